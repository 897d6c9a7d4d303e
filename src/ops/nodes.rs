// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::{on_clone, ObjectKind, OpError};
use crate::layout::{resolve_non_overlapping_position, ResolveRequest};
use crate::model::{ConversationSnapshot, NodeId, Position};

pub(super) fn select_in_place(
    snapshot: &mut ConversationSnapshot,
    node_id: &NodeId,
) -> Result<(), OpError> {
    if snapshot.set_active_node_id(node_id.clone()) {
        Ok(())
    } else {
        Err(OpError::not_found(ObjectKind::Node, node_id))
    }
}

pub(super) fn move_in_place(
    snapshot: &mut ConversationSnapshot,
    node_id: &NodeId,
    position: Position,
) -> Result<(), OpError> {
    if !position.x.is_finite() || !position.y.is_finite() {
        return Err(OpError::NonFinitePosition);
    }
    let node = snapshot
        .node_mut(node_id)
        .ok_or_else(|| OpError::not_found(ObjectKind::Node, node_id))?;
    node.set_position(position);
    Ok(())
}

pub(super) fn auto_place_in_place(
    snapshot: &mut ConversationSnapshot,
    node_id: &NodeId,
) -> Result<(), OpError> {
    let current = snapshot
        .node(node_id)
        .ok_or_else(|| OpError::not_found(ObjectKind::Node, node_id))?
        .position();
    let resolved = resolve_non_overlapping_position(&ResolveRequest::new(
        snapshot.nodes(),
        snapshot.messages_by_node(),
        node_id,
        current,
    ));
    if let Some(node) = snapshot.node_mut(node_id) {
        node.set_position(resolved);
    }
    Ok(())
}

/// Makes `node_id` the active node.
pub fn select_node(
    snapshot: &ConversationSnapshot,
    node_id: &NodeId,
) -> Result<ConversationSnapshot, OpError> {
    on_clone(snapshot, |next| select_in_place(next, node_id))
}

/// Drops a node at an explicit canvas position (for example after a drag).
pub fn move_node(
    snapshot: &ConversationSnapshot,
    node_id: &NodeId,
    position: Position,
) -> Result<ConversationSnapshot, OpError> {
    on_clone(snapshot, |next| move_in_place(next, node_id, position))
}

/// Pushes an existing node down until it no longer overlaps any other node.
pub fn auto_place_node(
    snapshot: &ConversationSnapshot,
    node_id: &NodeId,
) -> Result<ConversationSnapshot, OpError> {
    on_clone(snapshot, |next| auto_place_in_place(next, node_id))
}
