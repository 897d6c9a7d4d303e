// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Mutation operations for conversations and the workspace.
//!
//! Every operation takes the current value by reference and returns a new one; the input is
//! never modified, and a failed operation leaves nothing half-applied. Snapshot-level edits
//! that do not create messages can also be batched through [`apply_ops`].

use std::fmt;

use crate::model::{ConversationSnapshot, NodeId, Position};

pub mod branch;
pub mod nodes;
pub mod tags;
pub mod turn;
pub mod workspace;

pub use branch::{create_branch, BranchCreated, BranchMode, BranchRequest};
pub use nodes::{auto_place_node, move_node, select_node};
pub use tags::{add_manual_tag, dismiss_auto_tag, remove_manual_tag, set_auto_tags};
pub use turn::{
    append_user_message, apply_stream_delta, finish_stream, retry, PendingReply, RetryStarted,
    StreamOutcome, TurnAppended, INTERRUPTED_PLACEHOLDER,
};
pub use workspace::{
    add_note, create_conversation, delete_conversation, remove_note, rename_conversation,
    replace_snapshot, set_active_conversation, update_model_provider, NewNote,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Node,
    Message,
    Conversation,
    Note,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OpError {
    #[error("object not found ({kind:?}, id={id})")]
    NotFound { kind: ObjectKind, id: String },
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("message {id} is not a user message")]
    NotAPrompt { id: String },
    #[error("position must be finite")]
    NonFinitePosition,
}

impl OpError {
    pub(crate) fn not_found(kind: ObjectKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Snapshot edits that only touch navigation, geometry or tags.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotOp {
    SelectNode { node_id: NodeId },
    MoveNode { node_id: NodeId, position: Position },
    AutoPlaceNode { node_id: NodeId },
    AddManualTag { name: String },
    RemoveManualTag { name: String },
    DismissAutoTag { name: String },
    SetAutoTags { tags: Vec<(String, Option<f64>)> },
}

/// Applies `ops` in order to a copy of `snapshot`. The first failing op aborts the batch.
pub fn apply_ops(
    snapshot: &ConversationSnapshot,
    ops: &[SnapshotOp],
) -> Result<ConversationSnapshot, OpError> {
    let mut next = snapshot.clone();
    for op in ops {
        apply_op(&mut next, op)?;
    }
    Ok(next)
}

fn apply_op(snapshot: &mut ConversationSnapshot, op: &SnapshotOp) -> Result<(), OpError> {
    match op {
        SnapshotOp::SelectNode { node_id } => nodes::select_in_place(snapshot, node_id),
        SnapshotOp::MoveNode { node_id, position } => {
            nodes::move_in_place(snapshot, node_id, *position)
        }
        SnapshotOp::AutoPlaceNode { node_id } => nodes::auto_place_in_place(snapshot, node_id),
        SnapshotOp::AddManualTag { name } => tags::add_manual_in_place(snapshot, name),
        SnapshotOp::RemoveManualTag { name } => {
            tags::remove_manual_in_place(snapshot, name);
            Ok(())
        }
        SnapshotOp::DismissAutoTag { name } => tags::dismiss_auto_in_place(snapshot, name),
        SnapshotOp::SetAutoTags { tags } => {
            tags::set_auto_in_place(snapshot, tags);
            Ok(())
        }
    }
}

/// Runs `edit` on a clone so callers only ever observe complete results.
fn on_clone(
    snapshot: &ConversationSnapshot,
    edit: impl FnOnce(&mut ConversationSnapshot) -> Result<(), OpError>,
) -> Result<ConversationSnapshot, OpError> {
    let mut next = snapshot.clone();
    edit(&mut next)?;
    Ok(next)
}
