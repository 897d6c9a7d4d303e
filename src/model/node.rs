// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::ids::NodeId;

/// Advisory graph-canvas coordinates of a node.
///
/// Positions are presentational only; nothing in the model depends on them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A branch point in the conversation tree. Each node owns one ordered message bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    id: NodeId,
    parent_id: Option<NodeId>,
    title: String,
    created_at: String,
    position: Position,
}

impl GraphNode {
    pub fn new(
        id: NodeId,
        parent_id: Option<NodeId>,
        title: impl Into<String>,
        created_at: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            id,
            parent_id,
            title: title.into(),
            created_at: created_at.into(),
            position,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn parent_id(&self) -> Option<&NodeId> {
        self.parent_id.as_ref()
    }

    pub fn set_parent_id(&mut self, parent_id: Option<NodeId>) {
        self.parent_id = parent_id;
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }
}
