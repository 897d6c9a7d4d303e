// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;

use crate::model::{ChatMessage, GraphNode, NodeId, Position};

pub const GRAPH_NODE_WIDTH: f64 = 560.0;
pub const MIN_NODE_HEIGHT: f64 = 220.0;
pub const MAX_NODE_HEIGHT: f64 = 720.0;
pub const DEFAULT_PADDING: f64 = 36.0;
pub const DEFAULT_MAX_ITERATIONS: usize = 48;

const CHARS_PER_LINE: usize = 120;
const LINE_HEIGHT: f64 = 18.0;
const BRANCH_GAP_X: f64 = 80.0;
const SIBLING_STEP_Y: f64 = 120.0;
const ORPHAN_BRANCH_POSITION: Position = Position { x: 380.0, y: 140.0 };

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn at(position: Position, height: f64) -> Self {
        Self {
            x: position.x,
            y: position.y,
            width: GRAPH_NODE_WIDTH,
            height,
        }
    }
}

/// Estimated rendered height of a node's card.
///
/// Only the first user message and the last assistant message are shown on the card, so only
/// they count. Each started 120-char line adds 18px on top of a 220px base, capped at 720px.
pub fn estimate_node_height(messages: &[ChatMessage]) -> f64 {
    let user = messages
        .iter()
        .find(|message| message.is_user())
        .map_or(0, |message| message.content().chars().count());
    let assistant = messages
        .iter()
        .rev()
        .find(|message| message.is_assistant())
        .map_or(0, |message| message.content().chars().count());

    let lines = (user + assistant).div_ceil(CHARS_PER_LINE);
    (MIN_NODE_HEIGHT + lines as f64 * LINE_HEIGHT).clamp(MIN_NODE_HEIGHT, MAX_NODE_HEIGHT)
}

pub fn rects_overlap(a: &Rect, b: &Rect, padding: f64) -> bool {
    a.x < b.x + b.width + padding
        && a.x + a.width + padding > b.x
        && a.y < b.y + b.height + padding
        && a.y + a.height + padding > b.y
}

/// Input for [`resolve_non_overlapping_position`].
#[derive(Debug, Clone)]
pub struct ResolveRequest<'a> {
    pub nodes: &'a [GraphNode],
    pub messages_by_node: &'a BTreeMap<NodeId, Vec<ChatMessage>>,
    pub candidate_id: &'a NodeId,
    pub candidate_position: Position,
    pub padding: f64,
    pub max_iterations: usize,
}

impl<'a> ResolveRequest<'a> {
    pub fn new(
        nodes: &'a [GraphNode],
        messages_by_node: &'a BTreeMap<NodeId, Vec<ChatMessage>>,
        candidate_id: &'a NodeId,
        candidate_position: Position,
    ) -> Self {
        Self {
            nodes,
            messages_by_node,
            candidate_id,
            candidate_position,
            padding: DEFAULT_PADDING,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    fn height_of(&self, node_id: &NodeId) -> f64 {
        estimate_node_height(
            self.messages_by_node
                .get(node_id)
                .map(Vec::as_slice)
                .unwrap_or_default(),
        )
    }
}

/// Pushes the candidate straight down until its card clears every other node.
///
/// Each round picks the first other node (in `nodes` order) that collides and moves the
/// candidate just below it. `x` is never touched. Stops after `max_iterations` rounds and
/// returns the last trial position.
pub fn resolve_non_overlapping_position(request: &ResolveRequest<'_>) -> Position {
    let candidate_height = request.height_of(request.candidate_id);
    let mut next = request.candidate_position;

    for _ in 0..request.max_iterations {
        let rect = Rect::at(next, candidate_height);
        let collision = request.nodes.iter().find_map(|node| {
            if node.id() == request.candidate_id {
                return None;
            }
            let height = request.height_of(node.id());
            rects_overlap(&rect, &Rect::at(node.position(), height), request.padding)
                .then_some((node.position(), height))
        });

        let Some((position, height)) = collision else {
            break;
        };
        next = Position::new(next.x, position.y + height + request.padding);
    }

    next
}

/// Initial slot for a new child of `parent_id`: one column to the right, stacked below any
/// existing siblings.
pub fn next_branch_position(nodes: &[GraphNode], parent_id: &NodeId) -> Position {
    let Some(parent) = nodes.iter().find(|node| node.id() == parent_id) else {
        return ORPHAN_BRANCH_POSITION;
    };

    let siblings = nodes
        .iter()
        .filter(|node| node.parent_id() == Some(parent_id))
        .count();
    let origin = parent.position();
    Position::new(
        origin.x + GRAPH_NODE_WIDTH + BRANCH_GAP_X,
        origin.y + siblings as f64 * SIBLING_STEP_Y,
    )
}

#[cfg(test)]
mod tests;
