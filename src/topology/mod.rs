// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Promotes a linear message history to one graph node per turn.
//!
//! A conversation starts as a single root node holding every message. The first time the user
//! branches, that flat log is split into turns (a user message plus its reply) chained root to
//! leaf, so the new branch has a precise parent. The transformation runs once per
//! conversation and is never applied to an already branched snapshot.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::model::title::{branch_title, DEFAULT_CONVERSATION_TITLE};
use crate::model::{ChatMessage, GraphNode, MessageId, NodeId, Position};

const TURN_ORIGIN: Position = Position { x: 40.0, y: 140.0 };
const TURN_STEP_X: f64 = 640.0;
const TURN_STEP_Y: f64 = 80.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TurnTopology {
    pub nodes: Vec<GraphNode>,
    pub messages_by_node: BTreeMap<NodeId, Vec<ChatMessage>>,
    /// Every input message id (including discarded retry variants) to the node that now
    /// represents it.
    pub message_node_ids: HashMap<MessageId, NodeId>,
    pub last_node_id: NodeId,
}

impl TurnTopology {
    pub fn node_for_message(&self, message_id: &MessageId) -> Option<&NodeId> {
        self.message_node_ids.get(message_id)
    }
}

struct Turn<'a> {
    prompt: (usize, &'a ChatMessage),
    loose: Vec<(usize, &'a ChatMessage)>,
}

fn turn_position(index: usize) -> Position {
    Position::new(
        TURN_ORIGIN.x + index as f64 * TURN_STEP_X,
        TURN_ORIGIN.y + index as f64 * TURN_STEP_Y,
    )
}

fn settled(message: &ChatMessage, node_id: &NodeId) -> ChatMessage {
    let mut message = message.clone();
    message.set_node_id(node_id.clone());
    message.set_streaming(false);
    message
}

/// Splits `messages` into one node per user turn.
///
/// Each turn keeps its user message, the last (active) assistant variant replying to it and
/// any assistant messages without a resolvable `reply_to_message_id` that followed it. Older
/// retry variants are dropped; the surviving variant gets `retry_index = 1` and keeps its
/// streaming flag. Every other message comes out settled. Assistant messages
/// that precede every user message land in the first node. With no user message at all a
/// single root node is produced.
pub fn build_turn_topology(messages: &[ChatMessage], created_at: &str) -> TurnTopology {
    let user_ids: HashSet<&MessageId> = messages
        .iter()
        .filter(|message| message.is_user())
        .map(ChatMessage::id)
        .collect();

    let mut turns: Vec<Turn<'_>> = Vec::new();
    let mut leading: Vec<(usize, &ChatMessage)> = Vec::new();
    let mut variants: HashMap<&MessageId, Vec<(usize, &ChatMessage)>> = HashMap::new();

    for (idx, message) in messages.iter().enumerate() {
        if message.is_user() {
            turns.push(Turn { prompt: (idx, message), loose: Vec::new() });
            continue;
        }

        match message
            .reply_to_message_id()
            .filter(|prompt_id| user_ids.contains(prompt_id))
        {
            Some(prompt_id) => variants.entry(prompt_id).or_default().push((idx, message)),
            None => match turns.last_mut() {
                Some(turn) => turn.loose.push((idx, message)),
                None => leading.push((idx, message)),
            },
        }
    }

    let mut nodes = Vec::with_capacity(turns.len().max(1));
    let mut messages_by_node = BTreeMap::new();
    let mut message_node_ids = HashMap::new();

    let mut parent_id: Option<NodeId> = None;
    for (turn_index, turn) in turns.iter().enumerate() {
        let node_id = NodeId::fresh_node();
        let (prompt_idx, prompt) = turn.prompt;

        let mut members: Vec<(usize, ChatMessage)> = vec![(prompt_idx, settled(prompt, &node_id))];
        message_node_ids.insert(prompt.id().clone(), node_id.clone());

        if let Some(group) = variants.get(prompt.id()) {
            for (_, variant) in group {
                message_node_ids.insert(variant.id().clone(), node_id.clone());
            }
            if let Some((active_idx, active)) = group.last() {
                let mut flattened = settled(active, &node_id);
                flattened.set_retry_index(Some(1));
                // A reply still being written keeps its writer attached.
                flattened.set_streaming(active.is_streaming());
                members.push((*active_idx, flattened));
            }
        }

        let carried = if turn_index == 0 { leading.as_slice() } else { &[] };
        for (idx, message) in carried.iter().chain(turn.loose.iter()) {
            message_node_ids.insert(message.id().clone(), node_id.clone());
            members.push((*idx, settled(message, &node_id)));
        }
        members.sort_by_key(|(idx, _)| *idx);

        let title = match branch_title(prompt.content()) {
            title if title.is_empty() => DEFAULT_CONVERSATION_TITLE.to_owned(),
            title => title,
        };
        nodes.push(GraphNode::new(
            node_id.clone(),
            parent_id.take(),
            title,
            created_at,
            turn_position(turn_index),
        ));
        messages_by_node.insert(
            node_id.clone(),
            members.into_iter().map(|(_, message)| message).collect(),
        );
        parent_id = Some(node_id);
    }

    let Some(last_node_id) = parent_id else {
        return root_only_topology(&leading, created_at);
    };
    TurnTopology { nodes, messages_by_node, message_node_ids, last_node_id }
}

/// Single root node carrying every message; used when there is no user turn.
fn root_only_topology(leading: &[(usize, &ChatMessage)], created_at: &str) -> TurnTopology {
    let node_id = NodeId::fresh_node();
    let mut message_node_ids = HashMap::new();
    let bucket = leading
        .iter()
        .map(|(_, message)| {
            message_node_ids.insert(message.id().clone(), node_id.clone());
            settled(message, &node_id)
        })
        .collect();
    let root = GraphNode::new(
        node_id.clone(),
        None,
        DEFAULT_CONVERSATION_TITLE,
        created_at,
        TURN_ORIGIN,
    );
    TurnTopology {
        nodes: vec![root],
        messages_by_node: BTreeMap::from([(node_id.clone(), bucket)]),
        message_node_ids,
        last_node_id: node_id,
    }
}
