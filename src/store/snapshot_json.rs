// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Wire format and normalization for a single conversation snapshot (schema version 1).
//!
//! Input is untrusted: every node, message and tag is decoded on its own and dropped when it is
//! malformed, so one bad entry never costs the whole conversation.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::Rejected;
use crate::model::{
    ChatMessage, ConversationSnapshot, ConversationTag, GraphNode, MessageId, NodeId, Position,
    Quote, Role, TagSource,
};

pub const SNAPSHOT_VERSION: u64 = 1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RoleJson {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TagSourceJson {
    Manual,
    Auto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PositionJson {
    x: f64,
    y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeJson {
    id: String,
    #[serde(deserialize_with = "nullable")]
    parent_id: Option<String>,
    title: String,
    created_at: String,
    position: PositionJson,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageJson {
    id: String,
    node_id: String,
    role: RoleJson,
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    reply_to_message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    retry_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    is_streaming: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    quoted_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    quote_preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    quoted_message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    quoted_node_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TagJson {
    name: String,
    source: TagSourceJson,
    #[serde(deserialize_with = "nullable")]
    confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SnapshotJson {
    version: u64,
    nodes: Vec<NodeJson>,
    messages_by_node: BTreeMap<String, Vec<MessageJson>>,
    active_node_id: String,
    conversation_tags: Vec<TagJson>,
    dismissed_auto_tags: Vec<String>,
}

/// Optional fields of the wrong JSON type decode as absent instead of failing the entry.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// A key that must be present but may hold `null`. Without `default` a missing key fails the
/// entry instead of decoding as `None`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}

pub(crate) fn check_version(object: &Map<String, Value>, expected: u64) -> Result<(), Rejected> {
    match object.get("version") {
        Some(version) if version.as_f64() == Some(expected as f64) => Ok(()),
        other => Err(Rejected::UnsupportedVersion {
            expected,
            found: other.map_or_else(|| "missing".to_owned(), Value::to_string),
        }),
    }
}

fn node_from_json(node: NodeJson) -> Option<GraphNode> {
    let id = NodeId::new(node.id).ok()?;
    let parent_id = node.parent_id.and_then(|parent| NodeId::new(parent).ok());
    Some(GraphNode::new(
        id,
        parent_id,
        node.title,
        node.created_at,
        Position::new(node.position.x, node.position.y),
    ))
}

fn node_to_json(node: &GraphNode) -> NodeJson {
    let position = node.position();
    NodeJson {
        id: node.id().to_string(),
        parent_id: node.parent_id().map(ToString::to_string),
        title: node.title().to_owned(),
        created_at: node.created_at().to_owned(),
        position: PositionJson {
            x: position.x,
            y: position.y,
        },
    }
}

fn message_from_json(message: MessageJson, node_id: &NodeId) -> Option<ChatMessage> {
    let id = MessageId::new(message.id).ok()?;
    let role = match message.role {
        RoleJson::User => Role::User,
        RoleJson::Assistant => Role::Assistant,
    };

    let mut out = ChatMessage::new(id, node_id.clone(), role, message.content);
    out.set_reply_to_message_id(
        message
            .reply_to_message_id
            .and_then(|id| MessageId::new(id).ok()),
    );
    out.set_retry_index(message.retry_index.filter(|index| *index >= 1));
    out.set_streaming(message.is_streaming.unwrap_or(false));
    out.set_quote(Quote {
        text: message.quoted_text,
        preview: message.quote_preview,
        message_id: message.quoted_message_id.and_then(|id| MessageId::new(id).ok()),
        node_id: message.quoted_node_id.and_then(|id| NodeId::new(id).ok()),
    });
    Some(out)
}

fn message_to_json(message: &ChatMessage) -> MessageJson {
    let quote = message.quote();
    MessageJson {
        id: message.id().to_string(),
        node_id: message.node_id().to_string(),
        role: match message.role() {
            Role::User => RoleJson::User,
            Role::Assistant => RoleJson::Assistant,
        },
        content: message.content().to_owned(),
        reply_to_message_id: message.reply_to_message_id().map(ToString::to_string),
        retry_index: message.retry_index(),
        is_streaming: message.is_streaming().then_some(true),
        quoted_text: quote.text.clone(),
        quote_preview: quote.preview.clone(),
        quoted_message_id: quote.message_id.as_ref().map(ToString::to_string),
        quoted_node_id: quote.node_id.as_ref().map(ToString::to_string),
    }
}

fn tag_to_json(tag: &ConversationTag) -> TagJson {
    TagJson {
        name: tag.name().to_owned(),
        source: match tag.source() {
            TagSource::Manual => TagSourceJson::Manual,
            TagSource::Auto => TagSourceJson::Auto,
        },
        confidence: tag.confidence(),
    }
}

pub(crate) fn snapshot_to_json(snapshot: &ConversationSnapshot) -> SnapshotJson {
    SnapshotJson {
        version: SNAPSHOT_VERSION,
        nodes: snapshot.nodes().iter().map(node_to_json).collect(),
        messages_by_node: snapshot
            .messages_by_node()
            .iter()
            .map(|(node_id, bucket)| {
                (
                    node_id.to_string(),
                    bucket.iter().map(message_to_json).collect(),
                )
            })
            .collect(),
        active_node_id: snapshot.active_node_id().to_string(),
        conversation_tags: snapshot.conversation_tags().iter().map(tag_to_json).collect(),
        dismissed_auto_tags: snapshot.dismissed_auto_tags().to_vec(),
    }
}

/// Encodes `snapshot` in the camelCase wire format.
pub fn snapshot_to_value(snapshot: &ConversationSnapshot) -> Result<Value, serde_json::Error> {
    serde_json::to_value(snapshot_to_json(snapshot))
}

/// Re-parents every node that does not reach the root to the root and returns how many were
/// touched.
///
/// The root is the first node without a parent, or the first node when every node has one.
/// Missing parents, cycles and additional roots are all cut at the node where the chain breaks,
/// so intact subtrees hanging below that node stay intact.
fn heal_tree(nodes: &mut [GraphNode]) -> usize {
    if nodes.is_empty() {
        return 0;
    }

    let root_idx = nodes.iter().position(GraphNode::is_root).unwrap_or(0);
    let mut healed = usize::from(!nodes[root_idx].is_root());
    nodes[root_idx].set_parent_id(None);
    let root_id = nodes[root_idx].id().clone();

    let index: HashMap<NodeId, usize> = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id().clone(), idx))
        .collect();
    let mut settled = vec![false; nodes.len()];
    settled[root_idx] = true;

    for start in 0..nodes.len() {
        let mut path = Vec::new();
        let mut on_path = HashSet::new();
        let mut current = start;

        while !settled[current] {
            path.push(current);
            on_path.insert(current);
            let parent = nodes[current]
                .parent_id()
                .and_then(|parent_id| index.get(parent_id))
                .copied();
            match parent {
                Some(parent) if !on_path.contains(&parent) => current = parent,
                _ => {
                    nodes[current].set_parent_id(Some(root_id.clone()));
                    healed += 1;
                    break;
                }
            }
        }

        for idx in path {
            settled[idx] = true;
        }
    }

    healed
}

fn normalize_tags(raw: Option<&Value>) -> Vec<ConversationTag> {
    raw.and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| TagJson::deserialize(entry).ok())
        .filter_map(|tag| {
            let name = tag.name.trim();
            if name.is_empty() {
                return None;
            }
            Some(match tag.source {
                TagSourceJson::Manual => ConversationTag::manual(name),
                TagSourceJson::Auto => ConversationTag::auto(name, tag.confidence),
            })
        })
        .collect()
}

fn normalize_dismissed(raw: Option<&Value>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty() && seen.insert(name.clone()))
        .collect()
}

/// Validates untrusted JSON into a snapshot.
///
/// Rejects the document when its envelope is wrong (not an object, `version != 1`, `nodes` not
/// an array, `messagesByNode` not an object) or when no node survives filtering. Everything
/// below the envelope is repaired instead: malformed entries are dropped, buckets are re-keyed
/// to their node, the tree is healed and the active node falls back to the first node.
pub fn normalize_snapshot(raw: &Value) -> Result<ConversationSnapshot, Rejected> {
    let object = raw.as_object().ok_or(Rejected::NotAnObject)?;
    check_version(object, SNAPSHOT_VERSION)?;
    let raw_nodes = object
        .get("nodes")
        .and_then(Value::as_array)
        .ok_or(Rejected::BadField("nodes"))?;
    let raw_buckets = object
        .get("messagesByNode")
        .and_then(Value::as_object)
        .ok_or(Rejected::BadField("messagesByNode"))?;

    let mut node_ids = HashSet::new();
    let mut nodes: Vec<GraphNode> = raw_nodes
        .iter()
        .filter_map(|entry| NodeJson::deserialize(entry).ok())
        .filter_map(node_from_json)
        .filter(|node| node_ids.insert(node.id().clone()))
        .collect();
    let Some(first) = nodes.first() else {
        return Err(Rejected::NoNodes);
    };
    let first_id = first.id().clone();

    let healed = heal_tree(&mut nodes);
    if healed > 0 {
        tracing::debug!(healed, "re-parented nodes that did not reach the snapshot root");
    }

    let mut messages_by_node = BTreeMap::new();
    for (key, bucket) in raw_buckets {
        let Ok(node_id) = NodeId::new(key.as_str()) else {
            continue;
        };
        if !node_ids.contains(&node_id) {
            continue;
        }
        let Some(entries) = bucket.as_array() else {
            continue;
        };
        let messages = entries
            .iter()
            .filter_map(|entry| MessageJson::deserialize(entry).ok())
            .filter_map(|message| message_from_json(message, &node_id))
            .collect();
        messages_by_node.insert(node_id, messages);
    }

    let active_node_id = object
        .get("activeNodeId")
        .and_then(Value::as_str)
        .and_then(|id| NodeId::new(id).ok())
        .unwrap_or(first_id);

    let mut snapshot = ConversationSnapshot::from_parts(nodes, messages_by_node, active_node_id)
        .ok_or(Rejected::NoNodes)?;
    snapshot.set_conversation_tags(normalize_tags(object.get("conversationTags")));
    snapshot.set_dismissed_auto_tags(normalize_dismissed(object.get("dismissedAutoTags")));
    Ok(snapshot)
}

#[cfg(test)]
mod tests;
