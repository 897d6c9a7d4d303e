// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{json, Value};

use super::{normalize_snapshot, snapshot_to_value};
use crate::model::fixtures::{branched_snapshot, linear_snapshot};
use crate::model::{
    ChatMessage, ConversationTag, MessageId, NodeId, Quote, Role, TagSource,
};
use crate::store::Rejected;

fn nid(value: &str) -> NodeId {
    NodeId::new(value).expect("node id")
}

fn node(id: &str, parent: Option<&str>) -> Value {
    json!({
        "id": id,
        "parentId": parent,
        "title": format!("title {id}"),
        "createdAt": "2026-01-01T00:00:00.000Z",
        "position": {"x": 40, "y": 140},
    })
}

fn message(id: &str, node_id: &str, role: &str, content: &str) -> Value {
    json!({"id": id, "nodeId": node_id, "role": role, "content": content})
}

fn snapshot(nodes: Vec<Value>, messages_by_node: Value) -> Value {
    json!({
        "version": 1,
        "nodes": nodes,
        "messagesByNode": messages_by_node,
        "activeNodeId": "root",
        "conversationTags": [],
        "dismissedAutoTags": [],
    })
}

fn parent_of<'a>(snapshot: &'a crate::model::ConversationSnapshot, id: &str) -> Option<&'a str> {
    snapshot
        .node(&nid(id))
        .expect("node present")
        .parent_id()
        .map(NodeId::as_str)
}

#[test]
fn empty_node_list_is_rejected() {
    let raw = json!({
        "version": 1,
        "nodes": [],
        "messagesByNode": {},
        "activeNodeId": "x",
    });
    assert_eq!(normalize_snapshot(&raw), Err(Rejected::NoNodes));
}

#[test]
fn unknown_active_node_falls_back_to_first_node() {
    let mut raw = snapshot(vec![node("a", None), node("b", Some("a"))], json!({}));
    raw["activeNodeId"] = json!("ghost");

    let normalized = normalize_snapshot(&raw).expect("valid snapshot");
    assert_eq!(normalized.active_node_id().as_str(), "a");
    assert!(normalized.messages(&nid("a")).is_empty());
    assert!(normalized.messages_by_node().contains_key(&nid("b")));
}

#[rstest]
#[case::not_an_object(json!([1, 2, 3]), Rejected::NotAnObject)]
#[case::wrong_version(
    json!({"version": 2, "nodes": [], "messagesByNode": {}}),
    Rejected::UnsupportedVersion { expected: 1, found: "2".to_owned() }
)]
#[case::missing_version(
    json!({"nodes": [], "messagesByNode": {}}),
    Rejected::UnsupportedVersion { expected: 1, found: "missing".to_owned() }
)]
#[case::nodes_not_array(
    json!({"version": 1, "nodes": {}, "messagesByNode": {}}),
    Rejected::BadField("nodes")
)]
#[case::buckets_not_object(
    json!({"version": 1, "nodes": [], "messagesByNode": []}),
    Rejected::BadField("messagesByNode")
)]
fn malformed_envelopes_are_rejected(#[case] raw: Value, #[case] expected: Rejected) {
    assert_eq!(normalize_snapshot(&raw), Err(expected));
}

#[test]
fn malformed_nodes_are_dropped_and_first_duplicate_wins() {
    let mut bad_position = node("bad-position", Some("root"));
    bad_position["position"]["x"] = json!("40");
    let mut duplicate = node("root", None);
    duplicate["title"] = json!("second copy");

    let raw = snapshot(
        vec![
            node("root", None),
            bad_position,
            json!({"id": "no-position", "parentId": "root", "title": "t", "createdAt": "c"}),
            json!({
                "id": "no-parent-key",
                "title": "t",
                "createdAt": "c",
                "position": {"x": 0, "y": 0},
            }),
            json!("not a node"),
            duplicate,
            node("child", Some("root")),
        ],
        json!({}),
    );

    let normalized = normalize_snapshot(&raw).expect("valid snapshot");
    let ids: Vec<&str> = normalized.nodes().iter().map(|node| node.id().as_str()).collect();
    assert_eq!(ids, vec!["root", "child"]);
    assert_eq!(normalized.nodes()[0].title(), "title root");
}

#[test]
fn buckets_are_filtered_and_restamped() {
    let raw = snapshot(
        vec![node("root", None), node("child", Some("root"))],
        json!({
            "root": [
                message("u1", "somewhere-else", "user", "hi"),
                message("s1", "root", "system", "nope"),
                {"id": "no-content", "nodeId": "root", "role": "assistant"},
                message("a1", "root", "assistant", "hello"),
            ],
            "child": "not an array",
            "ghost": [message("g1", "ghost", "user", "lost")],
        }),
    );

    let normalized = normalize_snapshot(&raw).expect("valid snapshot");
    let root_ids: Vec<&str> = normalized
        .messages(&nid("root"))
        .iter()
        .map(|message| message.id().as_str())
        .collect();
    assert_eq!(root_ids, vec!["u1", "a1"]);
    assert!(normalized
        .messages(&nid("root"))
        .iter()
        .all(|message| message.node_id().as_str() == "root"));
    assert!(normalized.messages(&nid("child")).is_empty());
    assert!(!normalized.messages_by_node().contains_key(&nid("ghost")));
}

#[test]
fn optional_message_fields_with_wrong_types_are_dropped_individually() {
    let mut reply = message("a1", "root", "assistant", "hello");
    reply["replyToMessageId"] = json!("u1");
    reply["retryIndex"] = json!("2");
    reply["isStreaming"] = json!("yes");
    reply["quotedText"] = json!(42);
    reply["quotePreview"] = json!("preview");
    reply["quotedNodeId"] = json!(null);

    let raw = snapshot(vec![node("root", None)], json!({"root": [reply]}));
    let normalized = normalize_snapshot(&raw).expect("valid snapshot");
    let kept = &normalized.messages(&nid("root"))[0];

    assert_eq!(kept.content(), "hello");
    assert_eq!(kept.reply_to_message_id().map(MessageId::as_str), Some("u1"));
    assert_eq!(kept.retry_index(), None);
    assert!(!kept.is_streaming());
    assert_eq!(
        kept.quote(),
        &Quote {
            text: None,
            preview: Some("preview".to_owned()),
            message_id: None,
            node_id: None,
        }
    );
}

#[test]
fn tags_and_dismissals_are_cleaned() {
    let mut raw = snapshot(vec![node("root", None)], json!({}));
    raw["conversationTags"] = json!([
        {"name": "  Rust  ", "source": "manual", "confidence": 0.4},
        {"name": "   ", "source": "auto", "confidence": 0.9},
        {"name": "graphs", "source": "auto", "confidence": 0.75},
        {"name": "bogus", "source": "robot", "confidence": null},
        {"name": "typed", "source": "auto", "confidence": "high"},
        {"name": "unscored", "source": "auto"},
    ]);
    raw["dismissedAutoTags"] = json!(["  Papers ", "papers", 3, "", "LLM"]);

    let normalized = normalize_snapshot(&raw).expect("valid snapshot");
    assert_eq!(
        normalized.conversation_tags(),
        &[
            ConversationTag::manual("Rust"),
            ConversationTag::auto("graphs", Some(0.75)),
        ]
    );
    assert_eq!(normalized.conversation_tags()[0].source(), TagSource::Manual);
    assert_eq!(normalized.conversation_tags()[0].confidence(), None);
    assert_eq!(normalized.dismissed_auto_tags(), &["papers", "llm"]);
}

#[rstest]
#[case::dangling_parent(
    vec![node("root", None), node("orphan", Some("missing"))],
    vec![("orphan", Some("root"))]
)]
#[case::extra_root(
    vec![node("root", None), node("second", None)],
    vec![("second", Some("root"))]
)]
#[case::cycle(
    vec![node("root", None), node("a", Some("b")), node("b", Some("a"))],
    vec![("a", Some("b")), ("b", Some("root"))]
)]
#[case::self_parent(
    vec![node("root", None), node("loop", Some("loop"))],
    vec![("loop", Some("root"))]
)]
#[case::no_root(
    vec![node("first", Some("ghost")), node("second", Some("first"))],
    vec![("first", None), ("second", Some("first"))]
)]
#[case::subtree_below_break_is_kept(
    vec![node("root", None), node("leaf", Some("mid")), node("mid", Some("gone"))],
    vec![("leaf", Some("mid")), ("mid", Some("root"))]
)]
fn broken_trees_are_healed(
    #[case] nodes: Vec<Value>,
    #[case] expected_parents: Vec<(&str, Option<&str>)>,
) {
    let normalized = normalize_snapshot(&snapshot(nodes, json!({}))).expect("valid snapshot");
    assert!(normalized.is_well_formed_tree());
    for (id, parent) in expected_parents {
        assert_eq!(parent_of(&normalized, id), parent, "parent of {id}");
    }
}

#[test]
fn valid_tree_is_left_untouched() {
    let original = branched_snapshot();
    let encoded = snapshot_to_value(&original).expect("encode");
    let normalized = normalize_snapshot(&encoded).expect("valid snapshot");
    assert_eq!(normalized, original);
}

#[test]
fn round_trip_preserves_optional_message_fields_and_tags() {
    let mut original = linear_snapshot(&[("compare two papers", "here is a matrix")]);
    let root = nid("root");
    let mut quoted = ChatMessage::new(
        MessageId::new("q1").expect("message id"),
        root.clone(),
        Role::User,
        "Focus on this",
    );
    quoted.set_quote(Quote {
        text: Some("a matrix".to_owned()),
        preview: Some("a matrix".to_owned()),
        message_id: Some(MessageId::new("a1").expect("message id")),
        node_id: Some(root.clone()),
    });
    let mut pending = ChatMessage::pending_reply(root.clone(), quoted.id().clone(), 1);
    pending.push_content("partial");
    {
        let bucket = original.messages_mut(&root).expect("root bucket");
        bucket.push(quoted);
        bucket.push(pending);
    }
    original.set_conversation_tags(vec![
        ConversationTag::manual("research"),
        ConversationTag::auto("papers", Some(0.5)),
    ]);
    original.set_dismissed_auto_tags(vec!["llm".to_owned()]);

    let encoded = snapshot_to_value(&original).expect("encode");
    assert_eq!(encoded["version"], json!(1));
    assert_eq!(encoded["messagesByNode"]["root"][1]["replyToMessageId"], json!("u1"));
    assert_eq!(encoded["messagesByNode"]["root"][2]["quotedNodeId"], json!("root"));
    assert_eq!(encoded["messagesByNode"]["root"][3]["isStreaming"], json!(true));
    assert!(encoded["messagesByNode"]["root"][0].get("isStreaming").is_none());
    assert_eq!(encoded["conversationTags"][0]["confidence"], Value::Null);

    let decoded = normalize_snapshot(&encoded).expect("valid snapshot");
    assert_eq!(decoded, original);
}
