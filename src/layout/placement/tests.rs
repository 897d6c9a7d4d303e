// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;

use rstest::rstest;

use super::{
    estimate_node_height, next_branch_position, rects_overlap, resolve_non_overlapping_position,
    Rect, ResolveRequest, DEFAULT_PADDING, GRAPH_NODE_WIDTH, MAX_NODE_HEIGHT, MIN_NODE_HEIGHT,
};
use crate::model::{ChatMessage, GraphNode, MessageId, NodeId, Position, Role};

fn nid(value: &str) -> NodeId {
    NodeId::new(value).expect("node id")
}

fn node(id: &str, parent: Option<&str>, x: f64, y: f64) -> GraphNode {
    GraphNode::new(
        nid(id),
        parent.map(nid),
        id,
        "2026-01-01T00:00:00.000Z",
        Position::new(x, y),
    )
}

fn message(id: &str, node_id: &str, role: Role, content: &str) -> ChatMessage {
    ChatMessage::new(MessageId::new(id).expect("message id"), nid(node_id), role, content)
}

fn assert_clear_of_others(
    nodes: &[GraphNode],
    messages: &BTreeMap<NodeId, Vec<ChatMessage>>,
    candidate: &NodeId,
    position: Position,
) {
    let height_of = |id: &NodeId| {
        estimate_node_height(messages.get(id).map(Vec::as_slice).unwrap_or_default())
    };
    let rect = Rect::at(position, height_of(candidate));
    for other in nodes.iter().filter(|node| node.id() != candidate) {
        let other_rect = Rect::at(other.position(), height_of(other.id()));
        assert!(
            !rects_overlap(&rect, &other_rect, DEFAULT_PADDING),
            "candidate at {position:?} overlaps {}",
            other.id()
        );
    }
}

#[test]
fn height_is_clamped_between_base_and_cap() {
    assert_eq!(estimate_node_height(&[]), MIN_NODE_HEIGHT);

    let short = [message("u", "n", Role::User, "hi")];
    assert_eq!(estimate_node_height(&short), MIN_NODE_HEIGHT + 18.0);

    let huge = "x".repeat(120 * 400);
    let long = [message("u", "n", Role::User, &huge)];
    assert_eq!(estimate_node_height(&long), MAX_NODE_HEIGHT);
}

#[test]
fn height_counts_first_user_and_last_assistant_only() {
    let messages = [
        message("u1", "n", Role::User, &"a".repeat(100)),
        message("a1", "n", Role::Assistant, &"b".repeat(500)),
        message("u2", "n", Role::User, &"c".repeat(1000)),
        message("a2", "n", Role::Assistant, &"d".repeat(30)),
    ];
    // 100 + 30 chars -> 2 lines.
    assert_eq!(estimate_node_height(&messages), MIN_NODE_HEIGHT + 2.0 * 18.0);
}

#[test]
fn overlap_respects_padding() {
    let a = Rect { x: 0.0, y: 0.0, width: 100.0, height: 100.0 };
    let b = Rect { x: 120.0, y: 0.0, width: 100.0, height: 100.0 };
    assert!(!rects_overlap(&a, &b, 0.0));
    assert!(rects_overlap(&a, &b, 36.0));
}

#[test]
fn same_position_candidate_is_pushed_down_and_keeps_x() {
    let nodes = vec![node("a", None, 40.0, 160.0), node("b", Some("a"), 40.0, 160.0)];
    let messages = BTreeMap::from([
        (
            nid("a"),
            vec![
                message("a-u", "a", Role::User, "question"),
                message("a-a", "a", Role::Assistant, "answer"),
            ],
        ),
        (nid("b"), vec![message("b-u", "b", Role::User, "follow up")]),
    ]);
    let candidate = nid("b");

    let request = ResolveRequest::new(&nodes, &messages, &candidate, Position::new(40.0, 160.0));
    let resolved = resolve_non_overlapping_position(&request);

    assert!(resolved.y > 160.0);
    assert_eq!(resolved.x, 40.0);
    assert_eq!(resolved.y, 160.0 + estimate_node_height(&messages[&nid("a")]) + DEFAULT_PADDING);
    assert_clear_of_others(&nodes, &messages, &candidate, resolved);
}

#[test]
fn free_slot_is_returned_unchanged() {
    let nodes = vec![node("a", None, 40.0, 140.0), node("b", Some("a"), 680.0, 140.0)];
    let messages = BTreeMap::new();
    let candidate = nid("b");

    let request = ResolveRequest::new(&nodes, &messages, &candidate, Position::new(680.0, 140.0));
    assert_eq!(resolve_non_overlapping_position(&request), Position::new(680.0, 140.0));
}

#[rstest]
#[case::column_of_three(vec![(0.0, 0.0), (0.0, 250.0), (0.0, 520.0)], Position::new(10.0, 10.0))]
#[case::staggered(vec![(0.0, 0.0), (300.0, 200.0), (-200.0, 420.0)], Position::new(100.0, 100.0))]
#[case::gap_too_small(vec![(0.0, 0.0), (0.0, 300.0)], Position::new(0.0, 260.0))]
fn resolved_position_clears_every_node(
    #[case] placed: Vec<(f64, f64)>,
    #[case] start: Position,
) {
    let mut nodes: Vec<GraphNode> = placed
        .iter()
        .enumerate()
        .map(|(idx, (x, y))| node(&format!("n{idx}"), None, *x, *y))
        .collect();
    nodes.push(node("candidate", Some("n0"), start.x, start.y));
    let messages = BTreeMap::new();
    let candidate = nid("candidate");

    let request = ResolveRequest::new(&nodes, &messages, &candidate, start);
    let resolved = resolve_non_overlapping_position(&request);

    assert_eq!(resolved.x, start.x);
    assert!(resolved.y >= start.y);
    assert_clear_of_others(&nodes, &messages, &candidate, resolved);
    assert_eq!(resolve_non_overlapping_position(&request), resolved);
}

#[test]
fn iteration_cap_stops_the_search() {
    let nodes: Vec<GraphNode> = (0..10)
        .map(|idx| node(&format!("n{idx}"), None, 0.0, idx as f64 * 250.0))
        .chain(std::iter::once(node("candidate", Some("n0"), 0.0, 0.0)))
        .collect();
    let messages = BTreeMap::new();
    let candidate = nid("candidate");

    let mut request = ResolveRequest::new(&nodes, &messages, &candidate, Position::new(0.0, 0.0));
    request.max_iterations = 1;
    let resolved = resolve_non_overlapping_position(&request);
    assert_eq!(resolved.y, MIN_NODE_HEIGHT + DEFAULT_PADDING);

    request.max_iterations = 0;
    assert_eq!(resolve_non_overlapping_position(&request), Position::new(0.0, 0.0));
}

#[test]
fn next_branch_position_stacks_siblings() {
    let mut nodes = vec![node("root", None, 40.0, 140.0)];
    let parent = nid("root");

    let first = next_branch_position(&nodes, &parent);
    assert_eq!(first, Position::new(40.0 + GRAPH_NODE_WIDTH + 80.0, 140.0));

    nodes.push(node("child", Some("root"), first.x, first.y));
    let second = next_branch_position(&nodes, &parent);
    assert_eq!(second, Position::new(first.x, 260.0));

    assert_eq!(next_branch_position(&nodes, &nid("ghost")), Position::new(380.0, 140.0));
}
