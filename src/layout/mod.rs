// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Graph-canvas geometry.
//!
//! Node footprints are estimated from message text rather than measured, so placement stays a
//! pure function of the snapshot.

pub mod placement;

pub use placement::{
    estimate_node_height, next_branch_position, rects_overlap, resolve_non_overlapping_position,
    Rect, ResolveRequest, DEFAULT_MAX_ITERATIONS, DEFAULT_PADDING, GRAPH_NODE_WIDTH,
    MAX_NODE_HEIGHT, MIN_NODE_HEIGHT,
};
