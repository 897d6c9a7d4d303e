// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Nexa: a branching conversation workspace.
//!
//! Conversations are trees of graph nodes, each holding its own message log. The crate covers
//! the data model, turn topology, card layout, copy-on-write operations, versioned
//! persistence with migration, and a session that streams assistant replies.

pub mod layout;
pub mod model;
pub mod ops;
pub mod session;
pub mod store;
pub mod stream;
pub mod topology;

pub use session::{StreamKey, StreamUpdate, WorkspaceSession};
