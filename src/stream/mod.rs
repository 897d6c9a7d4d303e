// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Assistant reply streaming.
//!
//! A [`ReplyStreamer`] turns one reply request into a boxed stream of text chunks. The stream
//! ends with a single `done` chunk carrying no text, or with an error. Callers own a
//! [`CancellationToken`] per request; cancelling it ends the stream with
//! [`StreamError::Cancelled`], which is not a failure.

use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::model::ConversationId;

pub mod scripted;

pub use scripted::{scripted_reply, ScriptedStreamer, SCRIPTED_MODEL};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRequest {
    pub conversation_id: ConversationId,
    pub prompt: String,
    /// Earlier replies to the same prompt, oldest first.
    pub prior_replies: Vec<String>,
    pub provider_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyChunk {
    pub delta: String,
    pub done: bool,
}

impl ReplyChunk {
    pub fn text(delta: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
            done: false,
        }
    }

    pub fn done() -> Self {
        Self {
            delta: String::new(),
            done: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("reply stream cancelled")]
    Cancelled,
    #[error("reply stream failed: {0}")]
    Failed(String),
}

pub type ReplyStream = BoxStream<'static, Result<ReplyChunk, StreamError>>;

pub trait ReplyStreamer: Send + Sync {
    fn stream_reply(&self, request: ReplyRequest, cancel: CancellationToken) -> ReplyStream;
}

/// Masks an API key for logs: `(empty)`, `***` for short keys, otherwise the first four and
/// last two characters around `***`.
pub fn redact_key(api_key: &str) -> String {
    let chars: Vec<char> = api_key.chars().collect();
    match chars.len() {
        0 => "(empty)".to_owned(),
        1..=8 => "***".to_owned(),
        len => {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[len - 2..].iter().collect();
            format!("{head}***{tail}")
        }
    }
}
