// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Offline reply streamer with deterministic output.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

use super::{redact_key, ReplyChunk, ReplyRequest, ReplyStream, ReplyStreamer, StreamError};
use crate::model::title::{compact_whitespace, truncate_chars};

pub const SCRIPTED_MODEL: &str = "scripted-1";

const CHUNK_CHARS: std::ops::RangeInclusive<usize> = 14..=27;
const TOPIC_CHARS: usize = 60;

const OPENINGS: [&str; 3] = [
    "Here is a first pass at",
    "Taking a different angle on",
    "One more way to look at",
];

const BODY: &str = "Start from what is already settled, then name the part that is still open. \
                    Pick the smallest next step that would answer it and check the result \
                    against the original question before widening the scope.";

/// Reply text for `prompt` after `prior_replies` earlier answers to it.
pub fn scripted_reply(prompt: &str, prior_replies: usize) -> String {
    let topic = truncate_chars(&compact_whitespace(prompt), TOPIC_CHARS);
    let opening = OPENINGS[prior_replies % OPENINGS.len()];
    if topic.is_empty() {
        return format!("{opening} this. {BODY}");
    }
    format!("{opening} \"{topic}\". {BODY}")
}

fn seed_for(text: &str, salt: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    salt.hash(&mut hasher);
    hasher.finish()
}

/// Splits `text` into chunks of 14 to 27 characters; only the last one may be shorter.
fn split_chunks(text: &str, seed: u64) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut chunks = Vec::new();
    let mut cursor = 0;
    while cursor < chars.len() {
        let size = rng.random_range(CHUNK_CHARS);
        let end = chars.len().min(cursor + size);
        chunks.push(chars[cursor..end].iter().collect());
        cursor = end;
    }
    chunks
}

/// Streams [`scripted_reply`] without any network access.
///
/// Output depends only on the prompt and the number of prior replies, so the same request
/// always produces the same chunks.
#[derive(Debug, Clone, Default)]
pub struct ScriptedStreamer {
    chunk_delay: Option<Duration>,
    fail_after: Option<usize>,
}

impl ScriptedStreamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits this long before every text chunk.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    /// Ends the stream with [`StreamError::Failed`] after `chunks` text chunks.
    pub fn failing_after(mut self, chunks: usize) -> Self {
        self.fail_after = Some(chunks);
        self
    }

    pub fn chunks_for(request: &ReplyRequest) -> Vec<String> {
        let reply = scripted_reply(&request.prompt, request.prior_replies.len());
        split_chunks(&reply, seed_for(&request.prompt, request.prior_replies.len()))
    }
}

impl ReplyStreamer for ScriptedStreamer {
    fn stream_reply(&self, request: ReplyRequest, cancel: CancellationToken) -> ReplyStream {
        tracing::info!(
            conversation_id = %request.conversation_id,
            provider_url = %request.provider_url,
            api_key = %redact_key(&request.api_key),
            model = SCRIPTED_MODEL,
            "dispatching scripted completion"
        );

        let chunks = Self::chunks_for(&request);
        let delay = self.chunk_delay;
        let fail_after = self.fail_after;

        Box::pin(async_stream::stream! {
            for (idx, chunk) in chunks.into_iter().enumerate() {
                if fail_after == Some(idx) {
                    tracing::warn!(chunks = idx, "scripted completion failed");
                    yield Err(StreamError::Failed("scripted failure".to_owned()));
                    return;
                }

                let cancelled = match delay {
                    Some(delay) => tokio::select! {
                        _ = cancel.cancelled() => true,
                        _ = tokio::time::sleep(delay) => false,
                    },
                    None => cancel.is_cancelled(),
                };
                if cancelled {
                    yield Err(StreamError::Cancelled);
                    return;
                }

                yield Ok(ReplyChunk::text(chunk));
            }
            yield Ok(ReplyChunk::done());
        })
    }
}
