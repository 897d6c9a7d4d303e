// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Human-readable labels derived from message text.

pub const DEFAULT_CONVERSATION_TITLE: &str = "New chat";

const BRANCH_TITLE_CHARS: usize = 20;
const CONVERSATION_TITLE_CHARS: usize = 26;
const NOTE_TITLE_CHARS: usize = 24;
const QUOTE_PREVIEW_CHARS: usize = 80;

/// Collapses every whitespace run to a single space and trims both ends.
pub fn compact_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keeps at most `max_chars` characters, appending `...` when something was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_owned(),
    }
}

pub fn branch_title(text: &str) -> String {
    truncate_chars(&compact_whitespace(text), BRANCH_TITLE_CHARS)
}

pub fn conversation_title_from(first_user_text: Option<&str>) -> String {
    let compact = first_user_text.map(compact_whitespace).unwrap_or_default();
    if compact.is_empty() {
        return DEFAULT_CONVERSATION_TITLE.to_owned();
    }
    truncate_chars(&compact, CONVERSATION_TITLE_CHARS)
}

pub fn note_title(content: &str) -> String {
    truncate_chars(&compact_whitespace(content), NOTE_TITLE_CHARS)
}

pub fn quote_preview(text: &str) -> String {
    truncate_chars(&compact_whitespace(text), QUOTE_PREVIEW_CHARS)
}
