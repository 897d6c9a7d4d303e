// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSource {
    Manual,
    Auto,
}

/// A label attached to a whole conversation.
///
/// Manual tags never carry a confidence; auto tags may.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationTag {
    name: String,
    source: TagSource,
    confidence: Option<f64>,
}

impl ConversationTag {
    pub fn manual(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: TagSource::Manual,
            confidence: None,
        }
    }

    pub fn auto(name: impl Into<String>, confidence: Option<f64>) -> Self {
        Self {
            name: name.into(),
            source: TagSource::Auto,
            confidence,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> TagSource {
        self.source
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    /// Key used for case-insensitive tag comparisons.
    pub fn key(&self) -> String {
        tag_key(&self.name)
    }
}

pub fn tag_key(name: &str) -> String {
    name.trim().to_lowercase()
}
