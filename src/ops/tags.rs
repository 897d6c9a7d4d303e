// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Conversation tags.
//!
//! Names compare case-insensitively after trimming. A manual tag always wins over an auto tag
//! of the same name, and dismissing an auto tag keeps it from coming back until the user adds
//! it manually.

use std::collections::HashSet;

use super::{on_clone, OpError};
use crate::model::{tag_key, ConversationSnapshot, ConversationTag, TagSource};

pub(super) fn add_manual_in_place(
    snapshot: &mut ConversationSnapshot,
    name: &str,
) -> Result<(), OpError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(OpError::Empty { field: "tag" });
    }
    let key = tag_key(name);

    let dismissed = snapshot
        .dismissed_auto_tags()
        .iter()
        .filter(|item| **item != key)
        .cloned()
        .collect();
    snapshot.set_dismissed_auto_tags(dismissed);

    if snapshot.conversation_tags().iter().any(|tag| tag.key() == key) {
        return Ok(());
    }
    let mut tags = snapshot.conversation_tags().to_vec();
    tags.push(ConversationTag::manual(name));
    snapshot.set_conversation_tags(tags);
    Ok(())
}

pub(super) fn remove_manual_in_place(snapshot: &mut ConversationSnapshot, name: &str) {
    let key = tag_key(name);
    let tags = snapshot
        .conversation_tags()
        .iter()
        .filter(|tag| !(tag.source() == TagSource::Manual && tag.key() == key))
        .cloned()
        .collect();
    snapshot.set_conversation_tags(tags);
}

pub(super) fn dismiss_auto_in_place(
    snapshot: &mut ConversationSnapshot,
    name: &str,
) -> Result<(), OpError> {
    let key = tag_key(name);
    if key.is_empty() {
        return Err(OpError::Empty { field: "tag" });
    }

    if !snapshot.dismissed_auto_tags().contains(&key) {
        let mut dismissed = snapshot.dismissed_auto_tags().to_vec();
        dismissed.push(key.clone());
        snapshot.set_dismissed_auto_tags(dismissed);
    }
    let tags = snapshot
        .conversation_tags()
        .iter()
        .filter(|tag| !(tag.source() == TagSource::Auto && tag.key() == key))
        .cloned()
        .collect();
    snapshot.set_conversation_tags(tags);
    Ok(())
}

pub(super) fn set_auto_in_place(
    snapshot: &mut ConversationSnapshot,
    candidates: &[(String, Option<f64>)],
) {
    let dismissed: HashSet<&str> = snapshot
        .dismissed_auto_tags()
        .iter()
        .map(String::as_str)
        .collect();
    let mut taken: HashSet<String> = snapshot
        .conversation_tags()
        .iter()
        .filter(|tag| tag.source() == TagSource::Manual)
        .map(ConversationTag::key)
        .collect();

    let mut tags: Vec<ConversationTag> = snapshot
        .conversation_tags()
        .iter()
        .filter(|tag| tag.source() == TagSource::Manual)
        .cloned()
        .collect();
    for (name, confidence) in candidates {
        let name = name.trim();
        let key = tag_key(name);
        if key.is_empty() || dismissed.contains(key.as_str()) || !taken.insert(key) {
            continue;
        }
        tags.push(ConversationTag::auto(name, *confidence));
    }

    snapshot.set_conversation_tags(tags);
}

/// Adds a manual tag unless a tag with the same name exists, and clears any dismissal of it.
pub fn add_manual_tag(
    snapshot: &ConversationSnapshot,
    name: &str,
) -> Result<ConversationSnapshot, OpError> {
    on_clone(snapshot, |next| add_manual_in_place(next, name))
}

pub fn remove_manual_tag(snapshot: &ConversationSnapshot, name: &str) -> ConversationSnapshot {
    let mut next = snapshot.clone();
    remove_manual_in_place(&mut next, name);
    next
}

/// Removes an auto tag and remembers its lower-cased name so it is not suggested again.
pub fn dismiss_auto_tag(
    snapshot: &ConversationSnapshot,
    name: &str,
) -> Result<ConversationSnapshot, OpError> {
    on_clone(snapshot, |next| dismiss_auto_in_place(next, name))
}

/// Replaces all auto tags with `candidates`, skipping dismissed names and names that already
/// exist as manual tags.
pub fn set_auto_tags(
    snapshot: &ConversationSnapshot,
    candidates: &[(String, Option<f64>)],
) -> ConversationSnapshot {
    let mut next = snapshot.clone();
    set_auto_in_place(&mut next, candidates);
    next
}
