// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::borrow::Borrow;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use uuid::Uuid;

/// A stable identifier for nodes, messages, conversations and notes.
///
/// Ids are opaque strings. Persisted ids are accepted as-is as long as they are non-empty;
/// freshly minted ids carry a readable prefix (`node-3f9c1a2b4d5e`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T> {
    value: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        if value.is_empty() {
            return Err(IdError::Empty);
        }
        Ok(Self {
            value,
            _marker: PhantomData,
        })
    }

    /// Mints a new random id of the form `<prefix>-<12 hex chars>`.
    pub fn fresh(prefix: &str) -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        Self {
            value: format!("{prefix}-{}", &simple[..12]),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_string(self) -> String {
        self.value
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T> AsRef<str> for Id<T> {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl<T> Borrow<str> for Id<T> {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl<T> FromStr for Id<T> {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_owned())
    }
}

impl<T> TryFrom<String> for Id<T> {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("id must not be empty")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeIdTag {}
pub type NodeId = Id<NodeIdTag>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageIdTag {}
pub type MessageId = Id<MessageIdTag>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConversationIdTag {}
pub type ConversationId = Id<ConversationIdTag>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NoteIdTag {}
pub type NoteId = Id<NoteIdTag>;

impl NodeId {
    pub fn fresh_node() -> Self {
        Self::fresh("node")
    }

    /// The fixed id of the root node in a freshly seeded conversation.
    pub fn seed_root() -> Self {
        Self {
            value: "root".to_owned(),
            _marker: PhantomData,
        }
    }
}

impl ConversationId {
    pub fn fresh_conversation() -> Self {
        Self::fresh("conv")
    }
}

impl NoteId {
    pub fn fresh_note() -> Self {
        Self::fresh("note")
    }
}

#[cfg(test)]
mod tests {
    use super::{Id, IdError, MessageId, NodeId};

    #[test]
    fn id_rejects_empty() {
        let result: Result<Id<()>, _> = Id::new("");
        assert_eq!(result, Err(IdError::Empty));
    }

    #[test]
    fn id_accepts_any_non_empty_string() {
        let id: NodeId = "root".parse().expect("node id");
        assert_eq!(id.as_str(), "root");
        let id = MessageId::new("m/with slash").expect("message id");
        assert_eq!(id.to_string(), "m/with slash");
    }

    #[test]
    fn fresh_ids_carry_prefix_and_differ() {
        let a = NodeId::fresh_node();
        let b = NodeId::fresh_node();
        assert!(a.as_str().starts_with("node-"));
        assert_eq!(a.as_str().len(), "node-".len() + 12);
        assert_ne!(a, b);
    }
}
