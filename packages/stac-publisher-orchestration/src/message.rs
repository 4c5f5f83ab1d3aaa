use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{PublisherError, Result};

/// Outbound queue message for one stabilized document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    /// Document identifier (value of the configured `id_key` field)
    pub uri: String,
    /// Payload reference carried through unmodified
    pub description_path: String,
}

impl Message {
    pub fn new(uri: impl Into<String>, description_path: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            description_path: description_path.into(),
        }
    }

    /// Wire encoding (JSON)
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(PublisherError::serialization)
    }
}

/// Identifier -> message mapping produced by one selection.
///
/// Keys are unique by construction; a later hit for the same identifier
/// replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    messages: BTreeMap<String, Message>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, returning the message previously stored for this identifier
    pub fn insert(&mut self, message: Message) -> Option<Message> {
        self.messages.insert(message.uri.clone(), message)
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.messages.contains_key(uri)
    }

    pub fn get(&self, uri: &str) -> Option<&Message> {
        self.messages.get(uri)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.values()
    }
}

impl IntoIterator for CandidateSet {
    type Item = Message;
    type IntoIter = std::collections::btree_map::IntoValues<String, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_values()
    }
}

impl FromIterator<Message> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        let mut set = CandidateSet::new();
        for message in iter {
            set.insert(message);
        }
        set
    }
}
