//! Key-space boundary
//!
//! The external store is shared with unrelated data. Every key is described
//! before it is decoded, and decoders only ever see keys whose kind matched.

mod memory;
mod redis_keys;

pub use memory::MemoryKeySpace;
pub use redis_keys::RedisKeySpace;

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;

use crate::error::Result;

/// Storage kind of a key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// Field map
    Hash,
    /// Ordered list
    List,
    /// Plain string
    String,
    /// Set
    Set,
    /// Sorted set
    ZSet,
    /// Stream
    Stream,
    /// Key does not exist
    None,
    /// Anything the store reports that is not listed above
    Other(String),
}

impl KeyKind {
    /// Parse the store's type name (as returned by `TYPE`)
    #[must_use]
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "hash" => Self::Hash,
            "list" => Self::List,
            "string" => Self::String,
            "set" => Self::Set,
            "zset" => Self::ZSet,
            "stream" => Self::Stream,
            "none" => Self::None,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Result of describing a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDescriptor {
    /// Storage kind
    pub kind: KeyKind,
    /// Whether the key exists
    pub present: bool,
}

impl KeyDescriptor {
    /// Descriptor for a missing key
    #[must_use]
    pub fn absent() -> Self {
        Self {
            kind: KeyKind::None,
            present: false,
        }
    }

    /// Descriptor for an existing key of `kind`
    #[must_use]
    pub fn of(kind: KeyKind) -> Self {
        let present = kind != KeyKind::None;
        Self { kind, present }
    }

    /// Whether the key exists and has the expected kind
    #[must_use]
    pub fn matches(&self, expected: &KeyKind) -> bool {
        self.present && &self.kind == expected
    }
}

/// Text elements of a multi-element reply
///
/// The store is binary-safe; elements that are not valid UTF-8 are left out
/// and counted so the caller can report them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextItems {
    /// Decoded elements, in reply order
    pub items: Vec<String>,
    /// Elements dropped because they were not UTF-8
    pub invalid: usize,
}

impl TextItems {
    /// Decode raw elements one by one
    #[must_use]
    pub fn from_bytes(raw: impl IntoIterator<Item = Vec<u8>>) -> Self {
        let mut decoded = Self::default();
        for bytes in raw {
            match String::from_utf8(bytes) {
                Ok(text) => decoded.items.push(text),
                Err(_) => decoded.invalid += 1,
            }
        }
        decoded
    }
}

impl From<Vec<String>> for TextItems {
    fn from(items: Vec<String>) -> Self {
        Self { items, invalid: 0 }
    }
}

/// Read-only view of an external key-value store
#[async_trait]
pub trait KeySpace: Send + Sync {
    /// Every key starting with `prefix`, in no particular order
    async fn scan_prefix(&self, prefix: &str) -> Result<TextItems>;

    /// Kind and presence of `key`
    async fn describe(&self, key: &str) -> Result<KeyDescriptor>;

    /// All fields of a hash key
    async fn hash_fields(&self, key: &str) -> Result<HashMap<String, String>>;

    /// All items of a list key, head first
    async fn list_items(&self, key: &str) -> Result<TextItems>;

    /// Round-trip check used by health reporting
    async fn ping(&self) -> Result<()>;

    /// Backend name
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_items_skip_invalid_utf8() {
        let decoded = TextItems::from_bytes([
            b"algomind.agent.IM.logs".to_vec(),
            b"algomind.agent.\xff.logs".to_vec(),
            "algomind.agent.ÉQ.logs".as_bytes().to_vec(),
        ]);
        assert_eq!(
            decoded.items,
            vec!["algomind.agent.IM.logs", "algomind.agent.ÉQ.logs"]
        );
        assert_eq!(decoded.invalid, 1);
    }
}
