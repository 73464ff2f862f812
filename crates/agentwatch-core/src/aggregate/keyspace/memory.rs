//! In-process key-space

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use super::{KeyDescriptor, KeyKind, KeySpace, TextItems};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
enum Value {
    Hash(HashMap<String, String>),
    List(Vec<Vec<u8>>),
    String(String),
}

/// Key-space held in memory, for tests and local runs without Redis
///
/// Key names and list items are binary-safe, as they are in Redis.
#[derive(Debug, Default)]
pub struct MemoryKeySpace {
    entries: RwLock<BTreeMap<Vec<u8>, Value>>,
}

impl MemoryKeySpace {
    /// Create an empty key-space
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self, key: impl Into<Vec<u8>>, value: Value) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.into(), value);
        }
    }

    /// Set a hash key
    pub fn set_hash<K, V>(&self, key: &str, fields: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.write(key, Value::Hash(fields));
    }

    /// Set a list key
    pub fn set_list<S: Into<String>>(&self, key: &str, items: impl IntoIterator<Item = S>) {
        let items = items.into_iter().map(|s| s.into().into_bytes()).collect();
        self.write(key, Value::List(items));
    }

    /// Set a list key from raw bytes, for both the name and the items
    pub fn set_list_bytes(
        &self,
        key: impl Into<Vec<u8>>,
        items: impl IntoIterator<Item = Vec<u8>>,
    ) {
        self.write(key, Value::List(items.into_iter().collect()));
    }

    /// Set a string key
    pub fn set_string(&self, key: &str, value: impl Into<String>) {
        self.write(key, Value::String(value.into()));
    }

    /// Remove a key
    pub fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(key.as_bytes());
        }
    }

    fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| Error::KeySpace("memory key-space poisoned".to_string()))?;
        Ok(entries.get(key.as_bytes()).cloned())
    }
}

fn wrong_type(key: &str) -> Error {
    Error::KeySpace(format!("WRONGTYPE operation against key {key}"))
}

#[async_trait]
impl KeySpace for MemoryKeySpace {
    async fn scan_prefix(&self, prefix: &str) -> Result<TextItems> {
        let entries = self
            .entries
            .read()
            .map_err(|_| Error::KeySpace("memory key-space poisoned".to_string()))?;
        Ok(TextItems::from_bytes(
            entries
                .keys()
                .filter(|k| k.starts_with(prefix.as_bytes()))
                .cloned(),
        ))
    }

    async fn describe(&self, key: &str) -> Result<KeyDescriptor> {
        Ok(match self.get(key)? {
            None => KeyDescriptor::absent(),
            Some(Value::Hash(_)) => KeyDescriptor::of(KeyKind::Hash),
            Some(Value::List(_)) => KeyDescriptor::of(KeyKind::List),
            Some(Value::String(_)) => KeyDescriptor::of(KeyKind::String),
        })
    }

    async fn hash_fields(&self, key: &str) -> Result<HashMap<String, String>> {
        match self.get(key)? {
            None => Ok(HashMap::new()),
            Some(Value::Hash(fields)) => Ok(fields),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn list_items(&self, key: &str) -> Result<TextItems> {
        match self.get(key)? {
            None => Ok(TextItems::default()),
            Some(Value::List(items)) => Ok(TextItems::from_bytes(items)),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
