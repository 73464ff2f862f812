//! Redis key-space

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Client;
use std::collections::{HashMap, HashSet};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::{KeyDescriptor, KeyKind, KeySpace, TextItems};
use crate::error::{Error, Result};

/// Keys requested per SCAN round trip
const SCAN_COUNT: usize = 200;

/// Key-space backed by Redis
pub struct RedisKeySpace {
    client: Client,
    connection: OnceCell<MultiplexedConnection>,
}

impl RedisKeySpace {
    /// Create a key-space for `url`; connects lazily on first use
    ///
    /// # Errors
    ///
    /// Returns error if the Redis URL is invalid
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::open(url).map_err(|e| Error::KeySpace(e.to_string()))?;
        Ok(Self::from_client(client))
    }

    /// Create from an existing client
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            connection: OnceCell::new(),
        }
    }

    async fn get_connection(&self) -> Result<MultiplexedConnection> {
        let conn = self
            .connection
            .get_or_try_init(|| async {
                self.client
                    .get_multiplexed_async_connection()
                    .await
                    .map_err(|e| Error::KeySpace(format!("Redis connection failed: {e}")))
            })
            .await?;
        Ok(conn.clone())
    }
}

/// Escape glob metacharacters so a prefix matches literally
fn glob_escape(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('*');
    escaped
}

#[async_trait]
impl KeySpace for RedisKeySpace {
    async fn scan_prefix(&self, prefix: &str) -> Result<TextItems> {
        let mut conn = self.get_connection().await?;
        let pattern = glob_escape(prefix);

        // SCAN may return a key more than once. Names are read as bytes so
        // one binary key cannot fail the whole reply.
        let mut keys: HashSet<Vec<u8>> = HashSet::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<Vec<u8>>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await
                .map_err(|e| Error::KeySpace(format!("Redis SCAN failed: {e}")))?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        let scanned = TextItems::from_bytes(keys);
        if scanned.invalid > 0 {
            warn!(prefix = %prefix, invalid = scanned.invalid, "Skipping non UTF-8 key names");
        }
        debug!(prefix = %prefix, keys = scanned.items.len(), "Scanned key prefix");
        Ok(scanned)
    }

    async fn describe(&self, key: &str) -> Result<KeyDescriptor> {
        let mut conn = self.get_connection().await?;
        let name: String = redis::cmd("TYPE")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::KeySpace(format!("Redis TYPE failed: {e}")))?;
        Ok(KeyDescriptor::of(KeyKind::from_type_name(&name)))
    }

    async fn hash_fields(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.get_connection().await?;
        redis::cmd("HGETALL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::KeySpace(format!("Redis HGETALL failed: {e}")))
    }

    async fn list_items(&self, key: &str) -> Result<TextItems> {
        let mut conn = self.get_connection().await?;
        let raw: Vec<Vec<u8>> = redis::cmd("LRANGE")
            .arg(key)
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::KeySpace(format!("Redis LRANGE failed: {e}")))?;
        Ok(TextItems::from_bytes(raw))
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.get_connection().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| Error::KeySpace(format!("Redis PING failed: {e}")))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "redis"
    }
}
