use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use greencloud_config::validation::MAX_TOKEN_LIFETIME_SECONDS;
#[cfg(test)]
use mockall::automock;
use redis::{AsyncCommands, aio::ConnectionManager};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Entries never outlive the longest token lifetime config accepts.
const MAX_ENTRY_TTL: Duration =
    Duration::from_secs(MAX_TOKEN_LIFETIME_SECONDS);

pub fn refresh_key(user_id: i64) -> String {
    format!("RT:{user_id}")
}

pub fn blacklist_key(digest: &str) -> String {
    format!("BL:{digest}")
}

/// Server-side token state: the single live refresh token per user and the
/// logout blacklist of access-token digests.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Replaces any refresh token already stored for the user.
    async fn store_refresh(
        &self,
        user_id: i64,
        token: &str,
        ttl: Duration,
    ) -> Result<(), TokenStoreError>;

    async fn find_refresh(
        &self,
        user_id: i64,
    ) -> Result<Option<String>, TokenStoreError>;

    async fn revoke_refresh(&self, user_id: i64) -> Result<(), TokenStoreError>;

    /// No-op for a zero TTL.
    async fn blacklist_access(
        &self,
        digest: &str,
        ttl: Duration,
    ) -> Result<(), TokenStoreError>;

    async fn is_blacklisted(&self, digest: &str)
    -> Result<bool, TokenStoreError>;

    async fn ping(&self) -> Result<(), TokenStoreError>;
}

#[derive(Clone)]
pub struct RedisTokenStore {
    conn: ConnectionManager,
}

impl fmt::Debug for RedisTokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisTokenStore")
            .field("connection", &"ConnectionManager")
            .finish()
    }
}

impl RedisTokenStore {
    pub async fn connect(redis_url: &str) -> Result<Self, TokenStoreError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("connected to redis token store");
        Ok(Self { conn })
    }

    pub fn from_connection(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn store_refresh(
        &self,
        user_id: i64,
        token: &str,
        ttl: Duration,
    ) -> Result<(), TokenStoreError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(refresh_key(user_id), token, ttl.as_secs())
            .await?;
        debug!(user_id, ttl_secs = ttl.as_secs(), "stored refresh token");
        Ok(())
    }

    async fn find_refresh(
        &self,
        user_id: i64,
    ) -> Result<Option<String>, TokenStoreError> {
        let mut conn = self.conn.clone();
        Ok(conn.get::<_, Option<String>>(refresh_key(user_id)).await?)
    }

    async fn revoke_refresh(&self, user_id: i64) -> Result<(), TokenStoreError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(refresh_key(user_id)).await?;
        debug!(user_id, "revoked refresh token");
        Ok(())
    }

    async fn blacklist_access(
        &self,
        digest: &str,
        ttl: Duration,
    ) -> Result<(), TokenStoreError> {
        if ttl.as_secs() == 0 {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(blacklist_key(digest), "1", ttl.as_secs())
            .await?;
        Ok(())
    }

    async fn is_blacklisted(
        &self,
        digest: &str,
    ) -> Result<bool, TokenStoreError> {
        let mut conn = self.conn.clone();
        Ok(conn.exists::<_, bool>(blacklist_key(digest)).await?)
    }

    async fn ping(&self) -> Result<(), TokenStoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Process-local store used in dev mode without Redis. Entries expire lazily
/// when read.
#[derive(Default)]
pub struct InMemoryTokenStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl fmt::Debug for InMemoryTokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryTokenStore").finish_non_exhaustive()
    }
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn put(&self, key: String, value: String, ttl: Duration) {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
        let expires_at = now
            .checked_add(ttl.min(MAX_ENTRY_TTL))
            .unwrap_or(now);
        entries.insert(key, Entry { value, expires_at });
    }

    async fn live(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone())
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn store_refresh(
        &self,
        user_id: i64,
        token: &str,
        ttl: Duration,
    ) -> Result<(), TokenStoreError> {
        self.put(refresh_key(user_id), token.to_string(), ttl).await;
        Ok(())
    }

    async fn find_refresh(
        &self,
        user_id: i64,
    ) -> Result<Option<String>, TokenStoreError> {
        Ok(self.live(&refresh_key(user_id)).await)
    }

    async fn revoke_refresh(&self, user_id: i64) -> Result<(), TokenStoreError> {
        self.entries.write().await.remove(&refresh_key(user_id));
        Ok(())
    }

    async fn blacklist_access(
        &self,
        digest: &str,
        ttl: Duration,
    ) -> Result<(), TokenStoreError> {
        if ttl.as_secs() == 0 {
            return Ok(());
        }
        self.put(blacklist_key(digest), "1".into(), ttl).await;
        Ok(())
    }

    async fn is_blacklisted(
        &self,
        digest: &str,
    ) -> Result<bool, TokenStoreError> {
        Ok(self.live(&blacklist_key(digest)).await.is_some())
    }

    async fn ping(&self) -> Result<(), TokenStoreError> {
        Ok(())
    }
}
