use std::collections::HashMap;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use tokio::sync::RwLock;

use crate::{
    error::{AppError, Result},
    models::session::Session,
};

/// Server-side storage for issued sessions, keyed by token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, session: &Session, ttl_secs: u64) -> Result<()>;

    /// Returns `None` for unknown tokens and for entries that do not decode.
    async fn get(&self, token: &str) -> Result<Option<Session>>;

    /// Removing an unknown token is not an error.
    async fn remove(&self, token: &str) -> Result<()>;
}

fn session_key(token: &str) -> String {
    format!("session:{}", token)
}

/// Sessions kept in Redis with a TTL matching their expiry.
pub struct RedisSessionStore {
    redis: ConnectionManager,
}

impl RedisSessionStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(&self, session: &Session, ttl_secs: u64) -> Result<()> {
        let session_json = sonic_rs::to_string(session)
            .map_err(|e| AppError::Internal(format!("Session serialization failed: {}", e)))?;

        let mut redis = self.redis.clone();
        let _: () = redis
            .set_ex(session_key(&session.token), &session_json, ttl_secs)
            .await
            .map_err(|e| {
                tracing::error!("❌ Redis set_ex failed: {}", e);
                AppError::Redis(e)
            })?;

        tracing::debug!("✅ Session saved to Redis for user {}", session.user_id);
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<Session>> {
        let mut redis = self.redis.clone();
        let session_json: Option<String> = redis.get(session_key(token)).await?;

        Ok(session_json.and_then(|json| {
            sonic_rs::from_str(&json)
                .map_err(|e| tracing::warn!("❌ Invalid session JSON: {}", e))
                .ok()
        }))
    }

    async fn remove(&self, token: &str) -> Result<()> {
        let mut redis = self.redis.clone();
        let _: () = redis.del(session_key(token)).await?;
        Ok(())
    }
}

/// Sessions kept in process memory. Lost on restart.
///
/// Expired entries are dropped whenever a new session is stored, so the map
/// stays bounded by the sessions alive at the last login.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, session: &Session, _ttl_secs: u64) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired());
        if sessions.len() < before {
            tracing::debug!("🧹 Evicted {} expired sessions", before - sessions.len());
        }
        sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(token).cloned())
    }

    async fn remove(&self, token: &str) -> Result<()> {
        self.sessions.write().await.remove(token);
        Ok(())
    }
}
