use std::sync::Arc;

use chrono::Utc;

use crate::{
    crypto::token::{generate_session_token, looks_like_session_token},
    error::Result,
    models::{
        session::{Session, SessionUser},
        user::User,
    },
    repositories::session::SessionStore,
};

/// Mints, reads back and revokes login sessions.
#[derive(Clone)]
pub struct SessionIssuer {
    store: Arc<dyn SessionStore>,
    duration_days: i64,
}

impl SessionIssuer {
    pub fn new(store: Arc<dyn SessionStore>, duration_days: i64) -> Self {
        Self {
            store,
            duration_days,
        }
    }

    pub fn duration_days(&self) -> i64 {
        self.duration_days
    }

    fn ttl_secs(&self) -> u64 {
        (self.duration_days.max(0) * 86400) as u64
    }

    /// Issues a new session for `user`. The role is fixed at this point.
    pub async fn issue(&self, user: &User) -> Result<Session> {
        let now = Utc::now();
        let session = Session {
            token: generate_session_token(),
            user_id: user.id,
            role: user.role,
            user: SessionUser::from(user),
            issued_at: now,
            expires_at: now + chrono::Duration::days(self.duration_days),
        };

        self.store.put(&session, self.ttl_secs()).await?;
        tracing::info!("✅ Session issued for user {} ({})", user.id, user.role);
        Ok(session)
    }

    /// Looks up the session for `token`.
    ///
    /// Absent, malformed and expired tokens all read as "logged out". A store
    /// failure does too, after being logged.
    pub async fn current(&self, token: &str) -> Option<Session> {
        if !looks_like_session_token(token) {
            tracing::debug!("Ignoring malformed session token");
            return None;
        }

        let session = match self.store.get(token).await {
            Ok(Some(session)) => session,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("❌ Session lookup failed: {}", e);
                return None;
            }
        };

        if session.token != token {
            tracing::warn!("❌ Stored session does not match its key");
            return None;
        }

        if session.is_expired() {
            tracing::warn!("❌ Session expired for user: {}", session.user_id);
            if let Err(e) = self.store.remove(token).await {
                tracing::warn!("❌ Failed to drop expired session: {}", e);
            }
            return None;
        }

        Some(session)
    }

    /// Revokes `token`. Revoking an unknown or missing token is a no-op.
    pub async fn revoke(&self, token: Option<&str>) -> Result<()> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            tracing::debug!("Revoke without a session token");
            return Ok(());
        };
        self.store.remove(token).await?;
        tracing::info!("✅ Session revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use crate::repositories::session::MemorySessionStore;
    use uuid::Uuid;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            email: "admin@example.com".to_string(),
            name: "Admin".to_string(),
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn issuer(days: i64) -> SessionIssuer {
        SessionIssuer::new(Arc::new(MemorySessionStore::new()), days)
    }

    #[tokio::test]
    async fn issue_then_current_round_trips() {
        let issuer = issuer(7);
        let user = user(Role::Admin);
        let session = issuer.issue(&user).await.unwrap();

        let current = issuer.current(&session.token).await.unwrap();
        assert_eq!(current.user_id, user.id);
        assert_eq!(current.role, user.role);
        assert_eq!(current.user.email, user.email);
        assert_eq!((current.expires_at - current.issued_at).num_days(), 7);
    }

    #[tokio::test]
    async fn every_login_gets_a_fresh_token() {
        let issuer = issuer(7);
        let user = user(Role::Viewer);
        let a = issuer.issue(&user).await.unwrap();
        let b = issuer.issue(&user).await.unwrap();
        assert_ne!(a.token, b.token);
    }

    #[tokio::test]
    async fn revoke_is_idempotent() {
        let issuer = issuer(7);
        let session = issuer.issue(&user(Role::Admin)).await.unwrap();

        issuer.revoke(Some(&session.token)).await.unwrap();
        assert!(issuer.current(&session.token).await.is_none());
        issuer.revoke(Some(&session.token)).await.unwrap();
        assert!(issuer.current(&session.token).await.is_none());
        issuer.revoke(None).await.unwrap();
    }

    #[tokio::test]
    async fn malformed_and_unknown_tokens_are_logged_out() {
        let issuer = issuer(7);
        assert!(issuer.current("").await.is_none());
        assert!(issuer.current("%%%garbage").await.is_none());
        assert!(issuer.current(&generate_session_token()).await.is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_dropped() {
        let store = Arc::new(MemorySessionStore::new());
        let issuer = SessionIssuer::new(store.clone(), -1);
        let session = issuer.issue(&user(Role::Admin)).await.unwrap();

        assert!(issuer.current(&session.token).await.is_none());
        assert!(store.get(&session.token).await.unwrap().is_none());
    }
}
