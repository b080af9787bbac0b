use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::{Role, User};

/// The user snapshot carried by a session and mirrored in the `admin-user` cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

/// Represents a login session held server-side.
///
/// `role` is copied from the user at issuance and never refreshed, so a later
/// role change does not affect sessions already issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque token handed to the client in the `admin-token` cookie.
    pub token: String,
    /// The ID of the user this session belongs to.
    pub user_id: Uuid,
    /// The user's role at issuance.
    pub role: Role,
    /// The user snapshot at issuance.
    pub user: SessionUser,
    /// The timestamp when the session was created.
    pub issued_at: DateTime<Utc>,
    /// The timestamp when the session expires.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}
