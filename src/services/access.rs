//! Role hierarchy and per-role feature entitlements.
//!
//! The hierarchy answers "is this role at least as senior as that one"; the
//! capability table answers "may this role use this feature area". The two
//! are kept separate: granting a capability means editing
//! [`Role::capabilities`], never reordering levels.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::session::Session;
use crate::models::user::Role;

/// A feature area gated per role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Dashboard,
    Brands,
    Certificates,
    Users,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Dashboard,
        Capability::Brands,
        Capability::Certificates,
        Capability::Users,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Dashboard => "dashboard",
            Capability::Brands => "brands",
            Capability::Certificates => "certificates",
            Capability::Users => "users",
        }
    }

    /// Maps a dashboard section (`/dashboard/<section>`) to its capability.
    pub fn for_section(section: &str) -> Option<Self> {
        match section {
            "" => Some(Capability::Dashboard),
            "brands" => Some(Capability::Brands),
            "certificates" => Some(Capability::Certificates),
            "users" => Some(Capability::Users),
            _ => None,
        }
    }
}

impl Role {
    /// Seniority level: higher outranks lower.
    pub fn level(&self) -> u8 {
        match self {
            Role::SuperAdmin => 3,
            Role::Admin => 2,
            Role::Viewer => 1,
        }
    }

    /// The static allow-list for this role.
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            Role::SuperAdmin => &[
                Capability::Dashboard,
                Capability::Brands,
                Capability::Certificates,
                Capability::Users,
            ],
            Role::Admin => &[
                Capability::Dashboard,
                Capability::Brands,
                Capability::Certificates,
            ],
            Role::Viewer => &[Capability::Dashboard],
        }
    }
}

/// `true` when `role` ranks at or above `required`. No role means no session.
pub fn has_at_least_role(role: Option<Role>, required: Role) -> bool {
    role.is_some_and(|r| r.level() >= required.level())
}

/// `true` when `role` is entitled to `capability`. No role means no session.
pub fn can_access(role: Option<Role>, capability: Capability) -> bool {
    role.is_some_and(|r| r.capabilities().contains(&capability))
}

/// Fails with `Unauthorized` unless the session's role grants `capability`.
pub fn authorize(session: &Session, capability: Capability) -> Result<()> {
    if can_access(Some(session.role), capability) {
        Ok(())
    } else {
        tracing::warn!(
            "❌ {} ({}) denied {}",
            session.user_id,
            session.role,
            capability.as_str()
        );
        Err(AppError::Unauthorized)
    }
}
