//! Credential resolution across the configured user backends.
//!
//! Backends are consulted in a fixed order (seed, persisted, database). The
//! first backend holding a record whose secret verifies wins. A backend that
//! fails is logged and skipped, so operator accounts in the seed list keep
//! working when the file or the database is unreachable.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::crypto::secret::verify_secret;
use crate::error::Result;
use crate::models::user::{NewUser, User, UserChanges, UserRecord};

/// Identifies a user backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// In-process accounts seeded at startup.
    Seed,
    /// JSON file on local disk.
    Persisted,
    /// The Postgres `users` table.
    Database,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Seed => "seed",
            BackendKind::Persisted => "persisted",
            BackendKind::Database => "database",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a backend name is not recognised.
#[derive(thiserror::Error, Debug)]
#[error("unknown user backend: {0} (expected seed, persisted or database)")]
pub struct UnknownBackend(pub String);

impl FromStr for BackendKind {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "seed" | "memory" => Ok(BackendKind::Seed),
            "persisted" | "file" => Ok(BackendKind::Persisted),
            "database" | "db" => Ok(BackendKind::Database),
            other => Err(UnknownBackend(other.to_string())),
        }
    }
}

/// How emails are compared and stored.
#[derive(Clone, Copy, Debug)]
pub struct EmailPolicy {
    pub case_insensitive: bool,
}

impl EmailPolicy {
    /// The form an email is stored and looked up in.
    pub fn normalize(&self, email: &str) -> String {
        if self.case_insensitive {
            email.trim().to_lowercase()
        } else {
            email.to_string()
        }
    }

    pub fn matches(&self, stored: &str, candidate: &str) -> bool {
        if self.case_insensitive {
            stored.trim().to_lowercase() == candidate.trim().to_lowercase()
        } else {
            stored == candidate
        }
    }
}

/// A source of user records.
#[async_trait]
pub trait UserBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Whether plaintext and unsalted SHA-256 secrets from this backend verify.
    fn accepts_legacy_secrets(&self) -> bool;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>>;

    async fn list(&self) -> Result<Vec<UserRecord>>;

    /// Inserts a user; a duplicate email is a `Validation("Email already exists")`.
    async fn insert(&self, user: NewUser) -> Result<UserRecord>;

    async fn update(&self, id: Uuid, changes: &UserChanges) -> Result<Option<UserRecord>>;

    /// Returns `false` when no user had that id.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Checks a password against a record from this backend.
    fn verify(&self, password: &str, record: &UserRecord) -> bool {
        verify_secret(password, &record.secret, self.accepts_legacy_secrets())
    }
}

/// Outcome of resolving a credential pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Matched(User),
    NoMatch,
    /// Every consulted backend failed.
    Unavailable,
}

impl Resolution {
    pub fn into_user(self) -> Option<User> {
        match self {
            Resolution::Matched(user) => Some(user),
            _ => None,
        }
    }
}

/// The ordered list of user backends.
#[derive(Clone)]
pub struct CredentialChain {
    backends: Vec<Arc<dyn UserBackend>>,
    email: EmailPolicy,
}

impl CredentialChain {
    pub fn new(backends: Vec<Arc<dyn UserBackend>>, email: EmailPolicy) -> Self {
        Self { backends, email }
    }

    pub fn backends(&self) -> &[Arc<dyn UserBackend>] {
        &self.backends
    }

    pub fn backend(&self, kind: BackendKind) -> Option<&Arc<dyn UserBackend>> {
        self.backends.iter().find(|b| b.kind() == kind)
    }

    pub fn email_policy(&self) -> EmailPolicy {
        self.email
    }

    /// Resolves `email`/`password` to a user, trying every backend in order.
    pub async fn resolve(&self, email: &str, password: &str) -> Resolution {
        self.resolve_among(self.backends.iter(), email, password).await
    }

    /// Resolves against a single backend.
    pub async fn resolve_in(&self, kind: BackendKind, email: &str, password: &str) -> Resolution {
        self.resolve_among(self.backends.iter().filter(|b| b.kind() == kind), email, password)
            .await
    }

    async fn resolve_among<'a>(
        &self,
        backends: impl Iterator<Item = &'a Arc<dyn UserBackend>>,
        email: &str,
        password: &str,
    ) -> Resolution {
        if email.trim().is_empty() || password.is_empty() {
            return Resolution::NoMatch;
        }

        let email = self.email.normalize(email);
        let mut consulted = 0usize;
        let mut failed = 0usize;

        for backend in backends {
            consulted += 1;
            match backend.find_by_email(&email).await {
                Ok(Some(record)) => {
                    if backend.verify(password, &record) {
                        tracing::info!("✅ Credentials matched in {} backend: {}", backend.kind(), record.id);
                        return Resolution::Matched(record.to_user());
                    }
                    tracing::debug!("Secret mismatch in {} backend", backend.kind());
                }
                Ok(None) => {
                    tracing::debug!("No user in {} backend", backend.kind());
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!("❌ {} backend unavailable, falling through: {}", backend.kind(), e);
                }
            }
        }

        if consulted > 0 && failed == consulted {
            Resolution::Unavailable
        } else {
            Resolution::NoMatch
        }
    }
}
