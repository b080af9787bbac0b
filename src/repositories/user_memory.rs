use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::SeedUser;
use crate::error::{AppError, Result};
use crate::models::user::{NewUser, UserChanges, UserRecord};
use crate::services::credentials::{BackendKind, EmailPolicy, UserBackend};

/// Process-lifetime user list seeded from configuration.
///
/// Lives as long as the `AppState` that owns it and starts over from the seed
/// list on every restart.
pub struct MemoryUserBackend {
    users: RwLock<Vec<UserRecord>>,
    email: EmailPolicy,
}

impl MemoryUserBackend {
    pub fn new(users: Vec<UserRecord>, email: EmailPolicy) -> Self {
        Self {
            users: RwLock::new(users),
            email,
        }
    }

    /// Builds the backend from operator seed accounts. Seed `i` gets the id
    /// `00000000-0000-0000-0000-{i+1:012}`.
    pub fn seeded(seeds: &[SeedUser], email: EmailPolicy) -> Self {
        let now = Utc::now();
        let users = seeds
            .iter()
            .enumerate()
            .map(|(i, seed)| UserRecord {
                id: Uuid::from_u128(i as u128 + 1),
                email: email.normalize(&seed.email),
                name: seed.name.clone(),
                role: seed.role,
                secret: seed.password.clone(),
                created_at: now,
                updated_at: now,
            })
            .collect();
        tracing::info!("✅ Seed user backend initialized with {} account(s)", seeds.len());
        Self::new(users, email)
    }
}

#[async_trait]
impl UserBackend for MemoryUserBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Seed
    }

    // Seed secrets come from operator configuration and are held as given.
    fn accepts_legacy_secrets(&self) -> bool {
        true
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| self.email.matches(&u.email, email)).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<UserRecord>> {
        Ok(self.users.read().await.clone())
    }

    async fn insert(&self, user: NewUser) -> Result<UserRecord> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| self.email.matches(&u.email, &user.email)) {
            return Err(AppError::Validation("Email already exists".to_string()));
        }

        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: self.email.normalize(&user.email),
            name: user.name,
            role: user.role,
            secret: user.secret,
            created_at: now,
            updated_at: now,
        };
        users.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: Uuid, changes: &UserChanges) -> Result<Option<UserRecord>> {
        let mut users = self.users.write().await;
        Ok(users.iter_mut().find(|u| u.id == id).map(|record| {
            changes.apply(record);
            record.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    fn seeds() -> Vec<SeedUser> {
        vec![SeedUser {
            email: "Admin@Example.com".to_string(),
            password: "admin123".to_string(),
            role: Role::Admin,
            name: "Admin".to_string(),
        }]
    }

    #[tokio::test]
    async fn seeds_get_fixed_ids_and_normalized_emails() {
        let backend = MemoryUserBackend::seeded(&seeds(), EmailPolicy { case_insensitive: true });
        let found = backend.find_by_email("admin@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, Uuid::from_u128(1));
        assert_eq!(found.email, "admin@example.com");
    }

    #[tokio::test]
    async fn duplicate_insert_leaves_store_untouched() {
        let backend = MemoryUserBackend::seeded(&seeds(), EmailPolicy { case_insensitive: true });
        let err = backend
            .insert(NewUser {
                email: "ADMIN@example.com".to_string(),
                name: "Other".to_string(),
                role: Role::Viewer,
                secret: "x".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Email already exists"));
        assert_eq!(backend.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_and_delete_by_id() {
        let backend = MemoryUserBackend::seeded(&seeds(), EmailPolicy { case_insensitive: false });
        let id = Uuid::from_u128(1);
        let changes = UserChanges { name: Some("Renamed".into()), ..Default::default() };
        let updated = backend.update(id, &changes).await.unwrap().unwrap();
        assert_eq!(updated.name, "Renamed");
        assert!(backend.delete(id).await.unwrap());
        assert!(!backend.delete(id).await.unwrap());
    }
}
