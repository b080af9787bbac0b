use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    crypto::secret::hash_password,
    error::{AppError, Result},
    models::user::{NewUser, Role, User, UserChanges, UserRecord},
    services::credentials::{BackendKind, CredentialChain, UserBackend},
};

/// Plain-text input for creating a user.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: Role,
}

/// Plain-text input for updating a user.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub password: Option<String>,
}

/// Admin-facing user management over the credential backends.
///
/// Reads span every backend; writes of new users go to one configured backend.
#[derive(Clone)]
pub struct UserDirectory {
    chain: Arc<CredentialChain>,
    write_target: BackendKind,
}

impl UserDirectory {
    pub fn new(chain: Arc<CredentialChain>, write_target: BackendKind) -> Self {
        Self {
            chain,
            write_target,
        }
    }

    pub fn chain(&self) -> &Arc<CredentialChain> {
        &self.chain
    }

    fn target(&self) -> Result<&Arc<dyn UserBackend>> {
        self.chain.backend(self.write_target).ok_or_else(|| {
            AppError::Internal(format!("{} backend is not configured", self.write_target))
        })
    }

    /// Lists users from every backend. When an email appears in more than one
    /// backend the earlier backend's record is shown, matching login resolution.
    pub async fn list(&self) -> Result<Vec<User>> {
        let policy = self.chain.email_policy();
        let mut seen = HashSet::new();
        let mut users = Vec::new();
        let mut failures = 0usize;

        for backend in self.chain.backends() {
            match backend.list().await {
                Ok(records) => {
                    for record in records {
                        if seen.insert(policy.normalize(&record.email)) {
                            users.push(record.to_user());
                        }
                    }
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!("❌ Skipping {} backend in user listing: {}", backend.kind(), e);
                }
            }
        }

        if failures > 0 && failures == self.chain.backends().len() {
            return Err(AppError::Unavailable("Failed to fetch users".to_string()));
        }

        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    /// Creates a user in the write backend after checking that no backend
    /// already holds the email. A backend that cannot answer blocks the
    /// create, since the email may live there.
    pub async fn create(&self, input: CreateUser) -> Result<User> {
        let email = self.chain.email_policy().normalize(&input.email);

        for backend in self.chain.backends() {
            match backend.find_by_email(&email).await {
                Ok(Some(_)) => {
                    tracing::debug!("Email already present in {} backend", backend.kind());
                    return Err(AppError::Validation("Email already exists".to_string()));
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("❌ Duplicate check failed on {} backend: {}", backend.kind(), e);
                    return Err(AppError::Unavailable(format!(
                        "Cannot check email uniqueness: {} backend unavailable",
                        backend.kind()
                    )));
                }
            }
        }

        let secret = hash_password(&input.password)?;
        let record = self
            .target()?
            .insert(NewUser {
                email,
                name: input.name.trim().to_string(),
                role: input.role,
                secret,
            })
            .await?;

        tracing::info!("✅ User created with ID: {} ({})", record.id, self.write_target);
        Ok(record.to_user())
    }

    /// Finds the first backend holding `id`.
    async fn locate(&self, id: Uuid) -> Result<(&Arc<dyn UserBackend>, UserRecord)> {
        for backend in self.chain.backends() {
            match backend.find_by_id(id).await {
                Ok(Some(record)) => return Ok((backend, record)),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("❌ Lookup skipped {} backend: {}", backend.kind(), e);
                }
            }
        }
        Err(AppError::NotFound)
    }

    /// Updates name, role or password. Sessions already issued keep the role
    /// they were issued with. A super admin cannot be demoted, which would
    /// otherwise open the way to deleting it.
    pub async fn update(&self, id: Uuid, input: UpdateUser) -> Result<User> {
        let (backend, current) = self.locate(id).await?;

        if current.role == Role::SuperAdmin && input.role.is_some_and(|r| r != Role::SuperAdmin) {
            return Err(AppError::Validation("Cannot change super admin role".to_string()));
        }

        let changes = UserChanges {
            name: input.name.map(|n| n.trim().to_string()),
            role: input.role,
            secret: input.password.as_deref().map(hash_password).transpose()?,
        };

        let record = backend.update(id, &changes).await?.ok_or(AppError::NotFound)?;
        tracing::info!("✅ User updated: {}", id);
        Ok(record.to_user())
    }

    /// Deletes a user. Super admins cannot be deleted.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let (backend, record) = self.locate(id).await?;

        if record.role == Role::SuperAdmin {
            return Err(AppError::Validation("Cannot delete super admin".to_string()));
        }

        if !backend.delete(id).await? {
            return Err(AppError::NotFound);
        }

        tracing::info!("✅ User deleted: {} from {} backend", id, backend.kind());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::user_memory::MemoryUserBackend;
    use crate::services::credentials::tests::{record, DownBackend};
    use crate::services::credentials::EmailPolicy;

    const POLICY: EmailPolicy = EmailPolicy { case_insensitive: true };

    fn directory(backends: Vec<Arc<dyn UserBackend>>, target: BackendKind) -> UserDirectory {
        UserDirectory::new(Arc::new(CredentialChain::new(backends, POLICY)), target)
    }

    fn seed() -> Arc<dyn UserBackend> {
        Arc::new(MemoryUserBackend::new(
            vec![
                record(1, "superadmin@example.com", "admin123", Role::SuperAdmin),
                record(2, "admin@example.com", "admin123", Role::Admin),
            ],
            POLICY,
        ))
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_without_mutation() {
        let dir = directory(vec![seed()], BackendKind::Seed);
        let err = dir
            .create(CreateUser {
                email: "Admin@Example.com".into(),
                name: "Dup".into(),
                password: "password1".into(),
                role: Role::Viewer,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Email already exists"));
        assert_eq!(dir.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn created_users_can_log_in_with_a_hashed_secret() {
        let dir = directory(vec![seed()], BackendKind::Seed);
        let user = dir
            .create(CreateUser {
                email: "viewer@example.com".into(),
                name: " Viewer ".into(),
                password: "password1".into(),
                role: Role::Viewer,
            })
            .await
            .unwrap();
        assert_eq!(user.name, "Viewer");

        let stored = dir.chain().backends()[0]
            .find_by_email("viewer@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(stored.secret.starts_with("$argon2id$"));

        let resolved = dir.chain().resolve("viewer@example.com", "password1").await;
        assert_eq!(resolved.into_user().map(|u| u.id), Some(user.id));
    }

    #[tokio::test]
    async fn super_admin_cannot_be_deleted() {
        let dir = directory(vec![seed()], BackendKind::Seed);
        let err = dir.delete(Uuid::from_u128(1)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        dir.delete(Uuid::from_u128(2)).await.unwrap();
        assert!(matches!(dir.delete(Uuid::from_u128(2)).await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn super_admin_cannot_be_demoted_then_deleted() {
        let dir = directory(vec![seed()], BackendKind::Seed);
        let err = dir
            .update(
                Uuid::from_u128(1),
                UpdateUser { role: Some(Role::Admin), ..Default::default() },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Cannot change super admin role"));

        assert!(dir.delete(Uuid::from_u128(1)).await.is_err());
        let users = dir.list().await.unwrap();
        let root = users.iter().find(|u| u.id == Uuid::from_u128(1)).unwrap();
        assert_eq!(root.role, Role::SuperAdmin);

        let renamed = dir
            .update(
                Uuid::from_u128(1),
                UpdateUser { name: Some("Root".into()), ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Root");
    }

    #[tokio::test]
    async fn create_is_refused_when_a_backend_cannot_be_checked() {
        let dir = directory(
            vec![seed(), Arc::new(DownBackend(BackendKind::Database))],
            BackendKind::Seed,
        );
        let err = dir
            .create(CreateUser {
                email: "db-only@example.com".into(),
                name: "Db Only".into(),
                password: "password1".into(),
                role: Role::Viewer,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unavailable(_)));

        let stored = dir.chain().backends()[0].list().await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn listing_prefers_earlier_backends_and_skips_failures() {
        let shadow: Arc<dyn UserBackend> = Arc::new(MemoryUserBackend::new(
            vec![record(9, "admin@example.com", "other", Role::Viewer)],
            POLICY,
        ));
        let dir = directory(
            vec![seed(), Arc::new(DownBackend(BackendKind::Persisted)), shadow],
            BackendKind::Seed,
        );
        let users = dir.list().await.unwrap();
        assert_eq!(users.len(), 2);
        let admin = users.iter().find(|u| u.email == "admin@example.com").unwrap();
        assert_eq!(admin.id, Uuid::from_u128(2));
    }

    #[tokio::test]
    async fn listing_fails_when_every_backend_fails() {
        let dir = directory(vec![Arc::new(DownBackend(BackendKind::Database))], BackendKind::Database);
        assert!(matches!(dir.list().await, Err(AppError::Unavailable(_))));
    }

    #[tokio::test]
    async fn role_change_leaves_the_directory_updated() {
        let dir = directory(vec![seed()], BackendKind::Seed);
        let user = dir
            .update(
                Uuid::from_u128(2),
                UpdateUser { role: Some(Role::Viewer), ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(user.role, Role::Viewer);
    }
}
