use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::user::{NewUser, UserChanges, UserRecord};
use crate::services::credentials::{BackendKind, EmailPolicy, UserBackend};

/// User list persisted as a JSON array on local disk.
///
/// The file is read on every call so edits made outside the process are
/// picked up. A missing file is an empty list; a file that does not parse
/// makes the backend unavailable until it is fixed.
pub struct FileUserBackend {
    path: PathBuf,
    write_lock: Mutex<()>,
    email: EmailPolicy,
    accept_legacy: bool,
}

impl FileUserBackend {
    pub fn new(path: impl Into<PathBuf>, email: EmailPolicy, accept_legacy: bool) -> Self {
        let path = path.into();
        tracing::info!("✅ Persisted user backend at {}", path.display());
        Self {
            path,
            write_lock: Mutex::new(()),
            email,
            accept_legacy,
        }
    }

    async fn load(&self) -> Result<Vec<UserRecord>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        sonic_rs::from_str(&raw).map_err(|e| {
            AppError::Unavailable(format!("{} is not a valid user list: {}", self.path.display(), e))
        })
    }

    async fn save(&self, users: &[UserRecord]) -> Result<()> {
        let json = sonic_rs::to_string_pretty(users)
            .map_err(|e| AppError::Internal(format!("User list serialization failed: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl UserBackend for FileUserBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Persisted
    }

    fn accepts_legacy_secrets(&self) -> bool {
        self.accept_legacy
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let users = self.load().await?;
        Ok(users.into_iter().find(|u| self.email.matches(&u.email, email)))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        let users = self.load().await?;
        Ok(users.into_iter().find(|u| u.id == id))
    }

    async fn list(&self) -> Result<Vec<UserRecord>> {
        self.load().await
    }

    async fn insert(&self, user: NewUser) -> Result<UserRecord> {
        let _guard = self.write_lock.lock().await;
        let mut users = self.load().await?;

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
        self.save(&users).await?;

        tracing::info!("✅ User {} written to {}", record.id, self.path.display());
        Ok(record)
    }

    async fn update(&self, id: Uuid, changes: &UserChanges) -> Result<Option<UserRecord>> {
        let _guard = self.write_lock.lock().await;
        let mut users = self.load().await?;

        let Some(record) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        changes.apply(record);
        let updated = record.clone();
        self.save(&users).await?;
        Ok(Some(updated))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut users = self.load().await?;
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
            return Ok(false);
        }
        self.save(&users).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("certadmin-users-{}", Uuid::new_v4()))
            .join("users.json")
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            name: "Viewer".to_string(),
            role: Role::Viewer,
            secret: "secret".to_string(),
        }
    }

    #[tokio::test]
    async fn missing_file_is_an_empty_list() {
        let backend = FileUserBackend::new(temp_path(), EmailPolicy { case_insensitive: true }, true);
        assert!(backend.list().await.unwrap().is_empty());
        assert!(backend.find_by_email("a@b.c").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn inserted_users_survive_a_new_backend_instance() {
        let path = temp_path();
        let policy = EmailPolicy { case_insensitive: true };
        let first = FileUserBackend::new(&path, policy, true);
        let record = first.insert(new_user("viewer@example.com")).await.unwrap();

        let second = FileUserBackend::new(&path, policy, true);
        let found = second.find_by_email("VIEWER@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, record.id);

        assert!(second.insert(new_user("viewer@example.com")).await.is_err());
        assert!(second.delete(record.id).await.unwrap());
        assert!(second.list().await.unwrap().is_empty());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn corrupt_file_makes_backend_unavailable() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        let backend = FileUserBackend::new(&path, EmailPolicy { case_insensitive: true }, true);
        assert!(matches!(
            backend.find_by_email("a@b.c").await,
            Err(AppError::Unavailable(_))
        ));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
