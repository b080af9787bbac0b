use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::{
    error::{is_unique_violation, AppError, Result},
    models::user::{NewUser, Role, UserChanges, UserRecord},
    services::credentials::{BackendKind, EmailPolicy, UserBackend},
};

const USER_COLUMNS: &str = "id, email, name, role, password_hash, created_at, updated_at";

/// A helper function to map a `tokio_postgres::Row` to a `UserRecord`.
fn row_to_user(row: &Row) -> Result<UserRecord> {
    Ok(UserRecord {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        email: row.try_get("email").map_err(|_| AppError::MissingData("email".to_string()))?,
        name: row.try_get("name").map_err(|_| AppError::MissingData("name".to_string()))?,
        role: row.try_get("role").map_err(|_| AppError::MissingData("role".to_string()))?,
        secret: row.try_get("password_hash").map_err(|_| AppError::MissingData("password_hash".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
        updated_at: row.try_get("updated_at").map_err(|_| AppError::MissingData("updated_at".to_string()))?,
    })
}

/// Creates a new user in the database.
pub async fn create_user(pool: &Pool, user: &NewUser) -> Result<UserRecord> {
    let client = pool.get().await?;
    let query = format!(
        r#"
        INSERT INTO users (email, name, role, password_hash)
        VALUES ($1, $2, $3, $4)
        RETURNING {USER_COLUMNS}
        "#
    );
    let row = client
        .query_one(
            query.as_str(),
            &[&user.email, &user.name, &user.role, &user.secret],
        )
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Validation("Email already exists".to_string())
            } else {
                AppError::from(e)
            }
        })?;
    row_to_user(&row)
}

/// Finds a user by their email address.
pub async fn find_by_email(pool: &Pool, email: &str, case_insensitive: bool) -> Result<Option<UserRecord>> {
    let client = pool.get().await?;
    let query = if case_insensitive {
        format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)")
    } else {
        format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1")
    };
    let row = client.query_opt(query.as_str(), &[&email]).await?;
    row.map(|r| row_to_user(&r)).transpose()
}

/// Finds a user by their ID.
pub async fn find_by_id(pool: &Pool, user_id: &Uuid) -> Result<Option<UserRecord>> {
    let client = pool.get().await?;
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let row = client.query_opt(query.as_str(), &[user_id]).await?;
    row.map(|r| row_to_user(&r)).transpose()
}

/// Lists all users, newest first.
pub async fn list_users(pool: &Pool) -> Result<Vec<UserRecord>> {
    let client = pool.get().await?;
    let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
    let rows = client.query(query.as_str(), &[]).await?;
    rows.iter().map(row_to_user).collect()
}

/// Applies the given changes to a user.
pub async fn update_user(pool: &Pool, user_id: &Uuid, changes: &UserChanges) -> Result<Option<UserRecord>> {
    let client = pool.get().await?;
    let role: Option<Role> = changes.role;
    let query = format!(
        r#"
        UPDATE users
        SET
            name = COALESCE($2, name),
            role = COALESCE($3, role),
            password_hash = COALESCE($4, password_hash),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    );
    let row = client
        .query_opt(
            query.as_str(),
            &[user_id, &changes.name, &role, &changes.secret],
        )
        .await?;
    row.map(|r| row_to_user(&r)).transpose()
}

/// Deletes a user. Returns `false` when no row matched.
pub async fn delete_user(pool: &Pool, user_id: &Uuid) -> Result<bool> {
    let client = pool.get().await?;
    let deleted = client
        .execute("DELETE FROM users WHERE id = $1", &[user_id])
        .await?;
    Ok(deleted > 0)
}

/// The `users` table as a credential backend.
pub struct PgUserBackend {
    pool: Pool,
    email: EmailPolicy,
    accept_legacy: bool,
}

impl PgUserBackend {
    pub fn new(pool: Pool, email: EmailPolicy, accept_legacy: bool) -> Self {
        Self {
            pool,
            email,
            accept_legacy,
        }
    }
}

#[async_trait]
impl UserBackend for PgUserBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Database
    }

    fn accepts_legacy_secrets(&self) -> bool {
        self.accept_legacy
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        find_by_email(&self.pool, email, self.email.case_insensitive).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        find_by_id(&self.pool, &id).await
    }

    async fn list(&self) -> Result<Vec<UserRecord>> {
        list_users(&self.pool).await
    }

    async fn insert(&self, mut user: NewUser) -> Result<UserRecord> {
        user.email = self.email.normalize(&user.email);
        if self.email.case_insensitive
            && find_by_email(&self.pool, &user.email, true).await?.is_some()
        {
            return Err(AppError::Validation("Email already exists".to_string()));
        }
        create_user(&self.pool, &user).await
    }

    async fn update(&self, id: Uuid, changes: &UserChanges) -> Result<Option<UserRecord>> {
        update_user(&self.pool, &id, changes).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        delete_user(&self.pool, &id).await
    }
}
