use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use anyhow::{Context, Result};

use crate::models::user::Role;
use crate::services::credentials::BackendKind;

/// Accounts used when `SEED_USERS` is not set.
const DEFAULT_SEED_USERS: &str = "superadmin@example.com:admin123:super_admin:Super Admin;\
admin@example.com:admin123:admin:Admin";

/// Where the server keeps issued sessions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionBackend {
    Redis,
    Memory,
}

/// An operator account loaded into the seed backend at startup.
#[derive(Clone, Debug)]
pub struct SeedUser {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub name: String,
}

/// The application's configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// Where sessions are stored.
    pub session_backend: SessionBackend,
    /// The URL of the Redis server.
    pub redis_url: String,
    /// The duration of a session in days.
    pub session_duration_days: i64,
    /// Whether cookies are marked `Secure`.
    pub production: bool,
    /// Public base URL used to build certificate verification links.
    pub app_url: String,
    /// The address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Directory holding the login and dashboard shell pages.
    pub public_dir: PathBuf,
    /// JSON file backing the persisted user backend.
    pub user_store_path: PathBuf,
    /// Backend that receives newly created users.
    pub user_write_backend: BackendKind,
    /// Lowercase and trim emails on insert and lookup.
    pub email_case_insensitive: bool,
    /// Accept plaintext and unsalted SHA-256 secrets written by older deployments.
    pub accept_legacy_secrets: bool,
    /// Accounts for the in-process seed backend.
    pub seed_users: Vec<SeedUser>,
    /// Maximum size of an uploaded certificate document.
    pub max_document_bytes: usize,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let session_backend = match env::var("SESSION_STORE")
            .unwrap_or_else(|_| "redis".to_string())
            .as_str()
        {
            "redis" => SessionBackend::Redis,
            "memory" => SessionBackend::Memory,
            other => anyhow::bail!("SESSION_STORE must be 'redis' or 'memory', got '{}'", other),
        };

        let user_write_backend = env::var("USER_WRITE_BACKEND")
            .unwrap_or_else(|_| "database".to_string())
            .parse::<BackendKind>()
            .context("Invalid USER_WRITE_BACKEND")?;

        let seed_users = parse_seed_users(
            &env::var("SEED_USERS").unwrap_or_else(|_| DEFAULT_SEED_USERS.to_string()),
        )?;

        let production = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string()) == "production";

        if production && env::var("SEED_USERS").is_err() {
            tracing::warn!("⚠️ Running in production with the default seed accounts");
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            session_backend,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            session_duration_days: env::var("SESSION_DURATION_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .context("Invalid SESSION_DURATION_DAYS")?,
            production,
            app_url: env::var("APP_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
                .parse()
                .context("Invalid BIND_ADDR")?,
            public_dir: env::var("PUBLIC_DIR")
                .unwrap_or_else(|_| "public".to_string())
                .into(),
            user_store_path: env::var("USER_STORE_PATH")
                .unwrap_or_else(|_| "data/users.json".to_string())
                .into(),
            user_write_backend,
            email_case_insensitive: parse_flag("EMAIL_CASE_INSENSITIVE", true)?,
            accept_legacy_secrets: parse_flag("ACCEPT_LEGACY_SECRETS", true)?,
            seed_users,
            max_document_bytes: env::var("MAX_DOCUMENT_BYTES")
                .unwrap_or_else(|_| (10 * 1024 * 1024).to_string())
                .parse()
                .context("Invalid MAX_DOCUMENT_BYTES")?,
        })
    }
}

fn parse_flag(name: &str, default: bool) -> Result<bool> {
    match env::var(name) {
        Ok(v) => match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => anyhow::bail!("{} must be a boolean, got '{}'", name, v),
        },
        Err(_) => Ok(default),
    }
}

/// Parses `email:password:role:name` entries separated by `;`.
pub fn parse_seed_users(raw: &str) -> Result<Vec<SeedUser>> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let mut parts = entry.splitn(4, ':');
            let email = parts.next().unwrap_or_default().trim();
            let password = parts.next().unwrap_or_default();
            let role = parts.next().unwrap_or_default().trim();
            let name = parts.next().unwrap_or(email).trim();

            if email.is_empty() || password.is_empty() {
                anyhow::bail!("SEED_USERS entry '{}' needs an email and a password", entry);
            }

            Ok(SeedUser {
                email: email.to_string(),
                password: password.to_string(),
                role: role
                    .parse()
                    .with_context(|| format!("SEED_USERS entry for {}", email))?,
                name: name.to_string(),
            })
        })
        .collect()
}
