use std::sync::Arc;

use deadpool_postgres::Pool;
use redis::aio::ConnectionManager;

use crate::config::{Config, SessionBackend};
use crate::error::Result;
use crate::repositories::{
    session::{MemorySessionStore, RedisSessionStore, SessionStore},
    user::PgUserBackend,
    user_file::FileUserBackend,
    user_memory::MemoryUserBackend,
};
use crate::services::{
    credentials::{CredentialChain, EmailPolicy, UserBackend},
    session::SessionIssuer,
    users::UserDirectory,
};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool.
    pub db: Pool,
    /// The application's configuration.
    pub config: Config,
    /// Credential backends in resolution order.
    pub credentials: Arc<CredentialChain>,
    /// User management over the same backends.
    pub users: UserDirectory,
    /// Session minting and lookup.
    pub sessions: SessionIssuer,
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// Only the Redis session store connects eagerly. The database pool and
    /// the persisted user file are touched on first use.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = crate::db::create_pool(&config.database_url)?;
        tracing::info!("✅ PostgreSQL pool initialized (lazy connections)");

        let store: Arc<dyn SessionStore> = match config.session_backend {
            SessionBackend::Redis => {
                let redis_client = redis::Client::open(config.redis_url.as_str())?;
                let redis = ConnectionManager::new(redis_client).await?;
                tracing::info!("✅ Redis session store connected");
                Arc::new(RedisSessionStore::new(redis))
            }
            SessionBackend::Memory => {
                tracing::warn!("⚠️ Sessions are kept in memory and lost on restart");
                Arc::new(MemorySessionStore::new())
            }
        };

        Ok(Self::with_session_store(config, db, store))
    }

    /// Assembles the state around an existing pool and session store.
    pub fn with_session_store(config: &Config, db: Pool, store: Arc<dyn SessionStore>) -> Self {
        let email = EmailPolicy {
            case_insensitive: config.email_case_insensitive,
        };

        let backends: Vec<Arc<dyn UserBackend>> = vec![
            Arc::new(MemoryUserBackend::seeded(&config.seed_users, email)),
            Arc::new(FileUserBackend::new(
                config.user_store_path.clone(),
                email,
                config.accept_legacy_secrets,
            )),
            Arc::new(PgUserBackend::new(db.clone(), email, config.accept_legacy_secrets)),
        ];
        tracing::info!(
            "✅ Credential chain: seed ({} users) → persisted ({}) → database",
            config.seed_users.len(),
            config.user_store_path.display()
        );

        let credentials = Arc::new(CredentialChain::new(backends, email));
        let users = UserDirectory::new(credentials.clone(), config.user_write_backend);
        let sessions = SessionIssuer::new(store, config.session_duration_days);

        Self {
            db,
            config: config.clone(),
            credentials,
            users,
            sessions,
        }
    }
}
