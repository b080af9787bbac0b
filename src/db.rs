use std::time::Duration;

use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime, Timeouts};
use tokio_postgres::NoTls;

use crate::error::{AppError, Result};

/// Upper bound on pooled connections. The console is low-traffic.
const MAX_CONNECTIONS: usize = 16;

/// Builds the PostgreSQL pool from a connection URL.
///
/// Connections are opened lazily, so an unreachable database does not stop
/// startup; the database credential backend then reports itself unavailable
/// and the other backends keep serving logins.
pub fn create_pool(database_url: &str) -> Result<Pool> {
    // Reject malformed URLs up front instead of on first checkout.
    let _: tokio_postgres::Config = database_url.parse()?;

    let mut cfg = Config::new();
    cfg.url = Some(database_url.to_string());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(PoolConfig {
        max_size: MAX_CONNECTIONS,
        timeouts: Timeouts {
            wait: Some(Duration::from_secs(5)),
            create: Some(Duration::from_secs(2)),
            recycle: Some(Duration::from_secs(1)),
        },
        ..Default::default()
    });

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(AppError::from)
}
