use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::Result;

pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect_with(config.connect_options())
        .await?;

    info!(
        "Connected to database {} at {}:{}",
        config.name, config.host, config.port
    );

    if config.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied");
    }

    Ok(pool)
}

/// Builds a pool that only connects on first use.
pub fn connect_lazy(config: &DatabaseConfig) -> PgPool {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect_lazy_with(config.connect_options())
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    pub total_connections: u32,
    pub active_connections: u32,
    pub idle_connections: u32,
}

impl PoolStatus {
    pub fn of(pool: &PgPool) -> Self {
        let size = pool.size();
        let idle = pool.num_idle() as u32;

        Self {
            total_connections: size,
            active_connections: size.saturating_sub(idle),
            idle_connections: idle,
        }
    }
}
