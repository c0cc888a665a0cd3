pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod storage;

use actix_web::{web, HttpResponse};
use sqlx::PgPool;
use std::sync::Arc;

pub use config::Settings;
pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;

use db::PoolStatus;
use storage::ImageStore;

/// Health check endpoint handler
/// Returns a JSON response with server status, timestamp and pool usage
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "pool": PoolStatus::of(&state.db_pool),
    }))
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub db_pool: Arc<PgPool>,
    pub images: Arc<ImageStore>,
}

impl AppState {
    pub async fn new(config: Settings) -> Result<Self> {
        let db_pool = db::connect(&config.database).await?;
        Ok(Self::with_pool(config, db_pool))
    }

    pub fn with_pool(config: Settings, db_pool: PgPool) -> Self {
        let images = ImageStore::new(&config.uploads);

        Self {
            config: Arc::new(config),
            db_pool: Arc::new(db_pool),
            images: Arc::new(images),
        }
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.db_pool.close().await;
        Ok(())
    }
}
