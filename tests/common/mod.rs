#![allow(dead_code)]

use actix_web::{body::MessageBody, dev::ServiceResponse, test, web};
use campus_registry::db::pool::connect_lazy;
use campus_registry::{AppState, Settings};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Connection, Executor, PgConnection, PgPool};
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

pub fn test_settings() -> Settings {
    let mut settings = Settings::new_for_test().expect("Failed to load test config");
    settings.uploads.dir = std::env::temp_dir().join(format!("campus-uploads-{}", Uuid::new_v4()));
    settings.uploads.max_image_bytes = 64 * 1024;
    settings
}

/// State whose pool never connects; handlers that reach the database fail.
pub fn unreachable_state() -> web::Data<AppState> {
    let mut settings = test_settings();
    settings.database.port = 1;
    settings.database.acquire_timeout_secs = 1;
    let pool = connect_lazy(&settings.database);
    web::Data::new(AppState::with_pool(settings, pool))
}

pub async fn envelope<B: MessageBody>(resp: ServiceResponse<B>) -> serde_json::Value {
    assert_eq!(resp.status(), 200, "envelopes always travel with HTTP 200");
    test::read_body_json(resp).await
}

pub fn multipart_body(boundary: &str, fields: &[(&str, &str)], image: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                boundary, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((filename, content_type, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"img\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                boundary, filename, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}

/// A throwaway database with the schema applied.
pub struct TestDb {
    pub pool: PgPool,
    pub state: web::Data<AppState>,
    name: String,
    admin_url: String,
}

impl TestDb {
    pub fn uploads_dir(&self) -> PathBuf {
        self.state.config.uploads.dir.clone()
    }

    pub async fn cleanup(self) {
        self.pool.close().await;
        let _ = tokio::fs::remove_dir_all(self.state.config.uploads.dir.clone()).await;

        let mut admin_conn = PgConnection::connect(&self.admin_url)
            .await
            .expect("Failed to connect to admin database for cleanup");
        admin_conn
            .execute(&*format!(
                "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = '{}'",
                self.name
            ))
            .await
            .ok();
        admin_conn
            .execute(&*format!("DROP DATABASE IF EXISTS \"{}\"", self.name))
            .await
            .expect("Failed to drop test database during cleanup");
        admin_conn.close().await.ok();
    }
}

/// Creates a fresh database next to `TEST_DATABASE_URL`, or returns `None`
/// when no test server is configured.
pub async fn setup_test_db() -> Option<TestDb> {
    let admin_url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set, skipping database test");
            return None;
        }
    };
    let name = format!("campus_test_{}", Uuid::new_v4().simple());

    let mut admin_conn = PgConnection::connect(&admin_url)
        .await
        .expect("Failed to connect to admin database");
    admin_conn
        .execute(&*format!("CREATE DATABASE \"{}\"", name))
        .await
        .expect("Failed to create test database");
    admin_conn.close().await.ok();

    let options = PgConnectOptions::from_str(&admin_url)
        .expect("Invalid TEST_DATABASE_URL")
        .database(&name);
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let state = web::Data::new(AppState::with_pool(test_settings(), pool.clone()));
    Some(TestDb {
        pool,
        state,
        name,
        admin_url,
    })
}
