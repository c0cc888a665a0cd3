use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// libpq environment variables and the settings keys they seed.
const LIBPQ_VARS: [(&str, &str); 5] = [
    ("PGHOST", "database.host"),
    ("PGPORT", "database.port"),
    ("PGUSER", "database.user"),
    ("PGPASSWORD", "database.password"),
    ("PGDATABASE", "database.name"),
];

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub run_migrations: bool,
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.name)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Directory uploaded student images are written to and served from.
    pub dir: PathBuf,
    /// URL prefix the directory is mounted under.
    pub url_prefix: String,
    pub max_image_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allow_any_origin: bool,
    pub max_age: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub uploads: UploadConfig,
    pub cors: CorsConfig,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = with_defaults(Config::builder(), "development")?;
        let builder = seed_from_libpq(builder, |var| env::var(var).ok())?;

        builder
            // Add in settings from the config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in settings from environment variables (with prefix "APP_")
            // E.g., `APP_SERVER__PORT=5001` would set `Settings.server.port`
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Defaults for the `test` environment, without config files or libpq variables.
    pub fn new_for_test() -> Result<Self, ConfigError> {
        with_defaults(Config::builder(), "test")?
            .set_override("database.name", "campus_test")?
            .set_override("database.max_connections", 2)?
            .build()?
            .try_deserialize()
    }
}

fn with_defaults(
    builder: ConfigBuilder<DefaultState>,
    environment: &str,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    builder
        .set_default("environment", environment)?
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 3001)?
        .set_default("server.workers", num_cpus::get() as i64)?
        .set_default("database.host", "localhost")?
        .set_default("database.port", 5432)?
        .set_default("database.user", "postgres")?
        .set_default("database.password", "postgres")?
        .set_default("database.name", "campus")?
        .set_default("database.max_connections", 5)?
        .set_default("database.acquire_timeout_secs", 30)?
        .set_default("database.run_migrations", true)?
        .set_default("uploads.dir", "uploads/images")?
        .set_default("uploads.url_prefix", "/uploads/images")?
        .set_default("uploads.max_image_bytes", 5 * 1024 * 1024)?
        .set_default("cors.enabled", true)?
        .set_default("cors.allow_any_origin", true)?
        .set_default("cors.max_age", 3600)
}

/// Lets the `PG*` variables the database tooling already understands stand in
/// for the `database.*` defaults. `APP_DATABASE__*` still wins over them.
fn seed_from_libpq<F>(
    mut builder: ConfigBuilder<DefaultState>,
    lookup: F,
) -> Result<ConfigBuilder<DefaultState>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    for (var, key) in LIBPQ_VARS {
        if let Some(value) = lookup(var) {
            builder = builder.set_default(key, value)?;
        }
    }
    Ok(builder)
}
