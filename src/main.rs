use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use campus_registry::config::CorsConfig;
use campus_registry::{handlers, health_check, AppState, Settings};
use dotenv::dotenv;
use std::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn cors(config: &CorsConfig) -> Cors {
    if !config.enabled {
        // CORS disabled - use most restrictive settings
        return Cors::default();
    }

    let cors = if config.allow_any_origin {
        Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .expose_any_header()
    } else {
        Cors::default()
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://127.0.0.1:3000")
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
            .allowed_headers(vec!["Content-Type"])
    };

    cors.max_age(config.max_age as usize)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    // Load configuration
    let config = Settings::new().context("Failed to load configuration")?;
    info!("Configuration loaded successfully ({})", config.environment);

    tokio::fs::create_dir_all(&config.uploads.dir)
        .await
        .with_context(|| format!("Failed to create upload directory {}", config.uploads.dir.display()))?;

    // Initialize application state
    let state = AppState::new(config.clone())
        .await
        .context("Failed to initialize application state")?;
    let state = web::Data::new(state);

    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))
        .with_context(|| format!("Failed to bind {}:{}", config.server.host, config.server.port))?;

    info!("Server is listening on {}:{}", config.server.host, config.server.port);
    info!("API documentation at http://{}:{}/api/docs", config.server.host, config.server.port);

    let server_state = state.clone();
    let server_config = config.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(cors(&server_config.cors))
            .app_data(server_state.clone())
            .route("/health", web::get().to(health_check))
            .configure(handlers::configure)
            .configure(|cfg| handlers::configure_uploads(cfg, &server_config.uploads))
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await
    .context("HTTP server failed")?;

    info!("Server stopped, closing database pool");
    state.shutdown().await?;

    Ok(())
}
