use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{http::header, App, HttpServer};
use anyhow::Context;
use careid_server::config::CorsConfig;
use careid_server::db::PgDatabase;
use careid_server::{configure, AppState, Settings};
use dotenv::dotenv;
use std::net::TcpListener;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn cors(config: &CorsConfig) -> Cors {
    if !config.enabled {
        // CORS disabled - use most restrictive settings
        return Cors::default();
    }

    Cors::default()
        .allowed_origin(&config.allowed_origin)
        .allowed_methods(vec!["GET", "POST", "PUT"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
        .supports_credentials()
        .max_age(config.max_age as usize)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let config = Settings::new().context("failed to load configuration")?;
    info!("Configuration loaded for environment {}", config.environment);

    let db = PgDatabase::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    if config.database.run_migrations {
        db.migrate().await.context("failed to run migrations")?;
        info!("Database migrations applied");
    }
    let db = Arc::new(db);

    let state = AppState::new(config.clone(), db.clone()).context("failed to build application state")?;

    let listener = TcpListener::bind(config.bind_address())
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!("Starting server at {}", config.bind_address());

    let cors_config = config.cors.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(cors(&cors_config))
            .wrap(Logger::new("%r %s %Dms"))
            .configure(configure(state.clone()))
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await?;

    db.close().await;
    info!("Server stopped");
    Ok(())
}
