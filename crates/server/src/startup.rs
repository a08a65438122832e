use std::{env, net::SocketAddr};

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use common::utils::logging::init_logging_default;
use dotenvy::dotenv;
use migration::MigratorTrait;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::routes::{self, ServerState};

/// Initialize logging via shared common utils
fn init_logging() {
    init_logging_default();
}

/// CORS restricted to the single configured frontend origin for
/// GET/POST/PUT/DELETE with standard headers
fn build_cors(origin: &str) -> CorsLayer {
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        Err(_) => {
            warn!(%origin, "invalid CORS origin, falling back to permissive");
            CorsLayer::very_permissive()
        }
    }
}

/// Load configuration from config.toml, with env vars filling the gaps
fn load_config() -> configs::AppConfig {
    match configs::AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            info!(reason = %e, "config.toml not usable, falling back to environment");
            let mut cfg = configs::AppConfig::default();
            cfg.server.host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
            cfg.server.port = env::var("PORT")
                .or_else(|_| env::var("SERVER_PORT"))
                .ok()
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(3001);
            if let Ok(origin) = env::var("CORS_ORIGIN") {
                if !origin.trim().is_empty() {
                    cfg.server.cors_origin = origin;
                }
            }
            cfg.database.normalize_from_env();
            if cfg.database.url.trim().is_empty() {
                cfg.database.url = models::db::DATABASE_URL.clone();
            }
            cfg
        }
    }
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging();

    let cfg = load_config();

    // DB handle with explicit lifecycle: opened here, handed to the router
    // through state, closed after the server stops
    let db = models::db::connect_with_config(&cfg.database).await?;
    migration::Migrator::up(&db, None).await?;

    let state = ServerState { db: db.clone() };
    let cors = build_cors(&cfg.server.cors_origin);
    let app: Router = routes::build_router(state, cors);

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!(%addr, "starting cadastro server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    db.close().await?;
    Ok(())
}
