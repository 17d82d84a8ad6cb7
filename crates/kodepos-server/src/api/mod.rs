pub mod response;

use crate::config::Config;
use crate::db;
use crate::features;
use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use tower_http::compression::CompressionLayer;

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let db_config = db::DbConfig::from_url(&config.database);
    let db = db::create_pool(&db_config).await?;

    sqlx::migrate!("../../migrations")
        .run(&db)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

    let app = create_router(db, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes and middleware
pub fn create_router(db: sqlx::PgPool, config: &Config) -> Router {
    let feature_state = features::FeatureState {
        db: db.clone(),
        import_limits: config.import.clone(),
    };

    let api_v1 = features::router(feature_state);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(db)
        .nest("/api/v1", api_v1)
        .layer(CompressionLayer::new())
        .layer(crate::middleware::tracing_layer())
        .layer(crate::middleware::cors_layer(&config.cors))
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Kodepos Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

/// Health check handler
async fn health(
    axum::extract::State(db): axum::extract::State<sqlx::PgPool>,
) -> Result<impl IntoResponse, StatusCode> {
    match db::health_check(&db).await {
        Ok(()) => Ok((
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected"
            })),
        )),
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        },
    }
}
