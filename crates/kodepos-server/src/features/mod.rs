//! Feature modules implementing the Kodepos API
//!
//! Each feature is organized as a vertical slice following the CQRS (Command
//! Query Responsibility Segregation) pattern:
//!
//! - `commands/` - Write operations
//! - `queries/` - Read operations
//! - `pipeline/` - Processing stages (imports only)
//! - `routes.rs` - HTTP route definitions
//! - `types.rs` - Shared types
//!
//! # Features
//!
//! - **imports**: the bulk import pipeline — dataset submission, validation
//!   dry-runs, job status/history, cancellation, and system statistics
//! - **shared**: pagination and validation helpers used across slices

pub mod imports;
pub mod shared;

use axum::Router;

use crate::config::ImportConfig;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// PostgreSQL connection pool for database operations
    pub db: sqlx::PgPool,
    /// Submission limits for the import pipeline
    pub import_limits: ImportConfig,
}

/// Creates the main API router with all feature routes mounted
pub fn router(state: FeatureState) -> Router<()> {
    Router::new().nest("/imports", imports::imports_routes().with_state(state))
}
