//! Kodepos Server Library
//!
//! HTTP server for the Indonesian postal code dataset, centered on the bulk
//! import pipeline.
//!
//! # Overview
//!
//! - **Import pipeline**: submit a JSON/CSV postal-code dataset, have it
//!   normalized, validated, de-duplicated, and inserted in batches while the
//!   job row tracks live progress
//! - **Job tracking**: status snapshots, paginated history, system-wide
//!   statistics
//! - **Database**: PostgreSQL via SQLx; every state transition is a single
//!   atomic update to the persisted job row
//!
//! # Architecture
//!
//! The server follows a CQRS-flavored vertical-slice layout: each feature
//! owns its `commands/` (writes), `queries/` (reads), and `routes.rs`. The
//! import pipeline itself lives in `features::imports::pipeline` and is
//! driven synchronously by the submitting request; there is no background
//! worker. Cancellation is cooperative and takes effect at the next batch
//! boundary.
//!
//! # Example
//!
//! ```no_run
//! use kodepos_server::{api, config::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     api::serve(config).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod cqrs;
pub mod db;
pub mod error;
pub mod features;
pub mod middleware;

// Re-export commonly used types
pub use error::{AppError, AppResult};
