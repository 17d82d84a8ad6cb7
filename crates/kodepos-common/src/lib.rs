//! Kodepos Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the Kodepos project.
//!
//! # Overview
//!
//! This crate provides common functionality used across all Kodepos workspace
//! members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Logging**: Centralized tracing initialization
//! - **Region**: Service-region reference data (postal code range,
//!   geographic bounds, timezone enumeration)

pub mod error;
pub mod logging;
pub mod region;

// Re-export commonly used types
pub use error::{KodeposError, Result};
