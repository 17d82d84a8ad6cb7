//! Import processing pipeline
//!
//! Stages are split into focused modules: parsing, normalization,
//! validation, duplicate resolution, batch insertion, and statistics, with
//! [`runner`] driving a job through them in order.

pub mod inserter;
pub mod normalizer;
pub mod parser;
pub mod resolver;
pub mod runner;
pub mod stats;
pub mod validator;
