// src/utils/mod.rs
//! Common utilities: error types and configuration

pub mod config;
pub mod errors;

pub use config::TraceConfig;
pub use errors::{Result, TraceError};
