// src/observability.rs
//! Logging setup
//!
//! The library itself only emits `tracing` events. Binaries (and
//! instrumentation harnesses that want the recorder's diagnostics) call
//! `init_tracing` once at startup.
//!
//! - `RUST_LOG` selects the filter (default `memtrace=info`)
//! - `MEMTRACE_LOG_FORMAT=json` switches to JSON lines

use crate::utils::errors::{Result, TraceError};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "memtrace=info";

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Read `MEMTRACE_LOG_FORMAT`, defaulting to text
    pub fn from_env() -> Self {
        match std::env::var("MEMTRACE_LOG_FORMAT") {
            Ok(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Install the global tracing subscriber, writing to stderr
pub fn init_tracing() -> Result<()> {
    init_tracing_with(LogFormat::from_env())
}

pub fn init_tracing_with(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    result.map_err(|e| TraceError::ConfigError(format!("Failed to install subscriber: {}", e)))
}
