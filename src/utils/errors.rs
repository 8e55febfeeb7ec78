// src/utils/errors.rs
//! Error types for trace recording and decoding

use thiserror::Error;

/// Errors produced by the recorder, its writer and the trace reader
#[derive(Error, Debug)]
pub enum TraceError {
    /// The output has grown past its configured size cap
    #[error("Trace size cap exceeded: {size} bytes written, cap is {cap} bytes")]
    CapacityExceeded { size: u64, cap: u64 },

    /// The output destination could not be opened or became unwritable
    #[error("Trace stream unusable: {0}")]
    StreamUnusable(String),

    /// The compressor reported an error (internal invariant violation)
    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    /// The recorder stopped after an unrecoverable drain failure
    #[error("Recorder halted after a previous compression failure")]
    Halted,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The trace file could not be decoded
    #[error("Corrupt trace: {0}")]
    CorruptTrace(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for TraceError {
    fn from(e: config::ConfigError) -> Self {
        TraceError::ConfigError(e.to_string())
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, TraceError>;
