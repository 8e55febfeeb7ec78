// src/utils/config.rs
//! Recorder configuration
//!
//! Values are layered in this order, later sources overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. `memtrace.toml` (or any format `config` recognises) in the working directory
//! 3. `MEMTRACE_*` environment variables (e.g. `MEMTRACE_BUFFER_CAPACITY=4096`)

use crate::recording::compressor::CompressionLevel;
use crate::utils::errors::{Result, TraceError};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_BUFFER_CAPACITY: u32 = 1 << 16;
const DEFAULT_OUTPUT_PATH: &str = "memtrace.out";
const DEFAULT_MAX_SIZE_MB: u32 = 1024;

/// Construction-time options for a `Recorder`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Number of events staged in memory before a drain is attempted
    pub buffer_capacity: u32,

    /// Destination trace file (truncated on open)
    pub output_path: PathBuf,

    /// Soft cap on the output size, in megabytes
    pub max_size_mb: u32,

    /// zstd level used for every channel
    #[serde(default)]
    pub compression_level: CompressionLevel,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            max_size_mb: DEFAULT_MAX_SIZE_MB,
            compression_level: CompressionLevel::default(),
        }
    }
}

impl TraceConfig {
    /// Create a config with the given core options and default compression
    pub fn new(buffer_capacity: u32, output_path: impl Into<PathBuf>, max_size_mb: u32) -> Self {
        Self {
            buffer_capacity,
            output_path: output_path.into(),
            max_size_mb,
            compression_level: CompressionLevel::default(),
        }
    }

    pub fn with_compression_level(mut self, level: CompressionLevel) -> Self {
        self.compression_level = level;
        self
    }

    /// Load from defaults, an optional `memtrace.*` file and the environment
    pub fn load() -> Result<Self> {
        let config: Self = Self::builder()?
            .add_source(File::with_name("memtrace").required(false))
            .add_source(Environment::with_prefix("MEMTRACE").try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        debug!("Loaded trace configuration: {:?}", config);
        Ok(config)
    }

    /// Load from defaults overlaid with an explicit file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = Self::builder()?
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("buffer_capacity", DEFAULT_BUFFER_CAPACITY as i64)?
            .set_default("output_path", DEFAULT_OUTPUT_PATH)?
            .set_default("max_size_mb", DEFAULT_MAX_SIZE_MB as i64)?
            .set_default("compression_level", "fast")?)
    }

    /// Size cap in bytes (`max_size_mb << 20`)
    pub fn max_size_bytes(&self) -> u64 {
        (self.max_size_mb as u64) << 20
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 {
            return Err(TraceError::ConfigError(
                "buffer_capacity must be at least 1".to_string(),
            ));
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(TraceError::ConfigError(
                "output_path cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
