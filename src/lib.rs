// src/lib.rs
//! Memtrace: compressed memory-access trace recorder
//!
//! Instrumented programs hand every memory access (instruction id,
//! address, read/write code) to a [`Recorder`]. Events are staged in a
//! fixed-capacity buffer and, when it fills, compressed per channel with
//! zstd and appended to a trace file as one batch. Output size is capped;
//! past the cap events are dropped rather than written.
//!
//! # Modules
//!
//! - **recording**: buffer, compression, file format, recorder and reader
//! - **observability**: tracing subscriber setup
//! - **utils**: errors and configuration
//!
//! # Example
//!
//! ```no_run
//! use memtrace::Recorder;
//!
//! let recorder = Recorder::create(1 << 16, "accesses.trace", 512)?;
//! recorder.append(42, 0x7fff_0010, b'R');
//! recorder.append(43, 0x7fff_0018, b'W');
//!
//! // Entries still buffered are lost on drop
//! recorder.flush();
//! # Ok::<(), memtrace::TraceError>(())
//! ```

pub mod observability;
pub mod recording;
pub mod utils;

// Re-export commonly used types
pub use recording::{CompressionLevel, Event, Operation, Recorder, RecorderStats, TraceReader};
pub use utils::config::TraceConfig;
pub use utils::errors::{Result, TraceError};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_HASH: &str = env!("GIT_HASH");

/// Build information
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_timestamp: &'static str,
    pub rustc_version: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: VERSION,
            git_hash: GIT_HASH,
            build_timestamp: env!("BUILD_TIMESTAMP"),
            rustc_version: env!("RUSTC_VERSION"),
        }
    }
}
