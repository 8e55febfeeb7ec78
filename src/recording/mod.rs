// src/recording/mod.rs
//! Memory-access trace recording
//!
//! - **Event Buffer**: fixed-capacity column store for pending events
//! - **Compressor**: per-channel zstd compression into preallocated scratch
//! - **Framed Writer**: length-prefixed frames with a soft size cap
//! - **Drain**: compress-and-write step behind a narrow trait
//! - **Recorder**: locking front end used by instrumentation callbacks
//! - **Reader**: decoding of finished traces
//!
//! # Architecture
//!
//! ```text
//! instrumentation → Recorder::append ──(lock)──→ EventBuffer
//!                                                    │ full
//!                                                    ↓
//!                          ChannelCompressor × 3 (ids, addresses, ops)
//!                                                    ↓
//!                          FramedWriter (3 frames = 1 batch) → trace file
//! ```
//!
//! Appends, drains and flushes all run under one per-recorder mutex. A
//! drain refused by the size cap is never retried successfully: the
//! recorder stays in a drop state for the rest of its life.

pub mod compressor;
pub mod drain;
pub mod event;
pub mod event_buffer;
pub mod format;
pub mod framed_writer;
pub mod reader;
pub mod recorder;

// Re-export commonly used types
pub use compressor::{ChannelCompressor, CompressionLevel};
pub use drain::{CompressingDrain, Drain};
pub use event::{Event, Operation};
pub use event_buffer::EventBuffer;
pub use format::{Channel, TraceHeader};
pub use framed_writer::FramedWriter;
pub use reader::{DecodedBatch, TraceReader, TraceRecord, TraceSummary};
pub use recorder::{Recorder, RecorderStats};
