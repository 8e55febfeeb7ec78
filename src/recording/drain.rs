// src/recording/drain.rs
//! Turning a full event buffer into a batch on disk
//!
//! `Drain` is the seam between the recorder's locking and the work done on
//! a drain. The recorder calls it with the lock held; an implementation
//! that hands the buffer contents to a background writer could be plugged
//! in without touching the append path.

use crate::recording::compressor::{ChannelCompressor, CompressionLevel};
use crate::recording::event_buffer::EventBuffer;
use crate::recording::format::{Channel, TraceHeader};
use crate::recording::framed_writer::FramedWriter;
use crate::utils::errors::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Persists the valid entries of an `EventBuffer` as one batch
pub trait Drain: Send {
    /// Write `buffer.len()` entries as one batch and return the bytes written
    ///
    /// Called only with a non-empty buffer. Must not write anything unless
    /// the whole batch can be produced; the caller resets the buffer only
    /// on success.
    fn drain(&mut self, buffer: &EventBuffer) -> Result<u64>;

    /// Byte size past which no new batch is started
    fn size_cap(&self) -> u64 {
        u64::MAX
    }

    /// Change the size cap; drains without a cap ignore it
    fn set_size_cap(&mut self, _cap: u64) {}
}

/// Compress each channel with zstd and append the frames to a trace stream
pub struct CompressingDrain<W: Write + Send> {
    writer: FramedWriter<W>,
    instructions: ChannelCompressor<u32>,
    addresses: ChannelCompressor<usize>,
    operations: ChannelCompressor<u8>,
}

impl CompressingDrain<BufWriter<File>> {
    /// Create the trace file at `path` and write its header
    pub fn create<P: AsRef<Path>>(
        path: P,
        capacity: u32,
        cap: u64,
        level: CompressionLevel,
    ) -> Result<Self> {
        let writer = FramedWriter::create(path, cap)?;
        Self::new(writer, capacity, level)
    }
}

impl<W: Write + Send> CompressingDrain<W> {
    /// Write the header for `capacity` to `writer` and size the compressors
    pub fn new(mut writer: FramedWriter<W>, capacity: u32, level: CompressionLevel) -> Result<Self> {
        let instructions = ChannelCompressor::new(capacity as usize, level)?;
        let addresses = ChannelCompressor::new(capacity as usize, level)?;
        let operations = ChannelCompressor::new(capacity as usize, level)?;

        writer.write_header(&TraceHeader::for_capacity(capacity))?;
        writer.flush()?;

        Ok(Self {
            writer,
            instructions,
            addresses,
            operations,
        })
    }

    pub fn writer(&self) -> &FramedWriter<W> {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut FramedWriter<W> {
        &mut self.writer
    }

    pub fn into_writer(self) -> FramedWriter<W> {
        self.writer
    }
}

impl<W: Write + Send> Drain for CompressingDrain<W> {
    fn drain(&mut self, buffer: &EventBuffer) -> Result<u64> {
        self.writer.ensure_writable()?;

        // Compress everything before the first frame goes out so a failure
        // never leaves a partial batch behind.
        let frames = [
            self.instructions.compress(buffer.instruction_ids())?,
            self.addresses.compress(buffer.addresses())?,
            self.operations.compress(buffer.operations())?,
        ];

        let mut written = 0;
        for (channel, frame) in Channel::ORDER.iter().zip(frames) {
            written += self.writer.write_frame(frame)?;
            debug!("Wrote {} frame ({} bytes)", channel, frame.len());
        }

        self.writer.flush()?;
        Ok(written)
    }

    fn size_cap(&self) -> u64 {
        self.writer.cap()
    }

    fn set_size_cap(&mut self, cap: u64) {
        self.writer.set_cap(cap);
    }
}
