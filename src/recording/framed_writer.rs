// src/recording/framed_writer.rs
//! Length-prefixed frame writer with a soft size cap
//!
//! The writer counts every byte it hands to the underlying stream. The cap
//! is checked once per batch, against the size *before* the batch is
//! written, so the last accepted batch may push the file past the cap.
//!
//! Any I/O error poisons the writer: the stream is dropped and every later
//! operation fails with `StreamUnusable`.

use crate::recording::format::{TraceHeader, FRAME_PREFIX_LEN};
use crate::utils::errors::{Result, TraceError};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, error};

/// Frame writer over any byte sink
pub struct FramedWriter<W: Write> {
    stream: Option<W>,
    position: u64,
    cap: u64,
    header_written: bool,
}

impl FramedWriter<BufWriter<File>> {
    /// Open (and truncate) `path` for writing
    pub fn create<P: AsRef<Path>>(path: P, cap: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())
            .map_err(|e| {
                TraceError::StreamUnusable(format!(
                    "Failed to open {}: {}",
                    path.as_ref().display(),
                    e
                ))
            })?;

        debug!("Opened trace file {:?} (cap {} bytes)", path.as_ref(), cap);

        Ok(Self::new(BufWriter::new(file), cap))
    }
}

impl<W: Write> FramedWriter<W> {
    pub fn new(stream: W, cap: u64) -> Self {
        Self {
            stream: Some(stream),
            position: 0,
            cap,
            header_written: false,
        }
    }

    /// Write the trace header. Must be the first write.
    pub fn write_header(&mut self, header: &TraceHeader) -> Result<()> {
        if self.header_written || self.position != 0 {
            return Err(TraceError::StreamUnusable(
                "Trace header must be the first write".to_string(),
            ));
        }

        self.write_all(&header.encode())?;
        self.header_written = true;
        Ok(())
    }

    /// Check that a new batch may be started
    ///
    /// Fails if the stream is unusable or the bytes written so far already
    /// exceed the cap.
    pub fn ensure_writable(&self) -> Result<()> {
        if self.stream.is_none() {
            return Err(TraceError::StreamUnusable(
                "Trace stream is closed".to_string(),
            ));
        }

        if self.position > self.cap {
            return Err(TraceError::CapacityExceeded {
                size: self.position,
                cap: self.cap,
            });
        }

        Ok(())
    }

    /// Append one `{u64 length, bytes}` frame, returning the bytes written
    pub fn write_frame(&mut self, payload: &[u8]) -> Result<u64> {
        let prefix = (payload.len() as u64).to_le_bytes();
        self.write_all(&prefix)?;
        self.write_all(payload)?;
        Ok((FRAME_PREFIX_LEN + payload.len()) as u64)
    }

    /// Push buffered bytes to the underlying medium
    pub fn flush(&mut self) -> Result<()> {
        let stream = self.stream_mut()?;
        if let Err(e) = stream.flush() {
            return Err(self.poison("flush", e));
        }
        Ok(())
    }

    /// Bytes written so far, header included
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn cap(&self) -> u64 {
        self.cap
    }

    /// Move the cap; a batch refused under the old cap may start again
    pub fn set_cap(&mut self, cap: u64) {
        debug!("Trace size cap changed from {} to {} bytes", self.cap, cap);
        self.cap = cap;
    }

    pub fn is_usable(&self) -> bool {
        self.stream.is_some()
    }

    /// Flush and hand back the underlying stream
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        self.stream.take().ok_or_else(|| {
            TraceError::StreamUnusable("Trace stream is closed".to_string())
        })
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let stream = self.stream_mut()?;
        if let Err(e) = stream.write_all(bytes) {
            return Err(self.poison("write", e));
        }
        self.position += bytes.len() as u64;
        Ok(())
    }

    fn stream_mut(&mut self) -> Result<&mut W> {
        self.stream.as_mut().ok_or_else(|| {
            TraceError::StreamUnusable("Trace stream is closed".to_string())
        })
    }

    fn poison(&mut self, op: &str, e: std::io::Error) -> TraceError {
        error!("Trace stream {} failed, closing stream: {}", op, e);
        self.stream = None;
        TraceError::StreamUnusable(format!("Failed to {} trace stream: {}", op, e))
    }
}
