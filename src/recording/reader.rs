// src/recording/reader.rs
//! Trace file decoding
//!
//! Files are memory-mapped and decoded batch by batch. Each channel frame
//! is decompressed into a buffer sized by the frame's declared content
//! size, which must not exceed `buffer_capacity` elements; the
//! decompressed length gives the real entry count, so a partial last batch
//! (written by an explicit flush) decodes to exactly the flushed entries.

use crate::recording::event::Operation;
use crate::recording::format::{Channel, TraceHeader, FRAME_PREFIX_LEN, HEADER_LEN};
use crate::utils::errors::{Result, TraceError};
use bytes::Buf;
use memmap2::Mmap;
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// One decoded access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TraceRecord {
    pub instruction_id: u32,
    pub address: u64,
    pub operation: u8,
}

impl TraceRecord {
    pub fn kind(&self) -> Option<Operation> {
        Operation::from_code(self.operation)
    }
}

/// The three channels of one batch, decompressed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedBatch {
    pub instruction_ids: Vec<u32>,
    pub addresses: Vec<u64>,
    pub operations: Vec<u8>,
}

impl DecodedBatch {
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<TraceRecord> {
        Some(TraceRecord {
            instruction_id: *self.instruction_ids.get(index)?,
            address: *self.addresses.get(index)?,
            operation: *self.operations.get(index)?,
        })
    }

    /// Keep only the first `len` entries
    pub fn truncate(&mut self, len: usize) {
        self.instruction_ids.truncate(len);
        self.addresses.truncate(len);
        self.operations.truncate(len);
    }

    pub fn iter(&self) -> impl Iterator<Item = TraceRecord> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    pub fn into_records(self) -> impl Iterator<Item = TraceRecord> {
        self.instruction_ids
            .into_iter()
            .zip(self.addresses)
            .zip(self.operations)
            .map(|((instruction_id, address), operation)| TraceRecord {
                instruction_id,
                address,
                operation,
            })
    }
}

/// Aggregate view of a trace, as printed by the `memtrace` binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraceSummary {
    pub buffer_capacity: u32,
    pub address_width: u32,
    pub file_bytes: u64,
    pub batches: u64,
    pub records: u64,
    pub reads: u64,
    pub writes: u64,
    pub other_ops: u64,
    pub min_address: Option<u64>,
    pub max_address: Option<u64>,
}

/// Reader over an encoded trace
pub struct TraceReader<B = Mmap> {
    header: TraceHeader,
    data: B,
}

impl TraceReader<Mmap> {
    /// Memory-map and validate the trace at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let len = file.metadata()?.len();
        if len < HEADER_LEN as u64 {
            return Err(TraceError::CorruptTrace(format!(
                "{} is {} bytes, shorter than the trace header",
                path.as_ref().display(),
                len
            )));
        }

        // The recorder only ever appends, so the mapped prefix stays valid.
        let mmap = unsafe { Mmap::map(&file)? };

        debug!("Mapped trace {:?} ({} bytes)", path.as_ref(), len);
        Self::from_bytes(mmap)
    }
}

impl<B: AsRef<[u8]>> TraceReader<B> {
    /// Decode a trace held in memory
    pub fn from_bytes(data: B) -> Result<Self> {
        let mut cursor = data.as_ref();
        let header = TraceHeader::decode(&mut cursor)?;
        Ok(Self { header, data })
    }

    pub fn header(&self) -> &TraceHeader {
        &self.header
    }

    /// Iterate over batches in file order
    ///
    /// A batch cut short by end-of-file or failing to decompress yields one
    /// `CorruptTrace` error and ends the iteration.
    pub fn batches(&self) -> Batches<'_> {
        Batches {
            header: self.header,
            rest: &self.data.as_ref()[HEADER_LEN..],
            done: false,
        }
    }

    /// Iterate over every record of every batch
    pub fn records(&self) -> impl Iterator<Item = Result<TraceRecord>> + '_ {
        self.batches().flat_map(|batch| match batch {
            Ok(batch) => batch.into_records().map(Ok).collect::<Vec<_>>(),
            Err(e) => vec![Err(e)],
        })
    }

    pub fn summarize(&self) -> Result<TraceSummary> {
        let mut summary = TraceSummary {
            buffer_capacity: self.header.buffer_capacity,
            address_width: self.header.address_width,
            file_bytes: self.data.as_ref().len() as u64,
            ..Default::default()
        };

        for batch in self.batches() {
            let batch = batch?;
            summary.batches += 1;

            for record in batch.iter() {
                summary.records += 1;
                match record.kind() {
                    Some(Operation::Read) => summary.reads += 1,
                    Some(Operation::Write) => summary.writes += 1,
                    None => summary.other_ops += 1,
                }
                let address = record.address;
                summary.min_address = Some(summary.min_address.map_or(address, |m| m.min(address)));
                summary.max_address = Some(summary.max_address.map_or(address, |m| m.max(address)));
            }
        }

        Ok(summary)
    }
}

/// Iterator over the batches of a trace
pub struct Batches<'a> {
    header: TraceHeader,
    rest: &'a [u8],
    done: bool,
}

impl<'a> Batches<'a> {
    fn next_frame(&mut self, channel: Channel) -> Result<&'a [u8]> {
        if self.rest.remaining() < FRAME_PREFIX_LEN {
            return Err(TraceError::CorruptTrace(format!(
                "end of stream inside {} frame length",
                channel
            )));
        }

        let len = self.rest.get_u64_le();
        if (self.rest.len() as u64) < len {
            return Err(TraceError::CorruptTrace(format!(
                "{} frame declares {} bytes, {} remain",
                channel,
                len,
                self.rest.len()
            )));
        }

        let rest = self.rest;
        let (frame, rest) = rest.split_at(len as usize);
        self.rest = rest;
        Ok(frame)
    }

    fn decompress(&self, channel: Channel, frame: &[u8]) -> Result<Vec<u8>> {
        // Size the destination from the frame, not the header, so a corrupt
        // capacity cannot force a huge allocation.
        let limit = self.header.max_channel_bytes(channel);
        let declared = zstd::zstd_safe::get_frame_content_size(frame)
            .ok()
            .flatten()
            .ok_or_else(|| {
                TraceError::CorruptTrace(format!(
                    "{} frame does not declare its decompressed size",
                    channel
                ))
            })?;
        if declared > limit {
            return Err(TraceError::CorruptTrace(format!(
                "{} frame declares {} bytes, batch holds at most {}",
                channel, declared, limit
            )));
        }

        let raw = zstd::bulk::decompress(frame, declared as usize)
            .map_err(|e| {
                TraceError::CorruptTrace(format!("{} frame failed to decompress: {}", channel, e))
            })?;

        let width = self.header.element_width(channel);
        if raw.len() % width != 0 {
            return Err(TraceError::CorruptTrace(format!(
                "{} frame holds {} bytes, not a multiple of {}",
                channel,
                raw.len(),
                width
            )));
        }

        Ok(raw)
    }

    fn decode_batch(&mut self) -> Result<DecodedBatch> {
        let instruction_frame = self.next_frame(Channel::Instruction)?;
        let address_frame = self.next_frame(Channel::Address)?;
        let operation_frame = self.next_frame(Channel::Operation)?;

        let instruction_raw = self.decompress(Channel::Instruction, instruction_frame)?;
        let mut raw = &instruction_raw[..];
        let mut instruction_ids = Vec::with_capacity(raw.len() / 4);
        while raw.has_remaining() {
            instruction_ids.push(raw.get_u32_le());
        }

        let width = self.header.address_width as usize;
        let address_raw = self.decompress(Channel::Address, address_frame)?;
        let mut raw = &address_raw[..];
        let mut addresses = Vec::with_capacity(raw.len() / width);
        while raw.has_remaining() {
            addresses.push(raw.get_uint_le(width));
        }

        let operations = self.decompress(Channel::Operation, operation_frame)?;

        if instruction_ids.len() != addresses.len() || addresses.len() != operations.len() {
            return Err(TraceError::CorruptTrace(format!(
                "channel lengths disagree: {} instructions, {} addresses, {} operations",
                instruction_ids.len(),
                addresses.len(),
                operations.len()
            )));
        }

        Ok(DecodedBatch {
            instruction_ids,
            addresses,
            operations,
        })
    }
}

impl<'a> Iterator for Batches<'a> {
    type Item = Result<DecodedBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.rest.is_empty() {
            return None;
        }

        let batch = self.decode_batch();
        if batch.is_err() {
            self.done = true;
        }
        Some(batch)
    }
}
