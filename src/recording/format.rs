// src/recording/format.rs
//! On-disk trace layout
//!
//! All integers are little-endian.
//!
//! ```text
//! Header:   u32 buffer_capacity
//!           u32 address_width_bytes
//! Batch (repeated until EOF):
//!   Frame[instruction]: u64 compressed_length, compressed bytes (u32 ids)
//!   Frame[address]:     u64 compressed_length, compressed bytes (address_width each)
//!   Frame[operation]:   u64 compressed_length, compressed bytes (u8 codes)
//! ```
//!
//! The format carries no per-batch entry count. Every batch except the last
//! holds exactly `buffer_capacity` entries; the reader recovers the length of
//! a partial last batch from the decompressed channel sizes.

use crate::utils::errors::{Result, TraceError};
use bytes::{Buf, BufMut};
use std::fmt;
use std::mem::size_of;

/// Encoded header size in bytes
pub const HEADER_LEN: usize = 8;

/// Size of the length prefix in front of every frame
pub const FRAME_PREFIX_LEN: usize = size_of::<u64>();

/// Pointer width of the recording process
pub const ADDRESS_WIDTH: u32 = size_of::<usize>() as u32;

/// One of the three event attributes, compressed independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Instruction,
    Address,
    Operation,
}

impl Channel {
    /// Frame order within a batch
    pub const ORDER: [Channel; 3] = [Channel::Instruction, Channel::Address, Channel::Operation];

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Instruction => "instruction",
            Channel::Address => "address",
            Channel::Operation => "operation",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed header written once at the start of every trace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceHeader {
    pub buffer_capacity: u32,
    pub address_width: u32,
}

impl TraceHeader {
    /// Header for a trace recorded by this process
    pub fn for_capacity(buffer_capacity: u32) -> Self {
        Self {
            buffer_capacity,
            address_width: ADDRESS_WIDTH,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        let mut cursor = &mut out[..];
        cursor.put_u32_le(self.buffer_capacity);
        cursor.put_u32_le(self.address_width);
        out
    }

    /// Decode and validate a header, advancing `buf` past it
    pub fn decode(buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < HEADER_LEN {
            return Err(TraceError::CorruptTrace(format!(
                "header needs {} bytes, found {}",
                HEADER_LEN,
                buf.remaining()
            )));
        }

        let header = Self {
            buffer_capacity: buf.get_u32_le(),
            address_width: buf.get_u32_le(),
        };

        if header.buffer_capacity == 0 {
            return Err(TraceError::CorruptTrace(
                "header declares a zero buffer capacity".to_string(),
            ));
        }

        if !(1..=8).contains(&header.address_width) {
            return Err(TraceError::CorruptTrace(format!(
                "unsupported address width {}",
                header.address_width
            )));
        }

        Ok(header)
    }

    /// Bytes per element of `channel` in this trace
    pub fn element_width(&self, channel: Channel) -> usize {
        match channel {
            Channel::Instruction => size_of::<u32>(),
            Channel::Address => self.address_width as usize,
            Channel::Operation => size_of::<u8>(),
        }
    }

    /// Upper bound on the decompressed size of one channel frame
    pub fn max_channel_bytes(&self, channel: Channel) -> u64 {
        u64::from(self.buffer_capacity) * self.element_width(channel) as u64
    }
}

/// Element type of one channel column
pub trait ChannelValue: Copy + Send + 'static {
    const CHANNEL: Channel;
    const WIDTH: usize;

    /// Append the little-endian encoding of `self`
    fn put(&self, out: &mut impl BufMut);
}

impl ChannelValue for u32 {
    const CHANNEL: Channel = Channel::Instruction;
    const WIDTH: usize = size_of::<u32>();

    fn put(&self, out: &mut impl BufMut) {
        out.put_u32_le(*self);
    }
}

impl ChannelValue for usize {
    const CHANNEL: Channel = Channel::Address;
    const WIDTH: usize = size_of::<usize>();

    fn put(&self, out: &mut impl BufMut) {
        out.put_slice(&self.to_le_bytes());
    }
}

impl ChannelValue for u8 {
    const CHANNEL: Channel = Channel::Operation;
    const WIDTH: usize = 1;

    fn put(&self, out: &mut impl BufMut) {
        out.put_u8(*self);
    }
}
