// src/recording/compressor.rs
//! zstd compression of one channel column
//!
//! Each `ChannelCompressor` owns a reusable zstd context, a staging buffer
//! for the little-endian encoded column and a scratch output buffer sized
//! to zstd's worst-case bound for a full buffer. A drain therefore never
//! allocates, no matter how many entries are live.

use crate::recording::format::ChannelValue;
use crate::utils::errors::{Result, TraceError};
use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use tracing::trace;

/// Compression levels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// Fast compression (level 1)
    #[default]
    Fast,

    /// Balanced (level 3)
    Balanced,

    /// Best compression (level 19)
    Best,
}

impl CompressionLevel {
    pub fn as_i32(&self) -> i32 {
        match self {
            CompressionLevel::Fast => 1,
            CompressionLevel::Balanced => 3,
            CompressionLevel::Best => 19,
        }
    }
}

/// Compressor for a single channel of `T` values
pub struct ChannelCompressor<T: ChannelValue> {
    context: zstd::bulk::Compressor<'static>,
    level: CompressionLevel,
    max_elements: usize,
    staging: BytesMut,
    scratch: Box<[u8]>,
    _channel: PhantomData<fn(&T)>,
}

impl<T: ChannelValue> ChannelCompressor<T> {
    /// Create a compressor able to handle up to `capacity` elements per call
    pub fn new(capacity: usize, level: CompressionLevel) -> Result<Self> {
        let raw_len = capacity * T::WIDTH;
        let bound = zstd::zstd_safe::compress_bound(raw_len);

        let context = zstd::bulk::Compressor::new(level.as_i32()).map_err(|e| {
            TraceError::CompressionFailed(format!(
                "Failed to create {} compressor: {}",
                T::CHANNEL,
                e
            ))
        })?;

        Ok(Self {
            context,
            level,
            max_elements: capacity,
            staging: BytesMut::with_capacity(raw_len),
            scratch: vec![0u8; bound].into_boxed_slice(),
            _channel: PhantomData,
        })
    }

    /// Compress `source` and return the produced bytes
    ///
    /// The slice is valid until the next call. Fails only when `source` is
    /// larger than the capacity this compressor was sized for or zstd
    /// reports an error, both of which indicate a bug in the caller.
    pub fn compress(&mut self, source: &[T]) -> Result<&[u8]> {
        if source.len() > self.max_elements {
            return Err(TraceError::CompressionFailed(format!(
                "{} channel holds {} elements, compressor sized for {}",
                T::CHANNEL,
                source.len(),
                self.max_elements
            )));
        }

        self.staging.clear();
        for value in source {
            value.put(&mut self.staging);
        }

        let written = self
            .context
            .compress_to_buffer(&self.staging[..], &mut self.scratch[..])
            .map_err(|e| {
                TraceError::CompressionFailed(format!(
                    "{} channel compression error: {}",
                    T::CHANNEL,
                    e
                ))
            })?;

        trace!(
            "Compressed {} channel: {} bytes -> {} bytes",
            T::CHANNEL,
            self.staging.len(),
            written
        );

        Ok(&self.scratch[..written])
    }

    /// Size of the preallocated output buffer
    pub fn scratch_capacity(&self) -> usize {
        self.scratch.len()
    }

    pub fn level(&self) -> CompressionLevel {
        self.level
    }
}
