// src/recording/recorder.rs
//! Thread-safe memory-access recorder
//!
//! A single `parking_lot::Mutex` guards the event buffer and the drain. It
//! is held for the whole of an append, including the drain a full buffer
//! triggers, so the worst case of one call is one compress-and-write cycle.
//! Entries land in the trace in lock-acquisition order.
//!
//! Once a drain fails the buffer stays full and every later append that
//! finds it full fails too. A broken stream is never reopened and a
//! compression failure halts the recorder for good; a cap failure lasts
//! until `set_max_size_mb` raises the cap.
//!
//! Dropping a recorder does not flush. Call `flush()` first if the last
//! partial batch matters.

use crate::recording::compressor::CompressionLevel;
use crate::recording::drain::{CompressingDrain, Drain};
use crate::recording::event::Event;
use crate::recording::event_buffer::EventBuffer;
use crate::utils::config::TraceConfig;
use crate::utils::errors::{Result, TraceError};
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, info, warn};

/// Recorder writing zstd-compressed batches to a trace file
pub struct Recorder<D: Drain = CompressingDrain<BufWriter<File>>> {
    inner: Mutex<RecorderInner<D>>,
    capacity: usize,
    counters: Counters,
}

struct RecorderInner<D> {
    buffer: EventBuffer,
    drain: D,
    dropping: bool,
    halted: bool,
}

#[derive(Default)]
struct Counters {
    events_recorded: AtomicU64,
    events_dropped: AtomicU64,
    batches_written: AtomicU64,
    bytes_written: AtomicU64,
    drain_failures: AtomicU64,
}

impl Recorder {
    /// Create a recorder staging `capacity` events, writing to `path` and
    /// refusing drains once the file exceeds `max_size_mb` megabytes
    pub fn create<P: AsRef<Path>>(capacity: u32, path: P, max_size_mb: u32) -> Result<Self> {
        Self::with_config(&TraceConfig::new(
            capacity,
            path.as_ref().to_path_buf(),
            max_size_mb,
        ))
    }

    /// Create a recorder from a full configuration
    pub fn with_config(config: &TraceConfig) -> Result<Self> {
        config.validate()?;

        let drain = CompressingDrain::create(
            &config.output_path,
            config.buffer_capacity,
            config.max_size_bytes(),
            config.compression_level,
        )?;

        info!(
            "Recording memory trace to {:?} (buffer {} events, cap {} MB, level {:?})",
            config.output_path, config.buffer_capacity, config.max_size_mb, config.compression_level
        );

        Self::with_drain(config.buffer_capacity as usize, drain)
    }

    /// Shorthand for a recorder with a non-default compression level
    pub fn with_level<P: AsRef<Path>>(
        capacity: u32,
        path: P,
        max_size_mb: u32,
        level: CompressionLevel,
    ) -> Result<Self> {
        Self::with_config(
            &TraceConfig::new(capacity, path.as_ref().to_path_buf(), max_size_mb)
                .with_compression_level(level),
        )
    }
}

impl<D: Drain> Recorder<D> {
    /// Create a recorder around any `Drain` implementation
    pub fn with_drain(capacity: usize, drain: D) -> Result<Self> {
        if capacity == 0 {
            return Err(TraceError::ConfigError(
                "buffer capacity must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            inner: Mutex::new(RecorderInner {
                buffer: EventBuffer::new(capacity),
                drain,
                dropping: false,
                halted: false,
            }),
            capacity,
            counters: Counters::default(),
        })
    }

    /// Record one access; returns `false` if the event was dropped
    #[inline]
    pub fn append(&self, instruction_id: u32, address: usize, operation: impl Into<u8>) -> bool {
        self.record(Event::new(instruction_id, address, operation))
    }

    #[inline]
    pub fn record(&self, event: Event) -> bool {
        self.try_record(event).is_ok()
    }

    /// Record one access, reporting why it was dropped
    ///
    /// When the buffer is full a drain runs first. If that drain fails the
    /// event is discarded and the buffer is left untouched.
    pub fn try_record(&self, event: Event) -> Result<()> {
        let mut inner = self.inner.lock();

        if inner.buffer.is_full() {
            if let Err(e) = inner.drain_pending(&self.counters) {
                drop(inner);
                self.counters.events_dropped.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("memtrace_events_dropped_total").increment(1);
                return Err(e);
            }
        }

        let stored = inner.buffer.push(event);
        debug_assert!(stored, "buffer must have room after a successful drain");
        drop(inner);

        self.counters.events_recorded.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Drain whatever is buffered, ignoring failure
    ///
    /// A failed flush leaves the entries in the buffer; nothing retries it.
    pub fn flush(&self) {
        if let Err(e) = self.try_flush() {
            debug!("Flush failed, {} events remain buffered: {}", self.count(), e);
        }
    }

    pub fn try_flush(&self) -> Result<()> {
        self.inner.lock().drain_pending(&self.counters)
    }

    /// Number of buffered, not yet drained events
    pub fn count(&self) -> usize {
        self.inner.lock().buffer.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether a drain has failed and the buffer is full, so appends are
    /// currently refused
    pub fn is_dropping(&self) -> bool {
        let inner = self.inner.lock();
        (inner.dropping || inner.halted) && inner.buffer.is_full()
    }

    /// Size cap of the trace stream in bytes
    pub fn max_size_bytes(&self) -> u64 {
        self.inner.lock().drain.size_cap()
    }

    /// Change the size cap to `max_size_mb` megabytes
    ///
    /// This is the only way out of the drop state left by a cap failure:
    /// after raising the cap, the next append to the full buffer drains it
    /// again. It does not revive a broken stream or a halted recorder.
    pub fn set_max_size_mb(&self, max_size_mb: u32) {
        let cap = u64::from(max_size_mb) << 20;
        let mut inner = self.inner.lock();
        inner.drain.set_size_cap(cap);

        if inner.dropping {
            info!("Size cap set to {} MB, resuming drains", max_size_mb);
            inner.dropping = false;
        }
    }

    pub fn stats(&self) -> RecorderStats {
        RecorderStats {
            events_recorded: self.counters.events_recorded.load(Ordering::Relaxed),
            events_dropped: self.counters.events_dropped.load(Ordering::Relaxed),
            batches_written: self.counters.batches_written.load(Ordering::Relaxed),
            bytes_written: self.counters.bytes_written.load(Ordering::Relaxed),
            drain_failures: self.counters.drain_failures.load(Ordering::Relaxed),
        }
    }
}

impl<D: Drain> RecorderInner<D> {
    /// Drain the buffer; the caller holds the lock
    fn drain_pending(&mut self, counters: &Counters) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        if self.halted {
            counters.drain_failures.fetch_add(1, Ordering::Relaxed);
            return Err(TraceError::Halted);
        }

        let events = self.buffer.len();
        match self.drain.drain(&self.buffer) {
            Ok(bytes) => {
                self.buffer.reset();

                counters.batches_written.fetch_add(1, Ordering::Relaxed);
                counters.bytes_written.fetch_add(bytes, Ordering::Relaxed);
                metrics::counter!("memtrace_batches_written_total").increment(1);
                metrics::counter!("memtrace_bytes_written_total").increment(bytes);

                debug!("Drained {} events ({} bytes)", events, bytes);
                Ok(())
            }
            Err(e) => {
                counters.drain_failures.fetch_add(1, Ordering::Relaxed);

                if let TraceError::CompressionFailed(_) = e {
                    error!("Compression failed, recorder halted: {}", e);
                    self.halted = true;
                } else if !self.dropping {
                    warn!(
                        "Drain refused, dropping further events once the buffer is full: {}",
                        e
                    );
                    self.dropping = true;
                }

                Err(e)
            }
        }
    }
}

impl<D: Drain> Drop for Recorder<D> {
    fn drop(&mut self) {
        let pending = self.inner.get_mut().buffer.len();
        if pending > 0 {
            warn!("Recorder dropped with {} unflushed events; they are lost", pending);
        }
    }
}

/// Recorder statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecorderStats {
    /// Events accepted into the buffer
    pub events_recorded: u64,

    /// Events rejected because a drain failed
    pub events_dropped: u64,

    pub batches_written: u64,

    /// Frame bytes written, length prefixes included (header excluded)
    pub bytes_written: u64,

    pub drain_failures: u64,
}

impl RecorderStats {
    /// Percentage of append attempts that were dropped
    pub fn drop_rate(&self) -> f64 {
        let attempts = self.events_recorded + self.events_dropped;
        if attempts == 0 {
            0.0
        } else {
            (self.events_dropped as f64 / attempts as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::event::Operation;
    use crate::recording::framed_writer::FramedWriter;
    use crate::recording::reader::TraceReader;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;
    use tempfile::{tempdir, NamedTempFile};

    /// Drain that records batch sizes and can be told to fail
    #[derive(Clone, Default)]
    struct CountingDrain {
        batches: Arc<parking_lot::Mutex<Vec<Vec<Event>>>>,
        calls: Arc<AtomicUsize>,
        fail_compression: bool,
    }

    impl Drain for CountingDrain {
        fn drain(&mut self, buffer: &EventBuffer) -> Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_compression {
                return Err(TraceError::CompressionFailed("injected".to_string()));
            }
            let batch = (0..buffer.len()).filter_map(|i| buffer.get(i)).collect();
            self.batches.lock().push(batch);
            Ok(buffer.len() as u64)
        }
    }

    /// Sink that accepts `budget` bytes, then fails every write
    struct FailingSink {
        written: usize,
        budget: usize,
    }

    impl std::io::Write for FailingSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.written + buf.len() > self.budget {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "full"));
            }
            self.written += buf.len();
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn batch_sizes(drain: &CountingDrain) -> Vec<usize> {
        drain.batches.lock().iter().map(Vec::len).collect()
    }

    #[test]
    fn test_concrete_scenario() {
        let file = NamedTempFile::new().unwrap();
        let recorder = Recorder::create(4, file.path(), 1024).unwrap();

        assert!(recorder.append(1, 0x1000, b'R'));
        assert!(recorder.append(2, 0x1004, b'W'));
        assert!(recorder.append(3, 0x1008, b'R'));
        assert!(recorder.append(4, 0x100C, b'W'));
        assert_eq!(recorder.count(), 4);
        assert_eq!(recorder.stats().batches_written, 0);

        assert!(recorder.append(5, 0x1010, b'R'));
        assert_eq!(recorder.count(), 1);
        assert_eq!(recorder.stats().batches_written, 1);

        let reader = TraceReader::open(file.path()).unwrap();
        assert_eq!(reader.header().buffer_capacity, 4);
        assert_eq!(
            reader.header().address_width as usize,
            std::mem::size_of::<usize>()
        );

        let batches: Vec<_> = reader.batches().collect::<Result<_>>().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].instruction_ids, vec![1, 2, 3, 4]);
        assert_eq!(batches[0].addresses, vec![0x1000, 0x1004, 0x1008, 0x100C]);
        assert_eq!(batches[0].operations, b"RWRW".to_vec());
    }

    #[test]
    fn test_explicit_flush_scenario() {
        let file = NamedTempFile::new().unwrap();
        let recorder = Recorder::create(4, file.path(), 1024).unwrap();

        assert!(recorder.append(10, 0x2000, Operation::Read));
        assert!(recorder.append(11, 0x2008, Operation::Write));
        recorder.flush();
        assert_eq!(recorder.count(), 0);

        let reader = TraceReader::open(file.path()).unwrap();
        let batches: Vec<_> = reader.batches().collect::<Result<_>>().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[0].instruction_ids, vec![10, 11]);
        assert_eq!(batches[0].operations, b"RW".to_vec());
    }

    #[test]
    fn test_flush_empty_writes_nothing() {
        let drain = CountingDrain::default();
        let recorder = Recorder::with_drain(4, drain.clone()).unwrap();

        recorder.flush();
        assert!(recorder.try_flush().is_ok());
        assert_eq!(drain.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_capacity_boundary() {
        let drain = CountingDrain::default();
        let recorder = Recorder::with_drain(8, drain.clone()).unwrap();

        for i in 0..8 {
            assert!(recorder.append(i, i as usize * 8, b'R'));
        }
        assert_eq!(drain.calls.load(Ordering::SeqCst), 0);
        assert_eq!(recorder.count(), 8);

        assert!(recorder.append(8, 64, b'W'));
        assert_eq!(drain.calls.load(Ordering::SeqCst), 1);
        assert_eq!(batch_sizes(&drain), vec![8]);
        assert_eq!(recorder.count(), 1);
    }

    #[test]
    fn test_no_loss_below_capacity() {
        let drain = CountingDrain::default();
        let recorder = Recorder::with_drain(100, drain.clone()).unwrap();

        for i in 0..99 {
            assert!(recorder.append(i, 0, b'R'));
        }
        assert_eq!(recorder.count(), 99);
        assert_eq!(drain.calls.load(Ordering::SeqCst), 0);
        assert_eq!(recorder.stats().events_recorded, 99);
    }

    #[test]
    fn test_cap_enforcement() {
        let file = NamedTempFile::new().unwrap();
        let recorder = Recorder::create(4, file.path(), 0).unwrap();

        for i in 0..4 {
            assert!(recorder.append(i, 0x10, b'R'));
        }
        assert!(!recorder.append(4, 0x10, b'R'));
        assert_eq!(recorder.count(), 4);
        assert!(recorder.is_dropping());

        assert!(matches!(
            recorder.try_record(Event::read(5, 0x10)),
            Err(TraceError::CapacityExceeded { .. })
        ));

        // header only
        assert_eq!(std::fs::metadata(file.path()).unwrap().len(), 8);
    }

    #[test]
    fn test_sticky_drop_state() {
        let file = NamedTempFile::new().unwrap();
        let recorder = Recorder::create(2, file.path(), 0).unwrap();

        recorder.append(1, 0, b'R');
        recorder.append(2, 0, b'R');

        for i in 0..1000 {
            assert!(!recorder.append(i, 0, b'W'));
        }
        recorder.flush();

        let stats = recorder.stats();
        assert_eq!(recorder.count(), 2);
        assert_eq!(stats.events_recorded, 2);
        assert_eq!(stats.events_dropped, 1000);
        assert_eq!(stats.batches_written, 0);
        assert_eq!(stats.drain_failures, 1001);
        assert!(stats.drop_rate() > 99.0);
    }

    #[test]
    fn test_cap_reached_after_some_batches() {
        let file = NamedTempFile::new().unwrap();
        // 1 MB cap, incompressible-ish addresses so batches are sizeable
        let recorder = Recorder::create(4096, file.path(), 1).unwrap();

        let mut state = 0x9e37_79b9_7f4a_7c15u64;
        let mut accepted = 0u64;
        for i in 0..2_000_000u32 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            if recorder.append(i, state as usize, b'R') {
                accepted += 1;
            } else {
                break;
            }
        }

        let stats = recorder.stats();
        assert!(stats.batches_written > 0);
        assert!(recorder.is_dropping());
        assert_eq!(accepted, stats.events_recorded);

        // the last accepted batch may overshoot the cap, but only by one batch
        let size = std::fs::metadata(file.path()).unwrap().len();
        assert!(size > 1 << 20);
        assert!(size < (1 << 20) + 4096 * 16 + 1024);
    }

    #[test]
    fn test_raising_cap_resumes_drains() {
        let file = NamedTempFile::new().unwrap();
        let recorder = Recorder::create(4, file.path(), 0).unwrap();
        assert_eq!(recorder.max_size_bytes(), 0);

        for i in 0..4 {
            assert!(recorder.append(i, 0x10, b'R'));
        }
        assert!(!recorder.append(4, 0x10, b'R'));
        assert!(recorder.is_dropping());

        recorder.set_max_size_mb(1);
        assert_eq!(recorder.max_size_bytes(), 1 << 20);
        assert!(!recorder.is_dropping());

        assert!(recorder.append(5, 0x20, b'W'));
        assert_eq!(recorder.count(), 1);
        assert_eq!(recorder.stats().batches_written, 1);

        let reader = TraceReader::open(file.path()).unwrap();
        let batches: Vec<_> = reader.batches().collect::<Result<_>>().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].instruction_ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_lowering_cap_stops_drains() {
        let file = NamedTempFile::new().unwrap();
        let recorder = Recorder::create(2, file.path(), 16).unwrap();

        for i in 0..3 {
            assert!(recorder.append(i, 0, b'R'));
        }
        recorder.set_max_size_mb(0);
        assert!(recorder.append(3, 0, b'R'));
        assert!(matches!(
            recorder.try_record(Event::read(4, 0)),
            Err(TraceError::CapacityExceeded { .. })
        ));
        assert_eq!(recorder.stats().batches_written, 1);
    }

    #[test]
    fn test_broken_stream_is_sticky() {
        // header fits, the first frame of the first batch does not
        let sink = FailingSink {
            written: 0,
            budget: 20,
        };
        let drain = CompressingDrain::new(
            FramedWriter::new(sink, u64::MAX),
            2,
            CompressionLevel::Fast,
        )
        .unwrap();
        let recorder = Recorder::with_drain(2, drain).unwrap();

        assert!(recorder.append(1, 0x10, b'R'));
        assert!(recorder.append(2, 0x20, b'W'));

        match recorder.try_record(Event::read(3, 0x30)) {
            Err(TraceError::StreamUnusable(msg)) => assert!(msg.contains("Failed to write")),
            other => panic!("expected StreamUnusable, got {:?}", other),
        }
        match recorder.try_record(Event::read(4, 0x40)) {
            Err(TraceError::StreamUnusable(msg)) => assert!(msg.contains("closed")),
            other => panic!("expected StreamUnusable, got {:?}", other),
        }

        let stats = recorder.stats();
        assert_eq!(recorder.count(), 2);
        assert_eq!(stats.drain_failures, 2);
        assert_eq!(stats.events_dropped, 2);
        assert_eq!(stats.batches_written, 0);
        assert!(recorder.is_dropping());
    }

    #[test]
    fn test_failed_flush_of_partial_buffer_still_accepts() {
        let file = NamedTempFile::new().unwrap();
        let recorder = Recorder::create(4, file.path(), 0).unwrap();

        assert!(recorder.append(1, 0x10, b'R'));
        recorder.flush();
        assert!(!recorder.is_dropping());

        for i in 2..5 {
            assert!(recorder.append(i, 0x10, b'R'));
        }
        assert!(recorder.is_dropping());
        assert!(!recorder.append(5, 0x10, b'R'));
    }

    #[test]
    fn test_failed_flush_keeps_entries() {
        let file = NamedTempFile::new().unwrap();
        let recorder = Recorder::create(4, file.path(), 0).unwrap();

        recorder.append(1, 0x10, b'R');
        recorder.append(2, 0x20, b'W');

        assert!(recorder.try_flush().is_err());
        recorder.flush();
        assert_eq!(recorder.count(), 2);
    }

    #[test]
    fn test_compression_failure_halts() {
        let drain = CountingDrain {
            fail_compression: true,
            ..Default::default()
        };
        let recorder = Recorder::with_drain(2, drain.clone()).unwrap();

        recorder.append(1, 0, b'R');
        recorder.append(2, 0, b'R');

        assert!(matches!(
            recorder.try_record(Event::read(3, 0)),
            Err(TraceError::CompressionFailed(_))
        ));
        assert!(matches!(
            recorder.try_record(Event::read(4, 0)),
            Err(TraceError::Halted)
        ));
        assert!(matches!(recorder.try_flush(), Err(TraceError::Halted)));

        // the drain is never retried after a compression failure
        assert_eq!(drain.calls.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.count(), 2);
    }

    #[test]
    fn test_drop_does_not_flush() {
        let file = NamedTempFile::new().unwrap();
        {
            let recorder = Recorder::create(4, file.path(), 1024).unwrap();
            recorder.append(1, 0x10, b'R');
            recorder.append(2, 0x20, b'W');
        }

        let reader = TraceReader::open(file.path()).unwrap();
        assert_eq!(reader.batches().count(), 0);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let file = NamedTempFile::new().unwrap();
        assert!(matches!(
            Recorder::create(0, file.path(), 1),
            Err(TraceError::ConfigError(_))
        ));
        assert!(Recorder::with_drain(0, CountingDrain::default()).is_err());
    }

    #[test]
    fn test_unopenable_output() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("trace.out");

        assert!(matches!(
            Recorder::create(4, &path, 1),
            Err(TraceError::StreamUnusable(_))
        ));
    }

    #[test]
    fn test_concurrent_appends() {
        const THREADS: u32 = 8;
        const PER_THREAD: u32 = 1000;

        let file = NamedTempFile::new().unwrap();
        let recorder = Arc::new(Recorder::create(64, file.path(), 1024).unwrap());

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let recorder = Arc::clone(&recorder);
                thread::spawn(move || {
                    for j in 0..PER_THREAD {
                        let op = if j % 2 == 0 { b'R' } else { b'W' };
                        assert!(recorder.append(t * PER_THREAD + j, t as usize, op));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        recorder.flush();

        let stats = recorder.stats();
        assert_eq!(stats.events_recorded, (THREADS * PER_THREAD) as u64);
        assert_eq!(stats.events_dropped, 0);

        let reader = TraceReader::open(file.path()).unwrap();
        let records: Vec<_> = reader
            .records()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(records.len(), (THREADS * PER_THREAD) as usize);

        // each thread's own events keep their program order
        let mut next = vec![0u32; THREADS as usize];
        for record in records {
            let t = record.address as usize;
            assert_eq!(record.instruction_id, t as u32 * PER_THREAD + next[t]);
            next[t] += 1;
        }
        assert!(next.iter().all(|&n| n == PER_THREAD));
    }

    #[test]
    fn test_independent_instances() {
        let dir = tempdir().unwrap();

        let handles: Vec<_> = (0..4u32)
            .map(|k| {
                let path = dir.path().join(format!("trace-{}.out", k));
                thread::spawn(move || {
                    let recorder = Recorder::create(16, &path, 1024).unwrap();
                    for i in 0..(100 + k) {
                        assert!(recorder.append(i, k as usize, b'R'));
                    }
                    recorder.flush();
                    path
                })
            })
            .collect();

        for (k, handle) in handles.into_iter().enumerate() {
            let path = handle.join().unwrap();
            let reader = TraceReader::open(&path).unwrap();
            let records: Vec<_> = reader.records().collect::<Result<Vec<_>>>().unwrap();
            assert_eq!(records.len(), 100 + k);
            assert!(records.iter().all(|r| r.address == k as u64));
        }
    }

    #[test]
    fn test_with_level() {
        let file = NamedTempFile::new().unwrap();
        let recorder = Recorder::with_level(8, file.path(), 16, CompressionLevel::Best).unwrap();

        for i in 0..20 {
            assert!(recorder.append(i, 0x4000 + i as usize, b'R'));
        }
        recorder.flush();

        let reader = TraceReader::open(file.path()).unwrap();
        let sizes: Vec<_> = reader
            .batches()
            .map(|b| b.map(|b| b.len()))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(sizes, vec![8, 8, 4]);
    }
}
