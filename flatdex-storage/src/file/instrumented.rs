use super::IndexFile;
use crate::types::{FileOffset, IndexSlot, OpenMode};
use flatdex_result::Result;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A thread-safe container for I/O statistics.
#[derive(Debug, Default)]
pub struct IoStats {
    pub opens: AtomicU64,
    pub closes: AtomicU64,
    pub seeks: AtomicU64,
    pub reads: AtomicU64,
    pub read_bytes: AtomicU64,
    pub writes: AtomicU64,
    pub written_bytes: AtomicU64,
    pub discards: AtomicU64,
}

impl IoStats {
    /// Capture a point-in-time snapshot of the accumulated metrics.
    pub fn snapshot(&self) -> IoStatsSnapshot {
        IoStatsSnapshot {
            opens: self.opens.load(Ordering::Relaxed),
            closes: self.closes.load(Ordering::Relaxed),
            seeks: self.seeks.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            read_bytes: self.read_bytes.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            written_bytes: self.written_bytes.load(Ordering::Relaxed),
            discards: self.discards.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.opens.store(0, Ordering::Relaxed);
        self.closes.store(0, Ordering::Relaxed);
        self.seeks.store(0, Ordering::Relaxed);
        self.reads.store(0, Ordering::Relaxed);
        self.read_bytes.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
        self.written_bytes.store(0, Ordering::Relaxed);
        self.discards.store(0, Ordering::Relaxed);
    }
}

/// Immutable copy of [`IoStats`] counters captured at a specific moment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoStatsSnapshot {
    pub opens: u64,
    pub closes: u64,
    pub seeks: u64,
    pub reads: u64,
    pub read_bytes: u64,
    pub writes: u64,
    pub written_bytes: u64,
    pub discards: u64,
}

impl IoStatsSnapshot {
    /// Compute the delta between two snapshots (`newer - older`). Saturates at zero.
    pub fn delta_since(&self, older: &Self) -> Self {
        macro_rules! delta {
            ($field:ident) => {
                self.$field.saturating_sub(older.$field)
            };
        }
        Self {
            opens: delta!(opens),
            closes: delta!(closes),
            seeks: delta!(seeks),
            reads: delta!(reads),
            read_bytes: delta!(read_bytes),
            writes: delta!(writes),
            written_bytes: delta!(written_bytes),
            discards: delta!(discards),
        }
    }
}

/// Counts every call that reaches the wrapped file.
pub struct InstrumentedIndexFile<F: IndexFile> {
    inner: F,
    stats: Arc<IoStats>,
}

impl<F: IndexFile> InstrumentedIndexFile<F> {
    pub fn new(inner: F) -> (Self, Arc<IoStats>) {
        let stats = Arc::new(IoStats::default());
        (
            Self {
                inner,
                stats: Arc::clone(&stats),
            },
            stats,
        )
    }

    pub fn stats(&self) -> Arc<IoStats> {
        Arc::clone(&self.stats)
    }

    pub fn into_inner(self) -> F {
        self.inner
    }
}

impl<F: IndexFile> IndexFile for InstrumentedIndexFile<F> {
    fn open(&mut self, path: &Path, slot: IndexSlot, mode: OpenMode) -> Result<()> {
        self.stats.opens.fetch_add(1, Ordering::Relaxed);
        self.inner.open(path, slot, mode)
    }

    fn seek(&mut self, offset: FileOffset) -> Result<()> {
        self.stats.seeks.fetch_add(1, Ordering::Relaxed);
        self.inner.seek(offset)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        self.stats.reads.fetch_add(1, Ordering::Relaxed);
        self.stats
            .read_bytes
            .fetch_add(buf.len() as u64, Ordering::Relaxed);
        self.inner.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.stats.writes.fetch_add(1, Ordering::Relaxed);
        let n = self.inner.write(buf)?;
        self.stats
            .written_bytes
            .fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }

    fn close(&mut self, path: &Path, slot: IndexSlot) -> Result<()> {
        self.stats.closes.fetch_add(1, Ordering::Relaxed);
        self.inner.close(path, slot)
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn discard(&mut self, path: &Path, slot: IndexSlot) -> Result<()> {
        self.stats.discards.fetch_add(1, Ordering::Relaxed);
        self.inner.discard(path, slot)
    }
}
