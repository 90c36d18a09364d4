//! Buffer pool statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics tracked by the buffer pool.
///
/// Counters are relaxed atomics so they can be read through `&self` from a
/// [`SharedBufferManager`](crate::buffer::SharedBufferManager) without
/// taking the pool lock. Exact cross-counter ordering doesn't matter.
#[derive(Debug, Default)]
pub struct BufferPoolStats {
    /// `read_page` calls served from a cached frame.
    pub cache_hits: AtomicU64,

    /// `read_page` calls that had to load the page from its file.
    pub cache_misses: AtomicU64,

    /// Valid frames reclaimed by the clock replacer.
    pub evictions: AtomicU64,

    /// Pages written back to their file (eviction, flush or shutdown).
    pub pages_written: AtomicU64,

    /// Pages loaded from a file.
    pub pages_read: AtomicU64,

    /// Pages created through `alloc_page`.
    pub pages_allocated: AtomicU64,

    /// Pages deleted through `dispose_page`.
    pub pages_disposed: AtomicU64,

    /// Frames inspected by the clock hand, across all sweeps.
    pub clock_steps: AtomicU64,
}

impl BufferPoolStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Calculate cache hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        self.snapshot().hit_rate()
    }

    /// Get a non-atomic copy for display/logging.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            pages_written: self.pages_written.load(Ordering::Relaxed),
            pages_read: self.pages_read.load(Ordering::Relaxed),
            pages_allocated: self.pages_allocated.load(Ordering::Relaxed),
            pages_disposed: self.pages_disposed.load(Ordering::Relaxed),
            clock_steps: self.clock_steps.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.cache_hits,
            &self.cache_misses,
            &self.evictions,
            &self.pages_written,
            &self.pages_read,
            &self.pages_allocated,
            &self.pages_disposed,
            &self.clock_steps,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// A point-in-time snapshot of buffer pool statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evictions: u64,
    pub pages_written: u64,
    pub pages_read: u64,
    pub pages_allocated: u64,
    pub pages_disposed: u64,
    pub clock_steps: u64,
}

impl StatsSnapshot {
    /// Calculate cache hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ hits: {}, misses: {}, evictions: {}, written: {}, clock_steps: {}, hit_rate: {:.2}% }}",
            self.cache_hits,
            self.cache_misses,
            self.evictions,
            self.pages_written,
            self.clock_steps,
            self.hit_rate() * 100.0
        )
    }
}
