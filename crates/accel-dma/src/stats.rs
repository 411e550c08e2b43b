use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of [`EngineStats`], suitable for logging or forwarding to a profiler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStatsSnapshot {
    pub fast_reserves: u64,
    pub slow_reserves: u64,
    pub fetch_polls: u64,
    pub wraps: u64,
    pub flushes: u64,
    pub words_written: u64,
    pub stalls: u64,
    pub channel_rebinds: u64,
    pub primitives_submitted: u64,
}

/// Counters for the submission path.
///
/// Updated with relaxed atomics so they can be read from another thread while the owner of the
/// engine keeps submitting.
#[derive(Debug, Default)]
pub struct EngineStats {
    fast_reserves: AtomicU64,
    slow_reserves: AtomicU64,
    fetch_polls: AtomicU64,
    wraps: AtomicU64,
    flushes: AtomicU64,
    words_written: AtomicU64,
    stalls: AtomicU64,
    channel_rebinds: AtomicU64,
    primitives_submitted: AtomicU64,
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_fast_reserves(&self) {
        self.fast_reserves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_slow_reserves(&self) {
        self.slow_reserves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fetch_polls(&self) {
        self.fetch_polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_wraps(&self) {
        self.wraps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_flushes(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_words_written(&self, words: u64) {
        self.words_written.fetch_add(words, Ordering::Relaxed);
    }

    pub fn inc_stalls(&self) {
        self.stalls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_channel_rebinds(&self) {
        self.channel_rebinds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_primitives_submitted(&self, count: u64) {
        self.primitives_submitted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            fast_reserves: self.fast_reserves.load(Ordering::Relaxed),
            slow_reserves: self.slow_reserves.load(Ordering::Relaxed),
            fetch_polls: self.fetch_polls.load(Ordering::Relaxed),
            wraps: self.wraps.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            words_written: self.words_written.load(Ordering::Relaxed),
            stalls: self.stalls.load(Ordering::Relaxed),
            channel_rebinds: self.channel_rebinds.load(Ordering::Relaxed),
            primitives_submitted: self.primitives_submitted.load(Ordering::Relaxed),
        }
    }
}
