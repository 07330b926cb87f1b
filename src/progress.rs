use std::sync::atomic::{AtomicU64, Ordering};

/// Publications per full run: one every 0.5% of the total
const UPDATE_DIVISOR: u64 = 200;

/// Throttled, monotonic progress over a known number of bytes
///
/// Bytes are accumulated by [`record`](ProgressTracker::record); the observable fraction is
/// only republished once a full interval (0.5% of the total, at least one byte) has been
/// accumulated since the previous publication, so observers see updates proportional to
/// data volume rather than to packet count. Reaching the total always publishes exactly
/// `1.0`.
///
/// The tracker has a single writer (the import worker) and any number of readers. There is
/// no way to set the value directly.
#[derive(Debug)]
pub struct ProgressTracker {
    total: u64,
    interval: u64,
    recorded: AtomicU64,
    published_bytes: AtomicU64,
    /// `f64` bits of the published fraction
    published: AtomicU64,
    updates: AtomicU64,
}

impl ProgressTracker {
    pub fn new(total: u64) -> ProgressTracker {
        let interval = (total / UPDATE_DIVISOR).max(1);
        ProgressTracker {
            total,
            interval,
            recorded: AtomicU64::new(0),
            published_bytes: AtomicU64::new(0),
            published: AtomicU64::new(0f64.to_bits()),
            updates: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of bytes between two publications
    #[inline]
    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Bytes recorded so far (not throttled)
    #[inline]
    pub fn recorded(&self) -> u64 {
        self.recorded.load(Ordering::Relaxed)
    }

    /// Last published fraction, in `[0, 1]`
    #[inline]
    pub fn fraction(&self) -> f64 {
        f64::from_bits(self.published.load(Ordering::Acquire))
    }

    /// Number of times the fraction was republished
    #[inline]
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    /// Account for `bytes` more bytes of input
    pub fn record(&self, bytes: u64) {
        if bytes == 0 {
            return;
        }
        let recorded = self
            .recorded
            .fetch_add(bytes, Ordering::Relaxed)
            .saturating_add(bytes);
        let last = self.published_bytes.load(Ordering::Relaxed);
        if last >= self.total && self.total > 0 {
            return;
        }
        if recorded >= self.total {
            self.publish(self.total, 1.0);
        } else if recorded.saturating_sub(last) >= self.interval {
            self.publish(recorded, recorded as f64 / self.total as f64);
        }
    }

    fn publish(&self, bytes: u64, fraction: f64) {
        let prev = self.published_bytes.fetch_max(bytes, Ordering::Relaxed);
        if prev > bytes || (prev == bytes && self.updates() > 0) {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        self.published.store(fraction.to_bits(), Ordering::Release);
        self.updates.fetch_add(1, Ordering::Relaxed);
    }
}
