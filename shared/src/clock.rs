//! A small clock seam so freshness windows (the 4-hour cached-verdict
//! validity, the config-updater timestamp comparisons) are testable
//! without sleeping real wall-clock time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Nanoseconds since the Unix epoch. Chosen over `Instant` because
/// persisted verdicts must compare a timestamp across process restarts,
/// and `Instant` carries no serializable epoch.
pub trait Clock: Send + Sync {
    fn now_ns(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ns(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64
    }
}

#[cfg(any(test, feature = "test-support"))]
pub struct FakeClock {
    now_ns: AtomicU64,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeClock {
    pub fn new(start_ns: u64) -> Self {
        FakeClock {
            now_ns: AtomicU64::new(start_ns),
        }
    }

    pub fn advance(&self, delta_ns: u64) {
        self.now_ns.fetch_add(delta_ns, Ordering::SeqCst);
    }

    pub fn set(&self, value_ns: u64) {
        self.now_ns.store(value_ns, Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Clock for FakeClock {
    fn now_ns(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }
}
