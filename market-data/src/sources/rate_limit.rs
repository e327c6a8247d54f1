//! Per-source request pacing
//!
//! The gate keeps one monotonic "next permitted slot" as nanoseconds since the
//! gate was created. A caller reserves its slot with a compare-and-swap and
//! sleeps until then, so concurrent callers sharing a source are spaced out
//! by at least `60s / requests_per_minute` without holding a lock while asleep.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

pub struct RateGate {
    origin: Instant,
    min_interval: Duration,
    next_slot_nanos: AtomicU64,
}

impl RateGate {
    /// `requests_per_minute == 0` disables pacing
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let min_interval = if requests_per_minute == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(60) / requests_per_minute
        };
        Self {
            origin: Instant::now(),
            min_interval,
            next_slot_nanos: AtomicU64::new(0),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Claim the next slot and return how long the caller must wait for it.
    pub fn reserve(&self) -> Duration {
        let step = self.min_interval.as_nanos() as u64;
        let now = self.origin.elapsed().as_nanos() as u64;

        let mut current = self.next_slot_nanos.load(Ordering::Acquire);
        let slot = loop {
            let slot = current.max(now);
            match self.next_slot_nanos.compare_exchange_weak(
                current,
                slot + step,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break slot,
                Err(actual) => current = actual,
            }
        };
        Duration::from_nanos(slot - now)
    }

    /// Wait until this caller may issue its request
    pub async fn acquire(&self) {
        let wait = self.reserve();
        if !wait.is_zero() {
            debug!(wait_ms = wait.as_millis() as u64, "rate gate delaying request");
            tokio::time::sleep(wait).await;
        }
    }
}

impl std::fmt::Debug for RateGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateGate")
            .field("min_interval", &self.min_interval)
            .field("next_slot_nanos", &self.next_slot_nanos.load(Ordering::Relaxed))
            .finish()
    }
}
