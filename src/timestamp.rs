//! Monotonic millisecond timestamps (teacher: `src/timestamp.rs` +
//! `platform/native/clock.rs`'s `MonotonicClock`, kept almost unchanged).

use std::time::{Instant, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    pub ms_since_1970: u64,
}

impl Timestamp {
    pub fn adding(&self, ms: u64) -> Self {
        Self { ms_since_1970: self.ms_since_1970.saturating_add(ms) }
    }

    pub fn difference(&self, other: &Self) -> Option<u64> {
        self.ms_since_1970.checked_sub(other.ms_since_1970)
    }

    pub fn min(&self, other: Self) -> Self {
        Timestamp { ms_since_1970: self.ms_since_1970.min(other.ms_since_1970) }
    }
}

pub struct MonotonicClock {
    reference: Instant,
    reference_ms: u64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        let reference_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|d| u64::try_from(d.as_millis()).ok())
            .unwrap_or(u64::MAX);
        Self { reference: Instant::now(), reference_ms }
    }

    pub fn now(&self) -> Timestamp {
        let millis = u64::try_from(Instant::now().duration_since(self.reference).as_millis())
            .unwrap_or(u64::MAX);
        Timestamp { ms_since_1970: self.reference_ms.saturating_add(millis) }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}
