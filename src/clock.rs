//! Time source abstraction.
//!
//! The traffic monitor reads time through [`Clock`] so that idle-time
//! eviction can be driven deterministically in tests (see
//! `testkit::clock::FakeClock`).

use std::sync::Arc;
use std::time::Instant;

/// Monotonic time source.
///
/// Values are only meaningful relative to other readings from the same
/// clock; there is no relation to wall-clock time.
pub trait Clock: Send + Sync {
    /// Milliseconds since this clock's origin.
    fn now_millis(&self) -> u64;

    /// Nanoseconds since this clock's origin.
    fn now_nanos(&self) -> u64;
}

/// Production clock backed by [`Instant`].
///
/// The origin is the moment the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn now_nanos(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_millis(&self) -> u64 {
        (**self).now_millis()
    }

    fn now_nanos(&self) -> u64 {
        (**self).now_nanos()
    }
}
