//! Per-host traffic record.

use std::time::Duration;

use serde::Serialize;

/// Outcome of a single request, as reported by request handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestOutcome {
    Success,
    Failure,
    Timeout,
}

impl RequestOutcome {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Timeout => "timeout",
        }
    }
}

/// Connection and request statistics for one traffic key.
///
/// Instances handed out by the monitor are copies; mutating methods are
/// crate-private so that only [`TrafficMonitor`](super::TrafficMonitor)
/// changes live records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrafficInfo {
    connection_count: u32,
    success_count: u64,
    failure_count: u64,
    timeout_count: u64,
    total_latency_micros: u64,
    max_latency_micros: u64,
    last_activity_millis: u64,
}

impl TrafficInfo {
    /// Number of currently open connections.
    #[must_use]
    pub fn connection_count(&self) -> u32 {
        self.connection_count
    }

    #[must_use]
    pub fn success_count(&self) -> u64 {
        self.success_count
    }

    #[must_use]
    pub fn failure_count(&self) -> u64 {
        self.failure_count
    }

    #[must_use]
    pub fn timeout_count(&self) -> u64 {
        self.timeout_count
    }

    /// Counter for a specific outcome.
    #[must_use]
    pub fn outcome_count(&self, outcome: RequestOutcome) -> u64 {
        match outcome {
            RequestOutcome::Success => self.success_count,
            RequestOutcome::Failure => self.failure_count,
            RequestOutcome::Timeout => self.timeout_count,
        }
    }

    /// Total requests recorded against this entry, all outcomes.
    #[must_use]
    pub fn request_count(&self) -> u64 {
        self.success_count + self.failure_count + self.timeout_count
    }

    /// Mean request latency, or zero when no requests were recorded.
    #[must_use]
    pub fn mean_latency(&self) -> Duration {
        match self.request_count() {
            0 => Duration::ZERO,
            n => Duration::from_micros(self.total_latency_micros / n),
        }
    }

    #[must_use]
    pub fn max_latency(&self) -> Duration {
        Duration::from_micros(self.max_latency_micros)
    }

    /// Clock reading (millis) of the most recent event on this entry.
    #[must_use]
    pub fn last_activity_millis(&self) -> u64 {
        self.last_activity_millis
    }

    /// Whether the entry may be evicted at `now_millis` given `threshold`.
    ///
    /// Entries with open connections are never idle.
    pub(crate) fn is_idle(&self, now_millis: u64, threshold: Duration) -> bool {
        self.connection_count == 0
            && now_millis.saturating_sub(self.last_activity_millis) > threshold.as_millis() as u64
    }

    pub(crate) fn connect(&mut self, now_millis: u64) {
        self.connection_count = self.connection_count.saturating_add(1);
        self.touch(now_millis);
    }

    /// Decrement the connection count, flooring at zero.
    ///
    /// Returns `false` when the count was already zero.
    pub(crate) fn release(&mut self, now_millis: u64) -> bool {
        self.touch(now_millis);
        match self.connection_count.checked_sub(1) {
            Some(count) => {
                self.connection_count = count;
                true
            }
            None => false,
        }
    }

    pub(crate) fn record(&mut self, outcome: RequestOutcome, latency: Duration, now_millis: u64) {
        let counter = match outcome {
            RequestOutcome::Success => &mut self.success_count,
            RequestOutcome::Failure => &mut self.failure_count,
            RequestOutcome::Timeout => &mut self.timeout_count,
        };
        *counter = counter.saturating_add(1);

        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.total_latency_micros = self.total_latency_micros.saturating_add(micros);
        self.max_latency_micros = self.max_latency_micros.max(micros);
        self.touch(now_millis);
    }

    // Concurrent callers may read the clock out of order.
    fn touch(&mut self, now_millis: u64) {
        self.last_activity_millis = self.last_activity_millis.max(now_millis);
    }
}
