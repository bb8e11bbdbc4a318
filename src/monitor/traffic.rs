//! Per-host connection and request accounting.
//!
//! [`TrafficMonitor`] keeps one [`TrafficInfo`] per traffic key in a sharded
//! concurrent map. Every event performs a single upsert under the owning
//! shard's lock, so the first event for a key creates the entry whether it is
//! a connect, a release, or a request result. [`TrafficMonitor::gc`] drops
//! entries that have no open connections and have been idle longer than the
//! configured interval.

use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::MonitorConfig;
use crate::port::ConnectionMonitor;

use super::info::{RequestOutcome, TrafficInfo};
use super::snapshot::{HostStats, TrafficSnapshot};

/// Idle time after which a connection-free entry is eligible for eviction.
pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(60);

/// Bounds required of a traffic key.
pub trait TrafficKey: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

impl<T> TrafficKey for T where T: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

/// Live connection and request statistics keyed by host.
///
/// # Thread Safety
///
/// All methods take `&self` and may be called from any number of threads.
/// Share the monitor behind an `Arc`.
///
/// # Example
///
/// ```
/// use hostwatch::monitor::{RequestOutcome, TrafficMonitor};
/// use std::time::Duration;
///
/// let monitor = TrafficMonitor::new("api");
/// monitor.connected(&"10.0.0.1");
/// monitor.request_result(&"10.0.0.1", RequestOutcome::Success, Duration::from_millis(4));
/// monitor.released(&"10.0.0.1");
///
/// assert_eq!(monitor.lifetime_request_count(), 1);
/// ```
pub struct TrafficMonitor<K: TrafficKey> {
    service_name: String,
    traffic: DashMap<K, TrafficInfo>,
    lifetime_requests: AtomicU64,
    gc_interval: Duration,
    clock: Arc<dyn Clock>,
}

impl<K: TrafficKey> TrafficMonitor<K> {
    /// Create a monitor using the system clock and [`DEFAULT_GC_INTERVAL`].
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self::with_clock(
            service_name,
            DEFAULT_GC_INTERVAL,
            Arc::new(SystemClock::new()),
        )
    }

    /// Create a monitor with an explicit idle threshold and time source.
    #[must_use]
    pub fn with_clock(
        service_name: impl Into<String>,
        gc_interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            traffic: DashMap::new(),
            lifetime_requests: AtomicU64::new(0),
            gc_interval,
            clock,
        }
    }

    /// Create a monitor from validated configuration.
    #[must_use]
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::with_clock(
            config.service_name.clone(),
            config.gc_interval(),
            Arc::new(SystemClock::new()),
        )
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    #[must_use]
    pub fn gc_interval(&self) -> Duration {
        self.gc_interval
    }

    /// Record a newly opened connection for `key`.
    pub fn connected(&self, key: &K) {
        let now = self.clock.now_millis();
        let mut entry = self.traffic.entry(key.clone()).or_default();
        entry.connect(now);
        debug!(
            service = %self.service_name,
            key = ?key,
            connections = entry.connection_count(),
            "Connection opened"
        );
    }

    /// Record a closed connection for `key`.
    ///
    /// The count floors at zero; a release without a prior connect still
    /// creates the entry and refreshes its activity time.
    pub fn released(&self, key: &K) {
        let now = self.clock.now_millis();
        let mut entry = self.traffic.entry(key.clone()).or_default();
        if entry.release(now) {
            debug!(
                service = %self.service_name,
                key = ?key,
                connections = entry.connection_count(),
                "Connection released"
            );
        } else {
            warn!(
                service = %self.service_name,
                key = ?key,
                "Release with no open connections"
            );
        }
    }

    /// Record the outcome of one request served for `key`.
    ///
    /// `latency` is kept for reporting only.
    pub fn request_result(&self, key: &K, outcome: RequestOutcome, latency: Duration) {
        let now = self.clock.now_millis();
        self.traffic
            .entry(key.clone())
            .or_default()
            .record(outcome, latency, now);
        self.lifetime_requests.fetch_add(1, Ordering::Relaxed);
        trace!(
            service = %self.service_name,
            key = ?key,
            outcome = outcome.as_str(),
            latency_micros = latency.as_micros() as u64,
            "Request recorded"
        );
    }

    /// Copy of every tracked entry.
    ///
    /// Each entry is read under its shard lock, so individual records are
    /// consistent even while other threads keep updating the monitor.
    #[must_use]
    pub fn traffic_info(&self) -> HashMap<K, TrafficInfo> {
        self.traffic
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Copy of the entry for a single key.
    #[must_use]
    pub fn traffic_info_for(&self, key: &K) -> Option<TrafficInfo> {
        self.traffic.get(key).map(|entry| entry.value().clone())
    }

    /// Requests ever recorded by this monitor, unaffected by eviction.
    #[must_use]
    pub fn lifetime_request_count(&self) -> u64 {
        self.lifetime_requests.load(Ordering::Relaxed)
    }

    /// Number of tracked keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.traffic.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.traffic.is_empty()
    }

    /// Evict entries with no open connections that have been idle for longer
    /// than the GC interval. Returns the number of evicted entries.
    ///
    /// The idle check runs under the shard write lock, so an entry touched
    /// concurrently is either seen with its new state or evicted before the
    /// touch, which then recreates it.
    pub fn gc(&self) -> usize {
        let now = self.clock.now_millis();
        let threshold = self.gc_interval;
        let mut evicted = 0usize;

        self.traffic.retain(|_, info| {
            let idle = info.is_idle(now, threshold);
            if idle {
                evicted += 1;
            }
            !idle
        });

        if evicted > 0 {
            debug!(
                service = %self.service_name,
                evicted,
                remaining = self.traffic.len(),
                "Evicted idle traffic entries"
            );
        }
        evicted
    }
}

impl<K: TrafficKey + Display> TrafficMonitor<K> {
    /// Export-ready view of the current statistics, sorted by host.
    #[must_use]
    pub fn snapshot(&self) -> TrafficSnapshot {
        let now = self.clock.now_millis();
        let mut hosts: Vec<HostStats> = self
            .traffic
            .iter()
            .map(|entry| HostStats::from_info(entry.key().to_string(), entry.value(), now))
            .collect();
        hosts.sort_by(|a, b| a.host.cmp(&b.host));

        TrafficSnapshot {
            service: self.service_name.clone(),
            taken_at: Utc::now(),
            lifetime_requests: self.lifetime_request_count(),
            hosts,
        }
    }
}

impl<K: TrafficKey> ConnectionMonitor<K> for TrafficMonitor<K> {
    fn connected(&self, key: &K) {
        TrafficMonitor::connected(self, key);
    }

    fn released(&self, key: &K) {
        TrafficMonitor::released(self, key);
    }
}

impl<K: TrafficKey> Debug for TrafficMonitor<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrafficMonitor")
            .field("service_name", &self.service_name)
            .field("entries", &self.traffic.len())
            .field("lifetime_requests", &self.lifetime_request_count())
            .field("gc_interval", &self.gc_interval)
            .finish()
    }
}
