//! Export view of monitor statistics.
//!
//! A [`TrafficSnapshot`] is a plain serializable value that a stats system
//! can publish as JSON or as flat named gauges.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;

use super::info::TrafficInfo;

/// Statistics for one host at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostStats {
    pub host: String,
    pub connections: u32,
    pub successes: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub mean_latency_micros: u64,
    pub max_latency_micros: u64,
    /// Milliseconds since the host's last event.
    pub idle_millis: u64,
}

impl HostStats {
    pub(crate) fn from_info(host: String, info: &TrafficInfo, now_millis: u64) -> Self {
        Self {
            host,
            connections: info.connection_count(),
            successes: info.success_count(),
            failures: info.failure_count(),
            timeouts: info.timeout_count(),
            mean_latency_micros: info.mean_latency().as_micros() as u64,
            max_latency_micros: info.max_latency().as_micros() as u64,
            idle_millis: now_millis.saturating_sub(info.last_activity_millis()),
        }
    }
}

/// Point-in-time statistics for a whole monitor.
#[derive(Debug, Clone, Serialize)]
pub struct TrafficSnapshot {
    pub service: String,
    pub taken_at: DateTime<Utc>,
    pub lifetime_requests: u64,
    pub hosts: Vec<HostStats>,
}

impl TrafficSnapshot {
    /// Flatten into `(name, value)` gauges.
    ///
    /// Names are `<service>_<host>_<stat>` with every character of the host
    /// outside `[A-Za-z0-9]` replaced by `_`, plus one
    /// `<service>_lifetime_requests` gauge.
    #[must_use]
    pub fn gauges(&self) -> Vec<(String, u64)> {
        let mut gauges = Vec::with_capacity(1 + self.hosts.len() * 4);
        gauges.push((
            format!("{}_lifetime_requests", self.service),
            self.lifetime_requests,
        ));

        for host in &self.hosts {
            let prefix = format!("{}_{}", self.service, gauge_segment(&host.host));
            gauges.push((format!("{prefix}_connections"), u64::from(host.connections)));
            gauges.push((format!("{prefix}_successes"), host.successes));
            gauges.push((format!("{prefix}_failures"), host.failures));
            gauges.push((format!("{prefix}_timeouts"), host.timeouts));
        }
        gauges
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Sum of open connections across hosts.
    #[must_use]
    pub fn total_connections(&self) -> u64 {
        self.hosts.iter().map(|h| u64::from(h.connections)).sum()
    }
}

fn gauge_segment(host: &str) -> String {
    host.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
