//! Background task that runs [`TrafficMonitor::gc`] on a fixed period.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::error::{ConfigError, Result};

use super::traffic::{TrafficKey, TrafficMonitor};

/// Handle to a running sweeper task.
///
/// Dropping the handle aborts the task; [`stop`](Self::stop) shuts it down
/// and waits for it to finish.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Signal the task to stop and wait for it.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!(error = %e, "Sweeper task failed");
            }
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Spawn a task that sweeps `monitor` every `period`.
///
/// Must be called from within a tokio runtime. The first sweep runs one
/// period after spawning.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if `period` is zero or too large
/// to schedule.
pub fn spawn_sweeper<K: TrafficKey>(
    monitor: Arc<TrafficMonitor<K>>,
    period: Duration,
) -> Result<SweeperHandle> {
    let mut interval = periodic("sweep_interval_secs", period)?;

    let (shutdown, mut shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        debug!(
            service = monitor.service_name(),
            period_ms = period.as_millis() as u64,
            "Sweeper started"
        );

        loop {
            tokio::select! {
                result = shutdown_rx.changed() => {
                    if result.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    monitor.gc();
                }
            }
        }

        info!(service = monitor.service_name(), "Sweeper stopped");
    });

    Ok(SweeperHandle {
        shutdown,
        handle: Some(handle),
    })
}

/// Interval ticking every `period`, first tick one period from now.
pub(crate) fn periodic(field: &'static str, period: Duration) -> Result<Interval> {
    if period.is_zero() {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must be greater than 0".into(),
        }
        .into());
    }
    let start = Instant::now()
        .checked_add(period)
        .ok_or_else(|| ConfigError::InvalidValue {
            field,
            reason: format!("{}s is too far in the future", period.as_secs()),
        })?;

    let mut interval = interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    Ok(interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::RequestOutcome;
    use crate::testkit::clock::FakeClock;

    fn monitor(clock: &FakeClock) -> Arc<TrafficMonitor<&'static str>> {
        Arc::new(TrafficMonitor::with_clock(
            "sweep",
            Duration::from_secs(1),
            Arc::new(clock.clone()),
        ))
    }

    #[tokio::test]
    async fn rejects_zero_period() {
        let clock = FakeClock::new();
        let result = spawn_sweeper(monitor(&clock), Duration::ZERO);
        assert!(matches!(
            result,
            Err(crate::error::Error::Config(ConfigError::InvalidValue {
                field: "sweep_interval_secs",
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn rejects_period_past_the_end_of_time() {
        let clock = FakeClock::new();
        let result = spawn_sweeper(monitor(&clock), Duration::from_secs(u64::MAX));
        assert!(matches!(
            result,
            Err(crate::error::Error::Config(ConfigError::InvalidValue {
                field: "sweep_interval_secs",
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn sweeps_idle_entries_periodically() {
        let clock = FakeClock::new();
        let monitor = monitor(&clock);
        monitor.request_result(&"idle", RequestOutcome::Success, Duration::ZERO);
        monitor.connected(&"busy");
        clock.advance(Duration::from_secs(5));

        let sweeper = spawn_sweeper(Arc::clone(&monitor), Duration::from_millis(10)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        sweeper.stop().await;

        assert!(monitor.traffic_info_for(&"idle").is_none());
        assert!(monitor.traffic_info_for(&"busy").is_some());
        assert_eq!(monitor.lifetime_request_count(), 1);
    }

    #[tokio::test]
    async fn stop_finishes_task() {
        let clock = FakeClock::new();
        let sweeper = spawn_sweeper(monitor(&clock), Duration::from_secs(60)).unwrap();
        assert!(!sweeper.is_finished());
        sweeper.stop().await;
    }
}
