//! Line-echo TCP server instrumented with a [`TrafficMonitor`].
//!
//! Each newline-terminated line is one request. The reply is the line itself,
//! or the current snapshot as JSON when the line is `STATS`. Request outcomes
//! and latencies are recorded against the peer's IP; connection lifecycle is
//! recorded by the [`MonitoredTcpListener`].
//!
//! A line longer than `max_line_bytes` is recorded as a failure and the
//! connection is closed.

use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::Result;
use crate::monitor::{periodic, spawn_sweeper, RequestOutcome, TrafficMonitor};
use crate::transport::{MonitoredTcpListener, MonitoredTcpStream};

/// Monitor keyed by remote host.
pub type HostMonitor = TrafficMonitor<IpAddr>;

const STATS_COMMAND: &str = "STATS";

/// Serve connections until `shutdown` resolves.
///
/// Runs a GC sweeper and a periodic snapshot report alongside the accept
/// loop. Connection tasks already running are left to finish on their own.
///
/// # Errors
///
/// Returns an error if the sweep or report interval is zero or too large to
/// schedule.
pub async fn run<F>(
    listener: MonitoredTcpListener<HostMonitor>,
    config: &ServerConfig,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    let monitor = Arc::clone(listener.monitor());
    let mut report = periodic("report_interval_secs", config.report_interval())?;
    let sweeper = spawn_sweeper(Arc::clone(&monitor), config.sweep_interval())?;
    let limits = Limits {
        request_timeout: config.request_timeout(),
        max_line_bytes: config.max_line_bytes,
    };

    info!(addr = %listener.local_addr()?, service = monitor.service_name(), "Listening");

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
            _ = report.tick() => {
                report_snapshot(&monitor);
            }
            accepted = listener.accept() => match accepted {
                Ok(stream) => {
                    let monitor = Arc::clone(&monitor);
                    tokio::spawn(handle_connection(stream, monitor, limits));
                }
                Err(e) => warn!(error = %e, "Accept failed"),
            },
        }
    }

    sweeper.stop().await;
    report_snapshot(&monitor);
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct Limits {
    request_timeout: Duration,
    max_line_bytes: usize,
}

async fn handle_connection(
    stream: MonitoredTcpStream<HostMonitor>,
    monitor: Arc<HostMonitor>,
    limits: Limits,
) {
    let host = stream.peer_host();
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let mut limited = (&mut reader).take(limits.max_line_bytes as u64);
        match limited.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(n) if n == limits.max_line_bytes && buf.last() != Some(&b'\n') => {
                debug!(%host, limit = limits.max_line_bytes, "Request line too long");
                monitor.request_result(&host, RequestOutcome::Failure, Duration::ZERO);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                debug!(%host, error = %e, "Read failed");
                break;
            }
        }

        let started = std::time::Instant::now();
        let reply = reply_for(&String::from_utf8_lossy(&buf), &monitor);
        let write = reader.get_mut().write_all(reply.as_bytes());
        let outcome = match tokio::time::timeout(limits.request_timeout, write).await {
            Ok(Ok(())) => RequestOutcome::Success,
            Ok(Err(e)) => {
                debug!(%host, error = %e, "Write failed");
                RequestOutcome::Failure
            }
            Err(_) => RequestOutcome::Timeout,
        };
        monitor.request_result(&host, outcome, started.elapsed());

        if outcome != RequestOutcome::Success {
            break;
        }
    }

    let mut stream = reader.into_inner();
    if let Err(e) = stream.close().await {
        debug!(%host, error = %e, "Close failed");
    }
}

fn reply_for(line: &str, monitor: &HostMonitor) -> String {
    if line.trim() != STATS_COMMAND {
        return line.to_string();
    }
    match monitor.snapshot().to_json() {
        Ok(json) => format!("{json}\n"),
        Err(e) => format!("ERR {e}\n"),
    }
}

fn report_snapshot(monitor: &HostMonitor) {
    let snapshot = monitor.snapshot();
    match snapshot.to_json() {
        Ok(json) => info!(
            service = %snapshot.service,
            hosts = snapshot.hosts.len(),
            connections = snapshot.total_connections(),
            lifetime_requests = snapshot.lifetime_requests,
            snapshot = %json,
            "Traffic snapshot"
        ),
        Err(e) => warn!(error = %e, "Failed to serialize traffic snapshot"),
    }
}
