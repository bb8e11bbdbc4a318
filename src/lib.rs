//! Hostwatch - per-host connection and request accounting.
//!
//! This crate tracks, for every remote host, how many connections are open
//! and how its requests turned out, with idle entries swept away so that
//! hosts which vanish without a clean disconnect do not leak memory.
//!
//! # Architecture
//!
//! - **`monitor`** - The accounting core
//!   - `TrafficMonitor` - concurrent key to `TrafficInfo` table with a lifetime request counter
//!   - `spawn_sweeper` - tokio task driving periodic GC
//!
//! - **`transport`** - Listener decorators
//!   - `MonitoredListener` - blocking `std::net` accept loop
//!   - `MonitoredTcpListener` - tokio accept loop
//!
//! # Modules
//!
//! - [`clock`] - Time source abstraction
//! - [`config`] - Configuration loading from TOML files
//! - [`error`] - Error types for the crate
//! - [`monitor`] - Traffic accounting and snapshot export
//! - [`port`] - The `ConnectionMonitor` capability
//! - [`server`] - Instrumented line-echo server behind `hostwatch serve`
//! - [`transport`] - Monitored listeners and streams
//!
//! # Example
//!
//! ```no_run
//! use std::net::IpAddr;
//! use std::sync::Arc;
//! use hostwatch::monitor::TrafficMonitor;
//! use hostwatch::transport::MonitoredListener;
//!
//! let monitor = Arc::new(TrafficMonitor::<IpAddr>::new("api"));
//! let listener = MonitoredListener::bind("127.0.0.1:0", Arc::clone(&monitor))?;
//! let stream = listener.accept()?;
//! assert_eq!(monitor.traffic_info_for(&stream.peer_host()).unwrap().connection_count(), 1);
//! # Ok::<(), std::io::Error>(())
//! ```

pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod monitor;
pub mod port;
pub mod server;
pub mod transport;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
