//! Listener decorators that bind socket lifecycle to a [`ConnectionMonitor`].
//!
//! The monitoring key is the remote host's [`IpAddr`](std::net::IpAddr);
//! several connections from one host add up on the same key.
//!
//! - [`blocking`] - `std::net` listeners via the [`Accept`] trait
//! - [`nonblocking`] - tokio listeners
//!
//! [`ConnectionMonitor`]: crate::port::ConnectionMonitor

pub mod blocking;
pub mod nonblocking;
mod registry;

pub use blocking::{Accept, Close, MonitoredListener, MonitoredStream};
pub use nonblocking::{MonitoredTcpListener, MonitoredTcpStream};
