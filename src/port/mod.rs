//! Trait definitions at the seam between the monitor and transports.
//!
//! # Available Ports
//!
//! - [`ConnectionMonitor`] - Connection lifecycle notifications

mod monitor;

pub use monitor::ConnectionMonitor;
