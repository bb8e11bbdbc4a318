//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`clock`] - `FakeClock`, a manually advanced [`Clock`](crate::clock::Clock).
//! - [`monitor`] - `RecordingMonitor`, a [`ConnectionMonitor`](crate::port::ConnectionMonitor)
//!   that records every notification.
//! - [`config`] - Canonical test configurations.

pub mod clock;
pub mod config;
pub mod monitor;
