//! Canonical test configurations.
//!
//! Single source of truth for config structs used across tests.

use crate::config::{Config, MonitorConfig, ServerConfig};

/// Monitor config with the given idle threshold.
pub fn monitor(gc_interval_secs: u64) -> MonitorConfig {
    MonitorConfig {
        service_name: "test".to_string(),
        gc_interval_secs,
    }
}

/// Config bound to an ephemeral loopback port with one-second timers.
pub fn loopback() -> Config {
    Config {
        monitor: monitor(1),
        server: ServerConfig {
            bind: "127.0.0.1:0".to_string(),
            sweep_interval_secs: 1,
            report_interval_secs: 1,
            request_timeout_ms: 1_000,
            max_line_bytes: 64 * 1024,
        },
        logging: Default::default(),
    }
}
