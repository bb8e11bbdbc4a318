//! Application configuration loading and validation.
//!
//! Configuration is read from a TOML file. Every section and field has a
//! default, so an empty file is a valid configuration.
//!
//! # Example
//!
//! ```no_run
//! use hostwatch::config::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use super::logging::LoggingConfig;
use crate::error::{ConfigError, Result};
use crate::monitor::DEFAULT_GC_INTERVAL;

/// Upper bound for every `*_interval_secs` setting (one week).
pub const MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Upper bound for `request_timeout_ms` (one hour).
pub const MAX_REQUEST_TIMEOUT_MS: u64 = 60 * 60 * 1000;

/// Upper bound for `max_line_bytes` (16 MiB).
pub const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// Traffic monitor settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Name used as the prefix of exported gauges.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Idle seconds after which a host with no open connections is evicted.
    #[serde(default = "default_gc_interval_secs")]
    pub gc_interval_secs: u64,
}

impl MonitorConfig {
    #[must_use]
    pub fn gc_interval(&self) -> Duration {
        Duration::from_secs(self.gc_interval_secs)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            gc_interval_secs: default_gc_interval_secs(),
        }
    }
}

/// Settings for the `serve` command.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address, `host:port`.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Seconds between GC sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Seconds between snapshot log lines.
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,

    /// Milliseconds a reply may take before the request counts as timed out.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Longest accepted request line, newline included.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

impl ServerConfig {
    /// Parsed listen address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `bind` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let addr = self
            .bind
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "bind",
                reason: e.to_string(),
            })?;
        Ok(addr)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    #[must_use]
    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            sweep_interval_secs: default_sweep_interval_secs(),
            report_interval_secs: default_report_interval_secs(),
            request_timeout_ms: default_request_timeout_ms(),
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

fn default_service_name() -> String {
    "hostwatch".to_string()
}

fn default_gc_interval_secs() -> u64 {
    DEFAULT_GC_INTERVAL.as_secs()
}

fn default_bind() -> String {
    "127.0.0.1:7878".to_string()
}

fn default_sweep_interval_secs() -> u64 {
    30
}

fn default_report_interval_secs() -> u64 {
    10
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_max_line_bytes() -> usize {
    64 * 1024
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse and validate configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Check value ranges and formats.
    pub fn validate(&self) -> Result<()> {
        if self.monitor.service_name.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "service_name",
            }
            .into());
        }
        check_range("gc_interval_secs", self.monitor.gc_interval_secs, MAX_INTERVAL_SECS)?;
        check_range(
            "sweep_interval_secs",
            self.server.sweep_interval_secs,
            MAX_INTERVAL_SECS,
        )?;
        check_range(
            "report_interval_secs",
            self.server.report_interval_secs,
            MAX_INTERVAL_SECS,
        )?;
        check_range(
            "request_timeout_ms",
            self.server.request_timeout_ms,
            MAX_REQUEST_TIMEOUT_MS,
        )?;
        check_range("max_line_bytes", self.server.max_line_bytes, MAX_LINE_BYTES)?;
        self.server.bind_addr()?;
        Ok(())
    }

    /// Initialize tracing from the `[logging]` section.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

fn check_range<T>(field: &'static str, value: T, max: T) -> Result<()>
where
    T: PartialOrd + Default + std::fmt::Display,
{
    if value == T::default() {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must be greater than 0".to_string(),
        }
        .into());
    }
    if value > max {
        return Err(ConfigError::InvalidValue {
            field,
            reason: format!("must be at most {max}, got {value}"),
        }
        .into());
    }
    Ok(())
}
