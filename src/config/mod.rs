//! Configuration loading and logging setup.

mod logging;
mod settings;

pub use logging::{LogFormat, LoggingConfig};
pub use settings::{
    Config, MonitorConfig, ServerConfig, MAX_INTERVAL_SECS, MAX_LINE_BYTES, MAX_REQUEST_TIMEOUT_MS,
};
