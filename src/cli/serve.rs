//! Handler for the `serve` command.

use std::sync::Arc;

use tokio::signal;
use tracing::{info, warn};

use crate::cli::ServeArgs;
use crate::config::{Config, LogFormat};
use crate::error::Result;
use crate::server::{self, HostMonitor};
use crate::transport::MonitoredTcpListener;

/// Execute the serve command.
pub async fn execute(args: &ServeArgs) -> Result<()> {
    let mut config = if args.config.exists() {
        Config::load(&args.config)?
    } else {
        Config::default()
    };

    // Apply CLI overrides
    if let Some(ref bind) = args.bind {
        config.server.bind = bind.clone();
    }
    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.format = LogFormat::Json;
    }
    config.validate()?;

    config.init_logging();
    if !args.config.exists() {
        warn!(path = %args.config.display(), "Config file not found, using defaults");
    }
    info!(service = %config.monitor.service_name, "hostwatch starting");

    let monitor = Arc::new(HostMonitor::from_config(&config.monitor));
    let listener = MonitoredTcpListener::bind(config.server.bind_addr()?, monitor).await?;

    server::run(listener, &config.server, async {
        if signal::ctrl_c().await.is_err() {
            warn!("Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    })
    .await?;

    info!("hostwatch stopped");
    Ok(())
}
