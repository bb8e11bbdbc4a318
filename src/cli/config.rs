//! Handler for the `config` command group.

use std::path::Path;

use crate::config::Config;
use crate::error::Result;

/// Execute `config validate`.
pub fn execute_validate(path: &Path) -> Result<()> {
    Config::load(path)?;
    println!("Configuration valid: {}", path.display());
    Ok(())
}

/// Execute `config show`.
pub fn execute_show(path: &Path) -> Result<()> {
    let config = Config::load(path)?;

    println!("[monitor]");
    println!("  service_name       {}", config.monitor.service_name);
    println!("  gc_interval_secs   {}", config.monitor.gc_interval_secs);
    println!("[server]");
    println!("  bind               {}", config.server.bind);
    println!("  sweep_interval     {}s", config.server.sweep_interval_secs);
    println!("  report_interval    {}s", config.server.report_interval_secs);
    println!("  request_timeout    {}ms", config.server.request_timeout_ms);
    println!("  max_line_bytes     {}", config.server.max_line_bytes);
    println!("[logging]");
    println!("  level              {}", config.logging.level);
    println!("  format             {}", config.logging.format);
    Ok(())
}
