use anyhow::Context;
use clap::Parser;

use hostwatch::cli::{config, serve, Cli, Commands, ConfigCommand};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => serve::execute(&args)
            .await
            .context("serve failed")?,
        Commands::Config(ConfigCommand::Validate(arg)) => config::execute_validate(&arg.config)
            .with_context(|| format!("invalid configuration: {}", arg.config.display()))?,
        Commands::Config(ConfigCommand::Show(arg)) => config::execute_show(&arg.config)
            .with_context(|| format!("invalid configuration: {}", arg.config.display()))?,
    }
    Ok(())
}
