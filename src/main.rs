use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use ratecard::{config, init_tracing, metrics};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = cli::Cli::parse();
    let command = args.get_command();

    if let cli::Commands::Version = command {
        println!("ratecard v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Logging settings live in the config file, so it is loaded before tracing starts
    let cfg = config::load_config(&args.config)?;
    init_tracing(&cfg.logging.level, &cfg.logging.format);
    metrics::init_metric_descriptions();

    // Dispatch to appropriate command handler
    match command {
        cli::Commands::Check => commands::check::execute(&cfg).await?,
        cli::Commands::Regions => commands::query::regions(&cfg).await?,
        cli::Commands::Lookup {
            region,
            storage_type,
            tier,
        } => commands::query::lookup(&cfg, &region, &storage_type, tier.as_deref()).await?,
        cli::Commands::Rate {
            region,
            storage_type,
            rate_kind,
            tier,
            currency,
        } => {
            commands::query::rate(&cfg, &region, &storage_type, &rate_kind, tier.as_deref(), &currency)
                .await?
        }
        cli::Commands::Estimate {
            region,
            storage_type,
            size_gb,
            iops,
            tiered,
            currency,
        } => {
            commands::estimate::execute(
                &cfg,
                &region,
                &storage_type,
                &size_gb,
                &iops,
                tiered,
                &currency,
            )
            .await?
        }
        cli::Commands::Export { output } => commands::export::execute(&cfg, output).await?,
        cli::Commands::Watch { interval } => commands::watch::execute(&cfg, interval).await?,
        // Printed before the configuration is loaded
        cli::Commands::Version => {}
    }

    Ok(())
}
