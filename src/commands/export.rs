use super::load_service;
use anyhow::Result;
use colored::Colorize;
use ratecard::config::Config;
use std::path::PathBuf;

/// Execute the export command
pub async fn execute(cfg: &Config, output: Option<PathBuf>) -> Result<()> {
    let service = load_service(cfg).await?;

    match output {
        Some(path) => {
            service.save_cache(&path).await?;
            eprintln!(
                "{} {} ({} entries)",
                "✓ Rate card written to".green(),
                path.display(),
                service.current().len()
            );
        }
        None => {
            let card = service.current();
            println!("{}", serde_json::to_string_pretty(card.as_ref())?);
        }
    }
    Ok(())
}
