use anyhow::Result;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use ratecard::catalog::{build_sources, PricingService};
use ratecard::config::Config;
use tracing::info;

/// Execute the check command
///
/// Fetches and ingests every enabled catalog without touching the cache.
pub async fn execute(cfg: &Config) -> Result<()> {
    println!("{}", "Checking catalogs...");
    info!("Ingesting configured catalogs");

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("CATALOG").fg(Color::Cyan),
        Cell::new("LOCATION").fg(Color::Cyan),
        Cell::new("GENERATION").fg(Color::Cyan),
        Cell::new("STATUS").fg(Color::Cyan),
    ]);
    for catalog in &cfg.catalogs {
        let status = if catalog.enabled {
            Cell::new("enabled").fg(Color::Green)
        } else {
            Cell::new("disabled").fg(Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(&catalog.name),
            Cell::new(&catalog.location),
            Cell::new(catalog.generation),
            status,
        ]);
    }
    println!("{table}");

    let service = PricingService::new(cfg.to_region_policy()?);
    let sources = build_sources(&cfg.catalogs)?;
    let report = match service.refresh(&sources).await {
        Ok(report) => report,
        Err(e) => {
            println!("{} {}", "✗ Catalog check failed:".red(), e);
            return Err(e.into());
        }
    };

    println!("{}", "✓ Catalogs ingested successfully".green());
    println!();

    let card = service.current();
    println!("{}", "Rate Card Summary:");
    println!("  {}: {}", "Catalogs", report.catalogs);
    println!("  {}: {}", "Regions", report.regions);
    println!("  {}: {}", "Entries", report.entries);
    println!(
        "  {}: {}",
        "Currencies",
        card.currencies()
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  {}: {:?}", "Elapsed", report.duration);

    if !card.footnotes().is_empty() {
        println!();
        println!("{}", "Footnotes:");
        for (marker, label) in card.footnotes() {
            println!("    {} → {}", marker, label);
        }
    }

    let unpriced: Vec<&str> = card
        .list_regions()
        .iter()
        .filter(|region| card.storage_types(region).is_empty())
        .map(String::as_str)
        .collect();
    if !unpriced.is_empty() {
        println!();
        println!(
            "  {}: {}",
            "Regions without pricing".yellow(),
            unpriced.join(", ")
        );
    }

    info!("Catalog check completed successfully");
    Ok(())
}
