use super::load_service;
use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use ratecard::catalog::{Currency, RateEntry, RateKind};
use ratecard::config::Config;

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header.iter().map(|h| Cell::new(h).fg(Color::Cyan)).collect::<Vec<_>>());
    table
}

fn format_prices(entry: &RateEntry) -> String {
    entry
        .prices
        .iter()
        .map(|(currency, price)| format!("{} {}", price, currency))
        .collect::<Vec<_>>()
        .join(", ")
}

/// List regions with their priced storage types
pub async fn regions(cfg: &Config) -> Result<()> {
    let service = load_service(cfg).await?;
    let card = service.current();

    let mut table = new_table(&["REGION", "STORAGE TYPES", "ENTRIES"]);
    for region in card.list_regions() {
        let types = card.storage_types(region);
        let entries = card.entries().filter(|e| &e.region == region).count();
        let types_cell = if types.is_empty() {
            Cell::new("no published pricing").fg(Color::DarkGrey)
        } else {
            Cell::new(types.into_iter().collect::<Vec<_>>().join(", "))
        };
        table.add_row(vec![Cell::new(region), types_cell, Cell::new(entries)]);
    }

    println!("{table}");
    println!("{} regions, {} entries", card.list_regions().len(), card.len());
    Ok(())
}

/// Show every rate for a (region, storage type, tier)
pub async fn lookup(
    cfg: &Config,
    region: &str,
    storage_type: &str,
    tier: Option<&str>,
) -> Result<()> {
    let service = load_service(cfg).await?;
    let card = service.current();

    let entries = card.lookup(region, storage_type, tier);
    if entries.is_empty() {
        if !card.has_region(region) {
            anyhow::bail!("Unknown region '{}'", region);
        }
        let tiers = card.tiers(region, storage_type);
        if tier.is_none() && !tiers.is_empty() {
            println!(
                "{} is tiered in {}, pass --tier with one of: {}",
                storage_type,
                region,
                tiers.join(", ")
            );
        } else {
            println!(
                "{}",
                format!("No published pricing for {} in {}", storage_type, region).yellow()
            );
        }
        return Ok(());
    }

    let mut table = new_table(&["RATE", "PRICES", "VERSION", "FOOTNOTE"]);
    for entry in entries {
        table.add_row(vec![
            Cell::new(entry.rate_kind),
            Cell::new(format_prices(entry)),
            Cell::new(entry.source_version),
            Cell::new(entry.footnote.as_deref().unwrap_or("-")),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Print a single price
pub async fn rate(
    cfg: &Config,
    region: &str,
    storage_type: &str,
    rate_kind: &str,
    tier: Option<&str>,
    currency: &str,
) -> Result<()> {
    let rate_kind: RateKind = rate_kind.parse()?;
    let currency = Currency::parse(currency)?;

    let service = load_service(cfg).await?;
    let price = service
        .current()
        .rate(region, storage_type, rate_kind, tier, &currency)
        .with_context(|| format!("No price for {} {} in {}", storage_type, rate_kind, region))?;

    println!("{} {}", price, currency);
    Ok(())
}
