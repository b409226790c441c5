use super::load_service;
use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Color, ContentArrangement, Table};
use ratecard::catalog::{CostCalculator, Currency};
use ratecard::config::Config;
use rust_decimal::Decimal;
use std::str::FromStr;

fn parse_quantity(value: &str, name: &str) -> Result<Decimal> {
    let quantity = Decimal::from_str(value)
        .with_context(|| format!("Invalid {}: '{}'", name, value))?;
    if quantity.is_sign_negative() {
        anyhow::bail!("{} cannot be negative", name);
    }
    Ok(quantity)
}

/// Execute the estimate command
pub async fn execute(
    cfg: &Config,
    region: &str,
    storage_type: &str,
    size_gb: &str,
    iops: &str,
    tiered: bool,
    currency: &str,
) -> Result<()> {
    let size_gb = parse_quantity(size_gb, "size")?;
    let iops = parse_quantity(iops, "IOPS")?;
    let currency = Currency::parse(currency)?;

    let service = load_service(cfg).await?;
    let calculator = CostCalculator::new(service.current());

    let breakdown = if tiered {
        calculator.tiered_monthly(region, storage_type, size_gb, &currency)?
    } else {
        calculator.volume_monthly(region, storage_type, size_gb, iops, &currency)?
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("RATE").fg(Color::Cyan),
        Cell::new("TIER").fg(Color::Cyan),
        Cell::new("QUANTITY").fg(Color::Cyan),
        Cell::new("UNIT PRICE").fg(Color::Cyan),
        Cell::new("COST").fg(Color::Cyan),
    ]);
    for line in &breakdown.lines {
        table.add_row(vec![
            Cell::new(line.rate_kind),
            Cell::new(line.tier.as_deref().unwrap_or("-")),
            Cell::new(line.quantity).set_alignment(CellAlignment::Right),
            Cell::new(line.unit_price).set_alignment(CellAlignment::Right),
            Cell::new(line.cost.round_dp(4)).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{table}");
    println!(
        "{} {} {}",
        "Estimated monthly cost:".green().bold(),
        breakdown.total.round_dp(2),
        breakdown.currency
    );
    Ok(())
}
