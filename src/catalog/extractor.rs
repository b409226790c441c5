use crate::catalog::models::{
    Currency, ProductFamily, RateEntry, RateKind, RawCatalog, RegionPrices,
};
use crate::error::{rate_context, PricingError, Result};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Flatten a catalog into one `RateEntry` per region, type or tier, rate and currency
///
/// Both region shapes produce the same record type; tier prices take the
/// catalog default rate, type values their own rate (or the default when omitted).
/// Emission follows source order.
pub fn extract(catalog: &RawCatalog) -> Result<Vec<RateEntry>> {
    let family = match catalog.family() {
        Some(family) => family,
        None => return Ok(Vec::new()),
    };

    let mut entries = Vec::new();
    for region in &catalog.regions {
        match &region.prices {
            RegionPrices::Types(types) => {
                for t in types {
                    let (storage_type, footnote) = split_footnote(&t.name, &catalog.footnotes);
                    for value in &t.values {
                        let context = format!("{}/{}", region.region, storage_type);
                        let rate_kind =
                            resolve_rate(value.rate, catalog.default_rate, family, &context)?;
                        push_per_currency(
                            &mut entries,
                            &value.prices,
                            |currency, price| RateEntry {
                                region: region.region.clone(),
                                storage_type: storage_type.to_string(),
                                tier: None,
                                rate_kind,
                                prices: BTreeMap::from([(currency, price)]),
                                source_version: catalog.version,
                                footnote: footnote.clone(),
                            },
                        );
                    }
                }
            }
            RegionPrices::Tiers(tiers) => {
                for tier in tiers {
                    for st in &tier.storage_types {
                        let (storage_type, footnote) =
                            split_footnote(&st.storage_type, &catalog.footnotes);
                        if !catalog.value_columns.is_empty()
                            && !catalog.value_columns.iter().any(|c| c == storage_type)
                        {
                            warn!(
                                region = %region.region,
                                tier = %tier.name,
                                storage_type,
                                "Storage type is not listed in valueColumns"
                            );
                        }
                        let context = format!("{}/{}/{}", region.region, tier.name, storage_type);
                        let rate_kind = resolve_rate(None, catalog.default_rate, family, &context)?;
                        push_per_currency(
                            &mut entries,
                            &st.prices,
                            |currency, price| RateEntry {
                                region: region.region.clone(),
                                storage_type: storage_type.to_string(),
                                tier: Some(tier.name.clone()),
                                rate_kind,
                                prices: BTreeMap::from([(currency, price)]),
                                source_version: catalog.version,
                                footnote: footnote.clone(),
                            },
                        );
                    }
                }
            }
        }
    }

    debug!(
        version = %catalog.version,
        family = family.name(),
        entries = entries.len(),
        "Extracted rate entries"
    );
    Ok(entries)
}

fn push_per_currency<F>(entries: &mut Vec<RateEntry>, prices: &BTreeMap<Currency, Decimal>, build: F)
where
    F: Fn(Currency, Decimal) -> RateEntry,
{
    for (currency, price) in prices {
        entries.push(build(currency.clone(), *price));
    }
}

fn resolve_rate(
    own: Option<RateKind>,
    default: Option<RateKind>,
    family: ProductFamily,
    context: &str,
) -> Result<RateKind> {
    let kind = own.or(default).ok_or_else(|| {
        PricingError::malformed(format!(
            "{}: no rate given and the catalog declares no default rate",
            context
        ))
    })?;
    if !family.allows(kind) {
        return Err(PricingError::unknown_rate_kind(
            kind.as_str(),
            format!("{} at {}", rate_context(kind, family.name()), context),
        ));
    }
    Ok(kind)
}

/// Split a trailing footnote marker off a storage type id
///
/// `glacierStorage&dagger;` with footnote `&dagger;` -> (`glacierStorage`, label)
fn split_footnote<'a>(
    name: &'a str,
    footnotes: &BTreeMap<String, String>,
) -> (&'a str, Option<String>) {
    footnotes
        .iter()
        .filter(|(marker, _)| !marker.is_empty() && name.len() > marker.len())
        .filter_map(|(marker, label)| name.strip_suffix(marker.as_str()).map(|base| (base, label)))
        .min_by_key(|(base, _)| base.len())
        .map(|(base, label)| (base, Some(label.clone())))
        .unwrap_or((name, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::parser::parse;
    use std::str::FromStr;

    fn expected_count(catalog: &RawCatalog) -> usize {
        catalog
            .regions
            .iter()
            .map(|r| match &r.prices {
                RegionPrices::Types(types) => types
                    .iter()
                    .flat_map(|t| t.values.iter())
                    .map(|v| v.prices.len())
                    .sum::<usize>(),
                RegionPrices::Tiers(tiers) => tiers
                    .iter()
                    .flat_map(|t| t.storage_types.iter())
                    .map(|s| s.prices.len())
                    .sum::<usize>(),
            })
            .sum()
    }

    #[test]
    fn test_types_become_untiered_entries() {
        let catalog = parse(
            r#"callback({"vers":0.01,"config":{"currencies":["USD","EUR"],"rate":"perGB","regions":[
                {"region":"eu-west-1","types":[
                    {"name":"ebsPIOPSSSD","values":[
                        {"prices":{"USD":"0.138","EUR":"0.125"},"rate":"perGBmoProvStorage"},
                        {"prices":{"USD":"0.072"},"rate":"perPIOPSreq"}]}]}]}});"#,
        )
        .unwrap();
        let entries = extract(&catalog).unwrap();
        assert_eq!(entries.len(), expected_count(&catalog));
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.tier.is_none() && e.prices.len() == 1));
        assert_eq!(entries[2].rate_kind, RateKind::PerPiopsRequest);
        assert_eq!(
            entries[2].price(&Currency::usd()),
            Some(Decimal::from_str("0.072").unwrap())
        );
    }

    #[test]
    fn test_tiers_take_default_rate_and_tier_id() {
        let catalog = parse(
            r#"callback({"vers":0.01,"config":{"currencies":["USD"],"rate":"perGB","regions":[
                {"region":"eu-west-1","tiers":[{"name":"first50TBstorage","storageTypes":[
                    {"type":"storage","prices":{"USD":"0.022"}},
                    {"type":"glacierStorage","prices":{"USD":"0.004"}}]}]}]}});"#,
        )
        .unwrap();
        let entries = extract(&catalog).unwrap();
        assert_eq!(entries.len(), 2);
        for entry in &entries {
            assert_eq!(entry.rate_kind, RateKind::PerGb);
            assert_eq!(entry.tier.as_deref(), Some("first50TBstorage"));
        }
        assert_eq!(entries[0].storage_type, "storage");
        assert_eq!(entries[1].storage_type, "glacierStorage");
    }

    #[test]
    fn test_rate_outside_family_is_rejected() {
        // perGB is the EBS catalog default but not a block storage billing dimension
        let catalog = parse(
            r#"callback({"vers":0.01,"config":{"currencies":["USD"],"rate":"perGB","regions":[
                {"region":"eu-west-1","types":[{"name":"ebsGPSSD","values":[
                    {"prices":{"USD":"0.1"}}]}]}]}});"#,
        )
        .unwrap();
        match extract(&catalog) {
            Err(PricingError::UnknownRateKind { tag, .. }) => assert_eq!(tag, "perGB"),
            other => panic!("Expected UnknownRateKind, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_rate_without_default() {
        let catalog = parse(
            r#"callback({"vers":0.01,"config":{"currencies":["USD"],"regions":[
                {"region":"eu-west-1","tiers":[{"name":"first50TBstorage","storageTypes":[
                    {"type":"storage","prices":{"USD":"0.022"}}]}]}]}});"#,
        )
        .unwrap();
        assert!(matches!(extract(&catalog), Err(PricingError::MalformedCatalog(_))));
    }

    #[test]
    fn test_footnote_marker_is_resolved() {
        let catalog = parse(
            r#"callback({"vers":0.01,"config":{"currencies":["USD"],"rate":"perGB",
                "footnotes":{"&dagger;":"designed109Durable","&Dagger;":"designed49sDurable"},
                "regions":[{"region":"eu-west-1","tiers":[{"name":"first50TBstorage","storageTypes":[
                    {"type":"reducedRedundancyStorage&Dagger;","prices":{"USD":"0.024"}},
                    {"type":"storage","prices":{"USD":"0.022"}}]}]}]}});"#,
        )
        .unwrap();
        let entries = extract(&catalog).unwrap();
        assert_eq!(entries[0].storage_type, "reducedRedundancyStorage");
        assert_eq!(entries[0].footnote.as_deref(), Some("designed49sDurable"));
        assert_eq!(entries[1].footnote, None);
    }

    #[test]
    fn test_empty_regions_emit_nothing() {
        let catalog = parse(
            r#"callback({"vers":0.01,"config":{"currencies":["USD"],"rate":"perGB","regions":[
                {"region":"eu-central-1","types":[]}]}});"#,
        )
        .unwrap();
        assert!(extract(&catalog).unwrap().is_empty());
    }
}
