use crate::catalog::models::{
    CatalogVersion, Currency, RateKind, RawCatalog, RawRegion, RawStorageType, RawTier, RawType,
    RawValue, RegionPrices,
};
use crate::error::{PricingError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::value::RawValue as JsonText;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, warn};

/// Catalog payload structure, as published behind the JSONP callback
#[derive(Debug, Deserialize)]
struct CatalogFile {
    vers: Option<Box<JsonText>>,
    config: Option<CatalogConfig>,
}

#[derive(Debug, Deserialize)]
struct CatalogConfig {
    #[serde(default)]
    currencies: Vec<String>,
    #[serde(default)]
    rate: Option<String>,
    #[serde(default, rename = "valueColumns")]
    value_columns: Vec<String>,
    #[serde(default)]
    footnotes: BTreeMap<String, String>,
    #[serde(default)]
    regions: Option<Vec<RegionData>>,
}

#[derive(Debug, Deserialize)]
struct RegionData {
    region: Option<String>,
    types: Option<Vec<TypeData>>,
    tiers: Option<Vec<TierData>>,
}

#[derive(Debug, Deserialize)]
struct TypeData {
    name: String,
    #[serde(default)]
    values: Vec<ValueData>,
}

#[derive(Debug, Deserialize)]
struct ValueData {
    #[serde(default)]
    prices: BTreeMap<String, Box<JsonText>>,
    #[serde(default)]
    rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TierData {
    name: String,
    #[serde(default, rename = "storageTypes")]
    storage_types: Vec<StorageTypeData>,
}

#[derive(Debug, Deserialize)]
struct StorageTypeData {
    #[serde(rename = "type")]
    storage_type: String,
    #[serde(default)]
    prices: BTreeMap<String, Box<JsonText>>,
}

/// Parse a JSONP catalog payload
pub fn parse(raw: &str) -> Result<RawCatalog> {
    let body = strip_jsonp(raw)?;
    let file: CatalogFile = serde_json::from_str(body)?;

    let version = file
        .vers
        .as_deref()
        .ok_or_else(|| PricingError::malformed("missing 'vers'"))
        .and_then(parse_version)?;
    let config = file
        .config
        .ok_or_else(|| PricingError::malformed("missing 'config'"))?;
    let regions_data = config
        .regions
        .ok_or_else(|| PricingError::malformed("missing 'config.regions'"))?;

    let mut currencies: Vec<Currency> = Vec::with_capacity(config.currencies.len());
    for code in &config.currencies {
        let currency = Currency::parse(code)?;
        if !currencies.contains(&currency) {
            currencies.push(currency);
        }
    }

    let default_rate = config
        .rate
        .as_deref()
        .map(|tag| parse_rate(tag, "catalog default rate"))
        .transpose()?;

    let mut regions = Vec::with_capacity(regions_data.len());
    for data in regions_data {
        let region = convert_region(data, &currencies)?;
        if let Some(first) = regions.first().map(|r: &RawRegion| r.prices.family()) {
            if first != region.prices.family() {
                return Err(PricingError::malformed(format!(
                    "region '{}' is {} shaped but the catalog is {} shaped",
                    region.region,
                    region.prices.family().name(),
                    first.name()
                )));
            }
        }
        regions.push(region);
    }

    debug!(
        version = %version,
        regions = regions.len(),
        currencies = currencies.len(),
        "Parsed pricing catalog"
    );

    Ok(RawCatalog {
        version,
        currencies,
        default_rate,
        value_columns: config.value_columns,
        footnotes: config.footnotes,
        regions,
    })
}

/// Strip the `callback(...)` wrapper, returning the JSON body
///
/// Leading JavaScript comments (the publisher's copyright banner) are skipped.
/// A trailing `;` after the closing parenthesis is accepted.
pub fn strip_jsonp(raw: &str) -> Result<&str> {
    let payload = skip_leading_comments(raw)?;

    let ident_len = payload
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.'))
        .unwrap_or(payload.len());
    if ident_len == 0 || payload.as_bytes()[0].is_ascii_digit() {
        return Err(PricingError::malformed("missing JSONP callback wrapper"));
    }

    let rest = payload[ident_len..].trim_start();
    let inner = rest
        .strip_prefix('(')
        .ok_or_else(|| PricingError::malformed("JSONP callback is not followed by '('"))?;

    let tail = inner.trim_end();
    let tail = tail.strip_suffix(';').unwrap_or(tail).trim_end();
    let body = tail
        .strip_suffix(')')
        .ok_or_else(|| PricingError::malformed("unbalanced JSONP wrapper, missing ')'"))?;

    Ok(body.trim())
}

fn skip_leading_comments(raw: &str) -> Result<&str> {
    let mut rest = raw.trim_start_matches('\u{feff}');
    loop {
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix("/*") {
            let end = after
                .find("*/")
                .ok_or_else(|| PricingError::malformed("unterminated comment before JSONP body"))?;
            rest = &after[end + 2..];
        } else if let Some(after) = rest.strip_prefix("//") {
            rest = after.find('\n').map(|end| &after[end + 1..]).unwrap_or("");
        } else {
            return Ok(rest);
        }
    }
}

fn convert_region(data: RegionData, currencies: &[Currency]) -> Result<RawRegion> {
    let region = data
        .region
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| PricingError::malformed("region without a 'region' code"))?;

    let prices = match (data.types, data.tiers) {
        (Some(types), None) => {
            let mut converted = Vec::with_capacity(types.len());
            for t in types {
                let mut values = Vec::with_capacity(t.values.len());
                for v in t.values {
                    let context = format!("{}/{}", region, t.name);
                    let rate = v
                        .rate
                        .as_deref()
                        .map(|tag| parse_rate(tag, &context))
                        .transpose()?;
                    values.push(RawValue {
                        prices: decode_prices(v.prices, currencies, &context)?,
                        rate,
                    });
                }
                converted.push(RawType {
                    name: t.name,
                    values,
                });
            }
            RegionPrices::Types(converted)
        }
        (None, Some(tiers)) => {
            let mut converted = Vec::with_capacity(tiers.len());
            for tier in tiers {
                let mut storage_types = Vec::with_capacity(tier.storage_types.len());
                for st in tier.storage_types {
                    let context = format!("{}/{}/{}", region, tier.name, st.storage_type);
                    storage_types.push(RawStorageType {
                        prices: decode_prices(st.prices, currencies, &context)?,
                        storage_type: st.storage_type,
                    });
                }
                converted.push(RawTier {
                    name: tier.name,
                    storage_types,
                });
            }
            RegionPrices::Tiers(converted)
        }
        (Some(_), Some(_)) => {
            return Err(PricingError::malformed(format!(
                "region '{}' declares both 'types' and 'tiers'",
                region
            )))
        }
        (None, None) => {
            return Err(PricingError::malformed(format!(
                "region '{}' has neither 'types' nor 'tiers'",
                region
            )))
        }
    };

    Ok(RawRegion { region, prices })
}

fn parse_rate(tag: &str, context: &str) -> Result<RateKind> {
    RateKind::from_str(tag).map_err(|_| PricingError::unknown_rate_kind(tag, context))
}

fn parse_version(raw: &JsonText) -> Result<CatalogVersion> {
    let revision = decode_decimal(raw)?
        .ok_or_else(|| PricingError::malformed(format!("invalid 'vers' value: {}", raw.get())))?;
    Ok(CatalogVersion::new(1, revision))
}

/// Decode a price map; placeholder prices (e.g. "N/A") are skipped
fn decode_prices(
    raw: BTreeMap<String, Box<JsonText>>,
    currencies: &[Currency],
    context: &str,
) -> Result<BTreeMap<Currency, Decimal>> {
    let mut prices = BTreeMap::new();
    for (code, value) in raw {
        let currency = Currency::parse(&code)?;
        if !currencies.is_empty() && !currencies.contains(&currency) {
            return Err(PricingError::malformed(format!(
                "{}: currency {} is not declared in 'currencies'",
                context, currency
            )));
        }
        let decoded = decode_decimal(&value).map_err(|err| match err {
            PricingError::MalformedCatalog(msg) => {
                PricingError::malformed(format!("{} {}: {}", context, currency, msg))
            }
            other => other,
        })?;
        match decoded {
            Some(price) => {
                prices.insert(currency, price);
            }
            None => warn!(context, currency = %currency, value = value.get(), "Skipping unparsable price"),
        }
    }
    Ok(prices)
}

/// Exact decimal from a JSON string or number, read from its source text
///
/// `Ok(None)` is a placeholder such as `"N/A"`. A numeric value the decimal
/// type cannot hold is malformed rather than skipped.
pub fn decode_decimal(raw: &JsonText) -> Result<Option<Decimal>> {
    let literal = raw.get().trim();
    let quoted = literal.starts_with('"');
    let text = if quoted {
        serde_json::from_str::<String>(literal)?
    } else if literal.starts_with(|c: char| c == '-' || c.is_ascii_digit()) {
        literal.to_string()
    } else {
        return Ok(None);
    };
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    if let Ok(value) = Decimal::from_str(text).or_else(|_| Decimal::from_scientific(text)) {
        return Ok(Some(value));
    }
    let numeric = !quoted
        || (text.parse::<f64>().is_ok() && text.bytes().any(|b| b.is_ascii_digit()));
    if numeric {
        Err(PricingError::malformed(format!(
            "price {} is outside the decimal range",
            literal
        )))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::models::ProductFamily;

    const EBS: &str = r#"callback({"vers":0.01,"config":{"currencies":["USD"],"rate":"perGB","regions":[
        {"region":"eu-west-1","types":[
            {"name":"ebsPIOPSSSD","values":[{"prices":{"USD":"0.138"},"rate":"perGBmoProvStorage"},
                                            {"prices":{"USD":"0.072"},"rate":"perPIOPSreq"}]}]},
        {"region":"us-east-1","types":[]}]}});"#;

    #[test]
    fn test_strip_jsonp_with_banner() {
        let raw = "/*\n * Copyright\n */\ncallback({\"a\":1});\n";
        assert_eq!(strip_jsonp(raw).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_strip_jsonp_line_comment_and_no_semicolon() {
        let raw = "// banner\n  cb ( {\"a\":1} )  ";
        assert_eq!(strip_jsonp(raw).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_strip_jsonp_rejects_bare_json() {
        let err = strip_jsonp("{\"vers\":1}").unwrap_err();
        assert!(matches!(err, PricingError::MalformedCatalog(_)));
    }

    #[test]
    fn test_strip_jsonp_rejects_unbalanced() {
        assert!(strip_jsonp("callback({\"vers\":1}").is_err());
        assert!(strip_jsonp("callback {\"vers\":1})").is_err());
        assert!(strip_jsonp("/* never closed callback({})").is_err());
    }

    #[test]
    fn test_parse_types_catalog() {
        let catalog = parse(EBS).unwrap();
        assert_eq!(catalog.version.revision, Decimal::from_str("0.01").unwrap());
        assert_eq!(catalog.currencies, vec![Currency::usd()]);
        assert_eq!(catalog.default_rate, Some(RateKind::PerGb));
        assert_eq!(catalog.family(), Some(ProductFamily::BlockStorage));
        assert_eq!(catalog.regions.len(), 2);
        assert!(catalog.regions[1].prices.is_empty());

        match &catalog.regions[0].prices {
            RegionPrices::Types(types) => {
                assert_eq!(types[0].name, "ebsPIOPSSSD");
                assert_eq!(types[0].values.len(), 2);
                assert_eq!(
                    types[0].values[0].prices[&Currency::usd()],
                    Decimal::from_str("0.138").unwrap()
                );
                assert_eq!(types[0].values[1].rate, Some(RateKind::PerPiopsRequest));
            }
            other => panic!("Expected types region, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_tiers_catalog() {
        let raw = r#"callback({"vers":0.01,"config":{"currencies":["USD"],"rate":"perGB",
            "valueColumns":["storage","glacierStorage"],
            "footnotes":{"&dagger;":"designed109Durable"},
            "regions":[{"region":"eu-west-1","tiers":[{"name":"first50TBstorage","storageTypes":[
                {"type":"storage","prices":{"USD":"0.022"}},
                {"type":"glacierStorage","prices":{"USD":"0.004"}}]}]}]}});"#;
        let catalog = parse(raw).unwrap();
        assert_eq!(catalog.family(), Some(ProductFamily::ObjectStorage));
        assert_eq!(catalog.value_columns, vec!["storage", "glacierStorage"]);
        assert_eq!(catalog.footnotes["&dagger;"], "designed109Durable");
        match &catalog.regions[0].prices {
            RegionPrices::Tiers(tiers) => {
                assert_eq!(tiers[0].name, "first50TBstorage");
                assert_eq!(tiers[0].storage_types[1].storage_type, "glacierStorage");
            }
            other => panic!("Expected tiers region, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_missing_version() {
        let err = parse(r#"callback({"config":{"regions":[]}});"#).unwrap_err();
        assert!(err.to_string().contains("vers"));
    }

    #[test]
    fn test_parse_missing_regions() {
        let err = parse(r#"callback({"vers":1,"config":{"currencies":["USD"]}});"#).unwrap_err();
        assert!(err.to_string().contains("config.regions"));
    }

    #[test]
    fn test_parse_region_without_shape() {
        let err = parse(r#"callback({"vers":1,"config":{"regions":[{"region":"eu-west-1"}]}});"#)
            .unwrap_err();
        assert!(matches!(err, PricingError::MalformedCatalog(_)));
    }

    #[test]
    fn test_parse_region_with_both_shapes() {
        let raw = r#"callback({"vers":1,"config":{"regions":[
            {"region":"eu-west-1","types":[],"tiers":[]}]}});"#;
        match parse(raw) {
            Err(PricingError::MalformedCatalog(msg)) => {
                assert!(msg.contains("eu-west-1"));
                assert!(msg.contains("both"));
            }
            other => panic!("Expected MalformedCatalog, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_mixed_shapes() {
        let raw = r#"callback({"vers":1,"config":{"regions":[
            {"region":"eu-west-1","types":[]},{"region":"eu-west-2","tiers":[]}]}});"#;
        assert!(matches!(parse(raw), Err(PricingError::MalformedCatalog(_))));
    }

    #[test]
    fn test_parse_unknown_rate_tag() {
        let raw = r#"callback({"vers":1,"config":{"currencies":["USD"],"regions":[
            {"region":"eu-west-1","types":[{"name":"ebsGPSSD","values":[
                {"prices":{"USD":"0.1"},"rate":"perFortnight"}]}]}]}});"#;
        match parse(raw) {
            Err(PricingError::UnknownRateKind { tag, context }) => {
                assert_eq!(tag, "perFortnight");
                assert_eq!(context, "eu-west-1/ebsGPSSD");
            }
            other => panic!("Expected UnknownRateKind, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_undeclared_currency() {
        let raw = r#"callback({"vers":1,"config":{"currencies":["USD"],"regions":[
            {"region":"eu-west-1","types":[{"name":"ebsGPSSD","values":[
                {"prices":{"EUR":"0.1"},"rate":"perGBmoProvStorage"}]}]}]}});"#;
        assert!(matches!(parse(raw), Err(PricingError::MalformedCatalog(_))));
    }

    fn text(literal: &str) -> Box<JsonText> {
        JsonText::from_string(literal.to_string()).unwrap()
    }

    #[test]
    fn test_decode_decimal_is_exact() {
        assert_eq!(decode_decimal(&text("\"0.138\"")).unwrap(), Some(Decimal::new(138, 3)));
        assert_eq!(decode_decimal(&text("0.1")).unwrap(), Some(Decimal::new(1, 1)));
        assert_eq!(decode_decimal(&text("2.5e-3")).unwrap(), Some(Decimal::new(25, 4)));
        assert_eq!(decode_decimal(&text("\"N/A\"")).unwrap(), None);
        assert_eq!(decode_decimal(&text("\" \"")).unwrap(), None);
        assert_eq!(decode_decimal(&text("null")).unwrap(), None);
    }

    #[test]
    fn test_number_price_keeps_all_digits() {
        let exact = Decimal::from_str("0.12345678901234567891").unwrap();
        assert_eq!(decode_decimal(&text("0.12345678901234567891")).unwrap(), Some(exact));

        let raw = r#"callback({"vers":1,"config":{"currencies":["USD"],"regions":[
            {"region":"eu-west-1","types":[{"name":"ebsGPSSD","values":[
                {"prices":{"USD":0.12345678901234567891},"rate":"perGBmoProvStorage"}]}]}]}});"#;
        let catalog = parse(raw).unwrap();
        match &catalog.regions[0].prices {
            RegionPrices::Types(types) => {
                assert_eq!(types[0].values[0].prices[&Currency::usd()], exact);
            }
            other => panic!("Expected types region, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_price_is_malformed() {
        assert!(matches!(
            decode_decimal(&text("1e30")),
            Err(PricingError::MalformedCatalog(_))
        ));
        assert!(matches!(
            decode_decimal(&text("\"1e30\"")),
            Err(PricingError::MalformedCatalog(_))
        ));

        let raw = r#"callback({"vers":1,"config":{"currencies":["USD"],"regions":[
            {"region":"eu-west-1","types":[{"name":"ebsGPSSD","values":[
                {"prices":{"USD":1e30},"rate":"perGBmoProvStorage"}]}]}]}});"#;
        match parse(raw) {
            Err(PricingError::MalformedCatalog(msg)) => {
                assert!(msg.contains("eu-west-1/ebsGPSSD"));
                assert!(msg.contains("1e30"));
            }
            other => panic!("Expected MalformedCatalog, got {:?}", other),
        }
    }

    #[test]
    fn test_unparsable_price_is_skipped() {
        let raw = r#"callback({"vers":1,"config":{"currencies":["USD","EUR"],"regions":[
            {"region":"eu-west-1","types":[{"name":"ebsGPSSD","values":[
                {"prices":{"USD":"0.1","EUR":"N/A"},"rate":"perGBmoProvStorage"}]}]}]}});"#;
        let catalog = parse(raw).unwrap();
        match &catalog.regions[0].prices {
            RegionPrices::Types(types) => {
                assert_eq!(types[0].values[0].prices.len(), 1);
            }
            other => panic!("Expected types region, got {:?}", other),
        }
    }
}
