/// Integration tests for catalog ingestion over the bundled JSONP fixtures
use chrono::{TimeZone, Utc};
use ratecard::catalog::{
    extract, merge, parse, CatalogBatch, CatalogPayload, Currency, PricingService, RateCard,
    RateKind, RegionPolicy,
};
use ratecard::PricingError;
use rust_decimal::Decimal;
use std::str::FromStr;

const EBS_V1: &str = include_str!("fixtures/pricing-ebs-v1.js");
const EBS_V2: &str = include_str!("fixtures/pricing-ebs-v2.js");
const S3: &str = include_str!("fixtures/pricing-storage-s3.js");

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn batch(source: &str, raw: &str, generation: u32, secs: i64) -> CatalogBatch {
    let mut catalog = parse(raw).unwrap();
    catalog.version = catalog.version.with_generation(generation);
    CatalogBatch::from_catalog(source, &catalog, Utc.timestamp_opt(secs, 0).unwrap()).unwrap()
}

fn ebs_card() -> RateCard {
    merge(&[batch("ebs-v1", EBS_V1, 1, 100), batch("ebs-v2", EBS_V2, 2, 100)]).unwrap()
}

#[test]
fn test_fixture_entry_counts() {
    // 2 regions x (GP, PIOPS x2, TO, Cold, Snaps) x 1 currency
    assert_eq!(extract(&parse(EBS_V1).unwrap()).unwrap().len(), 12);
    assert_eq!(extract(&parse(EBS_V2).unwrap()).unwrap().len(), 12);
    // 2 regions x 3 tiers x 3 storage types
    assert_eq!(extract(&parse(S3).unwrap()).unwrap().len(), 18);
}

#[test]
fn test_higher_version_wins_for_ebs_fixtures() {
    let card = ebs_card();
    let usd = Currency::usd();

    let price = card
        .rate("eu-west-1", "ebsGPSSD", RateKind::PerGbMonthProvStorage, None, &usd)
        .unwrap();
    assert_eq!(price, dec("0.10"));

    let piops = card
        .rate("eu-west-2", "ebsPIOPSSSD", RateKind::PerPiopsRequest, None, &usd)
        .unwrap();
    assert_eq!(piops, dec("0.075"));
    assert_eq!(card.len(), 12);
}

#[test]
fn test_merge_order_does_not_matter() {
    let forward = ebs_card();
    let reverse =
        merge(&[batch("ebs-v2", EBS_V2, 2, 100), batch("ebs-v1", EBS_V1, 1, 100)]).unwrap();
    assert_eq!(forward, reverse);
}

#[test]
fn test_empty_regions_are_listed() {
    let card = ebs_card();
    let regions: Vec<&str> = card.list_regions().iter().map(String::as_str).collect();
    assert_eq!(regions, vec!["eu-central-1", "eu-west-1", "eu-west-2", "us-east-1"]);

    assert!(card.lookup("us-east-1", "ebsGPSSD", None).is_empty());
    assert!(card.lookup("eu-central-1", "anything", None).is_empty());
}

#[test]
fn test_query_errors() {
    let card = ebs_card();

    let result = card.rate(
        "eu-west-1",
        "ebsGPSSD",
        RateKind::PerPiopsRequest,
        None,
        &Currency::usd(),
    );
    assert!(matches!(result, Err(PricingError::UnknownRate(_))));

    let result = card.rate(
        "us-east-1",
        "ebsGPSSD",
        RateKind::PerGbMonthProvStorage,
        None,
        &Currency::usd(),
    );
    assert!(matches!(result, Err(PricingError::UnknownRate(_))));

    let result = card.rate(
        "eu-west-1",
        "ebsGPSSD",
        RateKind::PerGbMonthProvStorage,
        None,
        &Currency::parse("EUR").unwrap(),
    );
    assert!(matches!(result, Err(PricingError::UnsupportedCurrency { .. })));
}

#[test]
fn test_s3_tier_exposes_three_storage_types() {
    let card = merge(&[batch("s3", S3, 1, 100)]).unwrap();

    let mut types: Vec<&str> = card
        .lookup_tier("eu-west-1", "first50TBstorage")
        .into_iter()
        .map(|e| {
            assert_eq!(e.tier.as_deref(), Some("first50TBstorage"));
            assert_eq!(e.rate_kind, RateKind::PerGb);
            e.storage_type.as_str()
        })
        .collect();
    types.sort();
    assert_eq!(types, vec!["glacierStorage", "infrequentAccessStorage", "storage"]);

    let glacier = card
        .rate(
            "eu-west-1",
            "glacierStorage",
            RateKind::PerGb,
            Some("first50TBstorage"),
            &Currency::usd(),
        )
        .unwrap();
    assert_eq!(glacier, dec("0.004"));

    assert_eq!(card.footnotes().get("&dagger;").map(String::as_str), Some("designed109Durable"));
}

#[test]
fn test_rate_card_json_round_trip() {
    let card = merge(&[
        batch("ebs-v1", EBS_V1, 1, 100),
        batch("ebs-v2", EBS_V2, 2, 100),
        batch("s3", S3, 1, 100),
    ])
    .unwrap();

    let json = serde_json::to_string(&card).unwrap();
    let restored: RateCard = serde_json::from_str(&json).unwrap();

    assert_eq!(restored, card);
    for entry in card.entries() {
        let found = restored.lookup(&entry.region, &entry.storage_type, entry.tier.as_deref());
        assert!(found.contains(&entry));
    }
}

#[test]
fn test_merging_fixture_twice_is_idempotent() {
    let once = merge(&[batch("ebs-v1", EBS_V1, 1, 100)]).unwrap();
    let twice = merge(&[batch("ebs-v1", EBS_V1, 1, 100), batch("ebs-v1", EBS_V1, 1, 100)]).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_same_generation_conflict_is_ambiguous() {
    let result = merge(&[batch("ebs-v1", EBS_V1, 1, 100), batch("ebs-v2", EBS_V2, 1, 100)]);
    assert!(matches!(result, Err(PricingError::AmbiguousRate { .. })));
}

#[tokio::test]
async fn test_service_ingests_fixtures_in_parallel() {
    let service = PricingService::new(RegionPolicy::default());
    let report = service
        .refresh_payloads(vec![
            CatalogPayload::new("ebs-v1", 1, EBS_V1),
            CatalogPayload::new("ebs-v2", 2, EBS_V2),
            CatalogPayload::new("s3", 1, S3),
        ])
        .await
        .unwrap();

    assert_eq!(report.catalogs, 3);
    assert_eq!(report.regions, 4);
    assert_eq!(report.entries, 12 + 18);

    let card = service.current();
    assert_eq!(card.storage_types("eu-west-1").len(), 5 + 3);
    assert_eq!(
        card.tiers("eu-west-1", "storage"),
        vec!["first50TBstorage", "next450TBstorage", "over500TBstorage"]
    );
}
