use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Describe all rate card metrics (can be called multiple times safely)
///
/// No exporter is installed by this crate; an embedding service that installs
/// a recorder gets these series, otherwise the calls are no-ops.
pub fn init_metric_descriptions() {
    describe_counter!(
        "ratecard_refresh_total",
        "Total number of successful rate card refreshes"
    );
    describe_counter!(
        "ratecard_refresh_failures_total",
        "Total number of aborted rate card refreshes"
    );
    describe_counter!(
        "ratecard_catalogs_ingested_total",
        "Total number of catalog payloads parsed and extracted"
    );
    describe_gauge!(
        "ratecard_entries",
        "Number of rate entries in the published rate card"
    );
    describe_gauge!(
        "ratecard_regions",
        "Number of regions known to the published rate card"
    );
    describe_histogram!(
        "ratecard_refresh_duration_seconds",
        "Time spent fetching, parsing and merging catalogs"
    );
}

/// Record a successful refresh and the size of the new card
pub fn record_refresh(entries: usize, regions: usize, duration: Duration) {
    counter!("ratecard_refresh_total").increment(1);
    gauge!("ratecard_entries").set(entries as f64);
    gauge!("ratecard_regions").set(regions as f64);
    histogram!("ratecard_refresh_duration_seconds").record(duration.as_secs_f64());
}

/// Record an aborted refresh
pub fn record_refresh_failure(error_kind: &'static str) {
    counter!("ratecard_refresh_failures_total", "error" => error_kind).increment(1);
}

/// Record one ingested catalog
pub fn record_catalog(source: &str, entries: usize) {
    counter!(
        "ratecard_catalogs_ingested_total",
        "source" => source.to_string(),
    )
    .increment(1);
    tracing::trace!(source, entries, "Catalog ingested");
}
