use crate::catalog::models::RawCatalog;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

/// Region renaming and filtering applied between parsing and extraction
///
/// Some catalogs still publish legacy region names; `aliases` maps them to
/// current region codes. When `enabled` is set, only matching regions are kept.
#[derive(Debug, Clone, Default)]
pub struct RegionPolicy {
    aliases: HashMap<String, String>,
    enabled: Option<Regex>,
}

impl RegionPolicy {
    pub fn new(aliases: HashMap<String, String>, enabled: Option<Regex>) -> Self {
        Self { aliases, enabled }
    }

    /// Resolve a region code through the alias table
    pub fn canonical<'a>(&'a self, region: &'a str) -> &'a str {
        self.aliases.get(region).map(String::as_str).unwrap_or(region)
    }

    pub fn is_enabled(&self, region: &str) -> bool {
        self.enabled
            .as_ref()
            .map(|pattern| pattern.is_match(region))
            .unwrap_or(true)
    }

    /// Rename aliased regions, then drop disabled ones
    pub fn apply(&self, mut catalog: RawCatalog) -> RawCatalog {
        let before = catalog.regions.len();
        for region in &mut catalog.regions {
            let current = self.canonical(&region.region).to_string();
            if current != region.region {
                debug!(from = %region.region, to = %current, "Renaming catalog region");
                region.region = current;
            }
        }
        catalog.regions.retain(|r| self.is_enabled(&r.region));

        if catalog.regions.len() != before {
            debug!(
                kept = catalog.regions.len(),
                dropped = before - catalog.regions.len(),
                "Filtered catalog regions"
            );
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::parser::parse;

    const CATALOG: &str = r#"callback({"vers":0.01,"config":{"currencies":["USD"],"rate":"perGB","regions":[
        {"region":"eu-ireland","types":[]},
        {"region":"eu-west-2","types":[]},
        {"region":"us-east-1","types":[]}]}});"#;

    #[test]
    fn test_default_policy_is_identity() {
        let catalog = parse(CATALOG).unwrap();
        let applied = RegionPolicy::default().apply(catalog.clone());
        assert_eq!(applied, catalog);
    }

    #[test]
    fn test_aliases_and_filter() {
        let policy = RegionPolicy::new(
            HashMap::from([("eu-ireland".to_string(), "eu-west-1".to_string())]),
            Some(Regex::new("^eu-").unwrap()),
        );
        let applied = policy.apply(parse(CATALOG).unwrap());
        let regions: Vec<&str> = applied.regions.iter().map(|r| r.region.as_str()).collect();
        assert_eq!(regions, vec!["eu-west-1", "eu-west-2"]);
        assert_eq!(policy.canonical("eu-ireland"), "eu-west-1");
        assert_eq!(policy.canonical("us-east-1"), "us-east-1");
        assert!(!policy.is_enabled("us-east-1"));
    }
}
