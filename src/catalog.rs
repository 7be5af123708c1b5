//! Crop Catalog - static per-crop reference data
//!
//! Loaded once from `crop_data.json` at startup and shared read-only. Each
//! entry carries the commodity names used by the market-price dataset, the
//! estimated cultivation cost, and sustainability ratings on a 0-10 scale
//! where a higher rating means a worse outcome.
//!
//! The sentinel "Default" entry backs every lookup for a crop the catalog
//! does not know about.

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::utils::display_label;

/// Key of the sentinel profile used for unknown crops
pub const DEFAULT_PROFILE_KEY: &str = "Default";

/// Sustainability ratings (0 = best, 10 = worst)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SustainabilityRatings {
    #[serde(rename = "water_usage_rating")]
    pub water: f64,
    #[serde(rename = "pesticide_rating")]
    pub pesticide: f64,
    #[serde(rename = "soil_health_impact")]
    pub soil_health: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropProfile {
    /// Commodity names tried in order against the market-price dataset
    #[serde(default)]
    pub api_names: Vec<String>,
    pub estimated_cost_per_hectare: f64,
    #[serde(default, rename = "yield_tons_per_hectare_range")]
    pub yield_range: [f64; 2],
    pub sustainability: SustainabilityRatings,
    /// Placeholder price (per quintal) used when no market data is available
    #[serde(default)]
    pub fallback_price_per_quintal: Option<f64>,
}

/// One row of the `/api/crops` listing
#[derive(Debug, Clone, Serialize)]
pub struct CropListing {
    pub value: String,
    pub label: String,
    pub api_names: Vec<String>,
    pub cost_per_hectare: f64,
    pub yield_range: [f64; 2],
    pub sustainability: SustainabilityRatings,
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    key: String,
    profile: CropProfile,
}

#[derive(Debug, Clone)]
pub struct CropCatalog {
    /// Lower-cased crop key → entry (the Default profile is kept apart)
    entries: FxHashMap<String, CatalogEntry>,
    default: CropProfile,
}

impl CropCatalog {
    /// Load and validate the catalog from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read crop catalog: {:?}", path))?;
        Self::from_json_str(&contents)
            .with_context(|| format!("Invalid crop catalog: {:?}", path))
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        let raw: FxHashMap<String, CropProfile> = serde_json::from_str(contents)
            .with_context(|| "Failed to parse crop catalog JSON")?;
        Self::from_profiles(raw)
    }

    /// Build from already-parsed profiles; the map must contain "Default"
    pub fn from_profiles(profiles: FxHashMap<String, CropProfile>) -> Result<Self> {
        let mut default = None;
        let mut entries = FxHashMap::default();

        for (key, profile) in profiles {
            validate_profile(&key, &profile)?;

            if key.eq_ignore_ascii_case(DEFAULT_PROFILE_KEY) {
                default = Some(profile);
                continue;
            }

            let folded = key.trim().to_lowercase();
            if entries.contains_key(&folded) {
                anyhow::bail!("Duplicate crop key '{}' (keys are case-insensitive)", key);
            }
            entries.insert(folded, CatalogEntry { key, profile });
        }

        let default = default
            .ok_or_else(|| anyhow::anyhow!("Crop catalog has no '{}' entry", DEFAULT_PROFILE_KEY))?;
        if default.fallback_price_per_quintal.is_none() {
            anyhow::bail!(
                "'{}' profile must define fallback_price_per_quintal",
                DEFAULT_PROFILE_KEY
            );
        }

        Ok(Self { entries, default })
    }

    /// Number of real crops (the Default sentinel is not counted)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Case-insensitive lookup of a known crop
    pub fn lookup(&self, crop: &str) -> Option<&CropProfile> {
        self.entries
            .get(&crop.trim().to_lowercase())
            .map(|entry| &entry.profile)
    }

    pub fn default_profile(&self) -> &CropProfile {
        &self.default
    }

    /// Profile for `crop`, or the Default profile when the crop is unknown
    pub fn profile_or_default(&self, crop: &str) -> &CropProfile {
        self.lookup(crop).unwrap_or(&self.default)
    }

    /// Commodity aliases for the price dataset
    ///
    /// Unknown crops, and known crops without aliases, are queried by the
    /// name the caller supplied.
    pub fn price_aliases(&self, crop: &str) -> Vec<String> {
        match self.lookup(crop) {
            Some(profile) if !profile.api_names.is_empty() => profile.api_names.clone(),
            _ => vec![crop.trim().to_string()],
        }
    }

    /// Placeholder price for `crop`, falling back to the Default profile's value
    pub fn fallback_price(&self, crop: &str) -> f64 {
        self.lookup(crop)
            .and_then(|profile| profile.fallback_price_per_quintal)
            .or(self.default.fallback_price_per_quintal)
            .unwrap_or_default()
    }

    /// All crops except the Default sentinel, sorted by display label
    pub fn listing(&self) -> Vec<CropListing> {
        let mut crops: Vec<CropListing> = self
            .entries
            .values()
            .map(|entry| CropListing {
                value: entry.key.clone(),
                label: display_label(&entry.key),
                api_names: entry.profile.api_names.clone(),
                cost_per_hectare: entry.profile.estimated_cost_per_hectare,
                yield_range: entry.profile.yield_range,
                sustainability: entry.profile.sustainability,
            })
            .collect();

        crops.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.value.cmp(&b.value)));
        crops
    }
}

fn validate_profile(key: &str, profile: &CropProfile) -> Result<()> {
    let cost = profile.estimated_cost_per_hectare;
    if !cost.is_finite() || cost < 0.0 {
        anyhow::bail!("Crop '{}' has invalid estimated_cost_per_hectare: {}", key, cost);
    }

    let ratings = profile.sustainability;
    for (name, value) in [
        ("water_usage_rating", ratings.water),
        ("pesticide_rating", ratings.pesticide),
        ("soil_health_impact", ratings.soil_health),
    ] {
        if !(0.0..=10.0).contains(&value) {
            anyhow::bail!("Crop '{}' has {} outside 0-10: {}", key, name, value);
        }
    }

    if let Some(price) = profile.fallback_price_per_quintal {
        if !price.is_finite() || price <= 0.0 {
            anyhow::bail!("Crop '{}' has invalid fallback_price_per_quintal: {}", key, price);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "rice": {
            "api_names": ["Paddy(Dhan)(Common)", "Rice"],
            "estimated_cost_per_hectare": 45000,
            "yield_tons_per_hectare_range": [3.0, 4.5],
            "sustainability": {"water_usage_rating": 9, "pesticide_rating": 6, "soil_health_impact": 5}
        },
        "kidney_beans": {
            "api_names": [],
            "estimated_cost_per_hectare": 30000,
            "sustainability": {"water_usage_rating": 4, "pesticide_rating": 4, "soil_health_impact": 2},
            "fallback_price_per_quintal": 9000
        },
        "apple": {
            "api_names": ["Apple"],
            "estimated_cost_per_hectare": 250000,
            "sustainability": {"water_usage_rating": 6, "pesticide_rating": 8, "soil_health_impact": 4}
        },
        "Default": {
            "estimated_cost_per_hectare": 40000,
            "sustainability": {"water_usage_rating": 5, "pesticide_rating": 5, "soil_health_impact": 5},
            "fallback_price_per_quintal": 2500
        }
    }"#;

    fn catalog() -> CropCatalog {
        CropCatalog::from_json_str(SAMPLE).unwrap()
    }

    #[test]
    fn test_listing_excludes_default_and_is_sorted() {
        let listing = catalog().listing();
        let labels: Vec<&str> = listing.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Apple", "Kidney Beans", "Rice"]);
        assert!(listing.iter().all(|c| c.value != DEFAULT_PROFILE_KEY));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = catalog();
        assert!(catalog.lookup("RICE").is_some());
        assert!(catalog.lookup(" Rice ").is_some());
        assert!(catalog.lookup("mango").is_none());
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_unknown_crop_uses_default_profile() {
        let catalog = catalog();
        let profile = catalog.profile_or_default("dragonfruit");
        assert_eq!(profile.estimated_cost_per_hectare, 40000.0);
    }

    #[test]
    fn test_price_aliases() {
        let catalog = catalog();
        assert_eq!(
            catalog.price_aliases("rice"),
            vec!["Paddy(Dhan)(Common)".to_string(), "Rice".to_string()]
        );
        // Known crop with no aliases and unknown crop both use the raw name
        assert_eq!(catalog.price_aliases("kidney_beans"), vec!["kidney_beans".to_string()]);
        assert_eq!(catalog.price_aliases("Dragonfruit"), vec!["Dragonfruit".to_string()]);
    }

    #[test]
    fn test_fallback_price_prefers_crop_value() {
        let catalog = catalog();
        assert_eq!(catalog.fallback_price("kidney_beans"), 9000.0);
        assert_eq!(catalog.fallback_price("rice"), 2500.0);
        assert_eq!(catalog.fallback_price("unknown"), 2500.0);
    }

    #[test]
    fn test_missing_default_is_rejected() {
        let json = r#"{"rice": {"estimated_cost_per_hectare": 1,
            "sustainability": {"water_usage_rating": 1, "pesticide_rating": 1, "soil_health_impact": 1}}}"#;
        assert!(CropCatalog::from_json_str(json).is_err());
    }

    #[test]
    fn test_out_of_range_rating_is_rejected() {
        let json = r#"{"Default": {"estimated_cost_per_hectare": 1, "fallback_price_per_quintal": 100,
            "sustainability": {"water_usage_rating": 11, "pesticide_rating": 1, "soil_health_impact": 1}}}"#;
        let err = CropCatalog::from_json_str(json).unwrap_err();
        assert!(format!("{:#}", err).contains("water_usage_rating"));
    }

    #[test]
    fn test_bundled_catalog_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/crop_data.json");
        let catalog = CropCatalog::load(&path).unwrap();
        assert!(catalog.len() >= 20);
        assert!(catalog.lookup("rice").is_some());
    }
}
