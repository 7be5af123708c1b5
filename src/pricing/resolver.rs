//! Price Resolver - tiered fallback for market prices
//!
//! 1. Live: current-day records for state/district/commodity, alias by alias.
//!    The first alias with a usable record wins.
//! 2. Seasonal average: historical records for state/commodity, restricted
//!    to the current month ±1 (wrapping at the year boundary); the mean of
//!    positive modal prices becomes the quote.
//! 3. Default: the crop's placeholder price from the catalog.
//!
//! Upstream errors are logged and treated as "no data" for that alias. With
//! no configured source the chain goes straight to tier 3. Resolution
//! always returns a quote tagged with the tier that produced it.

use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;

use super::source::{HistoricalRecord, LiveRecord, MarketPriceSource};
use crate::catalog::CropCatalog;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuery {
    pub state: String,
    pub district: String,
    pub crop: String,
    /// Commodity names tried in order
    pub candidate_api_names: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceTier {
    Live,
    SeasonalAverage,
    Default,
}

impl PriceTier {
    /// Label shown to API clients
    pub fn label(&self) -> &'static str {
        match self {
            PriceTier::Live => "Live API",
            PriceTier::SeasonalAverage => "Recent Average API",
            PriceTier::Default => "Default (placeholder)",
        }
    }

    /// False for the synthesized placeholder
    pub fn is_market_data(&self) -> bool {
        !matches!(self, PriceTier::Default)
    }
}

/// Prices per quintal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    pub modal_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub market: Option<String>,
    pub source_tier: PriceTier,
}

impl PriceQuote {
    fn flat(price: f64, source_tier: PriceTier) -> Self {
        Self {
            modal_price: price,
            min_price: price,
            max_price: price,
            market: None,
            source_tier,
        }
    }

    /// Midpoint of the min/max range
    pub fn average_price(&self) -> f64 {
        (self.min_price + self.max_price) / 2.0
    }
}

pub struct PriceResolver {
    source: Option<Arc<dyn MarketPriceSource>>,
    catalog: Arc<CropCatalog>,
}

impl PriceResolver {
    /// `source` is None when no API credential is configured
    pub fn new(source: Option<Arc<dyn MarketPriceSource>>, catalog: Arc<CropCatalog>) -> Self {
        Self { source, catalog }
    }

    pub fn has_credential(&self) -> bool {
        self.source.is_some()
    }

    /// Build the query with the catalog's commodity aliases for `crop`
    pub fn query_for(&self, state: &str, district: &str, crop: &str) -> PriceQuery {
        PriceQuery {
            state: state.trim().to_string(),
            district: district.trim().to_string(),
            crop: crop.trim().to_string(),
            candidate_api_names: self.catalog.price_aliases(crop),
        }
    }

    pub async fn resolve(&self, query: &PriceQuery) -> PriceQuote {
        self.resolve_on(query, Local::now().date_naive()).await
    }

    /// Resolve as if today were `today` (drives the seasonal window)
    pub async fn resolve_on(&self, query: &PriceQuery, today: NaiveDate) -> PriceQuote {
        let Some(source) = self.source.as_deref() else {
            tracing::debug!("No price API credential; using placeholder for '{}'", query.crop);
            return self.default_quote(query);
        };

        if let Some(quote) = live_tier(source, query).await {
            return quote;
        }

        if let Some(quote) = seasonal_tier(source, query, today.month()).await {
            return quote;
        }

        tracing::info!(
            "No market price for '{}' in {}/{}; using placeholder",
            query.crop, query.state, query.district
        );
        self.default_quote(query)
    }

    fn default_quote(&self, query: &PriceQuery) -> PriceQuote {
        PriceQuote::flat(self.catalog.fallback_price(&query.crop), PriceTier::Default)
    }
}

async fn live_tier(source: &dyn MarketPriceSource, query: &PriceQuery) -> Option<PriceQuote> {
    for alias in &query.candidate_api_names {
        tracing::debug!("[Live] Checking '{}'", alias);
        match source.live_records(&query.state, &query.district, alias).await {
            Ok(records) => {
                if let Some(quote) = records.iter().find_map(live_quote) {
                    tracing::info!("[Live] Found price for '{}'", alias);
                    return Some(quote);
                }
                tracing::debug!("[Live] No usable records for '{}'", alias);
            }
            Err(e) => tracing::warn!("[Live] Request for '{}' failed: {}", alias, e),
        }
    }
    None
}

async fn seasonal_tier(
    source: &dyn MarketPriceSource,
    query: &PriceQuery,
    current_month: u32,
) -> Option<PriceQuote> {
    for alias in &query.candidate_api_names {
        tracing::debug!("[Seasonal] Checking '{}'", alias);
        match source.historical_records(&query.state, alias).await {
            Ok(records) => {
                if let Some(average) = seasonal_average(&records, current_month) {
                    tracing::info!("[Seasonal] Average price for '{}': {:.2}", alias, average);
                    return Some(PriceQuote::flat(average, PriceTier::SeasonalAverage));
                }
                tracing::debug!("[Seasonal] No in-season records for '{}'", alias);
            }
            Err(e) => tracing::warn!("[Seasonal] Request for '{}' failed: {}", alias, e),
        }
    }
    None
}

/// Usable when min and max are present; modal falls back to the midpoint
fn live_quote(record: &LiveRecord) -> Option<PriceQuote> {
    let min_price = record.min_price?;
    let max_price = record.max_price?;
    Some(PriceQuote {
        modal_price: record.modal_price.unwrap_or((min_price + max_price) / 2.0),
        min_price,
        max_price,
        market: record.market.clone(),
        source_tier: PriceTier::Live,
    })
}

/// Previous, current and next month (1-12), wrapping at the year boundary
pub fn seasonal_months(current_month: u32) -> [u32; 3] {
    let month = (current_month + 11) % 12 + 1;
    [
        (month + 10) % 12 + 1,
        month,
        month % 12 + 1,
    ]
}

/// Dated records that fall inside the seasonal window
pub fn seasonal_records(records: &[HistoricalRecord], current_month: u32) -> Vec<&HistoricalRecord> {
    let months = seasonal_months(current_month);
    records
        .iter()
        .filter(|r| r.price_date.is_some_and(|d| months.contains(&d.month())))
        .collect()
}

/// Mean positive modal price of in-season records
pub fn seasonal_average(records: &[HistoricalRecord], current_month: u32) -> Option<f64> {
    let prices: Vec<f64> = seasonal_records(records, current_month)
        .into_iter()
        .filter_map(|r| r.modal_price)
        .filter(|p| *p > 0.0)
        .collect();

    if prices.is_empty() {
        None
    } else {
        Some(prices.iter().sum::<f64>() / prices.len() as f64)
    }
}
