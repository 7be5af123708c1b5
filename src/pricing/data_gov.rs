//! Thin asynchronous client for the data.gov.in mandi price datasets.
//!
//! - Live prices: current-day records per state/district/commodity.
//! - Historical prices: multi-year records per state/commodity, used for
//!   seasonal averages.
//!
//! The API key travels in the query string, so request errors are stored
//! without their URL.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;

use super::source::{HistoricalRecord, LiveRecord, MarketPriceSource, PriceSourceError};

pub const DEFAULT_BASE_URL: &str = "https://api.data.gov.in/resource/";
/// Current daily prices from various markets (mandis)
pub const LIVE_RESOURCE_ID: &str = "9ef84268-d588-465a-a308-a864a43d0070";
/// Variety-wise daily market prices (historical)
pub const HISTORICAL_RESOURCE_ID: &str = "42823128-a8ed-4434-86a7-a931346a3625";
/// Window large enough to span several seasons
pub const HISTORICAL_LIMIT: u32 = 3000;

const USER_AGENT: &str = "crop-advisor/0.1.0";

#[derive(Clone)]
pub struct DataGovClient {
    http: Client,
    base_url: Url,
    api_key: String,
    live_timeout: Duration,
    historical_timeout: Duration,
}

impl DataGovClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        live_timeout: Duration,
        historical_timeout: Duration,
    ) -> Result<Self, PriceSourceError> {
        // Url::join drops the last segment unless the base ends with '/'
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };
        let http = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.to_string(),
            live_timeout,
            historical_timeout,
        })
    }

    fn resource_url(
        &self,
        resource_id: &str,
        filters: &[(&str, &str)],
        limit: Option<u32>,
    ) -> Result<Url, PriceSourceError> {
        let mut url = self.base_url.join(resource_id)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("api-key", &self.api_key)
                .append_pair("format", "json");
            if let Some(limit) = limit {
                query.append_pair("limit", &limit.to_string());
            }
            for (name, value) in filters {
                query.append_pair(&format!("filters[{}]", name), value);
            }
        }
        Ok(url)
    }

    async fn fetch_records(&self, url: Url, timeout: Duration) -> Result<Vec<Value>, PriceSourceError> {
        let body: Value = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(records_from_body(body))
    }
}

/// Rows under `records`; a body without a `records` array holds no data
fn records_from_body(body: Value) -> Vec<Value> {
    match body {
        Value::Object(mut fields) => match fields.remove("records") {
            Some(Value::Array(records)) => records,
            Some(other) => {
                tracing::debug!("Ignoring non-array 'records' field: {}", other);
                Vec::new()
            }
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

#[async_trait]
impl MarketPriceSource for DataGovClient {
    async fn live_records(
        &self,
        state: &str,
        district: &str,
        commodity: &str,
    ) -> Result<Vec<LiveRecord>, PriceSourceError> {
        let url = self.resource_url(
            LIVE_RESOURCE_ID,
            &[("state", state), ("district", district), ("commodity", commodity)],
            None,
        )?;
        let records = self.fetch_records(url, self.live_timeout).await?;
        Ok(records.iter().map(LiveRecord::from_json).collect())
    }

    async fn historical_records(
        &self,
        state: &str,
        commodity: &str,
    ) -> Result<Vec<HistoricalRecord>, PriceSourceError> {
        let url = self.resource_url(
            HISTORICAL_RESOURCE_ID,
            &[("State", state), ("Commodity", commodity)],
            Some(HISTORICAL_LIMIT),
        )?;
        let records = self.fetch_records(url, self.historical_timeout).await?;
        Ok(records.iter().map(HistoricalRecord::from_json).collect())
    }
}
