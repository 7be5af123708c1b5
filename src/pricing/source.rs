//! Market price data source seam
//!
//! Records from the price datasets are loosely typed: prices arrive as
//! numbers or numeric strings, field names differ in case between the live
//! and historical resources, and dates come in several formats. Parsing here
//! never fails; a value that cannot be read is simply absent.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PriceSourceError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(reqwest::Error),
}

// Request URLs carry the api key
impl From<reqwest::Error> for PriceSourceError {
    fn from(e: reqwest::Error) -> Self {
        PriceSourceError::Http(e.without_url())
    }
}

/// One row of the live (current-day) mandi price dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveRecord {
    pub market: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub modal_price: Option<f64>,
}

/// One row of the historical mandi price dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalRecord {
    pub price_date: Option<NaiveDate>,
    pub modal_price: Option<f64>,
}

#[async_trait]
pub trait MarketPriceSource: Send + Sync {
    /// Live records filtered by exact state, district and commodity
    async fn live_records(
        &self,
        state: &str,
        district: &str,
        commodity: &str,
    ) -> Result<Vec<LiveRecord>, PriceSourceError>;

    /// Historical records filtered by state and commodity
    async fn historical_records(
        &self,
        state: &str,
        commodity: &str,
    ) -> Result<Vec<HistoricalRecord>, PriceSourceError>;
}

impl LiveRecord {
    pub fn from_json(value: &Value) -> Self {
        Self {
            market: field(value, &["market", "Market"])
                .and_then(Value::as_str)
                .map(str::to_string),
            min_price: field(value, &["min_price", "Min_Price", "Min_x0020_Price"]).and_then(lenient_number),
            max_price: field(value, &["max_price", "Max_Price", "Max_x0020_Price"]).and_then(lenient_number),
            modal_price: field(value, &["modal_price", "Modal_Price", "Modal_x0020_Price"])
                .and_then(lenient_number),
        }
    }
}

impl HistoricalRecord {
    pub fn from_json(value: &Value) -> Self {
        Self {
            price_date: field(value, &["Price_Date", "price_date", "Arrival_Date", "arrival_date"])
                .and_then(Value::as_str)
                .and_then(parse_price_date),
            modal_price: field(value, &["Modal_Price", "modal_price", "Modal_x0020_Price"])
                .and_then(lenient_number),
        }
    }
}

/// First present, non-null field among `names`
fn field<'a>(value: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| value.get(name))
        .find(|v| !v.is_null())
}

/// Number or numeric string; non-finite values are rejected
pub fn lenient_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Accepts `dd/mm/yyyy`, `yyyy-mm-dd`, `dd-mm-yyyy` and ISO date-times
pub fn parse_price_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    const DATE_FORMATS: [&str; 3] = ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y"];
    const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.date_naive())
        })
}
