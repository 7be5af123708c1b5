//! Weather Provider
//!
//! Seasonal weather averages for a location, used as model inputs.
//!
//! The live source is the Open-Meteo historical archive: daily means for the
//! most recently completed occurrence of the requested season are averaged,
//! and daily precipitation is scaled to a monthly-equivalent total. Any
//! upstream failure degrades to static per-season constants, so a weather
//! lookup never fails the request.

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use moka::future::Cache;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::season::{Season, SeasonWindow};

const USER_AGENT: &str = "crop-advisor/0.1.0";
const DAILY_VARIABLES: &str = "temperature_2m_mean,relative_humidity_2m_mean,precipitation_sum";
/// Average daily rainfall × 30 ≈ monthly total
const DAYS_PER_MONTH: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherSource {
    Archive,
    SeasonalDefault,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeatherObservation {
    /// Mean air temperature at 2 m (°C)
    pub temperature: f64,
    /// Mean relative humidity (%)
    pub humidity: f64,
    /// Monthly-equivalent rainfall (mm)
    pub rainfall: f64,
    pub source: WeatherSource,
}

impl WeatherObservation {
    /// Static climatology used when the archive is unavailable
    pub fn seasonal_default(season: Season) -> Self {
        let (temperature, humidity, rainfall) = match season {
            Season::Kharif => (27.5, 82.0, 210.0),
            Season::Rabi => (20.5, 58.0, 18.0),
            Season::Zaid => (31.0, 48.0, 35.0),
        };
        Self {
            temperature,
            humidity,
            rainfall,
            source: WeatherSource::SeasonalDefault,
        }
    }
}

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no season window for {0}")]
    NoWindow(Season),
    #[error("no weather data between {start} and {end}")]
    EmptySeries { start: NaiveDate, end: NaiveDate },
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Seasonal averages for a location; never fails
    async fn seasonal_averages(&self, lat: f64, lon: f64, season: Season) -> WeatherObservation;
}

/// Lat/lon rounded to 0.01° (~1 km) plus season
type CacheKey = (i64, i64, Season);

#[derive(Clone)]
pub struct OpenMeteoClient {
    http: Client,
    archive_url: Url,
    cache: Cache<CacheKey, WeatherObservation>,
}

impl OpenMeteoClient {
    pub fn new(archive_url: &str, timeout: Duration, cache_ttl: Duration) -> Result<Self, WeatherError> {
        let archive_url = Url::parse(archive_url)?;
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        let cache = Cache::builder()
            .max_capacity(1_000)
            .time_to_live(cache_ttl)
            .build();

        Ok(Self {
            http,
            archive_url,
            cache,
        })
    }

    /// Query the archive for the season's last completed window
    pub async fn fetch_archive(
        &self,
        lat: f64,
        lon: f64,
        season: Season,
        today: NaiveDate,
    ) -> Result<WeatherObservation, WeatherError> {
        let window = season
            .last_completed_window(today)
            .ok_or(WeatherError::NoWindow(season))?;

        let url = self.archive_query(lat, lon, &window);
        tracing::debug!(
            "Fetching {} weather for ({:.2}, {:.2}) from {} to {}",
            season, lat, lon, window.start, window.end
        );

        let response: ArchiveResponse = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .daily
            .as_ref()
            .and_then(average_daily)
            .ok_or(WeatherError::EmptySeries {
                start: window.start,
                end: window.end,
            })
    }

    fn archive_query(&self, lat: f64, lon: f64, window: &SeasonWindow) -> Url {
        let mut url = self.archive_url.clone();
        url.query_pairs_mut()
            .append_pair("latitude", &lat.to_string())
            .append_pair("longitude", &lon.to_string())
            .append_pair("start_date", &window.start.format("%Y-%m-%d").to_string())
            .append_pair("end_date", &window.end.format("%Y-%m-%d").to_string())
            .append_pair("daily", DAILY_VARIABLES)
            .append_pair("timezone", "auto");
        url
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    async fn seasonal_averages(&self, lat: f64, lon: f64, season: Season) -> WeatherObservation {
        let key = cache_key(lat, lon, season);
        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!("Weather cache hit for {:?}", key);
            return cached;
        }

        let today = Local::now().date_naive();
        match self.fetch_archive(lat, lon, season, today).await {
            Ok(observation) => {
                self.cache.insert(key, observation).await;
                observation
            }
            Err(e) => {
                tracing::warn!("Weather archive unavailable ({}); using {} defaults", e, season);
                WeatherObservation::seasonal_default(season)
            }
        }
    }
}

fn cache_key(lat: f64, lon: f64, season: Season) -> CacheKey {
    ((lat * 100.0).round() as i64, (lon * 100.0).round() as i64, season)
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    daily: Option<DailySeries>,
}

#[derive(Debug, Default, Deserialize)]
struct DailySeries {
    #[serde(default)]
    temperature_2m_mean: Vec<Option<f64>>,
    #[serde(default)]
    relative_humidity_2m_mean: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_sum: Vec<Option<f64>>,
}

/// Mean over days where all three variables are present
fn average_daily(daily: &DailySeries) -> Option<WeatherObservation> {
    let complete: Vec<(f64, f64, f64)> = daily
        .temperature_2m_mean
        .iter()
        .zip(&daily.relative_humidity_2m_mean)
        .zip(&daily.precipitation_sum)
        .filter_map(|((t, h), p)| Some(((*t)?, (*h)?, (*p)?)))
        .collect();

    if complete.is_empty() {
        return None;
    }

    let n = complete.len() as f64;
    let (t_sum, h_sum, p_sum) = complete
        .iter()
        .fold((0.0, 0.0, 0.0), |acc, (t, h, p)| (acc.0 + t, acc.1 + h, acc.2 + p));

    Some(WeatherObservation {
        temperature: t_sum / n,
        humidity: h_sum / n,
        rainfall: p_sum / n * DAYS_PER_MONTH,
        source: WeatherSource::Archive,
    })
}
