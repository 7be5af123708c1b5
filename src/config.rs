//! Server configuration from environment variables
//!
//! | Variable | Default |
//! |---|---|
//! | `PORT` | 3000 |
//! | `MODELS_DIR` | `models` |
//! | `CROP_DATA_PATH` | `data/crop_data.json` |
//! | `API_GOV_KEY` | unset (prices fall back to catalog placeholders) |
//! | `PRICE_API_BASE_URL` | `https://api.data.gov.in/resource/` |
//! | `WEATHER_API_URL` | `https://archive-api.open-meteo.com/v1/archive` |
//! | `LIVE_PRICE_TIMEOUT_SECS` | 10 |
//! | `SEASONAL_PRICE_TIMEOUT_SECS` | 20 |
//! | `WEATHER_TIMEOUT_SECS` | 20 |
//! | `WEATHER_CACHE_TTL_SECS` | 3600 |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::pricing::data_gov::DEFAULT_BASE_URL;

pub const DEFAULT_WEATHER_API_URL: &str = "https://archive-api.open-meteo.com/v1/archive";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub models_dir: PathBuf,
    pub crop_data_path: PathBuf,
    /// data.gov.in key; None disables the live and seasonal price tiers
    pub price_api_key: Option<String>,
    pub price_api_base_url: String,
    pub weather_api_url: String,
    pub live_price_timeout: Duration,
    pub seasonal_price_timeout: Duration,
    pub weather_timeout: Duration,
    pub weather_cache_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            models_dir: PathBuf::from("models"),
            crop_data_path: PathBuf::from("data/crop_data.json"),
            price_api_key: None,
            price_api_base_url: DEFAULT_BASE_URL.to_string(),
            weather_api_url: DEFAULT_WEATHER_API_URL.to_string(),
            live_price_timeout: Duration::from_secs(10),
            seasonal_price_timeout: Duration::from_secs(20),
            weather_timeout: Duration::from_secs(20),
            weather_cache_ttl: Duration::from_secs(3600),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source; unset or blank values keep defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        Self {
            port: parse_or(get("PORT"), "PORT", defaults.port),
            models_dir: get("MODELS_DIR").map(PathBuf::from).unwrap_or(defaults.models_dir),
            crop_data_path: get("CROP_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.crop_data_path),
            price_api_key: get("API_GOV_KEY"),
            price_api_base_url: get("PRICE_API_BASE_URL").unwrap_or(defaults.price_api_base_url),
            weather_api_url: get("WEATHER_API_URL").unwrap_or(defaults.weather_api_url),
            live_price_timeout: secs_or(get("LIVE_PRICE_TIMEOUT_SECS"), "LIVE_PRICE_TIMEOUT_SECS", defaults.live_price_timeout),
            seasonal_price_timeout: secs_or(
                get("SEASONAL_PRICE_TIMEOUT_SECS"),
                "SEASONAL_PRICE_TIMEOUT_SECS",
                defaults.seasonal_price_timeout,
            ),
            weather_timeout: secs_or(get("WEATHER_TIMEOUT_SECS"), "WEATHER_TIMEOUT_SECS", defaults.weather_timeout),
            weather_cache_ttl: secs_or(
                get("WEATHER_CACHE_TTL_SECS"),
                "WEATHER_CACHE_TTL_SECS",
                defaults.weather_cache_ttl,
            ),
        }
    }
}

fn parse_or<T: FromStr + Copy>(raw: Option<String>, key: &str, default: T) -> T {
    match raw {
        None => default,
        Some(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring unparseable {}={:?}", key, value);
            default
        }),
    }
}

fn secs_or(raw: Option<String>, key: &str, default: Duration) -> Duration {
    Duration::from_secs(parse_or(raw, key, default.as_secs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    fn config(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: FxHashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config(&[]), ServerConfig::default());
        assert!(config(&[]).price_api_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("PORT", "8080"),
            ("MODELS_DIR", "/srv/models"),
            ("API_GOV_KEY", "abc123"),
            ("LIVE_PRICE_TIMEOUT_SECS", "5"),
        ]);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.models_dir, PathBuf::from("/srv/models"));
        assert_eq!(cfg.price_api_key.as_deref(), Some("abc123"));
        assert_eq!(cfg.live_price_timeout, Duration::from_secs(5));
        assert_eq!(cfg.seasonal_price_timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_blank_key_is_absent_and_bad_numbers_fall_back() {
        let cfg = config(&[("API_GOV_KEY", "   "), ("PORT", "eighty"), ("WEATHER_TIMEOUT_SECS", "-1")]);
        assert!(cfg.price_api_key.is_none());
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.weather_timeout, Duration::from_secs(20));
    }
}
