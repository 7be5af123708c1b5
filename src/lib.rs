//! Crop Advisor
//!
//! HTTP service around three pre-trained agronomy models (crop
//! recommendation, yield prediction, plant-disease detection) plus a
//! rule-based profit and sustainability calculator.
//!
//! - `catalog`: static per-crop reference data (`crop_data.json`)
//! - `season`: cropping seasons and their calendar windows
//! - `weather`: seasonal weather averages with static fallbacks
//! - `pricing`: market price resolution (Live → SeasonalAverage → Default)
//! - `economics`: revenue, profit and sustainability arithmetic
//! - `inference`: feature preprocessing, ONNX engine, model wrappers
//! - `config`: environment configuration
//! - `api_server`: axum router and handlers (feature `api`)

pub mod catalog;
pub mod config;
pub mod economics;
pub mod inference;
pub mod pricing;
pub mod season;
pub mod utils;
pub mod weather;

#[cfg(feature = "api")]
pub mod api_server;

// Re-export commonly used types
pub use catalog::{CropCatalog, CropListing, CropProfile, SustainabilityRatings};
pub use config::ServerConfig;
pub use economics::EconomicsReport;
pub use inference::{InferenceEngine, ModelRegistry, NumericFeatures};
pub use pricing::{PriceQuery, PriceQuote, PriceResolver, PriceTier};
pub use season::Season;
pub use weather::{WeatherObservation, WeatherProvider};

#[cfg(feature = "api")]
pub use api_server::{create_router, AppState};
