//! Market price resolution
//!
//! - `source`: the `MarketPriceSource` seam and lenient record parsing
//! - `data_gov`: reqwest client for the data.gov.in mandi price datasets
//! - `resolver`: the Live → SeasonalAverage → Default fallback chain

pub mod data_gov;
pub mod resolver;
pub mod source;

pub use data_gov::DataGovClient;
pub use resolver::{seasonal_average, seasonal_months, PriceQuery, PriceQuote, PriceResolver, PriceTier};
pub use source::{HistoricalRecord, LiveRecord, MarketPriceSource, PriceSourceError};
