//! Economics Calculator
//!
//! Pure arithmetic over a yield estimate, a resolved price quote and the
//! crop's catalog profile:
//!
//! - Revenue = yield (t/ha) × 10 quintals/t × average quintal price
//! - Net profit = revenue − estimated cultivation cost per hectare
//! - Sustainability = 0.4×(10 − water) + 0.4×(10 − pesticide) + 0.2×(10 − soil)
//!
//! Ratings are "higher is worse", so the score inverts them onto a 0-10
//! scale where higher is better.

use serde::Serialize;

use crate::catalog::{CropProfile, SustainabilityRatings};
use crate::pricing::{PriceQuote, PriceTier};
use crate::utils::round_to;

pub const QUINTALS_PER_TON: f64 = 10.0;

const WATER_WEIGHT: f64 = 0.4;
const PESTICIDE_WEIGHT: f64 = 0.4;
const SOIL_WEIGHT: f64 = 0.2;
const MAX_RATING: f64 = 10.0;

pub fn revenue_per_hectare(yield_tons_per_hectare: f64, average_quintal_price: f64) -> f64 {
    yield_tons_per_hectare * QUINTALS_PER_TON * average_quintal_price
}

pub fn net_profit(revenue: f64, cost_per_hectare: f64) -> f64 {
    revenue - cost_per_hectare
}

/// Weighted inverse of the ratings, one decimal, clamped to [0, 10]
pub fn sustainability_score(ratings: &SustainabilityRatings) -> f64 {
    let score = WATER_WEIGHT * (MAX_RATING - ratings.water)
        + PESTICIDE_WEIGHT * (MAX_RATING - ratings.pesticide)
        + SOIL_WEIGHT * (MAX_RATING - ratings.soil_health);
    round_to(score, 1).clamp(0.0, MAX_RATING)
}

/// Per-hectare economics; currency amounts are whole rupees
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EconomicsReport {
    pub predicted_yield_tons_per_hectare: f64,
    pub avg_market_price_per_quintal: f64,
    pub estimated_total_revenue_per_hectare: f64,
    pub estimated_input_cost_per_hectare: f64,
    pub estimated_net_profit_per_hectare: f64,
    pub sustainability_score_out_of_10: f64,
    pub price_tier: PriceTier,
    /// False when the price is the catalog placeholder
    pub market_price_available: bool,
}

impl EconomicsReport {
    pub fn compute(yield_tons_per_hectare: f64, quote: &PriceQuote, profile: &CropProfile) -> Self {
        let average_price = quote.average_price();
        let revenue = revenue_per_hectare(yield_tons_per_hectare, average_price);
        let cost = profile.estimated_cost_per_hectare;

        Self {
            predicted_yield_tons_per_hectare: yield_tons_per_hectare,
            avg_market_price_per_quintal: round_to(average_price, 2),
            estimated_total_revenue_per_hectare: revenue.round(),
            estimated_input_cost_per_hectare: cost,
            estimated_net_profit_per_hectare: net_profit(revenue, cost).round(),
            sustainability_score_out_of_10: sustainability_score(&profile.sustainability),
            price_tier: quote.source_tier,
            market_price_available: quote.source_tier.is_market_data(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ratings(water: f64, pesticide: f64, soil_health: f64) -> SustainabilityRatings {
        SustainabilityRatings { water, pesticide, soil_health }
    }

    fn profile(cost: f64, r: SustainabilityRatings) -> CropProfile {
        CropProfile {
            api_names: vec!["Rice".to_string()],
            estimated_cost_per_hectare: cost,
            yield_range: [3.0, 5.0],
            sustainability: r,
            fallback_price_per_quintal: None,
        }
    }

    fn quote(min: f64, max: f64, tier: PriceTier) -> PriceQuote {
        PriceQuote {
            modal_price: (min + max) / 2.0,
            min_price: min,
            max_price: max,
            market: None,
            source_tier: tier,
        }
    }

    #[test]
    fn test_sustainability_score() {
        // 0.4×2 + 0.4×6 + 0.2×7 = 4.6
        assert_relative_eq!(sustainability_score(&ratings(8.0, 4.0, 3.0)), 4.6);
        assert_relative_eq!(sustainability_score(&ratings(0.0, 0.0, 0.0)), 10.0);
        assert_relative_eq!(sustainability_score(&ratings(10.0, 10.0, 10.0)), 0.0);
    }

    #[test]
    fn test_sustainability_score_bounded() {
        for w in 0..=10 {
            for p in 0..=10 {
                for s in 0..=10 {
                    let score = sustainability_score(&ratings(w as f64, p as f64, s as f64));
                    assert!((0.0..=10.0).contains(&score));
                }
            }
        }
    }

    #[test]
    fn test_revenue_and_profit() {
        let revenue = revenue_per_hectare(4.0, 2000.0);
        assert_relative_eq!(revenue, 80000.0);
        assert_relative_eq!(net_profit(revenue, 45000.0), 35000.0);
    }

    #[test]
    fn test_report_uses_average_of_min_and_max() {
        let report = EconomicsReport::compute(
            4.0,
            &quote(1800.0, 2200.0, PriceTier::Live),
            &profile(45000.0, ratings(8.0, 4.0, 3.0)),
        );
        assert_relative_eq!(report.avg_market_price_per_quintal, 2000.0);
        assert_relative_eq!(report.estimated_total_revenue_per_hectare, 80000.0);
        assert_relative_eq!(report.estimated_net_profit_per_hectare, 35000.0);
        assert_relative_eq!(report.sustainability_score_out_of_10, 4.6);
        assert!(report.market_price_available);
    }

    #[test]
    fn test_report_flags_placeholder_price() {
        let report = EconomicsReport::compute(
            1.5,
            &quote(2500.0, 2500.0, PriceTier::Default),
            &profile(50000.0, ratings(5.0, 5.0, 5.0)),
        );
        assert_eq!(report.price_tier, PriceTier::Default);
        assert!(!report.market_price_available);
        assert_relative_eq!(report.estimated_net_profit_per_hectare, -12500.0);
    }
}
