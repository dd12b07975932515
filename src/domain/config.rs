//! Tunable business parameters for pricing and loyalty accrual.
use serde::{Deserialize, Serialize};

/// Parameters of the point-redemption side of pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Currency value of one loyalty point.
    pub value_per_point: f64,
    /// A redemption can never push the payable amount below this floor.
    pub min_booking_value_after_discount: f64,
    /// Minimum combined balance required before any points can be redeemed.
    pub min_redeemable_points: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            value_per_point: 1.0,
            min_booking_value_after_discount: 20.0,
            min_redeemable_points: 10,
        }
    }
}

/// Parameters of loyalty-point accrual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoyaltyConfig {
    /// Points awarded per 10 currency units of a completed booking.
    pub points_per_10_currency: i64,
    /// Completed bookings needed per loyalty milestone. A value of zero is
    /// treated as 1.
    pub milestone_threshold: u32,
    /// Points awarded per reached milestone.
    pub points_per_milestone: i64,
    /// Months until an accrued bucket expires.
    pub expiration_months: u32,
}

impl Default for LoyaltyConfig {
    fn default() -> Self {
        Self {
            points_per_10_currency: 1,
            milestone_threshold: 5,
            points_per_milestone: 10,
            expiration_months: 6,
        }
    }
}

/// Round a currency amount to 2 decimals. All money flowing out of the
/// pricing and loyalty paths passes through here so repeated runs over the
/// same inputs agree bit-for-bit.
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
