//! Domain models for the loyalty-point ledger.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The two point buckets a user can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointCategory {
    BookingPoints,
    Loyalty,
}

impl PointCategory {
    pub const ALL: [PointCategory; 2] = [PointCategory::BookingPoints, PointCategory::Loyalty];

    pub fn as_str(&self) -> &'static str {
        match self {
            PointCategory::BookingPoints => "booking_points",
            PointCategory::Loyalty => "loyalty",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "booking_points" => Some(PointCategory::BookingPoints),
            "loyalty" => Some(PointCategory::Loyalty),
            _ => None,
        }
    }
}

impl std::fmt::Display for PointCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current point count for one `(user, category)` bucket. The whole row is
/// overwritten on each accrual: one point total, one expiration for the
/// bucket. There is no per-lot expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoyaltyBalance {
    pub user_id: String,
    pub category: PointCategory,
    pub points: i64,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoyaltyBalance {
    /// Points still redeemable at `now`; an expired bucket counts as zero.
    pub fn redeemable_at(&self, now: DateTime<Utc>) -> i64 {
        if self.expires_at > now {
            self.points
        } else {
            0
        }
    }
}

/// Append-only ledger row. Positive deltas are accruals, negative ones are
/// redemptions. Write-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusTransaction {
    pub id: String,
    pub user_id: String,
    /// Set for per-booking accruals; the idempotency guard allows at most one
    /// booking-points row per booking id.
    pub booking_id: Option<String>,
    pub category: PointCategory,
    pub points: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl BonusTransaction {
    /// Generate a ledger row ID.
    /// Format: bonus::<uuid>
    pub fn generate_id() -> String {
        format!("bonus::{}", Uuid::new_v4())
    }
}
