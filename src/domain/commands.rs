//! Domain-level command and query types.
//! These structs are used by services inside the domain layer and are **not**
//! exposed over a public API; a transport layer is responsible for mapping
//! its DTOs onto these internal types.

pub mod bookings {
    use chrono::{DateTime, Utc};

    use crate::domain::models::booking::{Booking, BookingStatus};

    /// Input for creating a new booking.
    #[derive(Debug, Clone)]
    pub struct CreateBookingCommand {
        pub client_id: String,
        pub professional_id: String,
        /// Ordered, non-empty list of requested services.
        pub service_ids: Vec<String>,
        pub start: DateTime<Utc>,
        pub notes: Option<String>,
    }

    /// Result of creating a booking.
    #[derive(Debug, Clone)]
    pub struct CreateBookingResult {
        pub booking: Booking,
    }

    /// Input for moving a booking through its status machine.
    ///
    /// A confirmation may settle the price at the same time: exactly one of
    /// `coupon_code` / `use_bonus_points` may be set, mirroring the pricing
    /// preview.
    #[derive(Debug, Clone)]
    pub struct UpdateBookingStatusCommand {
        pub booking_id: String,
        pub new_status: BookingStatus,
        /// Who is asking: the confirming professional or the canceling party.
        pub actor_id: String,
        /// Optional cancellation reason, max 500 characters.
        pub reason: Option<String>,
        pub coupon_code: Option<String>,
        pub use_bonus_points: bool,
    }

    impl UpdateBookingStatusCommand {
        /// Plain transition without price settlement or reason.
        pub fn plain(booking_id: &str, new_status: BookingStatus, actor_id: &str) -> Self {
            Self {
                booking_id: booking_id.to_string(),
                new_status,
                actor_id: actor_id.to_string(),
                reason: None,
                coupon_code: None,
                use_bonus_points: false,
            }
        }
    }

    /// Result of a status transition.
    #[derive(Debug, Clone)]
    pub struct UpdateBookingStatusResult {
        pub booking: Booking,
    }
}

pub mod pricing {
    /// Input for a price preview. `coupon_code` and `use_bonus_points` are
    /// mutually exclusive; supplying both is always rejected.
    #[derive(Debug, Clone)]
    pub struct PricePreviewCommand {
        pub client_id: String,
        pub professional_id: String,
        pub service_ids: Vec<String>,
        pub coupon_code: Option<String>,
        pub use_bonus_points: bool,
    }

    /// Price breakdown returned by the resolver. Pure data; nothing has been
    /// consumed when this is produced.
    #[derive(Debug, Clone, PartialEq)]
    pub struct PriceBreakdown {
        pub total_value: f64,
        pub coupon_discount: f64,
        pub points_discount: f64,
        pub points_used: i64,
        pub final_value: f64,
    }

    impl PriceBreakdown {
        /// Breakdown with no discount applied.
        pub fn undiscounted(total_value: f64) -> Self {
            Self {
                total_value,
                coupon_discount: 0.0,
                points_discount: 0.0,
                points_used: 0,
                final_value: total_value,
            }
        }
    }
}

pub mod bonus {
    use chrono::{DateTime, Utc};

    /// Input for awarding per-booking points after completion.
    #[derive(Debug, Clone)]
    pub struct AccrueBookingPointsCommand {
        pub user_id: String,
        pub booking_id: String,
    }

    /// Result of a per-booking accrual.
    #[derive(Debug, Clone)]
    pub struct AccrueBookingPointsResult {
        pub points_awarded: i64,
        pub new_balance: i64,
        pub expires_at: DateTime<Utc>,
    }

    /// Input for the on-demand loyalty milestone accrual.
    #[derive(Debug, Clone)]
    pub struct AccrueLoyaltyMilestoneCommand {
        pub user_id: String,
    }

    /// Result of a milestone accrual.
    #[derive(Debug, Clone)]
    pub struct AccrueLoyaltyMilestoneResult {
        pub completed_bookings: u32,
        pub new_balance: i64,
        pub expires_at: DateTime<Utc>,
    }

    /// User-facing view of both point buckets.
    #[derive(Debug, Clone, PartialEq)]
    pub struct BalanceSummary {
        pub booking_points: i64,
        pub loyalty_points: i64,
        pub total_points: i64,
        /// Soonest expiration among the non-expired buckets.
        pub next_expiration: Option<DateTime<Utc>>,
    }
}
