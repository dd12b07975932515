//! Domain model for a booking.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Canceled,
    Completed,
}

impl BookingStatus {
    /// Stable string form used by the CSV store and log messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Canceled => "canceled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "canceled" => Some(BookingStatus::Canceled),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A service line inside a booking. Price and duration are snapshotted at
/// booking time and never change afterwards, even if the catalog does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingItem {
    pub service_id: String,
    pub unit_price: f64,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub client_id: String,
    pub professional_id: String,
    pub start: DateTime<Utc>,
    /// Always `start + sum(item durations)`. Stored for cheap overlap scans
    /// but derived from the items, never edited independently.
    pub end: DateTime<Utc>,
    pub status: BookingStatus,
    pub items: Vec<BookingItem>,
    pub notes: Option<String>,
    /// Sum of the item prices at creation time.
    pub total_value: f64,
    /// Payable amount. Equals `total_value` until a discount is applied at
    /// confirmation.
    pub final_value: f64,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Generate a booking ID.
    /// Format: booking::<uuid>
    pub fn generate_id() -> String {
        format!("booking::{}", Uuid::new_v4())
    }

    /// Total duration of all items, in minutes.
    pub fn duration_minutes(&self) -> i64 {
        self.items.iter().map(|item| item.duration_minutes).sum()
    }

    /// Half-open overlap test against `[start, end)`. A booking ending exactly
    /// when another starts does not overlap it.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }

    /// Whether this booking still occupies its time slot. Canceled bookings
    /// free the slot; everything else keeps it.
    pub fn blocks_slot(&self) -> bool {
        self.status != BookingStatus::Canceled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn booking_between(start_h: u32, end_h: u32) -> Booking {
        let start = Utc.with_ymd_and_hms(2026, 3, 10, start_h, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 10, end_h, 0, 0).unwrap();
        Booking {
            id: Booking::generate_id(),
            client_id: "client::a".to_string(),
            professional_id: "professional::b".to_string(),
            start,
            end,
            status: BookingStatus::Pending,
            items: vec![BookingItem {
                service_id: "service::cut".to_string(),
                unit_price: 50.0,
                duration_minutes: (end_h - start_h) as i64 * 60,
            }],
            notes: None,
            total_value: 50.0,
            final_value: 50.0,
            confirmed_at: None,
            canceled_at: None,
            created_at: start,
        }
    }

    #[test]
    fn overlap_is_symmetric() {
        let a = booking_between(10, 12);
        let b = booking_between(11, 13);
        assert!(a.overlaps(b.start, b.end));
        assert!(b.overlaps(a.start, a.end));
    }

    #[test]
    fn back_to_back_bookings_do_not_overlap() {
        let a = booking_between(10, 12);
        let b = booking_between(12, 14);
        assert!(!a.overlaps(b.start, b.end));
        assert!(!b.overlaps(a.start, a.end));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Canceled,
            BookingStatus::Completed,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("unknown"), None);
    }
}
