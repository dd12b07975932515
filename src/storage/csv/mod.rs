//! # CSV Storage Module
//!
//! Production storage backend for the booking backend. Every aggregate lives
//! in its own flat CSV file under the connection's data directory:
//!
//! ```csv
//! id,client_id,professional_id,start,end,status,items,...
//! booking::4f1c...,client::a9...,professional::07...,2026-03-10T14:00:00+00:00,...
//! ```
//!
//! All writes rewrite the file through a temp-file-then-rename, so readers
//! never observe a half-written file. Composite operations (slot reservation,
//! accrual recording, coupon use counting) additionally hold the connection's
//! write lock across their read-check-write sequence.

pub mod bonus_repository;
pub mod booking_repository;
pub mod catalog_repository;
pub mod connection;
pub mod coupon_repository;
pub mod user_repository;

#[cfg(test)]
pub mod test_utils;

pub use bonus_repository::BonusRepository;
pub use booking_repository::BookingRepository;
pub use catalog_repository::CatalogRepository;
pub use connection::CsvConnection;
pub use coupon_repository::CouponRepository;
pub use user_repository::UserRepository;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::storage::traits::Connection;

impl Connection for CsvConnection {
    type UserRepository = UserRepository;
    type CatalogRepository = CatalogRepository;
    type BookingRepository = BookingRepository;
    type CouponRepository = CouponRepository;
    type LoyaltyRepository = BonusRepository;

    fn create_user_repository(&self) -> UserRepository {
        UserRepository::new(self.clone())
    }

    fn create_catalog_repository(&self) -> CatalogRepository {
        CatalogRepository::new(self.clone())
    }

    fn create_booking_repository(&self) -> BookingRepository {
        BookingRepository::new(self.clone())
    }

    fn create_coupon_repository(&self) -> CouponRepository {
        CouponRepository::new(self.clone())
    }

    fn create_loyalty_repository(&self) -> BonusRepository {
        BonusRepository::new(self.clone())
    }
}

/// Parse a required RFC 3339 timestamp cell.
fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("invalid timestamp in CSV: '{value}'"))?;
    Ok(parsed.with_timezone(&Utc))
}

/// Optional timestamp cell: empty means absent.
fn parse_optional_rfc3339(value: &str) -> Result<Option<DateTime<Utc>>> {
    if value.is_empty() {
        Ok(None)
    } else {
        Ok(Some(parse_rfc3339(value)?))
    }
}

fn format_optional_rfc3339(value: &Option<DateTime<Utc>>) -> String {
    value.map(|v| v.to_rfc3339()).unwrap_or_default()
}
