//! # Booking Backend
//!
//! Scheduling and pricing engine for appointment bookings. Three concerns
//! live here:
//!
//! - **Scheduling**: multi-service bookings whose end time is derived from the
//!   snapshotted service durations, with atomic per-professional slot
//!   reservation over half-open intervals.
//! - **Pricing**: a deterministic price resolver combining the service total
//!   with at most one discount source, a scoped coupon or a loyalty-point
//!   redemption.
//! - **Loyalty**: a two-bucket point ledger with calendar-correct expiration,
//!   per-booking accrual idempotency, and milestone recomputation.
//!
//! The domain services are synchronous, generic over a storage
//! [`Connection`](storage::traits::Connection), and take the current instant
//! as an explicit parameter. `CsvConnection` is the production backend;
//! `MemoryConnection` backs the tests.

pub mod domain;
pub mod storage;

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

pub use domain::{
    BonusService, BookingService, DomainError, DomainResult, ErrorKind, LoyaltyConfig,
    PricingConfig, PricingService,
};
pub use storage::{Connection, CsvConnection, MemoryConnection};

/// Main backend struct that orchestrates all services over one connection.
pub struct Backend<C: Connection> {
    pub booking_service: BookingService<C>,
    pub pricing_service: PricingService<C>,
    pub bonus_service: BonusService<C>,
}

impl<C: Connection> Backend<C> {
    /// Wire all services over a shared connection with default business
    /// parameters.
    pub fn new(connection: Arc<C>) -> Self {
        Self::with_config(connection, PricingConfig::default(), LoyaltyConfig::default())
    }

    /// Wire all services with explicit business parameters.
    pub fn with_config(
        connection: Arc<C>,
        pricing_config: PricingConfig,
        loyalty_config: LoyaltyConfig,
    ) -> Self {
        let pricing_service = PricingService::with_config(connection.clone(), pricing_config);
        let bonus_service = BonusService::with_config(connection.clone(), loyalty_config);
        let booking_service = BookingService::new(
            connection,
            pricing_service.clone(),
            bonus_service.clone(),
        );

        Backend {
            booking_service,
            pricing_service,
            bonus_service,
        }
    }
}

impl Backend<CsvConnection> {
    /// Backend over CSV files in the given directory.
    pub fn open<P: AsRef<Path>>(data_directory: P) -> Result<Self> {
        let connection = Arc::new(CsvConnection::new(data_directory)?);
        Ok(Self::new(connection))
    }

    /// Backend over CSV files in the default data directory
    /// (~/Documents/Booking Tracker).
    pub fn open_default() -> Result<Self> {
        let connection = Arc::new(CsvConnection::new_default()?);
        Ok(Self::new(connection))
    }
}

// End-to-end flow over the CSV backend: book, confirm, complete, accrue,
// then spend the points on the next booking.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::commands::bonus::AccrueBookingPointsCommand;
    use crate::domain::commands::bookings::{CreateBookingCommand, UpdateBookingStatusCommand};
    use crate::domain::models::booking::BookingStatus;
    use crate::domain::models::service_offering::ServiceOffering;
    use crate::domain::models::user::{Client, Professional};
    use crate::storage::traits::{BookingStorage, CatalogStorage, UserStorage};
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    #[test]
    fn cloned_services_share_the_connection_state() {
        let connection = Arc::new(MemoryConnection::new());
        let backend = Backend::new(connection.clone());
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();

        connection
            .create_user_repository()
            .store_client(&Client {
                id: "client::ana".to_string(),
                name: "Ana".to_string(),
                created_at: now,
            })
            .unwrap();

        // A cloned service sees the same stored data as the original.
        let bonus = backend.bonus_service.clone();
        let summary = bonus.get_balance_summary("client::ana", now).unwrap();
        assert_eq!(summary.total_points, 0);
    }

    #[test]
    fn booking_lifecycle_over_csv_files() {
        let temp_dir = TempDir::new().unwrap();
        // One connection per directory; the backend and the seeding below
        // share it so all writes go through the same lock.
        let connection = Arc::new(CsvConnection::new(temp_dir.path()).unwrap());
        let backend = Backend::new(connection.clone());
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();

        connection
            .create_user_repository()
            .store_client(&Client {
                id: "client::ana".to_string(),
                name: "Ana".to_string(),
                created_at: now,
            })
            .unwrap();
        connection
            .create_user_repository()
            .store_professional(&Professional {
                id: "professional::rui".to_string(),
                name: "Rui".to_string(),
                created_at: now,
            })
            .unwrap();
        connection
            .create_catalog_repository()
            .store_offering(&ServiceOffering {
                service_id: "service::spa".to_string(),
                professional_id: "professional::rui".to_string(),
                price: 100.0,
                duration_minutes: 60,
            })
            .unwrap();

        // Book and confirm.
        let booking = backend
            .booking_service
            .create_booking(
                CreateBookingCommand {
                    client_id: "client::ana".to_string(),
                    professional_id: "professional::rui".to_string(),
                    service_ids: vec!["service::spa".to_string()],
                    start: now + Duration::hours(2),
                    notes: None,
                },
                now,
            )
            .unwrap()
            .booking;
        backend
            .booking_service
            .update_status(
                UpdateBookingStatusCommand::plain(
                    &booking.id,
                    BookingStatus::Confirmed,
                    "professional::rui",
                ),
                now,
            )
            .unwrap();

        // Mark completed (an admin-side edit, not a service transition).
        let repo = connection.create_booking_repository();
        let mut completed = repo.get_booking(&booking.id).unwrap().unwrap();
        completed.status = BookingStatus::Completed;
        repo.update_booking(&completed).unwrap();

        // 100.0 booking earns 10 points.
        let accrued = backend
            .bonus_service
            .accrue_booking_points(
                AccrueBookingPointsCommand {
                    user_id: "client::ana".to_string(),
                    booking_id: booking.id.clone(),
                },
                now + Duration::days(1),
            )
            .unwrap();
        assert_eq!(accrued.points_awarded, 10);

        // The points discount the next booking at confirmation.
        let next = backend
            .booking_service
            .create_booking(
                CreateBookingCommand {
                    client_id: "client::ana".to_string(),
                    professional_id: "professional::rui".to_string(),
                    service_ids: vec!["service::spa".to_string()],
                    start: now + Duration::days(7),
                    notes: None,
                },
                now + Duration::days(1),
            )
            .unwrap()
            .booking;
        let mut confirm = UpdateBookingStatusCommand::plain(
            &next.id,
            BookingStatus::Confirmed,
            "professional::rui",
        );
        confirm.use_bonus_points = true;
        let confirmed = backend
            .booking_service
            .update_status(confirm, now + Duration::days(1))
            .unwrap()
            .booking;
        assert_eq!(confirmed.final_value, 90.0);

        // A re-opened backend sees everything the first one wrote.
        let reopened = Backend::open(temp_dir.path()).unwrap();
        let summary = reopened
            .bonus_service
            .get_balance_summary("client::ana", now + Duration::days(2))
            .unwrap();
        assert_eq!(summary.total_points, 0);
        let bookings = connection
            .create_booking_repository()
            .list_bookings("client::ana")
            .unwrap();
        assert_eq!(bookings.len(), 2);
    }
}
