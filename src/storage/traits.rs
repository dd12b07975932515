//! # Storage Traits
//!
//! This module defines the storage abstraction traits that allow different
//! storage backends to be used interchangeably in the domain layer. The
//! domain services depend only on these traits; `CsvConnection` is the
//! production backend and `MemoryConnection` the in-memory one used by tests.
//!
//! All operations are synchronous request/response. The check-then-act
//! sequences that must not race (slot reservation, accrual recording, coupon
//! use counting) are single trait methods so each backend can make them
//! atomic with its own locking.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::domain::models::bonus::{BonusTransaction, LoyaltyBalance, PointCategory};
use crate::domain::models::booking::Booking;
use crate::domain::models::coupon::Coupon;
use crate::domain::models::service_offering::ServiceOffering;
use crate::domain::models::user::{Client, Professional};

/// Outcome of an atomic slot reservation.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotReservation {
    /// The booking and its items were persisted.
    Reserved,
    /// An existing booking occupies an overlapping interval; nothing was
    /// written.
    Conflict(Booking),
}

/// Outcome of an atomic accrual write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccrualOutcome {
    /// Balance overwritten and ledger row appended.
    Recorded,
    /// A booking-points ledger row already exists for this booking id;
    /// nothing was written.
    DuplicateBooking,
}

/// Trait defining the interface for client and professional lookups.
pub trait UserStorage: Send + Sync {
    /// Store a new client.
    fn store_client(&self, client: &Client) -> Result<()>;

    /// Retrieve a client by ID.
    fn get_client(&self, client_id: &str) -> Result<Option<Client>>;

    /// Store a new professional.
    fn store_professional(&self, professional: &Professional) -> Result<()>;

    /// Retrieve a professional by ID.
    fn get_professional(&self, professional_id: &str) -> Result<Option<Professional>>;
}

/// Trait defining the interface for catalog lookups: price and duration of a
/// service as offered by one professional.
pub trait CatalogStorage: Send + Sync {
    /// Store or replace a catalog entry.
    fn store_offering(&self, offering: &ServiceOffering) -> Result<()>;

    /// Resolve a (service, professional) pairing to its price and duration.
    fn get_offering(
        &self,
        service_id: &str,
        professional_id: &str,
    ) -> Result<Option<ServiceOffering>>;

    /// List everything a professional offers.
    fn list_offerings(&self, professional_id: &str) -> Result<Vec<ServiceOffering>>;
}

/// Trait defining the interface for booking storage operations.
pub trait BookingStorage: Send + Sync {
    /// Atomically check the professional's agenda for an overlapping
    /// slot-blocking booking and, when free, persist the booking with all of
    /// its items. Two concurrent reservations of intersecting intervals must
    /// resolve to one `Reserved` and one `Conflict`.
    fn reserve(&self, booking: &Booking) -> Result<SlotReservation>;

    /// Retrieve a booking by ID.
    fn get_booking(&self, booking_id: &str) -> Result<Option<Booking>>;

    /// Find a slot-blocking booking of the professional whose interval
    /// intersects `[start, end)` (half-open). `exclude_booking_id` lets an
    /// update skip the booking being updated.
    fn find_overlapping(
        &self,
        professional_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_booking_id: Option<&str>,
    ) -> Result<Option<Booking>>;

    /// Replace a stored booking. The row must exist.
    fn update_booking(&self, booking: &Booking) -> Result<()>;

    /// Number of completed bookings for a client.
    fn count_completed(&self, client_id: &str) -> Result<u32>;

    /// All bookings of a client, ordered by start time ascending.
    fn list_bookings(&self, client_id: &str) -> Result<Vec<Booking>>;
}

/// Trait defining the interface for coupon storage operations.
pub trait CouponStorage: Send + Sync {
    /// Store a new coupon.
    fn store_coupon(&self, coupon: &Coupon) -> Result<()>;

    /// Look up a coupon by its (case-insensitive) code.
    fn get_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>>;

    /// Atomically increment the use counter unless `max_uses` has been
    /// reached. Returns false (and leaves the counter untouched) when the
    /// ceiling is hit, so concurrent redemptions cannot exceed it.
    fn increment_uses(&self, coupon_id: &str) -> Result<bool>;
}

/// Trait defining the interface for the loyalty ledger and balances.
pub trait LoyaltyStorage: Send + Sync {
    /// Read the balance bucket for a user and category.
    fn get_balance(&self, user_id: &str, category: PointCategory)
        -> Result<Option<LoyaltyBalance>>;

    /// Overwrite (or create) a balance bucket wholesale.
    fn upsert_balance(&self, balance: &LoyaltyBalance) -> Result<()>;

    /// Append a ledger row. Rows are write-once.
    fn append_transaction(&self, transaction: &BonusTransaction) -> Result<()>;

    /// The booking-points ledger row for a booking, if one exists.
    fn find_transaction_by_booking(&self, booking_id: &str) -> Result<Option<BonusTransaction>>;

    /// All ledger rows of a user, oldest first.
    fn list_transactions(&self, user_id: &str) -> Result<Vec<BonusTransaction>>;

    /// Atomically overwrite the balance bucket and append the ledger row.
    /// When the row carries a booking id and a booking-points row for that
    /// booking already exists, nothing is written and `DuplicateBooking` is
    /// returned. Either both writes land or neither does.
    fn record_accrual(
        &self,
        balance: &LoyaltyBalance,
        transaction: &BonusTransaction,
    ) -> Result<AccrualOutcome>;
}

/// Trait defining the interface for storage connections.
///
/// A connection is a factory for the per-store repositories. The domain layer
/// is generic over this trait and never names a concrete backend. The
/// repositories are `Clone` so the services holding them can be cloned and
/// shared the same way the connection itself is.
pub trait Connection: Send + Sync + Clone + 'static {
    type UserRepository: UserStorage + Clone;
    type CatalogRepository: CatalogStorage + Clone;
    type BookingRepository: BookingStorage + Clone;
    type CouponRepository: CouponStorage + Clone;
    type LoyaltyRepository: LoyaltyStorage + Clone;

    fn create_user_repository(&self) -> Self::UserRepository;
    fn create_catalog_repository(&self) -> Self::CatalogRepository;
    fn create_booking_repository(&self) -> Self::BookingRepository;
    fn create_coupon_repository(&self) -> Self::CouponRepository;
    fn create_loyalty_repository(&self) -> Self::LoyaltyRepository;
}
