//! # In-Memory Storage Module
//!
//! A complete storage backend over plain `HashMap`s behind one mutex. It
//! exists as the test double for the domain layer and doubles as a throwaway
//! backend for demos; the CSV implementation is the production one.
//!
//! A single `Mutex` guards the whole state, which makes the composite
//! operations (`reserve`, `record_accrual`, `increment_uses`) trivially
//! atomic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

use crate::domain::models::bonus::{BonusTransaction, LoyaltyBalance, PointCategory};
use crate::domain::models::booking::Booking;
use crate::domain::models::coupon::Coupon;
use crate::domain::models::service_offering::ServiceOffering;
use crate::domain::models::user::{Client, Professional};
use crate::storage::traits::{
    AccrualOutcome, BookingStorage, CatalogStorage, Connection, CouponStorage, LoyaltyStorage,
    SlotReservation, UserStorage,
};

#[derive(Default)]
struct MemoryState {
    clients: HashMap<String, Client>,
    professionals: HashMap<String, Professional>,
    offerings: HashMap<(String, String), ServiceOffering>,
    bookings: HashMap<String, Booking>,
    coupons: HashMap<String, Coupon>,
    balances: HashMap<(String, PointCategory), LoyaltyBalance>,
    transactions: Vec<BonusTransaction>,
}

/// Shared in-memory "database". Cloning the connection shares the state, the
/// same way cloning a CSV connection shares the data directory.
#[derive(Clone, Default)]
pub struct MemoryConnection {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Connection for MemoryConnection {
    type UserRepository = MemoryRepository;
    type CatalogRepository = MemoryRepository;
    type BookingRepository = MemoryRepository;
    type CouponRepository = MemoryRepository;
    type LoyaltyRepository = MemoryRepository;

    fn create_user_repository(&self) -> MemoryRepository {
        MemoryRepository {
            state: self.state.clone(),
        }
    }

    fn create_catalog_repository(&self) -> MemoryRepository {
        self.create_user_repository()
    }

    fn create_booking_repository(&self) -> MemoryRepository {
        self.create_user_repository()
    }

    fn create_coupon_repository(&self) -> MemoryRepository {
        self.create_user_repository()
    }

    fn create_loyalty_repository(&self) -> MemoryRepository {
        self.create_user_repository()
    }
}

/// One repository type implements every store trait; the split into traits is
/// for the domain layer's benefit, not the backend's.
#[derive(Clone)]
pub struct MemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRepository {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("memory store poisoned by a panicking writer"))
    }
}

impl UserStorage for MemoryRepository {
    fn store_client(&self, client: &Client) -> Result<()> {
        self.lock()?.clients.insert(client.id.clone(), client.clone());
        Ok(())
    }

    fn get_client(&self, client_id: &str) -> Result<Option<Client>> {
        Ok(self.lock()?.clients.get(client_id).cloned())
    }

    fn store_professional(&self, professional: &Professional) -> Result<()> {
        self.lock()?
            .professionals
            .insert(professional.id.clone(), professional.clone());
        Ok(())
    }

    fn get_professional(&self, professional_id: &str) -> Result<Option<Professional>> {
        Ok(self.lock()?.professionals.get(professional_id).cloned())
    }
}

impl CatalogStorage for MemoryRepository {
    fn store_offering(&self, offering: &ServiceOffering) -> Result<()> {
        self.lock()?.offerings.insert(
            (offering.service_id.clone(), offering.professional_id.clone()),
            offering.clone(),
        );
        Ok(())
    }

    fn get_offering(
        &self,
        service_id: &str,
        professional_id: &str,
    ) -> Result<Option<ServiceOffering>> {
        Ok(self
            .lock()?
            .offerings
            .get(&(service_id.to_string(), professional_id.to_string()))
            .cloned())
    }

    fn list_offerings(&self, professional_id: &str) -> Result<Vec<ServiceOffering>> {
        let state = self.lock()?;
        let mut offerings: Vec<ServiceOffering> = state
            .offerings
            .values()
            .filter(|o| o.professional_id == professional_id)
            .cloned()
            .collect();
        offerings.sort_by(|a, b| a.service_id.cmp(&b.service_id));
        Ok(offerings)
    }
}

fn overlapping_in<'a>(
    bookings: impl Iterator<Item = &'a Booking>,
    professional_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude_booking_id: Option<&str>,
) -> Option<Booking> {
    bookings
        .filter(|b| b.professional_id == professional_id)
        .filter(|b| b.blocks_slot())
        .filter(|b| exclude_booking_id != Some(b.id.as_str()))
        .find(|b| b.overlaps(start, end))
        .cloned()
}

impl BookingStorage for MemoryRepository {
    fn reserve(&self, booking: &Booking) -> Result<SlotReservation> {
        let mut state = self.lock()?;
        if let Some(existing) = overlapping_in(
            state.bookings.values(),
            &booking.professional_id,
            booking.start,
            booking.end,
            None,
        ) {
            return Ok(SlotReservation::Conflict(existing));
        }
        state.bookings.insert(booking.id.clone(), booking.clone());
        Ok(SlotReservation::Reserved)
    }

    fn get_booking(&self, booking_id: &str) -> Result<Option<Booking>> {
        Ok(self.lock()?.bookings.get(booking_id).cloned())
    }

    fn find_overlapping(
        &self,
        professional_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_booking_id: Option<&str>,
    ) -> Result<Option<Booking>> {
        let state = self.lock()?;
        Ok(overlapping_in(
            state.bookings.values(),
            professional_id,
            start,
            end,
            exclude_booking_id,
        ))
    }

    fn update_booking(&self, booking: &Booking) -> Result<()> {
        let mut state = self.lock()?;
        if !state.bookings.contains_key(&booking.id) {
            return Err(anyhow!("booking not stored: {}", booking.id));
        }
        state.bookings.insert(booking.id.clone(), booking.clone());
        Ok(())
    }

    fn count_completed(&self, client_id: &str) -> Result<u32> {
        let state = self.lock()?;
        Ok(state
            .bookings
            .values()
            .filter(|b| b.client_id == client_id)
            .filter(|b| b.status == crate::domain::models::booking::BookingStatus::Completed)
            .count() as u32)
    }

    fn list_bookings(&self, client_id: &str) -> Result<Vec<Booking>> {
        let state = self.lock()?;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| b.client_id == client_id)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.start);
        Ok(bookings)
    }
}

impl CouponStorage for MemoryRepository {
    fn store_coupon(&self, coupon: &Coupon) -> Result<()> {
        coupon.validate().map_err(|reason| anyhow!(reason))?;
        self.lock()?.coupons.insert(coupon.id.clone(), coupon.clone());
        Ok(())
    }

    fn get_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        let state = self.lock()?;
        Ok(state
            .coupons
            .values()
            .find(|c| c.code.eq_ignore_ascii_case(code))
            .cloned())
    }

    fn increment_uses(&self, coupon_id: &str) -> Result<bool> {
        let mut state = self.lock()?;
        let coupon = state
            .coupons
            .get_mut(coupon_id)
            .ok_or_else(|| anyhow!("coupon not stored: {coupon_id}"))?;
        if coupon.exhausted() {
            return Ok(false);
        }
        coupon.uses += 1;
        Ok(true)
    }
}

impl LoyaltyStorage for MemoryRepository {
    fn get_balance(
        &self,
        user_id: &str,
        category: PointCategory,
    ) -> Result<Option<LoyaltyBalance>> {
        Ok(self
            .lock()?
            .balances
            .get(&(user_id.to_string(), category))
            .cloned())
    }

    fn upsert_balance(&self, balance: &LoyaltyBalance) -> Result<()> {
        self.lock()?.balances.insert(
            (balance.user_id.clone(), balance.category),
            balance.clone(),
        );
        Ok(())
    }

    fn append_transaction(&self, transaction: &BonusTransaction) -> Result<()> {
        self.lock()?.transactions.push(transaction.clone());
        Ok(())
    }

    fn find_transaction_by_booking(&self, booking_id: &str) -> Result<Option<BonusTransaction>> {
        let state = self.lock()?;
        Ok(state
            .transactions
            .iter()
            .find(|t| {
                t.category == PointCategory::BookingPoints
                    && t.booking_id.as_deref() == Some(booking_id)
            })
            .cloned())
    }

    fn list_transactions(&self, user_id: &str) -> Result<Vec<BonusTransaction>> {
        let state = self.lock()?;
        Ok(state
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    fn record_accrual(
        &self,
        balance: &LoyaltyBalance,
        transaction: &BonusTransaction,
    ) -> Result<AccrualOutcome> {
        let mut state = self.lock()?;
        if let Some(booking_id) = &transaction.booking_id {
            let duplicate = state.transactions.iter().any(|t| {
                t.category == PointCategory::BookingPoints
                    && t.booking_id.as_deref() == Some(booking_id.as_str())
            });
            if duplicate && transaction.category == PointCategory::BookingPoints {
                return Ok(AccrualOutcome::DuplicateBooking);
            }
        }
        state.balances.insert(
            (balance.user_id.clone(), balance.category),
            balance.clone(),
        );
        state.transactions.push(transaction.clone());
        Ok(AccrualOutcome::Recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn record_accrual_guards_booking_rows() {
        let conn = MemoryConnection::new();
        let repo = conn.create_loyalty_repository();
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0).unwrap();

        let balance = LoyaltyBalance {
            user_id: "client::a".to_string(),
            category: PointCategory::BookingPoints,
            points: 10,
            expires_at: now + chrono::Duration::days(180),
            updated_at: now,
        };
        let tx = BonusTransaction {
            id: BonusTransaction::generate_id(),
            user_id: "client::a".to_string(),
            booking_id: Some("booking::b".to_string()),
            category: PointCategory::BookingPoints,
            points: 10,
            description: "test".to_string(),
            created_at: now,
        };

        assert_eq!(repo.record_accrual(&balance, &tx).unwrap(), AccrualOutcome::Recorded);
        let again = BonusTransaction {
            id: BonusTransaction::generate_id(),
            ..tx.clone()
        };
        assert_eq!(
            repo.record_accrual(&balance, &again).unwrap(),
            AccrualOutcome::DuplicateBooking
        );
        assert_eq!(repo.list_transactions("client::a").unwrap().len(), 1);
    }

    #[test]
    fn increment_uses_stops_at_the_ceiling() {
        let conn = MemoryConnection::new();
        let repo = conn.create_coupon_repository();
        let coupon = Coupon {
            id: Coupon::generate_id(),
            code: "LAST-ONE".to_string(),
            coupon_type: crate::domain::models::coupon::CouponType::Fixed,
            scope: crate::domain::models::coupon::CouponScope::Global,
            service_id: None,
            professional_id: None,
            user_id: None,
            value: 5.0,
            min_booking_value: None,
            max_uses: Some(1),
            uses: 0,
            active: true,
            starts_at: None,
            ends_at: None,
            created_at: Utc::now(),
        };
        repo.store_coupon(&coupon).unwrap();

        assert!(repo.increment_uses(&coupon.id).unwrap());
        assert!(!repo.increment_uses(&coupon.id).unwrap());
        let stored = repo.get_coupon_by_code("last-one").unwrap().unwrap();
        assert_eq!(stored.uses, 1);
    }
}
