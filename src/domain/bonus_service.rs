//! Loyalty-point accrual, redemption and balance reporting.
//!
//! Two buckets per user: booking points (earned per completed booking) and
//! loyalty points (earned per completed-bookings milestone). Every balance
//! change overwrites the bucket wholesale and appends a ledger row; the
//! bucket's single expiration restarts on accrual but never on redemption.

use log::{info, warn};
use std::sync::Arc;

use crate::domain::calendar::add_months_clamped;
use crate::domain::commands::bonus::{
    AccrueBookingPointsCommand, AccrueBookingPointsResult, AccrueLoyaltyMilestoneCommand,
    AccrueLoyaltyMilestoneResult, BalanceSummary,
};
use crate::domain::config::LoyaltyConfig;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::bonus::{BonusTransaction, LoyaltyBalance, PointCategory};
use crate::domain::models::booking::BookingStatus;
use crate::storage::traits::{AccrualOutcome, BookingStorage, Connection, LoyaltyStorage, UserStorage};
use chrono::{DateTime, Utc};

/// Service managing the loyalty ledger.
#[derive(Clone)]
pub struct BonusService<C: Connection> {
    user_repository: C::UserRepository,
    booking_repository: C::BookingRepository,
    loyalty_repository: C::LoyaltyRepository,
    config: LoyaltyConfig,
}

impl<C: Connection> BonusService<C> {
    pub fn new(connection: Arc<C>) -> Self {
        Self::with_config(connection, LoyaltyConfig::default())
    }

    pub fn with_config(connection: Arc<C>, config: LoyaltyConfig) -> Self {
        Self {
            user_repository: connection.create_user_repository(),
            booking_repository: connection.create_booking_repository(),
            loyalty_repository: connection.create_loyalty_repository(),
            config,
        }
    }

    pub fn config(&self) -> &LoyaltyConfig {
        &self.config
    }

    /// Award booking points for a completed booking. At most one accrual per
    /// booking, enforced both by an upfront ledger check and atomically inside
    /// the storage write.
    pub fn accrue_booking_points(
        &self,
        command: AccrueBookingPointsCommand,
        now: DateTime<Utc>,
    ) -> DomainResult<AccrueBookingPointsResult> {
        info!(
            "Accruing booking points for {} on {}",
            command.user_id, command.booking_id
        );

        self.user_repository
            .get_client(&command.user_id)?
            .ok_or_else(|| DomainError::UserNotFound(command.user_id.clone()))?;

        let booking = self
            .booking_repository
            .get_booking(&command.booking_id)?
            .ok_or_else(|| DomainError::BookingNotFound(command.booking_id.clone()))?;

        if booking.client_id != command.user_id {
            return Err(DomainError::BookingUpdateError(
                "booking does not belong to this user".to_string(),
            ));
        }
        if booking.status != BookingStatus::Completed {
            return Err(DomainError::InvalidBookingStatus {
                expected: BookingStatus::Completed,
                found: booking.status,
            });
        }

        let points = ((booking.final_value / 10.0).floor() as i64) * self.config.points_per_10_currency;
        if points <= 0 {
            return Err(DomainError::NoPointsEarned);
        }

        if self
            .loyalty_repository
            .find_transaction_by_booking(&command.booking_id)?
            .is_some()
        {
            return Err(DomainError::BonusAlreadyAssigned(command.booking_id));
        }

        // Expired points vanish from the running total here: the overwrite is
        // seeded from what is still redeemable, not from the raw bucket.
        let current = self
            .loyalty_repository
            .get_balance(&command.user_id, PointCategory::BookingPoints)?
            .map(|balance| balance.redeemable_at(now))
            .unwrap_or(0);

        let expires_at = add_months_clamped(now, self.config.expiration_months);
        let new_balance = LoyaltyBalance {
            user_id: command.user_id.clone(),
            category: PointCategory::BookingPoints,
            points: current + points,
            expires_at,
            updated_at: now,
        };
        let transaction = BonusTransaction {
            id: BonusTransaction::generate_id(),
            user_id: command.user_id.clone(),
            booking_id: Some(command.booking_id.clone()),
            category: PointCategory::BookingPoints,
            points,
            description: format!("Points earned for booking {}", command.booking_id),
            created_at: now,
        };

        match self.loyalty_repository.record_accrual(&new_balance, &transaction)? {
            AccrualOutcome::Recorded => Ok(AccrueBookingPointsResult {
                points_awarded: points,
                new_balance: current + points,
                expires_at,
            }),
            AccrualOutcome::DuplicateBooking => {
                warn!(
                    "Concurrent accrual detected for booking {}",
                    command.booking_id
                );
                Err(DomainError::BonusAlreadyAssigned(command.booking_id))
            }
        }
    }

    /// Recompute the loyalty bucket from the user's completed-booking count.
    /// On-demand and idempotent between milestones: re-running with the same
    /// count rewrites the same total.
    pub fn accrue_loyalty_milestone(
        &self,
        command: AccrueLoyaltyMilestoneCommand,
        now: DateTime<Utc>,
    ) -> DomainResult<AccrueLoyaltyMilestoneResult> {
        self.user_repository
            .get_client(&command.user_id)?
            .ok_or_else(|| DomainError::UserNotFound(command.user_id.clone()))?;

        // A zero threshold would divide by zero below; treat it as 1.
        let threshold = self.config.milestone_threshold.max(1);
        let completed = self.booking_repository.count_completed(&command.user_id)?;
        if completed < threshold {
            return Err(DomainError::MilestoneNotReached {
                completed,
                required: threshold,
            });
        }

        let milestones = (completed / threshold) as i64;
        let total = milestones * self.config.points_per_milestone;

        let expires_at = add_months_clamped(now, self.config.expiration_months);
        let new_balance = LoyaltyBalance {
            user_id: command.user_id.clone(),
            category: PointCategory::Loyalty,
            points: total,
            expires_at,
            updated_at: now,
        };
        let transaction = BonusTransaction {
            id: BonusTransaction::generate_id(),
            user_id: command.user_id.clone(),
            booking_id: None,
            category: PointCategory::Loyalty,
            points: total,
            description: format!("Loyalty milestone: {completed} completed bookings"),
            created_at: now,
        };

        self.loyalty_repository
            .record_accrual(&new_balance, &transaction)?;

        info!(
            "Loyalty bucket for {} recomputed to {} points ({} completed bookings)",
            command.user_id, total, completed
        );

        Ok(AccrueLoyaltyMilestoneResult {
            completed_bookings: completed,
            new_balance: total,
            expires_at,
        })
    }

    /// Redeemable points per bucket plus the soonest upcoming expiration.
    pub fn get_balance_summary(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<BalanceSummary> {
        self.user_repository
            .get_client(user_id)?
            .ok_or_else(|| DomainError::UserNotFound(user_id.to_string()))?;

        let mut booking_points = 0;
        let mut loyalty_points = 0;
        let mut next_expiration: Option<DateTime<Utc>> = None;

        for category in PointCategory::ALL {
            let Some(balance) = self.loyalty_repository.get_balance(user_id, category)? else {
                continue;
            };
            let redeemable = balance.redeemable_at(now);
            if redeemable == 0 {
                continue;
            }
            match category {
                PointCategory::BookingPoints => booking_points = redeemable,
                PointCategory::Loyalty => loyalty_points = redeemable,
            }
            next_expiration = Some(match next_expiration {
                Some(soonest) => soonest.min(balance.expires_at),
                None => balance.expires_at,
            });
        }

        Ok(BalanceSummary {
            booking_points,
            loyalty_points,
            total_points: booking_points + loyalty_points,
            next_expiration,
        })
    }

    /// Spend `points` across the user's buckets, booking points first. Each
    /// drained bucket keeps its expiration; redeeming never extends a
    /// bucket's life. Ledger rows carry negative deltas and no booking id.
    pub(crate) fn redeem_points(
        &self,
        user_id: &str,
        points: i64,
        booking_id: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if points <= 0 {
            return Ok(());
        }

        let mut available = 0;
        let mut buckets = Vec::new();
        for category in PointCategory::ALL {
            if let Some(balance) = self.loyalty_repository.get_balance(user_id, category)? {
                let redeemable = balance.redeemable_at(now);
                if redeemable > 0 {
                    available += redeemable;
                    buckets.push((balance, redeemable));
                }
            }
        }

        if available < points {
            return Err(DomainError::InsufficientBonusPoints {
                available,
                required: points,
            });
        }

        let mut remaining = points;
        for (balance, redeemable) in buckets {
            if remaining == 0 {
                break;
            }
            let used = redeemable.min(remaining);
            remaining -= used;

            let drained = LoyaltyBalance {
                points: redeemable - used,
                updated_at: now,
                ..balance.clone()
            };
            let transaction = BonusTransaction {
                id: BonusTransaction::generate_id(),
                user_id: user_id.to_string(),
                booking_id: None,
                category: balance.category,
                points: -used,
                description: format!("Points redeemed on booking {booking_id}"),
                created_at: now,
            };
            self.loyalty_repository.upsert_balance(&drained)?;
            self.loyalty_repository.append_transaction(&transaction)?;
        }

        info!("Redeemed {points} points for {user_id} on {booking_id}");
        Ok(())
    }
}
