//! Price resolution for bookings.
//!
//! Combines the multi-service total with at most one discount source: a
//! coupon code or a loyalty-point redemption, never both. The resolver is a
//! pure computation over already-stored data — it neither consumes coupon
//! uses nor spends points. Consumption happens when a booking is confirmed
//! (see `booking_service`), which runs the same arithmetic over the booking's
//! snapshotted items.

use log::{debug, info};
use std::sync::Arc;

use crate::domain::commands::pricing::{PriceBreakdown, PricePreviewCommand};
use crate::domain::config::{round_currency, PricingConfig};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::bonus::PointCategory;
use crate::domain::models::coupon::{Coupon, CouponScope, CouponType};
use crate::storage::traits::{CatalogStorage, Connection, CouponStorage, LoyaltyStorage, UserStorage};
use chrono::{DateTime, Utc};

/// Service computing price breakdowns.
#[derive(Clone)]
pub struct PricingService<C: Connection> {
    user_repository: C::UserRepository,
    catalog_repository: C::CatalogRepository,
    coupon_repository: C::CouponRepository,
    loyalty_repository: C::LoyaltyRepository,
    config: PricingConfig,
}

impl<C: Connection> PricingService<C> {
    pub fn new(connection: Arc<C>) -> Self {
        Self::with_config(connection, PricingConfig::default())
    }

    pub fn with_config(connection: Arc<C>, config: PricingConfig) -> Self {
        Self {
            user_repository: connection.create_user_repository(),
            catalog_repository: connection.create_catalog_repository(),
            coupon_repository: connection.create_coupon_repository(),
            loyalty_repository: connection.create_loyalty_repository(),
            config,
        }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Quote a price for a prospective booking. Read-only; may be called any
    /// number of times with identical inputs and returns identical output.
    pub fn preview_price(
        &self,
        command: PricePreviewCommand,
        now: DateTime<Utc>,
    ) -> DomainResult<PriceBreakdown> {
        info!(
            "Price preview for client {} with {} ({} services)",
            command.client_id,
            command.professional_id,
            command.service_ids.len()
        );

        self.user_repository
            .get_client(&command.client_id)?
            .ok_or_else(|| DomainError::UserNotFound(command.client_id.clone()))?;
        self.user_repository
            .get_professional(&command.professional_id)?
            .ok_or_else(|| DomainError::ProfessionalNotFound(command.professional_id.clone()))?;

        if command.service_ids.is_empty() {
            return Err(DomainError::EmptyServiceList);
        }

        let mut total = 0.0;
        for service_id in &command.service_ids {
            let offering = self
                .catalog_repository
                .get_offering(service_id, &command.professional_id)?
                .ok_or_else(|| DomainError::ServiceNotFound(service_id.clone()))?;
            if offering.duration_minutes <= 0 {
                return Err(DomainError::InvalidDuration(service_id.clone()));
            }
            if offering.price <= 0.0 {
                return Err(DomainError::InvalidPrice(service_id.clone()));
            }
            total += offering.price;
        }
        let total = round_currency(total);

        let (breakdown, _) = self.settle(
            &command.client_id,
            &command.professional_id,
            &command.service_ids,
            total,
            command.coupon_code.as_deref(),
            command.use_bonus_points,
            now,
        )?;
        Ok(breakdown)
    }

    /// Resolve the discounts against an already-computed total. Returns the
    /// matched coupon (when a code was supplied) so the confirmation step can
    /// consume a use without a second lookup.
    pub(crate) fn settle(
        &self,
        client_id: &str,
        professional_id: &str,
        service_ids: &[String],
        total_value: f64,
        coupon_code: Option<&str>,
        use_bonus_points: bool,
        now: DateTime<Utc>,
    ) -> DomainResult<(PriceBreakdown, Option<Coupon>)> {
        if coupon_code.is_some() && use_bonus_points {
            return Err(DomainError::CouponBonusConflict);
        }

        if let Some(code) = coupon_code {
            let (breakdown, coupon) =
                self.apply_coupon(code, client_id, professional_id, service_ids, total_value, now)?;
            return Ok((breakdown, Some(coupon)));
        }

        if use_bonus_points {
            let breakdown = self.apply_points(client_id, total_value, now)?;
            return Ok((breakdown, None));
        }

        Ok((PriceBreakdown::undiscounted(total_value), None))
    }

    fn apply_coupon(
        &self,
        code: &str,
        client_id: &str,
        professional_id: &str,
        service_ids: &[String],
        total_value: f64,
        now: DateTime<Utc>,
    ) -> DomainResult<(PriceBreakdown, Coupon)> {
        let coupon = self
            .coupon_repository
            .get_coupon_by_code(code)?
            .ok_or(DomainError::InvalidCoupon("not found"))?;

        if !coupon.active {
            return Err(DomainError::InvalidCoupon("inactive"));
        }
        if matches!(coupon.starts_at, Some(starts) if starts > now) {
            return Err(DomainError::InvalidCoupon("not yet valid"));
        }
        if matches!(coupon.ends_at, Some(ends) if ends < now) {
            return Err(DomainError::InvalidCoupon("expired"));
        }
        if coupon.exhausted() {
            return Err(DomainError::InvalidCoupon("limit reached"));
        }

        match coupon.scope {
            CouponScope::Global => {}
            CouponScope::Professional => {
                if coupon.professional_id.as_deref() != Some(professional_id) {
                    return Err(DomainError::CouponNotApplicable(format!(
                        "coupon {} is restricted to another professional",
                        coupon.code
                    )));
                }
            }
            CouponScope::Service => {
                let applies = coupon
                    .service_id
                    .as_deref()
                    .is_some_and(|sid| service_ids.iter().any(|requested| requested == sid));
                if !applies {
                    return Err(DomainError::CouponNotApplicable(format!(
                        "coupon {} does not cover any requested service",
                        coupon.code
                    )));
                }
            }
            CouponScope::User => {
                if coupon.user_id.as_deref() != Some(client_id) {
                    return Err(DomainError::CouponNotApplicable(format!(
                        "coupon {} is restricted to another client",
                        coupon.code
                    )));
                }
            }
        }

        if matches!(coupon.min_booking_value, Some(min) if total_value < min) {
            return Err(DomainError::CouponNotApplicable(format!(
                "booking value below the coupon minimum of {:.2}",
                coupon.min_booking_value.unwrap_or(0.0)
            )));
        }

        let discount = match coupon.coupon_type {
            CouponType::Percentage => total_value * coupon.value / 100.0,
            CouponType::Fixed => coupon.value.min(total_value),
            CouponType::Free => total_value,
        };
        let discount = round_currency(discount);
        let final_value = round_currency((total_value - discount).max(0.0));

        debug!(
            "Coupon {} applied: total {:.2}, discount {:.2}",
            coupon.code, total_value, discount
        );

        Ok((
            PriceBreakdown {
                total_value,
                coupon_discount: discount,
                points_discount: 0.0,
                points_used: 0,
                final_value,
            },
            coupon,
        ))
    }

    fn apply_points(
        &self,
        client_id: &str,
        total_value: f64,
        now: DateTime<Utc>,
    ) -> DomainResult<PriceBreakdown> {
        let mut total_points = 0_i64;
        for category in PointCategory::ALL {
            if let Some(balance) = self.loyalty_repository.get_balance(client_id, category)? {
                total_points += balance.redeemable_at(now);
            }
        }

        if total_points < self.config.min_redeemable_points {
            return Err(DomainError::InsufficientBonusPoints {
                available: total_points,
                required: self.config.min_redeemable_points,
            });
        }

        // The floor never exceeds the total itself, so a cheap booking with
        // no redeemable headroom keeps its undiscounted price.
        let floor = self.config.min_booking_value_after_discount.min(total_value);
        let max_discount = (total_value - floor).max(0.0);
        let max_points = (max_discount / self.config.value_per_point).floor() as i64;
        let points_used = total_points.min(max_points);
        let discount = round_currency(points_used as f64 * self.config.value_per_point);
        let final_value = round_currency((total_value - discount).max(floor));

        debug!(
            "Points applied for {client_id}: {points_used} of {total_points} available, discount {discount:.2}"
        );

        Ok(PriceBreakdown {
            total_value,
            coupon_discount: 0.0,
            points_discount: discount,
            points_used,
            final_value,
        })
    }
}
