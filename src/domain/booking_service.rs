//! Booking creation and the booking status machine.
//!
//! Creation snapshots catalog prices and durations into the booking's items
//! and atomically reserves the professional's time slot. Confirmation settles
//! the final price (optionally consuming a coupon use or redeeming points);
//! cancellation frees the slot and records the reason in the notes.

use log::{info, warn};
use std::sync::Arc;

use crate::domain::calendar::span_end;
use crate::domain::commands::bookings::{
    CreateBookingCommand, CreateBookingResult, UpdateBookingStatusCommand,
    UpdateBookingStatusResult,
};
use crate::domain::config::round_currency;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::booking::{Booking, BookingItem, BookingStatus};
use crate::domain::{BonusService, PricingService};
use crate::storage::traits::{
    BookingStorage, CatalogStorage, Connection, CouponStorage, SlotReservation, UserStorage,
};
use chrono::{DateTime, Utc};

const MAX_CANCEL_REASON_CHARS: usize = 500;

/// Service managing booking creation and status transitions.
#[derive(Clone)]
pub struct BookingService<C: Connection> {
    user_repository: C::UserRepository,
    catalog_repository: C::CatalogRepository,
    booking_repository: C::BookingRepository,
    coupon_repository: C::CouponRepository,
    pricing_service: PricingService<C>,
    bonus_service: BonusService<C>,
}

impl<C: Connection> BookingService<C> {
    pub fn new(
        connection: Arc<C>,
        pricing_service: PricingService<C>,
        bonus_service: BonusService<C>,
    ) -> Self {
        Self {
            user_repository: connection.create_user_repository(),
            catalog_repository: connection.create_catalog_repository(),
            booking_repository: connection.create_booking_repository(),
            coupon_repository: connection.create_coupon_repository(),
            pricing_service,
            bonus_service,
        }
    }

    /// Create a pending booking, snapshotting prices and durations from the
    /// catalog and atomically reserving the professional's slot.
    pub fn create_booking(
        &self,
        command: CreateBookingCommand,
        now: DateTime<Utc>,
    ) -> DomainResult<CreateBookingResult> {
        info!(
            "Creating booking for client {} with {} at {}",
            command.client_id, command.professional_id, command.start
        );

        if command.start < now {
            return Err(DomainError::InvalidDateTime);
        }

        self.user_repository
            .get_client(&command.client_id)?
            .ok_or_else(|| DomainError::UserNotFound(command.client_id.clone()))?;
        self.user_repository
            .get_professional(&command.professional_id)?
            .ok_or_else(|| DomainError::ProfessionalNotFound(command.professional_id.clone()))?;

        if command.service_ids.is_empty() {
            return Err(DomainError::EmptyServiceList);
        }

        let mut items = Vec::with_capacity(command.service_ids.len());
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
            items.push(BookingItem {
                service_id: service_id.clone(),
                unit_price: offering.price,
                duration_minutes: offering.duration_minutes,
            });
        }

        let total_value = round_currency(items.iter().map(|item| item.unit_price).sum());
        let duration: i64 = items.iter().map(|item| item.duration_minutes).sum();
        let end = span_end(command.start, duration);

        let booking = Booking {
            id: Booking::generate_id(),
            client_id: command.client_id,
            professional_id: command.professional_id,
            start: command.start,
            end,
            status: BookingStatus::Pending,
            items,
            notes: command.notes,
            total_value,
            final_value: total_value,
            confirmed_at: None,
            canceled_at: None,
            created_at: now,
        };

        match self.booking_repository.reserve(&booking)? {
            SlotReservation::Reserved => {
                info!("Booking {} reserved until {}", booking.id, booking.end);
                Ok(CreateBookingResult { booking })
            }
            SlotReservation::Conflict(existing) => {
                warn!(
                    "Slot conflict for {}: {} occupies [{}, {})",
                    booking.professional_id, existing.id, existing.start, existing.end
                );
                Err(DomainError::TimeSlotAlreadyBooked(existing.id))
            }
        }
    }

    /// Drive a booking through its status machine. Only the pending →
    /// confirmed and non-canceled → canceled edges are exposed here.
    pub fn update_status(
        &self,
        command: UpdateBookingStatusCommand,
        now: DateTime<Utc>,
    ) -> DomainResult<UpdateBookingStatusResult> {
        let booking = self
            .booking_repository
            .get_booking(&command.booking_id)?
            .ok_or_else(|| DomainError::BookingNotFound(command.booking_id.clone()))?;

        match command.new_status {
            BookingStatus::Confirmed => self.confirm(booking, command, now),
            BookingStatus::Canceled => self.cancel(booking, command, now),
            other => Err(DomainError::BookingUpdateError(format!(
                "unsupported target status: {other}"
            ))),
        }
    }

    /// Confirm a pending booking, settling the final price. Exactly one of
    /// coupon / points may be supplied; the discount is consumed here, not at
    /// preview time.
    fn confirm(
        &self,
        mut booking: Booking,
        command: UpdateBookingStatusCommand,
        now: DateTime<Utc>,
    ) -> DomainResult<UpdateBookingStatusResult> {
        if booking.status != BookingStatus::Pending {
            return Err(DomainError::InvalidBookingStatus {
                expected: BookingStatus::Pending,
                found: booking.status,
            });
        }
        if command.actor_id != booking.professional_id {
            return Err(DomainError::BookingUpdateError(
                "only the assigned professional can confirm this booking".to_string(),
            ));
        }

        let service_ids: Vec<String> = booking
            .items
            .iter()
            .map(|item| item.service_id.clone())
            .collect();
        let (breakdown, coupon) = self.pricing_service.settle(
            &booking.client_id,
            &booking.professional_id,
            &service_ids,
            booking.total_value,
            command.coupon_code.as_deref(),
            command.use_bonus_points,
            now,
        )?;

        // Consume the discount before flipping the status: a failure here
        // leaves the booking pending and nothing spent.
        if let Some(coupon) = coupon {
            if !self.coupon_repository.increment_uses(&coupon.id)? {
                return Err(DomainError::InvalidCoupon("limit reached"));
            }
            info!(
                "Coupon {} consumed on booking {} (discount {:.2})",
                coupon.code, booking.id, breakdown.coupon_discount
            );
        } else if breakdown.points_used > 0 {
            self.bonus_service.redeem_points(
                &booking.client_id,
                breakdown.points_used,
                &booking.id,
                now,
            )?;
        }

        booking.status = BookingStatus::Confirmed;
        booking.confirmed_at = Some(now);
        booking.final_value = breakdown.final_value;
        self.booking_repository.update_booking(&booking)?;

        info!(
            "Booking {} confirmed at final value {:.2}",
            booking.id, booking.final_value
        );
        Ok(UpdateBookingStatusResult { booking })
    }

    /// Cancel a booking, freeing its slot. Allowed from any non-canceled
    /// status, by either party.
    fn cancel(
        &self,
        mut booking: Booking,
        command: UpdateBookingStatusCommand,
        now: DateTime<Utc>,
    ) -> DomainResult<UpdateBookingStatusResult> {
        if booking.status == BookingStatus::Canceled {
            return Err(DomainError::BookingUpdateError(
                "booking is already canceled".to_string(),
            ));
        }
        if command.actor_id != booking.client_id && command.actor_id != booking.professional_id {
            return Err(DomainError::BookingUpdateError(
                "only the booking's client or professional can cancel it".to_string(),
            ));
        }

        if let Some(reason) = &command.reason {
            if reason.chars().count() > MAX_CANCEL_REASON_CHARS {
                return Err(DomainError::BookingUpdateError(format!(
                    "cancellation reason exceeds {MAX_CANCEL_REASON_CHARS} characters"
                )));
            }
            let annotation = format!("Motivo do cancelamento: {reason}");
            booking.notes = Some(match booking.notes.take() {
                Some(notes) => format!("{notes}\n{annotation}"),
                None => annotation,
            });
        }

        booking.status = BookingStatus::Canceled;
        booking.canceled_at = Some(now);
        self.booking_repository.update_booking(&booking)?;

        info!("Booking {} canceled by {}", booking.id, command.actor_id);
        Ok(UpdateBookingStatusResult { booking })
    }
}
