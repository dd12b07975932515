//! Typed failures surfaced by the domain services.
//!
//! Every rejection a caller can observe has its own variant; `kind()` groups
//! them into the coarse classes a transport layer would map to status codes.
//! Storage failures are folded in from `anyhow::Error` so repository calls
//! can use `?` directly.

use thiserror::Error;

use crate::domain::models::BookingStatus;

/// Coarse classification of a [`DomainError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    Conflict,
    PermissionDenied,
    BusinessRuleViolation,
    Storage,
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("client not found: {0}")]
    UserNotFound(String),

    #[error("professional not found: {0}")]
    ProfessionalNotFound(String),

    #[error("service not offered by this professional: {0}")]
    ServiceNotFound(String),

    #[error("booking not found: {0}")]
    BookingNotFound(String),

    #[error("invalid coupon: {0}")]
    InvalidCoupon(&'static str),

    #[error("booking start must not be in the past")]
    InvalidDateTime,

    #[error("service {0} has a non-positive duration")]
    InvalidDuration(String),

    #[error("service {0} has a non-positive price")]
    InvalidPrice(String),

    #[error("at least one service is required")]
    EmptyServiceList,

    #[error("time slot already booked: conflicts with {0}")]
    TimeSlotAlreadyBooked(String),

    #[error("bonus points already assigned for booking {0}")]
    BonusAlreadyAssigned(String),

    #[error("a coupon and bonus points cannot be combined")]
    CouponBonusConflict,

    #[error("coupon not applicable: {0}")]
    CouponNotApplicable(String),

    #[error("insufficient bonus points: {available} available, {required} required")]
    InsufficientBonusPoints { available: i64, required: i64 },

    #[error("booking is {found}, expected {expected}")]
    InvalidBookingStatus {
        expected: BookingStatus,
        found: BookingStatus,
    },

    #[error("booking update rejected: {0}")]
    BookingUpdateError(String),

    #[error("loyalty milestone not reached: {completed} completed bookings, {required} required")]
    MilestoneNotReached { completed: u32, required: u32 },

    #[error("booking earns no points")]
    NoPointsEarned,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::UserNotFound(_)
            | DomainError::ProfessionalNotFound(_)
            | DomainError::ServiceNotFound(_)
            | DomainError::BookingNotFound(_) => ErrorKind::NotFound,

            DomainError::InvalidDateTime
            | DomainError::InvalidDuration(_)
            | DomainError::InvalidPrice(_)
            | DomainError::EmptyServiceList => ErrorKind::InvalidInput,

            DomainError::TimeSlotAlreadyBooked(_) | DomainError::BonusAlreadyAssigned(_) => {
                ErrorKind::Conflict
            }

            DomainError::BookingUpdateError(_) => ErrorKind::PermissionDenied,

            DomainError::CouponBonusConflict
            | DomainError::InvalidCoupon(_)
            | DomainError::CouponNotApplicable(_)
            | DomainError::InsufficientBonusPoints { .. }
            | DomainError::InvalidBookingStatus { .. }
            | DomainError::MilestoneNotReached { .. }
            | DomainError::NoPointsEarned => ErrorKind::BusinessRuleViolation,

            DomainError::Storage(_) => ErrorKind::Storage,
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
