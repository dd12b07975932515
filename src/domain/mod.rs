//! Domain layer: models, commands, and the services implementing the
//! scheduling, pricing, and loyalty rules. Services are generic over the
//! storage [`Connection`](crate::storage::traits::Connection) and take the
//! current instant as an explicit parameter, so every rule is testable
//! against the in-memory backend at a frozen clock.

pub mod bonus_service;
pub mod booking_service;
pub mod calendar;
pub mod commands;
pub mod config;
pub mod errors;
pub mod models;
pub mod pricing_service;

pub use bonus_service::BonusService;
pub use booking_service::BookingService;
pub use config::{LoyaltyConfig, PricingConfig};
pub use errors::{DomainError, DomainResult, ErrorKind};
pub use pricing_service::PricingService;
