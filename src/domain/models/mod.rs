//! Domain models for the booking backend.

pub mod bonus;
pub mod booking;
pub mod coupon;
pub mod service_offering;
pub mod user;

pub use bonus::{BonusTransaction, LoyaltyBalance, PointCategory};
pub use booking::{Booking, BookingItem, BookingStatus};
pub use coupon::{Coupon, CouponScope, CouponType};
pub use service_offering::ServiceOffering;
pub use user::{Client, Professional};
