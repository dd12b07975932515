//! Storage layer: abstraction traits plus the CSV (production) and in-memory
//! (test double) backends.

pub mod csv;
pub mod memory;
pub mod traits;

pub use csv::CsvConnection;
pub use memory::MemoryConnection;
pub use traits::{
    AccrualOutcome, BookingStorage, CatalogStorage, Connection, CouponStorage, LoyaltyStorage,
    SlotReservation, UserStorage,
};
