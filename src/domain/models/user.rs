//! Domain models for clients and professionals.
//!
//! Registration and authentication live outside this crate; these records
//! exist so the scheduling core can resolve that the parties of a booking
//! actually exist.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Client {
    /// Format: client::<uuid>
    pub fn generate_id() -> String {
        format!("client::{}", Uuid::new_v4())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Professional {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Professional {
    /// Format: professional::<uuid>
    pub fn generate_id() -> String {
        format!("professional::{}", Uuid::new_v4())
    }
}
