//! Domain model for a catalog entry: a service as offered by one
//! professional, with its price and duration.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub service_id: String,
    pub professional_id: String,
    pub price: f64,
    pub duration_minutes: i64,
}
