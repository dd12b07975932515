//! Test utilities for the CSV backend: RAII-based cleanup and seed helpers
//! so repository tests always run against a fresh, self-deleting directory.

use anyhow::Result;
use chrono::{TimeZone, Utc};
use std::path::PathBuf;
use tempfile::TempDir;

use super::connection::CsvConnection;
use crate::domain::models::service_offering::ServiceOffering;
use crate::domain::models::user::{Client, Professional};
use crate::storage::traits::{CatalogStorage, Connection, UserStorage};

/// RAII test environment. The temp directory lives as long as the struct and
/// is removed on drop, even when a test panics.
pub struct TestEnvironment {
    _temp_dir: TempDir,
    pub connection: CsvConnection,
    pub base_path: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let base_path = temp_dir.path().to_path_buf();
        let connection = CsvConnection::new(&base_path)?;

        Ok(TestEnvironment {
            _temp_dir: temp_dir,
            connection,
            base_path,
        })
    }

    /// Seed a client with a fixed creation time.
    pub fn seed_client(&self, id: &str, name: &str) -> Result<Client> {
        let client = Client {
            id: id.to_string(),
            name: name.to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        };
        self.connection.create_user_repository().store_client(&client)?;
        Ok(client)
    }

    /// Seed a professional with a fixed creation time.
    pub fn seed_professional(&self, id: &str, name: &str) -> Result<Professional> {
        let professional = Professional {
            id: id.to_string(),
            name: name.to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        };
        self.connection
            .create_user_repository()
            .store_professional(&professional)?;
        Ok(professional)
    }

    /// Seed a catalog entry.
    pub fn seed_offering(
        &self,
        service_id: &str,
        professional_id: &str,
        price: f64,
        duration_minutes: i64,
    ) -> Result<ServiceOffering> {
        let offering = ServiceOffering {
            service_id: service_id.to_string(),
            professional_id: professional_id.to_string(),
            price,
            duration_minutes,
        };
        self.connection
            .create_catalog_repository()
            .store_offering(&offering)?;
        Ok(offering)
    }
}
