//! CSV connection: owns the data directory and the write lock.

use anyhow::Result;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// CsvConnection manages file paths and serializes composite writes.
///
/// Every repository created from the same connection shares the base
/// directory and the write lock. Reads go through the lock too when they are
/// part of a check-then-act sequence (slot reservation, accrual recording,
/// coupon use counting), which is what makes those sequences atomic on a
/// plain-files backend.
///
/// The lock lives in the connection, not the directory: open one connection
/// per data directory per process and clone it wherever repositories are
/// needed. Two independently-opened connections over the same directory do
/// not serialize against each other.
#[derive(Clone)]
pub struct CsvConnection {
    base_directory: Arc<Mutex<PathBuf>>,
    write_guard: Arc<Mutex<()>>,
}

impl CsvConnection {
    /// Create a new CSV connection with a base directory.
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
            info!("Created data directory: {}", base_path.display());
        }

        Ok(Self {
            base_directory: Arc::new(Mutex::new(base_path)),
            write_guard: Arc::new(Mutex::new(())),
        })
    }

    /// Create a new CSV connection in the default data directory
    /// (~/Documents/Booking Tracker).
    pub fn new_default() -> Result<Self> {
        let home_dir = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| anyhow::anyhow!("Could not determine home directory"))?;

        let data_dir = PathBuf::from(home_dir)
            .join("Documents")
            .join("Booking Tracker");

        info!("Using default data directory: {}", data_dir.display());
        Self::new(data_dir)
    }

    /// Absolute path of a CSV file inside the data directory.
    pub fn file_path(&self, file_name: &str) -> PathBuf {
        let base = self
            .base_directory
            .lock()
            .expect("base directory lock poisoned");
        base.join(file_name)
    }

    /// Take the connection-wide write lock. Held for the duration of any
    /// read-modify-write on a CSV file.
    pub fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_guard.lock().expect("write lock poisoned")
    }
}
