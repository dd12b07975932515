//! CSV-based booking repository.
//!
//! Bookings live in a single `bookings.csv`; the item snapshots are stored as
//! a JSON-encoded column so a booking and its items always land in one row
//! (and therefore one atomic file rewrite).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::{Reader, Writer};
use log::{info, warn};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};

use super::connection::CsvConnection;
use crate::domain::models::booking::{Booking, BookingItem, BookingStatus};
use crate::storage::traits::{BookingStorage, SlotReservation};

const BOOKINGS_FILE: &str = "bookings.csv";
const HEADER: [&str; 13] = [
    "id",
    "client_id",
    "professional_id",
    "start",
    "end",
    "status",
    "items",
    "notes",
    "total_value",
    "final_value",
    "confirmed_at",
    "canceled_at",
    "created_at",
];

#[derive(Clone)]
pub struct BookingRepository {
    connection: CsvConnection,
}

impl BookingRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_bookings(&self) -> Result<Vec<Booking>> {
        let file_path = self.connection.file_path(BOOKINGS_FILE);
        if !file_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&file_path)
            .with_context(|| format!("opening {}", file_path.display()))?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut bookings = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            let id = record.get(0).unwrap_or("").to_string();
            let status_field = record.get(5).unwrap_or("");
            let status = match BookingStatus::parse(status_field) {
                Some(status) => status,
                None => {
                    warn!("Skipping booking {id} with unknown status '{status_field}'");
                    continue;
                }
            };
            let items: Vec<BookingItem> = serde_json::from_str(record.get(6).unwrap_or("[]"))
                .with_context(|| format!("invalid items column for booking {id}"))?;
            let notes_field = record.get(7).unwrap_or("");

            bookings.push(Booking {
                id,
                client_id: record.get(1).unwrap_or("").to_string(),
                professional_id: record.get(2).unwrap_or("").to_string(),
                start: super::parse_rfc3339(record.get(3).unwrap_or(""))?,
                end: super::parse_rfc3339(record.get(4).unwrap_or(""))?,
                status,
                items,
                notes: if notes_field.is_empty() {
                    None
                } else {
                    Some(notes_field.to_string())
                },
                total_value: record
                    .get(8)
                    .unwrap_or("0")
                    .parse::<f64>()
                    .context("invalid total_value in bookings.csv")?,
                final_value: record
                    .get(9)
                    .unwrap_or("0")
                    .parse::<f64>()
                    .context("invalid final_value in bookings.csv")?,
                confirmed_at: super::parse_optional_rfc3339(record.get(10).unwrap_or(""))?,
                canceled_at: super::parse_optional_rfc3339(record.get(11).unwrap_or(""))?,
                created_at: super::parse_rfc3339(record.get(12).unwrap_or(""))?,
            });
        }
        Ok(bookings)
    }

    fn write_bookings(&self, bookings: &[Booking]) -> Result<()> {
        let file_path = self.connection.file_path(BOOKINGS_FILE);
        let temp_path = file_path.with_extension("tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;
            let mut csv_writer = Writer::from_writer(BufWriter::new(file));

            csv_writer.write_record(HEADER)?;
            for booking in bookings {
                let items = serde_json::to_string(&booking.items)?;
                csv_writer.write_record(&[
                    booking.id.as_str(),
                    booking.client_id.as_str(),
                    booking.professional_id.as_str(),
                    &booking.start.to_rfc3339(),
                    &booking.end.to_rfc3339(),
                    booking.status.as_str(),
                    &items,
                    booking.notes.as_deref().unwrap_or(""),
                    &booking.total_value.to_string(),
                    &booking.final_value.to_string(),
                    &super::format_optional_rfc3339(&booking.confirmed_at),
                    &super::format_optional_rfc3339(&booking.canceled_at),
                    &booking.created_at.to_rfc3339(),
                ])?;
            }
            csv_writer.flush()?;
        }

        std::fs::rename(&temp_path, &file_path)?;
        Ok(())
    }

    fn overlapping_in(
        bookings: &[Booking],
        professional_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_booking_id: Option<&str>,
    ) -> Option<Booking> {
        bookings
            .iter()
            .filter(|b| b.professional_id == professional_id)
            .filter(|b| b.blocks_slot())
            .filter(|b| exclude_booking_id != Some(b.id.as_str()))
            .find(|b| b.overlaps(start, end))
            .cloned()
    }
}

impl BookingStorage for BookingRepository {
    fn reserve(&self, booking: &Booking) -> Result<SlotReservation> {
        // Check-then-insert happens under the connection's write lock so two
        // concurrent reservations cannot both pass the overlap scan.
        let _guard = self.connection.lock_writes();

        let mut bookings = self.read_bookings()?;
        if let Some(existing) = Self::overlapping_in(
            &bookings,
            &booking.professional_id,
            booking.start,
            booking.end,
            None,
        ) {
            info!(
                "Reservation for {} rejected: overlaps {}",
                booking.professional_id, existing.id
            );
            return Ok(SlotReservation::Conflict(existing));
        }

        bookings.push(booking.clone());
        self.write_bookings(&bookings)?;
        info!("Reserved booking {} for {}", booking.id, booking.professional_id);
        Ok(SlotReservation::Reserved)
    }

    fn get_booking(&self, booking_id: &str) -> Result<Option<Booking>> {
        let bookings = self.read_bookings()?;
        Ok(bookings.into_iter().find(|b| b.id == booking_id))
    }

    fn find_overlapping(
        &self,
        professional_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_booking_id: Option<&str>,
    ) -> Result<Option<Booking>> {
        let bookings = self.read_bookings()?;
        Ok(Self::overlapping_in(
            &bookings,
            professional_id,
            start,
            end,
            exclude_booking_id,
        ))
    }

    fn update_booking(&self, booking: &Booking) -> Result<()> {
        let _guard = self.connection.lock_writes();
        let mut bookings = self.read_bookings()?;
        let slot = bookings
            .iter_mut()
            .find(|b| b.id == booking.id)
            .ok_or_else(|| anyhow::anyhow!("booking not stored: {}", booking.id))?;
        *slot = booking.clone();
        self.write_bookings(&bookings)
    }

    fn count_completed(&self, client_id: &str) -> Result<u32> {
        let bookings = self.read_bookings()?;
        Ok(bookings
            .iter()
            .filter(|b| b.client_id == client_id && b.status == BookingStatus::Completed)
            .count() as u32)
    }

    fn list_bookings(&self, client_id: &str) -> Result<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .read_bookings()?
            .into_iter()
            .filter(|b| b.client_id == client_id)
            .collect();
        bookings.sort_by_key(|b| b.start);
        Ok(bookings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::csv::test_utils::TestEnvironment;
    use crate::storage::traits::Connection;
    use chrono::{Duration, TimeZone, Utc};

    fn booking_at(id: &str, hour: u32, minutes: i64) -> Booking {
        let start = Utc.with_ymd_and_hms(2026, 3, 10, hour, 0, 0).unwrap();
        Booking {
            id: id.to_string(),
            client_id: "client::ana".to_string(),
            professional_id: "professional::rui".to_string(),
            start,
            end: start + Duration::minutes(minutes),
            status: BookingStatus::Pending,
            items: vec![BookingItem {
                service_id: "service::cut".to_string(),
                unit_price: 50.0,
                duration_minutes: minutes,
            }],
            notes: Some("first visit".to_string()),
            total_value: 50.0,
            final_value: 50.0,
            confirmed_at: None,
            canceled_at: None,
            created_at: start - Duration::days(1),
        }
    }

    #[test]
    fn reserve_round_trips_through_the_file() {
        let env = TestEnvironment::new().unwrap();
        let repo = env.connection.create_booking_repository();

        let booking = booking_at("booking::one", 10, 90);
        assert_eq!(repo.reserve(&booking).unwrap(), SlotReservation::Reserved);

        // A fresh repository over the same directory reads the same row,
        // items and notes included.
        let reread = env
            .connection
            .create_booking_repository()
            .get_booking("booking::one")
            .unwrap()
            .unwrap();
        assert_eq!(reread, booking);
    }

    #[test]
    fn reserve_reports_the_blocking_booking() {
        let env = TestEnvironment::new().unwrap();
        let repo = env.connection.create_booking_repository();

        repo.reserve(&booking_at("booking::one", 10, 90)).unwrap();
        let outcome = repo.reserve(&booking_at("booking::two", 11, 30)).unwrap();
        match outcome {
            SlotReservation::Conflict(existing) => assert_eq!(existing.id, "booking::one"),
            other => panic!("expected conflict, got {other:?}"),
        }

        // Back-to-back is fine; a canceled blocker frees its slot.
        let mut canceled = booking_at("booking::one", 10, 90);
        canceled.status = BookingStatus::Canceled;
        repo.update_booking(&canceled).unwrap();
        assert_eq!(
            repo.reserve(&booking_at("booking::two", 11, 30)).unwrap(),
            SlotReservation::Reserved
        );
    }

    #[test]
    fn counts_and_lists_by_client() {
        let env = TestEnvironment::new().unwrap();
        let repo = env.connection.create_booking_repository();

        let mut completed = booking_at("booking::done", 8, 30);
        completed.status = BookingStatus::Completed;
        repo.reserve(&completed).unwrap();
        repo.reserve(&booking_at("booking::later", 14, 30)).unwrap();

        assert_eq!(repo.count_completed("client::ana").unwrap(), 1);
        assert_eq!(repo.count_completed("client::other").unwrap(), 0);

        let listed = repo.list_bookings("client::ana").unwrap();
        assert_eq!(listed.len(), 2);
        // Sorted by start time, not insertion order.
        assert_eq!(listed[0].id, "booking::done");
    }

    #[test]
    fn update_requires_a_stored_row() {
        let env = TestEnvironment::new().unwrap();
        let repo = env.connection.create_booking_repository();
        assert!(repo.update_booking(&booking_at("booking::ghost", 10, 30)).is_err());
    }
}
