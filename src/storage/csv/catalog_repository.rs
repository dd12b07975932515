//! CSV-based catalog repository: services as priced and timed per
//! professional.

use anyhow::{Context, Result};
use csv::{Reader, Writer};
use log::info;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};

use super::connection::CsvConnection;
use crate::domain::models::service_offering::ServiceOffering;
use crate::storage::traits::CatalogStorage;

const OFFERINGS_FILE: &str = "offerings.csv";
const HEADER: [&str; 4] = ["service_id", "professional_id", "price", "duration_minutes"];

#[derive(Clone)]
pub struct CatalogRepository {
    connection: CsvConnection,
}

impl CatalogRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_offerings(&self) -> Result<Vec<ServiceOffering>> {
        let file_path = self.connection.file_path(OFFERINGS_FILE);
        if !file_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&file_path)
            .with_context(|| format!("opening {}", file_path.display()))?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut offerings = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            offerings.push(ServiceOffering {
                service_id: record.get(0).unwrap_or("").to_string(),
                professional_id: record.get(1).unwrap_or("").to_string(),
                price: record
                    .get(2)
                    .unwrap_or("0")
                    .parse::<f64>()
                    .context("invalid price in offerings.csv")?,
                duration_minutes: record
                    .get(3)
                    .unwrap_or("0")
                    .parse::<i64>()
                    .context("invalid duration in offerings.csv")?,
            });
        }
        Ok(offerings)
    }

    fn write_offerings(&self, offerings: &[ServiceOffering]) -> Result<()> {
        let file_path = self.connection.file_path(OFFERINGS_FILE);
        let temp_path = file_path.with_extension("tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;
            let mut csv_writer = Writer::from_writer(BufWriter::new(file));

            csv_writer.write_record(HEADER)?;
            for offering in offerings {
                csv_writer.write_record(&[
                    offering.service_id.as_str(),
                    offering.professional_id.as_str(),
                    &offering.price.to_string(),
                    &offering.duration_minutes.to_string(),
                ])?;
            }
            csv_writer.flush()?;
        }

        std::fs::rename(&temp_path, &file_path)?;
        Ok(())
    }
}

impl CatalogStorage for CatalogRepository {
    fn store_offering(&self, offering: &ServiceOffering) -> Result<()> {
        info!(
            "Storing offering: {} by {}",
            offering.service_id, offering.professional_id
        );
        let _guard = self.connection.lock_writes();
        let mut offerings = self.read_offerings()?;
        offerings.retain(|existing| {
            !(existing.service_id == offering.service_id
                && existing.professional_id == offering.professional_id)
        });
        offerings.push(offering.clone());
        self.write_offerings(&offerings)
    }

    fn get_offering(
        &self,
        service_id: &str,
        professional_id: &str,
    ) -> Result<Option<ServiceOffering>> {
        let offerings = self.read_offerings()?;
        Ok(offerings.into_iter().find(|offering| {
            offering.service_id == service_id && offering.professional_id == professional_id
        }))
    }

    fn list_offerings(&self, professional_id: &str) -> Result<Vec<ServiceOffering>> {
        let mut offerings: Vec<ServiceOffering> = self
            .read_offerings()?
            .into_iter()
            .filter(|offering| offering.professional_id == professional_id)
            .collect();
        offerings.sort_by(|a, b| a.service_id.cmp(&b.service_id));
        Ok(offerings)
    }
}
