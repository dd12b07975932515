//! CSV-based client and professional repository.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::{Reader, Writer};
use log::info;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};

use super::connection::CsvConnection;
use crate::domain::models::user::{Client, Professional};
use crate::storage::traits::UserStorage;

const CLIENTS_FILE: &str = "clients.csv";
const PROFESSIONALS_FILE: &str = "professionals.csv";
const HEADER: [&str; 3] = ["id", "name", "created_at"];

/// CSV-based user repository. Clients and professionals live in two flat
/// files with identical layouts.
#[derive(Clone)]
pub struct UserRepository {
    connection: CsvConnection,
}

/// One row of either file.
struct PersonRow {
    id: String,
    name: String,
    created_at: DateTime<Utc>,
}

impl UserRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_rows(&self, file_name: &str) -> Result<Vec<PersonRow>> {
        let file_path = self.connection.file_path(file_name);
        if !file_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&file_path)
            .with_context(|| format!("opening {}", file_path.display()))?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut rows = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            rows.push(PersonRow {
                id: record.get(0).unwrap_or("").to_string(),
                name: record.get(1).unwrap_or("").to_string(),
                created_at: super::parse_rfc3339(record.get(2).unwrap_or(""))?,
            });
        }
        Ok(rows)
    }

    fn write_rows(&self, file_name: &str, rows: &[PersonRow]) -> Result<()> {
        let file_path = self.connection.file_path(file_name);
        let temp_path = file_path.with_extension("tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;
            let mut csv_writer = Writer::from_writer(BufWriter::new(file));

            csv_writer.write_record(HEADER)?;
            for row in rows {
                csv_writer.write_record(&[
                    row.id.as_str(),
                    row.name.as_str(),
                    &row.created_at.to_rfc3339(),
                ])?;
            }
            csv_writer.flush()?;
        }

        // Atomic move from temp to final file
        std::fs::rename(&temp_path, &file_path)?;
        Ok(())
    }

    fn upsert(&self, file_name: &str, row: PersonRow) -> Result<()> {
        let _guard = self.connection.lock_writes();
        let mut rows = self.read_rows(file_name)?;
        rows.retain(|existing| existing.id != row.id);
        rows.push(row);
        self.write_rows(file_name, &rows)
    }
}

impl UserStorage for UserRepository {
    fn store_client(&self, client: &Client) -> Result<()> {
        info!("Storing client: {}", client.id);
        self.upsert(
            CLIENTS_FILE,
            PersonRow {
                id: client.id.clone(),
                name: client.name.clone(),
                created_at: client.created_at,
            },
        )
    }

    fn get_client(&self, client_id: &str) -> Result<Option<Client>> {
        let rows = self.read_rows(CLIENTS_FILE)?;
        Ok(rows.into_iter().find(|row| row.id == client_id).map(|row| Client {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }))
    }

    fn store_professional(&self, professional: &Professional) -> Result<()> {
        info!("Storing professional: {}", professional.id);
        self.upsert(
            PROFESSIONALS_FILE,
            PersonRow {
                id: professional.id.clone(),
                name: professional.name.clone(),
                created_at: professional.created_at,
            },
        )
    }

    fn get_professional(&self, professional_id: &str) -> Result<Option<Professional>> {
        let rows = self.read_rows(PROFESSIONALS_FILE)?;
        Ok(rows
            .into_iter()
            .find(|row| row.id == professional_id)
            .map(|row| Professional {
                id: row.id,
                name: row.name,
                created_at: row.created_at,
            }))
    }
}
