//! CSV-based loyalty ledger repository.
//!
//! Two files: `loyalty_balances.csv` holds the current bucket per user and
//! category (overwritten wholesale on accrual), `bonus_transactions.csv` is
//! the append-only ledger.

use anyhow::{anyhow, Context, Result};
use csv::{Reader, Writer};
use log::info;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use super::connection::CsvConnection;
use crate::domain::models::bonus::{BonusTransaction, LoyaltyBalance, PointCategory};
use crate::storage::traits::{AccrualOutcome, LoyaltyStorage};

const BALANCES_FILE: &str = "loyalty_balances.csv";
const TRANSACTIONS_FILE: &str = "bonus_transactions.csv";
const BALANCES_HEADER: [&str; 5] = ["user_id", "category", "points", "expires_at", "updated_at"];
const TRANSACTIONS_HEADER: [&str; 7] = [
    "id",
    "user_id",
    "booking_id",
    "category",
    "points",
    "description",
    "created_at",
];

#[derive(Clone)]
pub struct BonusRepository {
    connection: CsvConnection,
}

impl BonusRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_balances(&self) -> Result<Vec<LoyaltyBalance>> {
        let file_path = self.connection.file_path(BALANCES_FILE);
        if !file_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&file_path)
            .with_context(|| format!("opening {}", file_path.display()))?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut balances = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            let user_id = record.get(0).unwrap_or("").to_string();
            let category = PointCategory::parse(record.get(1).unwrap_or(""))
                .ok_or_else(|| anyhow!("unknown point category for {user_id}"))?;
            balances.push(LoyaltyBalance {
                user_id,
                category,
                points: record
                    .get(2)
                    .unwrap_or("0")
                    .parse::<i64>()
                    .context("invalid points in loyalty_balances.csv")?,
                expires_at: super::parse_rfc3339(record.get(3).unwrap_or(""))?,
                updated_at: super::parse_rfc3339(record.get(4).unwrap_or(""))?,
            });
        }
        Ok(balances)
    }

    fn write_balances(&self, balances: &[LoyaltyBalance]) -> Result<()> {
        let file_path = self.connection.file_path(BALANCES_FILE);
        let temp_path = file_path.with_extension("tmp");

        {
            let file = open_truncated(&temp_path)?;
            let mut csv_writer = Writer::from_writer(BufWriter::new(file));

            csv_writer.write_record(BALANCES_HEADER)?;
            for balance in balances {
                csv_writer.write_record(&[
                    balance.user_id.as_str(),
                    balance.category.as_str(),
                    &balance.points.to_string(),
                    &balance.expires_at.to_rfc3339(),
                    &balance.updated_at.to_rfc3339(),
                ])?;
            }
            csv_writer.flush()?;
        }

        std::fs::rename(&temp_path, &file_path)?;
        Ok(())
    }

    fn read_transactions(&self) -> Result<Vec<BonusTransaction>> {
        let file_path = self.connection.file_path(TRANSACTIONS_FILE);
        if !file_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&file_path)
            .with_context(|| format!("opening {}", file_path.display()))?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut transactions = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            let id = record.get(0).unwrap_or("").to_string();
            let category = PointCategory::parse(record.get(3).unwrap_or(""))
                .ok_or_else(|| anyhow!("unknown point category in ledger row {id}"))?;
            let booking_field = record.get(2).unwrap_or("");

            transactions.push(BonusTransaction {
                id,
                user_id: record.get(1).unwrap_or("").to_string(),
                booking_id: if booking_field.is_empty() {
                    None
                } else {
                    Some(booking_field.to_string())
                },
                category,
                points: record
                    .get(4)
                    .unwrap_or("0")
                    .parse::<i64>()
                    .context("invalid points in bonus_transactions.csv")?,
                description: record.get(5).unwrap_or("").to_string(),
                created_at: super::parse_rfc3339(record.get(6).unwrap_or(""))?,
            });
        }
        Ok(transactions)
    }

    fn write_transactions(&self, transactions: &[BonusTransaction]) -> Result<()> {
        let file_path = self.connection.file_path(TRANSACTIONS_FILE);
        let temp_path = file_path.with_extension("tmp");

        {
            let file = open_truncated(&temp_path)?;
            let mut csv_writer = Writer::from_writer(BufWriter::new(file));

            csv_writer.write_record(TRANSACTIONS_HEADER)?;
            for transaction in transactions {
                csv_writer.write_record(&[
                    transaction.id.as_str(),
                    transaction.user_id.as_str(),
                    transaction.booking_id.as_deref().unwrap_or(""),
                    transaction.category.as_str(),
                    &transaction.points.to_string(),
                    transaction.description.as_str(),
                    &transaction.created_at.to_rfc3339(),
                ])?;
            }
            csv_writer.flush()?;
        }

        std::fs::rename(&temp_path, &file_path)?;
        Ok(())
    }

    fn upsert_balance_locked(&self, balance: &LoyaltyBalance) -> Result<()> {
        let mut balances = self.read_balances()?;
        balances.retain(|existing| {
            !(existing.user_id == balance.user_id && existing.category == balance.category)
        });
        balances.push(balance.clone());
        self.write_balances(&balances)
    }
}

fn open_truncated(path: &Path) -> Result<File> {
    Ok(OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?)
}

impl LoyaltyStorage for BonusRepository {
    fn get_balance(
        &self,
        user_id: &str,
        category: PointCategory,
    ) -> Result<Option<LoyaltyBalance>> {
        let balances = self.read_balances()?;
        Ok(balances
            .into_iter()
            .find(|b| b.user_id == user_id && b.category == category))
    }

    fn upsert_balance(&self, balance: &LoyaltyBalance) -> Result<()> {
        let _guard = self.connection.lock_writes();
        self.upsert_balance_locked(balance)
    }

    fn append_transaction(&self, transaction: &BonusTransaction) -> Result<()> {
        let _guard = self.connection.lock_writes();
        let mut transactions = self.read_transactions()?;
        transactions.push(transaction.clone());
        self.write_transactions(&transactions)
    }

    fn find_transaction_by_booking(&self, booking_id: &str) -> Result<Option<BonusTransaction>> {
        let transactions = self.read_transactions()?;
        Ok(transactions.into_iter().find(|t| {
            t.category == PointCategory::BookingPoints
                && t.booking_id.as_deref() == Some(booking_id)
        }))
    }

    fn list_transactions(&self, user_id: &str) -> Result<Vec<BonusTransaction>> {
        let transactions = self.read_transactions()?;
        Ok(transactions
            .into_iter()
            .filter(|t| t.user_id == user_id)
            .collect())
    }

    fn record_accrual(
        &self,
        balance: &LoyaltyBalance,
        transaction: &BonusTransaction,
    ) -> Result<AccrualOutcome> {
        // Balance overwrite + ledger append under one lock; the per-booking
        // guard is checked inside the same critical section.
        let _guard = self.connection.lock_writes();

        let mut transactions = self.read_transactions()?;
        if transaction.category == PointCategory::BookingPoints {
            if let Some(booking_id) = &transaction.booking_id {
                let duplicate = transactions.iter().any(|t| {
                    t.category == PointCategory::BookingPoints
                        && t.booking_id.as_deref() == Some(booking_id.as_str())
                });
                if duplicate {
                    return Ok(AccrualOutcome::DuplicateBooking);
                }
            }
        }

        // The ledger append goes first: replaying a ledger row over a stale
        // balance is recoverable, a balance without its ledger row is not.
        transactions.push(transaction.clone());
        self.write_transactions(&transactions)?;
        self.upsert_balance_locked(balance)?;

        info!(
            "Recorded {} accrual of {} points for {}",
            transaction.category, transaction.points, transaction.user_id
        );
        Ok(AccrualOutcome::Recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::csv::test_utils::TestEnvironment;
    use crate::storage::traits::Connection;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0).unwrap()
    }

    fn balance(points: i64) -> LoyaltyBalance {
        LoyaltyBalance {
            user_id: "client::ana".to_string(),
            category: PointCategory::BookingPoints,
            points,
            expires_at: now() + Duration::days(180),
            updated_at: now(),
        }
    }

    fn accrual_row(booking_id: &str, points: i64) -> BonusTransaction {
        BonusTransaction {
            id: BonusTransaction::generate_id(),
            user_id: "client::ana".to_string(),
            booking_id: Some(booking_id.to_string()),
            category: PointCategory::BookingPoints,
            points,
            description: format!("Points earned for booking {booking_id}"),
            created_at: now(),
        }
    }

    #[test]
    fn accrual_writes_both_files() {
        let env = TestEnvironment::new().unwrap();
        let repo = env.connection.create_loyalty_repository();

        let outcome = repo
            .record_accrual(&balance(10), &accrual_row("booking::one", 10))
            .unwrap();
        assert_eq!(outcome, AccrualOutcome::Recorded);

        let stored = repo
            .get_balance("client::ana", PointCategory::BookingPoints)
            .unwrap()
            .unwrap();
        assert_eq!(stored.points, 10);
        let row = repo.find_transaction_by_booking("booking::one").unwrap().unwrap();
        assert_eq!(row.points, 10);
    }

    #[test]
    fn duplicate_booking_row_blocks_the_accrual() {
        let env = TestEnvironment::new().unwrap();
        let repo = env.connection.create_loyalty_repository();

        repo.record_accrual(&balance(10), &accrual_row("booking::one", 10))
            .unwrap();
        let outcome = repo
            .record_accrual(&balance(20), &accrual_row("booking::one", 10))
            .unwrap();
        assert_eq!(outcome, AccrualOutcome::DuplicateBooking);

        // Neither file moved.
        let stored = repo
            .get_balance("client::ana", PointCategory::BookingPoints)
            .unwrap()
            .unwrap();
        assert_eq!(stored.points, 10);
        assert_eq!(repo.list_transactions("client::ana").unwrap().len(), 1);
    }

    #[test]
    fn redemption_rows_do_not_trip_the_guard() {
        let env = TestEnvironment::new().unwrap();
        let repo = env.connection.create_loyalty_repository();

        let redemption = BonusTransaction {
            booking_id: None,
            points: -5,
            ..accrual_row("unused", 0)
        };
        repo.append_transaction(&redemption).unwrap();

        let outcome = repo
            .record_accrual(&balance(10), &accrual_row("booking::one", 10))
            .unwrap();
        assert_eq!(outcome, AccrualOutcome::Recorded);
    }

    #[test]
    fn balances_are_keyed_by_user_and_category() {
        let env = TestEnvironment::new().unwrap();
        let repo = env.connection.create_loyalty_repository();

        repo.upsert_balance(&balance(10)).unwrap();
        let loyalty = LoyaltyBalance {
            category: PointCategory::Loyalty,
            points: 30,
            ..balance(0)
        };
        repo.upsert_balance(&loyalty).unwrap();
        // Overwriting one bucket leaves the other alone.
        repo.upsert_balance(&balance(15)).unwrap();

        assert_eq!(
            repo.get_balance("client::ana", PointCategory::BookingPoints)
                .unwrap()
                .unwrap()
                .points,
            15
        );
        assert_eq!(
            repo.get_balance("client::ana", PointCategory::Loyalty)
                .unwrap()
                .unwrap()
                .points,
            30
        );
        assert!(repo
            .get_balance("client::other", PointCategory::Loyalty)
            .unwrap()
            .is_none());
    }
}
