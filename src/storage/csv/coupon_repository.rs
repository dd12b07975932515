//! CSV-based coupon repository.

use anyhow::{anyhow, Context, Result};
use csv::{Reader, Writer};
use log::info;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};

use super::connection::CsvConnection;
use crate::domain::models::coupon::{Coupon, CouponScope, CouponType};
use crate::storage::traits::CouponStorage;

const COUPONS_FILE: &str = "coupons.csv";
const HEADER: [&str; 15] = [
    "id",
    "code",
    "coupon_type",
    "scope",
    "service_id",
    "professional_id",
    "user_id",
    "value",
    "min_booking_value",
    "max_uses",
    "uses",
    "active",
    "starts_at",
    "ends_at",
    "created_at",
];

#[derive(Clone)]
pub struct CouponRepository {
    connection: CsvConnection,
}

impl CouponRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    fn read_coupons(&self) -> Result<Vec<Coupon>> {
        let file_path = self.connection.file_path(COUPONS_FILE);
        if !file_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&file_path)
            .with_context(|| format!("opening {}", file_path.display()))?;
        let mut csv_reader = Reader::from_reader(BufReader::new(file));

        let mut coupons = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            let code = record.get(1).unwrap_or("").to_string();
            let coupon_type = CouponType::parse(record.get(2).unwrap_or(""))
                .ok_or_else(|| anyhow!("unknown coupon type for {code}"))?;
            let scope = CouponScope::parse(record.get(3).unwrap_or(""))
                .ok_or_else(|| anyhow!("unknown coupon scope for {code}"))?;

            coupons.push(Coupon {
                id: record.get(0).unwrap_or("").to_string(),
                code,
                coupon_type,
                scope,
                service_id: optional_string(record.get(4)),
                professional_id: optional_string(record.get(5)),
                user_id: optional_string(record.get(6)),
                value: record
                    .get(7)
                    .unwrap_or("0")
                    .parse::<f64>()
                    .context("invalid value in coupons.csv")?,
                min_booking_value: optional_f64(record.get(8))?,
                max_uses: optional_u32(record.get(9))?,
                uses: record
                    .get(10)
                    .unwrap_or("0")
                    .parse::<u32>()
                    .context("invalid uses in coupons.csv")?,
                active: record.get(11).unwrap_or("false") == "true",
                starts_at: super::parse_optional_rfc3339(record.get(12).unwrap_or(""))?,
                ends_at: super::parse_optional_rfc3339(record.get(13).unwrap_or(""))?,
                created_at: super::parse_rfc3339(record.get(14).unwrap_or(""))?,
            });
        }
        Ok(coupons)
    }

    fn write_coupons(&self, coupons: &[Coupon]) -> Result<()> {
        let file_path = self.connection.file_path(COUPONS_FILE);
        let temp_path = file_path.with_extension("tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;
            let mut csv_writer = Writer::from_writer(BufWriter::new(file));

            csv_writer.write_record(HEADER)?;
            for coupon in coupons {
                csv_writer.write_record(&[
                    coupon.id.as_str(),
                    coupon.code.as_str(),
                    coupon.coupon_type.as_str(),
                    coupon.scope.as_str(),
                    coupon.service_id.as_deref().unwrap_or(""),
                    coupon.professional_id.as_deref().unwrap_or(""),
                    coupon.user_id.as_deref().unwrap_or(""),
                    &coupon.value.to_string(),
                    &coupon
                        .min_booking_value
                        .map(|v| v.to_string())
                        .unwrap_or_default(),
                    &coupon.max_uses.map(|v| v.to_string()).unwrap_or_default(),
                    &coupon.uses.to_string(),
                    if coupon.active { "true" } else { "false" },
                    &super::format_optional_rfc3339(&coupon.starts_at),
                    &super::format_optional_rfc3339(&coupon.ends_at),
                    &coupon.created_at.to_rfc3339(),
                ])?;
            }
            csv_writer.flush()?;
        }

        std::fs::rename(&temp_path, &file_path)?;
        Ok(())
    }
}

fn optional_string(value: Option<&str>) -> Option<String> {
    match value {
        Some("") | None => None,
        Some(v) => Some(v.to_string()),
    }
}

fn optional_f64(value: Option<&str>) -> Result<Option<f64>> {
    match value {
        Some("") | None => Ok(None),
        Some(v) => Ok(Some(v.parse::<f64>().context("invalid number in coupons.csv")?)),
    }
}

fn optional_u32(value: Option<&str>) -> Result<Option<u32>> {
    match value {
        Some("") | None => Ok(None),
        Some(v) => Ok(Some(v.parse::<u32>().context("invalid count in coupons.csv")?)),
    }
}

impl CouponStorage for CouponRepository {
    fn store_coupon(&self, coupon: &Coupon) -> Result<()> {
        coupon.validate().map_err(|reason| anyhow!(reason))?;
        info!("Storing coupon: {} ({})", coupon.code, coupon.id);

        let _guard = self.connection.lock_writes();
        let mut coupons = self.read_coupons()?;
        if coupons
            .iter()
            .any(|existing| existing.id != coupon.id && existing.code.eq_ignore_ascii_case(&coupon.code))
        {
            return Err(anyhow!("coupon code already exists: {}", coupon.code));
        }
        coupons.retain(|existing| existing.id != coupon.id);
        coupons.push(coupon.clone());
        self.write_coupons(&coupons)
    }

    fn get_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        let coupons = self.read_coupons()?;
        Ok(coupons
            .into_iter()
            .find(|coupon| coupon.code.eq_ignore_ascii_case(code)))
    }

    fn increment_uses(&self, coupon_id: &str) -> Result<bool> {
        // Increment-with-ceiling under the write lock; a concurrent redemption
        // that loses the race observes `false` instead of overshooting.
        let _guard = self.connection.lock_writes();

        let mut coupons = self.read_coupons()?;
        let coupon = coupons
            .iter_mut()
            .find(|c| c.id == coupon_id)
            .ok_or_else(|| anyhow!("coupon not stored: {coupon_id}"))?;

        if coupon.exhausted() {
            return Ok(false);
        }
        coupon.uses += 1;
        let uses = coupon.uses;
        self.write_coupons(&coupons)?;
        info!("Coupon {coupon_id} now at {uses} uses");
        Ok(true)
    }
}
