use super::ObservationSource;
use crate::errors::{AppError, AppResult};
use crate::state::Observation;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};

const DATE_FIELDS: &[&str] = &["date", "日期"];
const PRICE_FIELDS: &[&str] = &["price", "期貨價格"];

/// CSV file with a date column and a price column. Other columns are ignored.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl ObservationSource for FileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn try_fetch(&self) -> AppResult<Vec<Observation>> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| AppError::Io(format!("read {}: {e}", self.path.display())))?;
        parse_csv(&bytes)
    }
}

/// Parse observations from CSV bytes, keeping row order.
/// Missing date or price header is an error; unparseable rows are skipped.
pub fn parse_csv(bytes: &[u8]) -> AppResult<Vec<Observation>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let date_idx = find_column(&headers, DATE_FIELDS)
        .ok_or_else(|| AppError::Source(format!("missing date column (one of {DATE_FIELDS:?})")))?;
    let price_idx = find_column(&headers, PRICE_FIELDS)
        .ok_or_else(|| AppError::Source(format!("missing price column (one of {PRICE_FIELDS:?})")))?;

    let mut observations = Vec::new();
    // Byte records so a stray non-UTF-8 cell costs one row, not the file
    for (row, record) in reader.byte_records().enumerate() {
        let record = record?;
        let (Some(raw_date), Some(raw_price)) = (
            utf8_cell(&record, date_idx),
            utf8_cell(&record, price_idx),
        ) else {
            tracing::warn!(row = row + 1, "skipping row with non-UTF-8 date or price");
            continue;
        };

        let Some(timestamp) = parse_timestamp(raw_date) else {
            tracing::warn!(row = row + 1, value = raw_date, "skipping row with bad date");
            continue;
        };
        let price = match raw_price.replace(',', "").parse::<f64>() {
            Ok(p) if p.is_finite() && p > 0.0 => p,
            _ => {
                tracing::warn!(row = row + 1, value = raw_price, "skipping row with bad price");
                continue;
            }
        };
        observations.push(Observation::new(timestamp, price));
    }

    Ok(observations)
}

fn utf8_cell(record: &csv::ByteRecord, idx: usize) -> Option<&str> {
    std::str::from_utf8(record.get(idx).unwrap_or(b"")).ok()
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.trim_start_matches('\u{feff}');
        names.iter().any(|n| h.eq_ignore_ascii_case(n))
    })
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}
