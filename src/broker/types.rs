use crate::errors::{AppError, AppResult};
use crate::state::Observation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Token brokerage ──

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub api_key: &'a str,
    pub secret: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: Option<String>,
    pub expires_at: Option<String>,
}

// Token brokerage quote format:
// {
//   "symbol": "TXFR1",
//   "last": "18812",
//   "bid": "18811",
//   "ask": "18813",
//   "datetime": "2024-03-01T13:44:59+08:00"
// }

#[derive(Debug, Clone, Deserialize)]
pub struct TokenQuote {
    #[allow(dead_code)]
    pub symbol: Option<String>,
    pub last: Option<String>,
    #[allow(dead_code)]
    pub bid: Option<String>,
    #[allow(dead_code)]
    pub ask: Option<String>,
    pub datetime: Option<String>,
}

impl TokenQuote {
    pub fn to_observation(&self) -> AppResult<Observation> {
        let last = self
            .last
            .as_deref()
            .ok_or_else(|| AppError::Parse("quote has no last price".into()))?;
        let price: f64 = last
            .parse()
            .map_err(|_| AppError::Parse(format!("invalid price string: {last}")))?;
        let timestamp = match self.datetime.as_deref() {
            Some(s) => parse_quote_time(s)?,
            None => Utc::now(),
        };
        checked_observation(timestamp, price)
    }
}

// ── Signed brokerage ──

#[derive(Debug, Clone, Deserialize)]
pub struct SessionResponse {
    pub session_id: Option<String>,
    #[allow(dead_code)]
    pub account: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotResponse {
    pub quote: Option<SnapshotQuote>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotQuote {
    #[allow(dead_code)]
    pub symbol: Option<String>,
    pub last_price: Option<f64>,
    /// Exchange time, epoch milliseconds
    pub ts_ms: Option<i64>,
}

impl SnapshotQuote {
    pub fn to_observation(&self) -> AppResult<Observation> {
        let price = self
            .last_price
            .ok_or_else(|| AppError::Parse("snapshot has no last_price".into()))?;
        let timestamp = match self.ts_ms {
            Some(ms) => DateTime::from_timestamp_millis(ms)
                .ok_or_else(|| AppError::Parse(format!("invalid ts_ms: {ms}")))?,
            None => Utc::now(),
        };
        checked_observation(timestamp, price)
    }
}

fn checked_observation(timestamp: DateTime<Utc>, price: f64) -> AppResult<Observation> {
    if price <= 0.0 || !price.is_finite() {
        return Err(AppError::Parse(format!("invalid price: {price}")));
    }
    Ok(Observation::new(timestamp, price))
}

pub fn parse_quote_time(s: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc())
        })
        .map_err(|e| AppError::Parse(format!("quote time {s}: {e}")))
}
