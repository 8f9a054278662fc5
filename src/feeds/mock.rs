use super::ObservationSource;
use crate::errors::AppResult;
use crate::state::Observation;
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Synthetic futures series: a straight upward ramp, one point per day.
pub struct MockSource {
    pub start: DateTime<Utc>,
    pub days: usize,
    pub from_price: f64,
    pub to_price: f64,
}

impl Default for MockSource {
    fn default() -> Self {
        Self {
            start: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).single().unwrap_or_default(),
            days: 10,
            from_price: 18800.0,
            to_price: 19100.0,
        }
    }
}

impl MockSource {
    /// Evenly spaced prices, both endpoints included.
    pub fn generate(&self) -> Vec<Observation> {
        let n = self.days;
        (0..n)
            .map(|i| {
                let price = if n <= 1 {
                    self.from_price
                } else if i == n - 1 {
                    self.to_price
                } else {
                    self.from_price + (self.to_price - self.from_price) * i as f64 / (n - 1) as f64
                };
                Observation::new(self.start + Duration::days(i as i64), price)
            })
            .collect()
    }
}

impl ObservationSource for MockSource {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn try_fetch(&self) -> AppResult<Vec<Observation>> {
        Ok(self.generate())
    }
}
