use crate::errors::AppResult;
use crate::evaluator::evaluate_series;
use crate::feeds::ObservationSource;
use crate::state::{Evaluation, Parameters, Signal};
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::path::Path;

/// Ordered output of one run: every observation the source produced, evaluated.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Report {
    pub run_id: uuid::Uuid,
    /// Dashboard run order; 0 for the startup run.
    pub seq: u64,
    pub generated_at: DateTime<Utc>,
    pub source: &'static str,
    pub params: Parameters,
    pub evaluations: Vec<Evaluation>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SignalSummary {
    pub buy_option: usize,
    pub sell_option: usize,
    pub no_arbitrage: usize,
}

/// One chart point: underlying price over time.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct SeriesPoint {
    pub t: DateTime<Utc>,
    pub price: f64,
}

#[derive(serde::Serialize)]
struct CsvRow<'a> {
    date: String,
    futures_price: f64,
    fair_price: f64,
    signal: &'a str,
}

impl Report {
    pub fn empty(source: &'static str, params: Parameters) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4(),
            seq: 0,
            generated_at: Utc::now(),
            source,
            params,
            evaluations: Vec::new(),
        }
    }

    pub fn summary(&self) -> SignalSummary {
        let mut s = SignalSummary::default();
        for e in &self.evaluations {
            match e.signal {
                Signal::BuyOption => s.buy_option += 1,
                Signal::SellOption => s.sell_option += 1,
                Signal::NoArbitrage => s.no_arbitrage += 1,
            }
        }
        s
    }

    pub fn series(&self) -> Vec<SeriesPoint> {
        self.evaluations
            .iter()
            .map(|e| SeriesPoint {
                t: e.timestamp,
                price: e.underlying_price,
            })
            .collect()
    }

    /// Plain-text table: date, futures price, fair price, signal.
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<20} {:>14} {:>12}  {}",
            "date", "futures_price", "fair_price", "signal"
        );
        for e in &self.evaluations {
            let _ = writeln!(
                out,
                "{:<20} {:>14.2} {:>12.2}  {}",
                format_time(e.timestamp),
                e.underlying_price,
                e.fair_price,
                e.signal
            );
        }
        out
    }

    pub fn write_csv(&self, path: &Path) -> AppResult<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for e in &self.evaluations {
            writer.serialize(CsvRow {
                date: format_time(e.timestamp),
                futures_price: e.underlying_price,
                fair_price: e.fair_price,
                signal: e.signal.label(),
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Fetch from `source` and evaluate everything it returns, in order.
pub async fn run_once<S: ObservationSource>(source: &S, params: &Parameters) -> Report {
    let observations = source.fetch_observations().await;
    let evaluations = evaluate_series(&observations, params);

    let report = Report {
        evaluations,
        ..Report::empty(source.name(), params.clone())
    };
    let summary = report.summary();
    tracing::info!(
        run_id = %report.run_id,
        source = report.source,
        rows = report.evaluations.len(),
        buy = summary.buy_option,
        sell = summary.sell_option,
        none = summary.no_arbitrage,
        "evaluation run complete"
    );
    report
}

fn format_time(t: DateTime<Utc>) -> String {
    if t.time() == chrono::NaiveTime::MIN {
        t.format("%Y-%m-%d").to_string()
    } else {
        t.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::mock::MockSource;
    use crate::state::OptionType;

    fn params(option_type: OptionType) -> Parameters {
        Parameters::new(18970.0, option_type, 0.1, 7).unwrap()
    }

    #[tokio::test]
    async fn test_mock_run_call() {
        let report = run_once(&MockSource::default(), &params(OptionType::Call)).await;
        assert_eq!(report.source, "mock");
        assert_eq!(report.evaluations.len(), 10);
        // Below strike the call is worthless, so every positive price sells.
        assert_eq!(report.evaluations[0].fair_price, 0.0);
        assert_eq!(report.evaluations[0].signal, Signal::SellOption);
        let s = report.summary();
        assert_eq!(s.buy_option + s.sell_option + s.no_arbitrage, 10);
    }

    #[tokio::test]
    async fn test_mock_run_put_fair_prices() {
        let report = run_once(&MockSource::default(), &params(OptionType::Put)).await;
        assert_eq!(report.evaluations[0].fair_price, 170.0);
        assert_eq!(report.evaluations[9].fair_price, 0.0);
    }

    #[test]
    fn test_table_and_series() {
        let mut report = Report::empty("mock", params(OptionType::Call));
        report.evaluations = MockSource::default()
            .generate()
            .iter()
            .map(|o| crate::evaluator::evaluate(o, &report.params))
            .collect();

        let table = report.render_table();
        assert_eq!(table.lines().count(), 11);
        assert!(table.lines().nth(1).unwrap().starts_with("2024-03-01"));
        assert!(table.contains("sell option"));

        let series = report.series();
        assert_eq!(series.len(), 10);
        assert_eq!(series[9].price, 19100.0);
    }

    #[test]
    fn test_empty_report_renders_header_only() {
        let report = Report::empty("file", params(OptionType::Put));
        assert_eq!(report.render_table().lines().count(), 1);
        assert_eq!(report.summary(), SignalSummary::default());
    }

    #[test]
    fn test_csv_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        let mut report = Report::empty("mock", params(OptionType::Put));
        report.evaluations = crate::evaluator::evaluate_series(&MockSource::default().generate(), &report.params);
        report.write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("date,futures_price,fair_price,signal"));
        assert_eq!(lines.next(), Some("2024-03-01,18800.0,170.0,sell option"));
        assert_eq!(text.lines().count(), 11);
    }
}
