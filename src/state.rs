use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::feeds::PriceSource;
use crate::report::Report;
use chrono::{DateTime, Utc};
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

// ── Option Type ──

/// Option type as supplied by the user. Anything other than call/put is
/// kept verbatim and prices to zero.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(into = "String")]
pub enum OptionType {
    Call,
    Put,
    Other(String),
}

impl From<&str> for OptionType {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" => Self::Call,
            "put" => Self::Put,
            _ => Self::Other(s.trim().to_string()),
        }
    }
}

impl From<String> for OptionType {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<OptionType> for String {
    fn from(t: OptionType) -> Self {
        t.to_string()
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

// ── Signal ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Signal {
    #[serde(rename = "buy option")]
    BuyOption,
    #[serde(rename = "sell option")]
    SellOption,
    #[serde(rename = "no arbitrage opportunity")]
    NoArbitrage,
}

impl Signal {
    pub fn label(&self) -> &'static str {
        match self {
            Self::BuyOption => "buy option",
            Self::SellOption => "sell option",
            Self::NoArbitrage => "no arbitrage opportunity",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ── Run parameters (read-only for the duration of a run) ──

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Parameters {
    pub strike_price: f64,
    pub option_type: OptionType,
    /// Half-width of the no-signal band, as a fraction of fair price.
    pub threshold: f64,
    /// Accepted and reported, never used by the intrinsic-value formula.
    pub days_to_expiration: u32,
}

impl Parameters {
    pub fn new(
        strike_price: f64,
        option_type: OptionType,
        threshold: f64,
        days_to_expiration: u32,
    ) -> AppResult<Self> {
        if !strike_price.is_finite() || strike_price <= 0.0 {
            return Err(AppError::Config(format!(
                "strike price must be positive, got {strike_price}"
            )));
        }
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(AppError::Config(format!(
                "threshold must be in (0, 1), got {threshold}"
            )));
        }
        if let OptionType::Other(raw) = &option_type {
            tracing::warn!(option_type = %raw, "unknown option type, fair price will be 0");
        }
        Ok(Self {
            strike_price,
            option_type,
            threshold,
            days_to_expiration,
        })
    }
}

// ── Observation / Evaluation ──

/// A single (timestamp, underlying price) point from a price source.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl Observation {
    #[inline]
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Evaluation {
    pub timestamp: DateTime<Utc>,
    pub underlying_price: f64,
    pub fair_price: f64,
    pub signal: Signal,
}

// ── Counters (lock-free) ──

pub struct RunCounters {
    pub runs_completed: AtomicU64,
    pub evaluations_emitted: AtomicU64,
    pub empty_fetches: AtomicU64,
}

impl RunCounters {
    pub fn new() -> Self {
        Self {
            runs_completed: AtomicU64::new(0),
            evaluations_emitted: AtomicU64::new(0),
            empty_fetches: AtomicU64::new(0),
        }
    }

    /// One evaluation per fetched observation, so `evaluations_emitted`
    /// doubles as the observation count.
    pub fn record(&self, report: &Report) {
        let n = report.evaluations.len() as u64;
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
        self.evaluations_emitted.fetch_add(n, Ordering::Relaxed);
        if n == 0 {
            self.empty_fetches.fetch_add(1, Ordering::Relaxed);
        }
    }
}

// ── Application shared state ──

pub struct AppState {
    pub config: AppConfig,
    pub source: PriceSource,

    // Latest report for the dashboard (single producer per run, many readers)
    pub report_tx: watch::Sender<Report>,
    pub report_rx: watch::Receiver<Report>,

    pub counters: RunCounters,
    run_seq: AtomicU64,
}

impl AppState {
    pub fn new(config: AppConfig, source: PriceSource, initial: Report) -> Arc<Self> {
        let run_seq = AtomicU64::new(initial.seq);
        let (report_tx, report_rx) = watch::channel(initial);
        Arc::new(Self {
            config,
            source,
            report_tx,
            report_rx,
            counters: RunCounters::new(),
            run_seq,
        })
    }

    /// Sequence number for a run about to start.
    pub fn next_seq(&self) -> u64 {
        self.run_seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count the run and make it the latest report unless a run that started
    /// later has already been published. Returns whether it was published.
    pub fn publish(&self, report: Report) -> bool {
        self.counters.record(&report);
        self.report_tx.send_if_modified(|latest| {
            if report.seq > latest.seq {
                *latest = report;
                true
            } else {
                tracing::debug!(seq = report.seq, latest = latest.seq, "stale report dropped");
                false
            }
        })
    }
}
