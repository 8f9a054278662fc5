use crate::errors::AppResult;
use crate::report::{run_once, Report};
use crate::state::{AppState, OptionType, Parameters};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use std::sync::Arc;

/// Parameter overrides for a re-run. Absent fields keep the configured value.
#[derive(Debug, Default, serde::Deserialize)]
pub struct EvaluateQuery {
    pub strike: Option<f64>,
    pub option_type: Option<String>,
    pub threshold: Option<f64>,
    pub days: Option<u32>,
}

impl EvaluateQuery {
    pub fn apply(&self, base: &Parameters) -> AppResult<Parameters> {
        Parameters::new(
            self.strike.unwrap_or(base.strike_price),
            self.option_type
                .as_deref()
                .map(OptionType::from)
                .unwrap_or_else(|| base.option_type.clone()),
            self.threshold.unwrap_or(base.threshold),
            self.days.unwrap_or(base.days_to_expiration),
        )
    }
}

/// GET /api/report -- latest report (from watch channel, no lock)
pub async fn get_report(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let report = state.report_rx.borrow().clone();
    Json(report_json(&report))
}

/// GET /api/series -- chart series of the latest report
pub async fn get_series(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let report = state.report_rx.borrow().clone();
    Json(serde_json::json!({
        "run_id": report.run_id,
        "series": report.series(),
    }))
}

/// GET /api/evaluate -- re-fetch from the configured source and re-evaluate
/// with parameter overrides. The result becomes the latest report.
pub async fn evaluate(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EvaluateQuery>,
) -> Response {
    let params = match query.apply(&state.config.params) {
        Ok(p) => p,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    // Stamped before fetching: a slow run cannot replace a later one
    let seq = state.next_seq();
    let mut report = run_once(&state.source, &params).await;
    report.seq = seq;
    let body = report_json(&report);
    state.publish(report);
    Json(body).into_response()
}

/// GET /api/counters -- run counters (lock-free reads)
pub async fn get_counters(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    use portable_atomic::Ordering::Relaxed;
    Json(serde_json::json!({
        "runs_completed": state.counters.runs_completed.load(Relaxed),
        "evaluations_emitted": state.counters.evaluations_emitted.load(Relaxed),
        "empty_fetches": state.counters.empty_fetches.load(Relaxed),
    }))
}

fn report_json(report: &Report) -> serde_json::Value {
    serde_json::json!({
        "report": report,
        "summary": report.summary(),
    })
}
