pub mod routes;

use crate::errors::{AppError, AppResult};
use crate::state::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Bind the dashboard port. Port 0 disables the dashboard.
pub async fn bind(port: u16) -> AppResult<Option<TcpListener>> {
    if port == 0 {
        return Ok(None);
    }
    let addr = format!("0.0.0.0:{port}");
    TcpListener::bind(&addr)
        .await
        .map(Some)
        .map_err(|e| AppError::Io(format!("bind {addr}: {e}")))
}

pub fn router(state: Arc<AppState>) -> axum::Router {
    axum::Router::new()
        .route("/api/report", axum::routing::get(routes::get_report))
        .route("/api/series", axum::routing::get(routes::get_series))
        .route("/api/evaluate", axum::routing::get(routes::evaluate))
        .route("/api/counters", axum::routing::get(routes::get_counters))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::feeds::PriceSource;
    use crate::report::Report;

    async fn spawn_dashboard() -> (String, Arc<AppState>) {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        let source = PriceSource::from_config(&config).await;
        let initial = Report::empty("mock", config.params.clone());
        let state = AppState::new(config, source, initial);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), state)
    }

    #[tokio::test]
    async fn test_evaluate_publishes_report() {
        let (base, state) = spawn_dashboard().await;
        let client = reqwest::Client::new();

        let body: serde_json::Value = client
            .get(format!("{base}/api/evaluate?option_type=put&threshold=0.1"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let rows = body["report"]["evaluations"].as_array().unwrap();
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0]["fair_price"], 170.0);
        assert_eq!(rows[0]["signal"], "sell option");

        let latest: serde_json::Value = client
            .get(format!("{base}/api/series"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(latest["series"].as_array().unwrap().len(), 10);

        use portable_atomic::Ordering::Relaxed;
        assert_eq!(state.counters.runs_completed.load(Relaxed), 1);
        assert_eq!(state.counters.evaluations_emitted.load(Relaxed), 10);
        assert_eq!(state.report_rx.borrow().seq, 1);
    }

    #[tokio::test]
    async fn test_bind_disabled_and_taken_port() {
        assert!(bind(0).await.unwrap().is_none());

        let held = TcpListener::bind("0.0.0.0:0").await.unwrap();
        let port = held.local_addr().unwrap().port();
        assert!(matches!(bind(port).await, Err(AppError::Io(_))));
    }

    #[tokio::test]
    async fn test_bad_override_is_400() {
        let (base, _state) = spawn_dashboard().await;
        let resp = reqwest::get(format!("{base}/api/evaluate?threshold=2"))
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400);
    }
}
