mod broker;
mod config;
mod errors;
mod evaluator;
mod feeds;
mod pricing;
mod report;
mod server;
mod state;

use crate::feeds::PriceSource;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    // Structured logging to stderr; stdout carries the report table
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("option_arb_signal starting");

    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        source = cfg.source.name(),
        strike = cfg.params.strike_price,
        option_type = %cfg.params.option_type,
        threshold = cfg.params.threshold,
        days_to_expiration = cfg.params.days_to_expiration,
        "parameters loaded"
    );

    // Bind before any brokerage session exists so a taken port leaks nothing
    let listener = match server::bind(cfg.server_port).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("dashboard error: {e}");
            std::process::exit(1);
        }
    };

    // Live sources open their brokerage session here and keep it until close()
    let source = PriceSource::from_config(&cfg).await;

    let report = report::run_once(&source, &cfg.params).await;
    print!("{}", report.render_table());

    if let Some(path) = cfg.report_csv.as_deref() {
        match report.write_csv(path) {
            Ok(()) => tracing::info!(path = %path.display(), "report written"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "report export failed"),
        }
    }

    let Some(listener) = listener else {
        source.close().await;
        return;
    };

    let app_state = AppState::new(cfg, source, report.clone());
    app_state.counters.record(&report);
    let app = server::router(app_state.clone());

    match listener.local_addr() {
        Ok(addr) => tracing::info!("dashboard listening on {addr}"),
        Err(e) => tracing::warn!("dashboard listening, address unknown: {e}"),
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("signal handler error: {e}");
        }
        tracing::info!("shutdown requested");
    };

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
        tracing::error!("server error: {e}");
    }

    app_state.source.close().await;
    tracing::info!("option_arb_signal stopped");
}
