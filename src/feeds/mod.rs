pub mod file;
pub mod live;
pub mod mock;

use crate::config::{AppConfig, SourceKind};
use crate::errors::{AppError, AppResult};
use crate::state::Observation;
use std::future::Future;

/// Anything that can supply an ordered series of price observations.
///
/// `try_fetch` reports why data is missing; `fetch_observations` is the
/// soft-failing form the evaluator consumes: every error is logged and
/// becomes an empty series.
pub trait ObservationSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn try_fetch(&self) -> impl Future<Output = AppResult<Vec<Observation>>> + Send;

    fn fetch_observations(&self) -> impl Future<Output = Vec<Observation>> + Send {
        async move {
            match self.try_fetch().await {
                Ok(observations) => {
                    tracing::debug!(source = self.name(), count = observations.len(), "observations fetched");
                    observations
                }
                Err(e) => {
                    tracing::warn!(source = self.name(), error = %e, "price source unavailable, no data");
                    Vec::new()
                }
            }
        }
    }
}

/// The configured price source. Live variants own their brokerage session.
pub enum PriceSource {
    Mock(mock::MockSource),
    File(file::FileSource),
    TokenBroker(live::TokenQuoteSource),
    SignedBroker(live::SignedQuoteSource),
    /// Source could not be set up (missing credentials, failed login).
    Unavailable { name: &'static str, reason: String },
}

impl PriceSource {
    /// Build the source selected by config. Never fails: a live source that
    /// cannot open its session degrades to `Unavailable`.
    pub async fn from_config(config: &AppConfig) -> Self {
        match config.source {
            SourceKind::Mock => Self::Mock(mock::MockSource::default()),
            SourceKind::File => Self::File(file::FileSource::new(&config.price_file)),
            SourceKind::TokenBroker => {
                let Some(cfg) = config.token_broker.as_ref() else {
                    return Self::unavailable(SourceKind::TokenBroker, "missing token brokerage credentials");
                };
                match live::TokenQuoteSource::connect(cfg, &config.futures_contract).await {
                    Ok(src) => Self::TokenBroker(src),
                    Err(e) => Self::unavailable(SourceKind::TokenBroker, e),
                }
            }
            SourceKind::SignedBroker => {
                let Some(cfg) = config.signed_broker.as_ref() else {
                    return Self::unavailable(SourceKind::SignedBroker, "missing signed brokerage credentials");
                };
                match live::SignedQuoteSource::connect(cfg, &config.futures_contract).await {
                    Ok(src) => Self::SignedBroker(src),
                    Err(e) => Self::unavailable(SourceKind::SignedBroker, e),
                }
            }
        }
    }

    fn unavailable(kind: SourceKind, reason: impl std::fmt::Display) -> Self {
        let reason = reason.to_string();
        tracing::warn!(source = kind.name(), reason = %reason, "price source disabled");
        Self::Unavailable {
            name: kind.name(),
            reason,
        }
    }

    /// Release any brokerage session held by this source.
    pub async fn close(&self) {
        match self {
            Self::TokenBroker(src) => src.close().await,
            Self::SignedBroker(src) => src.close().await,
            _ => {}
        }
    }
}

impl ObservationSource for PriceSource {
    fn name(&self) -> &'static str {
        match self {
            Self::Mock(s) => s.name(),
            Self::File(s) => s.name(),
            Self::TokenBroker(s) => s.name(),
            Self::SignedBroker(s) => s.name(),
            Self::Unavailable { name, .. } => *name,
        }
    }

    async fn try_fetch(&self) -> AppResult<Vec<Observation>> {
        match self {
            Self::Mock(s) => s.try_fetch().await,
            Self::File(s) => s.try_fetch().await,
            Self::TokenBroker(s) => s.try_fetch().await,
            Self::SignedBroker(s) => s.try_fetch().await,
            Self::Unavailable { reason, .. } => Err(AppError::Source(reason.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_source_yields_empty() {
        let src = PriceSource::Unavailable {
            name: "token_broker",
            reason: "missing credentials".into(),
        };
        assert!(src.try_fetch().await.is_err());
        assert!(src.fetch_observations().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_credentials_degrade() {
        let mut cfg = AppConfig::from_lookup(|_| None).unwrap();
        cfg.source = SourceKind::SignedBroker;
        let src = PriceSource::from_config(&cfg).await;
        assert!(matches!(src, PriceSource::Unavailable { name: "signed_broker", .. }));
        assert!(src.fetch_observations().await.is_empty());
    }

    #[tokio::test]
    async fn test_mock_via_config() {
        let cfg = AppConfig::from_lookup(|_| None).unwrap();
        let src = PriceSource::from_config(&cfg).await;
        assert_eq!(src.name(), "mock");
        assert_eq!(src.fetch_observations().await.len(), 10);
    }

    #[tokio::test]
    async fn test_rejected_login_degrades() {
        use axum::http::StatusCode;
        use axum::routing::post;

        let app = axum::Router::new().route("/auth/login", post(|| async { StatusCode::UNAUTHORIZED }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut cfg = AppConfig::from_lookup(|_| None).unwrap();
        cfg.source = SourceKind::TokenBroker;
        cfg.token_broker = Some(crate::config::TokenBrokerConfig {
            base_url: format!("http://{addr}"),
            api_key: "k".into(),
            secret: "wrong".into(),
        });

        let src = PriceSource::from_config(&cfg).await;
        match &src {
            PriceSource::Unavailable { name, reason } => {
                assert_eq!(*name, "token_broker");
                assert!(reason.contains("401"), "reason: {reason}");
            }
            _ => panic!("expected an unavailable source"),
        }
        assert!(src.fetch_observations().await.is_empty());
        src.close().await;
    }
}
