use super::types::{LoginRequest, LoginResponse, TokenQuote};
use crate::errors::{AppError, AppResult};
use crate::state::Observation;
use chrono::{DateTime, Utc};
use reqwest::Client;

/// Session handle for the token brokerage. Acquired by `login`, passed to
/// every call, released by `logout`.
#[derive(Debug, Clone)]
pub struct TokenSession {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl TokenSession {
    #[inline]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// REST client for the token brokerage. All methods return Result, never panic.
#[derive(Clone)]
pub struct TokenBrokerClient {
    client: Client,
    base_url: String,
}

impl TokenBrokerClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn login(&self, api_key: &str, secret: &str) -> AppResult<TokenSession> {
        let url = format!("{}/auth/login", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&LoginRequest { api_key, secret })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::BrokerApi {
                status: status.as_u16(),
                body,
            });
        }

        let login: LoginResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Parse(format!("login: {e}")))?;

        let token = login
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Auth("login returned no token".into()))?;

        let expires_at = login
            .expires_at
            .as_deref()
            .and_then(|s| super::types::parse_quote_time(s).ok());

        tracing::info!(expires_at = ?expires_at, "token brokerage session opened");
        Ok(TokenSession { token, expires_at })
    }

    pub async fn logout(&self, session: &TokenSession) -> AppResult<()> {
        let url = format!("{}/auth/logout", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&session.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::BrokerApi {
                status: status.as_u16(),
                body,
            });
        }
        tracing::info!("token brokerage session closed");
        Ok(())
    }

    pub async fn latest_quote(&self, session: &TokenSession, contract: &str) -> AppResult<Observation> {
        if session.is_expired(Utc::now()) {
            return Err(AppError::Auth("session expired".into()));
        }

        let url = format!("{}/quotes/{contract}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&session.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::BrokerApi {
                status: status.as_u16(),
                body,
            });
        }

        let quote: TokenQuote = resp
            .json()
            .await
            .map_err(|e| AppError::Parse(format!("GET /quotes/{contract}: {e}")))?;
        quote.to_observation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::Json;
    use chrono::Duration;

    async fn spawn_mock_broker() -> String {
        async fn login(Json(body): Json<serde_json::Value>) -> (StatusCode, Json<serde_json::Value>) {
            if body["secret"] == "hunter2" {
                (StatusCode::OK, Json(serde_json::json!({ "token": "tok-1" })))
            } else {
                (StatusCode::UNAUTHORIZED, Json(serde_json::json!({ "error": "bad secret" })))
            }
        }

        async fn quote(Path(contract): Path<String>, headers: HeaderMap) -> (StatusCode, Json<serde_json::Value>) {
            let authed = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                == Some("Bearer tok-1");
            if !authed {
                return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({})));
            }
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "symbol": contract,
                    "last": "18812",
                    "datetime": "2024-03-01T05:44:59Z"
                })),
            )
        }

        let app = axum::Router::new()
            .route("/auth/login", post(login))
            .route("/auth/logout", post(|| async { StatusCode::NO_CONTENT }))
            .route("/quotes/{contract}", get(quote));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_login_quote_logout() {
        let base = spawn_mock_broker().await;
        let client = TokenBrokerClient::new(&base);

        let session = client.login("key", "hunter2").await.unwrap();
        let obs = client.latest_quote(&session, "TXFR1").await.unwrap();
        assert_eq!(obs.price, 18812.0);
        client.logout(&session).await.unwrap();
    }

    #[tokio::test]
    async fn test_bad_credentials_rejected() {
        let base = spawn_mock_broker().await;
        let client = TokenBrokerClient::new(&base);
        let err = client.login("key", "wrong").await.err().unwrap();
        assert!(matches!(err, AppError::BrokerApi { status: 401, .. }));
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let live = TokenSession { token: "t".into(), expires_at: Some(now + Duration::minutes(5)) };
        let dead = TokenSession { token: "t".into(), expires_at: Some(now - Duration::minutes(5)) };
        let open = TokenSession { token: "t".into(), expires_at: None };
        assert!(!live.is_expired(now));
        assert!(dead.is_expired(now));
        assert!(!open.is_expired(now));
    }
}
