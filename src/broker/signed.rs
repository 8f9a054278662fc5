use super::signing::RequestSigner;
use super::types::{SessionResponse, SnapshotResponse};
use crate::errors::{AppError, AppResult};
use crate::state::Observation;
use reqwest::{Client, Method, Url};

/// Session handle for the signed brokerage. Opened with a signed session
/// check, closed with a signed DELETE.
#[derive(Debug, Clone)]
pub struct SignedSession {
    session_id: String,
}

impl SignedSession {
    pub fn id(&self) -> &str {
        &self.session_id
    }
}

/// REST client for the signed brokerage. Every request carries key ID,
/// timestamp and RSA signature headers.
#[derive(Clone)]
pub struct SignedBrokerClient {
    client: Client,
    base_url: String,
    signer: RequestSigner,
}

impl SignedBrokerClient {
    pub fn new(base_url: &str, signer: RequestSigner) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .pool_max_idle_per_host(4)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            signer,
        }
    }

    fn endpoint(&self, path: &str) -> AppResult<Url> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| AppError::Config(format!("broker url {}{path}: {e}", self.base_url)))
    }

    /// Returns `None` when the broker answers with an empty body.
    async fn signed_request<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        session: Option<&SignedSession>,
    ) -> AppResult<Option<T>> {
        let signed_path = signed_path(&url);
        let headers = self.signer.sign_request(method.as_str(), &signed_path, "")?;

        let mut req = self
            .client
            .request(method, url)
            .header("X-ACCESS-KEY", &headers.key_id)
            .header("X-ACCESS-TIMESTAMP", &headers.timestamp_ms)
            .header("X-ACCESS-SIGNATURE", &headers.signature);
        if let Some(s) = session {
            req = req.header("X-SESSION-ID", s.id());
        }

        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::BrokerApi {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        serde_json::from_slice::<T>(&body)
            .map(Some)
            .map_err(|e| AppError::Parse(format!("{signed_path}: {e}")))
    }

    pub async fn open_session(&self) -> AppResult<SignedSession> {
        let url = self.endpoint("/session")?;
        let resp: SessionResponse = self
            .signed_request(Method::GET, url, None)
            .await?
            .ok_or_else(|| AppError::Auth("session check returned no body".into()))?;

        let session_id = resp
            .session_id
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Auth("session check returned no session_id".into()))?;

        tracing::info!(session_id = %session_id, "signed brokerage session opened");
        Ok(SignedSession { session_id })
    }

    pub async fn close_session(&self, session: &SignedSession) -> AppResult<()> {
        let url = self.endpoint("/session")?;
        self.signed_request::<serde_json::Value>(Method::DELETE, url, Some(session))
            .await?;
        tracing::info!(session_id = %session.id(), "signed brokerage session closed");
        Ok(())
    }

    pub async fn latest_quote(&self, session: &SignedSession, contract: &str) -> AppResult<Observation> {
        let mut url = self.endpoint("/marketdata/snapshot")?;
        url.query_pairs_mut()
            .append_pair("symbol", contract)
            .append_pair("fields", "last_price,ts_ms");

        let snapshot: SnapshotResponse = self
            .signed_request(Method::GET, url, Some(session))
            .await?
            .ok_or_else(|| AppError::Parse(format!("snapshot for {contract}: empty body")))?;

        snapshot
            .quote
            .ok_or_else(|| AppError::Parse(format!("no quote for {contract}")))?
            .to_observation()
    }
}

/// Path plus encoded query exactly as sent on the wire.
fn signed_path(url: &Url) -> String {
    match url.query() {
        Some(q) => format!("{}?{q}", url.path()),
        None => url.path().to_string(),
    }
}
