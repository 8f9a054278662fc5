use super::ObservationSource;
use crate::broker::signed::{SignedBrokerClient, SignedSession};
use crate::broker::signing::RequestSigner;
use crate::broker::token::{TokenBrokerClient, TokenSession};
use crate::config::{SignedBrokerConfig, TokenBrokerConfig};
use crate::errors::AppResult;
use crate::state::Observation;

/// Latest futures quote from the token brokerage. Holds the session opened
/// in `connect` until `close`.
pub struct TokenQuoteSource {
    client: TokenBrokerClient,
    session: TokenSession,
    contract: String,
}

impl TokenQuoteSource {
    pub async fn connect(cfg: &TokenBrokerConfig, contract: &str) -> AppResult<Self> {
        let client = TokenBrokerClient::new(&cfg.base_url);
        let session = client.login(&cfg.api_key, &cfg.secret).await?;
        Ok(Self {
            client,
            session,
            contract: contract.to_string(),
        })
    }

    pub async fn close(&self) {
        if let Err(e) = self.client.logout(&self.session).await {
            tracing::warn!(error = %e, "token brokerage logout failed");
        }
    }
}

impl ObservationSource for TokenQuoteSource {
    fn name(&self) -> &'static str {
        "token_broker"
    }

    async fn try_fetch(&self) -> AppResult<Vec<Observation>> {
        let obs = self.client.latest_quote(&self.session, &self.contract).await?;
        tracing::info!(contract = %self.contract, price = obs.price, "latest quote");
        Ok(vec![obs])
    }
}

/// Latest futures quote from the signed brokerage.
pub struct SignedQuoteSource {
    client: SignedBrokerClient,
    session: SignedSession,
    contract: String,
}

impl SignedQuoteSource {
    pub async fn connect(cfg: &SignedBrokerConfig, contract: &str) -> AppResult<Self> {
        let signer = RequestSigner::load(
            &cfg.key_id,
            cfg.private_key_pem.as_deref(),
            cfg.private_key_path.as_deref(),
        )?;
        let client = SignedBrokerClient::new(&cfg.base_url, signer);
        let session = client.open_session().await?;
        Ok(Self {
            client,
            session,
            contract: contract.to_string(),
        })
    }

    pub async fn close(&self) {
        if let Err(e) = self.client.close_session(&self.session).await {
            tracing::warn!(error = %e, "signed brokerage session close failed");
        }
    }
}

impl ObservationSource for SignedQuoteSource {
    fn name(&self) -> &'static str {
        "signed_broker"
    }

    async fn try_fetch(&self) -> AppResult<Vec<Observation>> {
        let obs = self.client.latest_quote(&self.session, &self.contract).await?;
        tracing::info!(contract = %self.contract, price = obs.price, "latest quote");
        Ok(vec![obs])
    }
}
