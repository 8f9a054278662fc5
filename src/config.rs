use crate::errors::{AppError, AppResult};
use crate::state::{OptionType, Parameters};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Mock,
    File,
    TokenBroker,
    SignedBroker,
}

impl SourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::File => "file",
            Self::TokenBroker => "token_broker",
            Self::SignedBroker => "signed_broker",
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "file" => Ok(Self::File),
            "token_broker" => Ok(Self::TokenBroker),
            "signed_broker" => Ok(Self::SignedBroker),
            other => Err(AppError::Config(format!("PRICE_SOURCE: unknown source {other:?}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenBrokerConfig {
    pub base_url: String,
    pub api_key: String,
    pub secret: String,
}

#[derive(Debug, Clone)]
pub struct SignedBrokerConfig {
    pub base_url: String,
    pub key_id: String,
    pub private_key_path: Option<PathBuf>,
    pub private_key_pem: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub params: Parameters,
    pub source: SourceKind,
    pub price_file: PathBuf,
    pub futures_contract: String,
    /// None when credentials are absent; the source then yields no data.
    pub token_broker: Option<TokenBrokerConfig>,
    pub signed_broker: Option<SignedBrokerConfig>,
    pub report_csv: Option<PathBuf>,
    /// 0 disables the dashboard: print the report and exit.
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let var_opt = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let strike_price = var_or("STRIKE_PRICE", "18970")
            .parse::<f64>()
            .map_err(|e| AppError::Config(format!("STRIKE_PRICE: {e}")))?;

        let days_to_expiration = var_or("DAYS_TO_EXPIRATION", "7")
            .parse::<u32>()
            .map_err(|e| AppError::Config(format!("DAYS_TO_EXPIRATION: {e}")))?;

        let threshold = var_or("ARBITRAGE_THRESHOLD", "0.1")
            .parse::<f64>()
            .map_err(|e| AppError::Config(format!("ARBITRAGE_THRESHOLD: {e}")))?;

        let option_type = OptionType::from(var_or("OPTION_TYPE", "call"));

        let server_port = var_or("SERVER_PORT", "8501")
            .parse::<u16>()
            .map_err(|e| AppError::Config(format!("SERVER_PORT: {e}")))?;

        let token_broker = match (
            var_opt("TOKEN_BROKER_BASE_URL"),
            var_opt("TOKEN_BROKER_API_KEY"),
            var_opt("TOKEN_BROKER_SECRET"),
        ) {
            (Some(base_url), Some(api_key), Some(secret)) => Some(TokenBrokerConfig {
                base_url,
                api_key,
                secret,
            }),
            _ => None,
        };

        let private_key_pem = var_opt("SIGNED_BROKER_PRIVATE_KEY_PEM");
        let private_key_path = var_opt("SIGNED_BROKER_PRIVATE_KEY_PATH").map(PathBuf::from);
        let signed_broker = match (var_opt("SIGNED_BROKER_BASE_URL"), var_opt("SIGNED_BROKER_KEY_ID")) {
            (Some(base_url), Some(key_id)) if private_key_pem.is_some() || private_key_path.is_some() => {
                Some(SignedBrokerConfig {
                    base_url,
                    key_id,
                    private_key_path,
                    private_key_pem,
                })
            }
            _ => None,
        };

        Ok(Self {
            params: Parameters::new(strike_price, option_type, threshold, days_to_expiration)?,
            source: var_or("PRICE_SOURCE", "mock").parse()?,
            price_file: PathBuf::from(var_or("PRICE_FILE", "prices.csv")),
            futures_contract: var_or("FUTURES_CONTRACT", "TXFR1"),
            token_broker,
            signed_broker,
            report_csv: var_opt("REPORT_CSV").map(PathBuf::from),
            server_port,
        })
    }
}
