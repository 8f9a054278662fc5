use crate::errors::{AppError, AppResult};
use base64::Engine as _;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha2::Sha256;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Request signer for the signed brokerage, RSA PKCS#1 v1.5 over SHA-256.
/// Produces three headers per request: key ID, timestamp (ms), and signature.
#[derive(Clone)]
pub struct RequestSigner {
    key_id: String,
    signing_key: SigningKey<Sha256>,
}

/// Headers attached to every signed request.
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    pub key_id: String,
    pub timestamp_ms: String,
    pub signature: String,
}

impl RequestSigner {
    /// Loads the key from `pem` when given, otherwise from `private_key_path`.
    pub fn load(key_id: &str, pem: Option<&str>, private_key_path: Option<&Path>) -> AppResult<Self> {
        let pem = match (pem, private_key_path) {
            (Some(pem), _) => {
                tracing::info!("loaded RSA key from environment");
                pem.to_string()
            }
            (None, Some(path)) => {
                tracing::info!(path = %path.display(), "loading RSA key from file");
                std::fs::read_to_string(path)
                    .map_err(|e| AppError::Auth(format!("read key {}: {e}", path.display())))?
            }
            (None, None) => return Err(AppError::Auth("no private key configured".into())),
        };
        Self::from_pem(key_id, &pem)
    }

    pub fn from_pem(key_id: &str, pem: &str) -> AppResult<Self> {
        let private_key = RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|e| AppError::Auth(format!("parse RSA PEM: {e}")))?;

        Ok(Self {
            key_id: key_id.to_string(),
            signing_key: SigningKey::<Sha256>::new(private_key),
        })
    }

    pub fn sign_request(&self, method: &str, path: &str, body: &str) -> AppResult<SignedHeaders> {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::Auth(format!("system clock: {e}")))?
            .as_millis()
            .to_string();

        let message = signing_payload(&timestamp_ms, method, path, body);
        let signature = self.signing_key.sign(message.as_bytes());
        let sig_b64 = base64::engine::general_purpose::STANDARD.encode(signature.to_bytes());

        Ok(SignedHeaders {
            key_id: self.key_id.clone(),
            timestamp_ms,
            signature: sig_b64,
        })
    }
}

/// timestamp + METHOD + path (query included) + body
#[inline]
pub fn signing_payload(timestamp_ms: &str, method: &str, path: &str, body: &str) -> String {
    format!("{}{}{}{}", timestamp_ms, method.to_uppercase(), path, body)
}
