use async_trait::async_trait;
use reqwest::StatusCode;
use td_api_types::{ClaimRejection, ClaimRequest, Nonce, NonceResponse};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

/// The faucet could not be reached, or answered without a structured body.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("faucet transport failure: {detail}")]
pub struct TransportFailure {
    pub detail: String,
}

impl TransportFailure {
    fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Classified result of a claim submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Accepted and dispatched. Says nothing about on-chain confirmation.
    Accepted,
    TransportFailure(TransportFailure),
    /// Server refused the claim and explained why; the message is user-facing.
    ApplicationRejection { message: String },
}

#[async_trait]
pub trait FaucetApi: Send + Sync {
    async fn retrieve_nonce(&self) -> Result<Nonce, TransportFailure>;
    async fn submit_claim(&self, request: &ClaimRequest) -> SubmitOutcome;
}

/// HTTP adapter for the faucet server at `endpoint` (e.g.
/// `http://localhost:3000/api`). No request timeout is configured; waits are
/// bounded by the server.
pub struct HttpFaucetApi {
    endpoint: String,
    http: reqwest::Client,
}

impl HttpFaucetApi {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            http: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl FaucetApi for HttpFaucetApi {
    async fn retrieve_nonce(&self) -> Result<Nonce, TransportFailure> {
        let url = format!("{}/nonce", self.endpoint);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| TransportFailure::new(format!("nonce request: {err}")))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(TransportFailure::new(format!("nonce HTTP {status}: {text}")));
        }

        let body: NonceResponse = serde_json::from_str(&text)
            .map_err(|err| TransportFailure::new(format!("malformed nonce response: {err}")))?;
        if body.nonce.trim().is_empty() {
            return Err(TransportFailure::new("nonce response carried an empty nonce"));
        }

        debug!("retrieved claim nonce");
        Ok(Nonce::new(body.nonce))
    }

    async fn submit_claim(&self, request: &ClaimRequest) -> SubmitOutcome {
        let url = format!("{}/claim", self.endpoint);
        let response = match self.http.post(&url).json(request).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!("claim submission transport error: {}", err);
                return SubmitOutcome::TransportFailure(TransportFailure::new(err.to_string()));
            }
        };

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        classify_response(status, &text)
    }
}

/// Any 2xx is accepted. A failure counts as an application rejection only
/// when the body carries a non-empty `message`; the status code alone decides nothing.
pub fn classify_response(status: StatusCode, body: &str) -> SubmitOutcome {
    if status.is_success() {
        return SubmitOutcome::Accepted;
    }

    match serde_json::from_str::<ClaimRejection>(body) {
        Ok(rejection) if !rejection.message.trim().is_empty() => {
            debug!(%status, "claim rejected by faucet");
            SubmitOutcome::ApplicationRejection {
                message: rejection.message,
            }
        }
        _ => {
            warn!("claim failed with HTTP {} and no structured body", status);
            SubmitOutcome::TransportFailure(TransportFailure::new(format!("claim HTTP {status}")))
        }
    }
}
