use std::sync::Arc;
use td_api_types::{ClaimMessage, Nonce, claim_message};
use td_faucet_client::FaucetApi;
use td_wallet::ProviderHandle;
use tracing::debug;

use crate::error::ClaimError;

/// Nonce retrieval and the wallet signature over the derived claim message.
pub struct ChallengeClient {
    api: Arc<dyn FaucetApi>,
}

impl ChallengeClient {
    pub fn new(api: Arc<dyn FaucetApi>) -> Self {
        Self { api }
    }

    pub async fn retrieve_nonce(&self) -> Result<Nonce, ClaimError> {
        Ok(self.api.retrieve_nonce().await?)
    }

    /// Pure. The server re-derives the same bytes to verify the signature.
    pub fn build_message(nonce: &Nonce) -> ClaimMessage {
        claim_message(nonce)
    }

    pub async fn request_signature(
        &self,
        signer: Option<&ProviderHandle>,
        message: &ClaimMessage,
    ) -> Result<String, ClaimError> {
        let Some(handle) = signer else {
            return Err(ClaimError::WalletUnavailable("no signer bound".to_owned()));
        };

        let signature = handle
            .provider()
            .sign_message(message.as_str())
            .await
            .map_err(ClaimError::from_signing)?;
        debug!("claim message signed");
        Ok(signature)
    }
}
