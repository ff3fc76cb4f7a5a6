use std::sync::Arc;
use td_api_types::{ClaimMessage, ClaimRequest, WalletAddress};
use td_faucet_client::{FaucetApi, SubmitOutcome};
use tracing::info;

pub struct ClaimSubmitter {
    api: Arc<dyn FaucetApi>,
}

impl ClaimSubmitter {
    pub fn new(api: Arc<dyn FaucetApi>) -> Self {
        Self { api }
    }

    pub async fn submit(
        &self,
        account: &WalletAddress,
        message: ClaimMessage,
        signature: String,
    ) -> SubmitOutcome {
        let request = ClaimRequest {
            account: account.0.clone(),
            message: message.into_string(),
            signature,
        };

        let outcome = self.api.submit_claim(&request).await;
        if outcome == SubmitOutcome::Accepted {
            info!(%account, "claim accepted and dispatched");
        }
        outcome
    }
}
