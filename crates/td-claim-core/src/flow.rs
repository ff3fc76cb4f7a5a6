use std::sync::Arc;
use td_faucet_client::{FaucetApi, SubmitOutcome};
use tracing::debug;

use crate::challenge::ChallengeClient;
use crate::error::ClaimError;
use crate::machine::ClaimTicket;
use crate::submit::ClaimSubmitter;

/// One claim attempt: nonce, message, signature, submission.
///
/// Every attempt fetches its own nonce. Nothing is cached between attempts.
pub struct ClaimFlow {
    challenge: ChallengeClient,
    submitter: ClaimSubmitter,
}

impl ClaimFlow {
    pub fn new(api: Arc<dyn FaucetApi>) -> Self {
        Self {
            challenge: ChallengeClient::new(Arc::clone(&api)),
            submitter: ClaimSubmitter::new(api),
        }
    }

    pub async fn run(&self, ticket: &ClaimTicket) -> Result<(), ClaimError> {
        let message = {
            let nonce = self.challenge.retrieve_nonce().await?;
            ChallengeClient::build_message(&nonce)
        };

        let signature = self
            .challenge
            .request_signature(Some(ticket.signer()), &message)
            .await?;

        debug!(attempt = ticket.attempt(), "submitting signed claim");
        match self.submitter.submit(ticket.account(), message, signature).await {
            SubmitOutcome::Accepted => Ok(()),
            SubmitOutcome::TransportFailure(failure) => Err(failure.into()),
            SubmitOutcome::ApplicationRejection { message } => Err(ClaimError::ApplicationRejection(message)),
        }
    }
}
