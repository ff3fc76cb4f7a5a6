//! Claim UI state machine.
//!
//! The state is derived from what the machine has observed (install check,
//! connecting flag, wallet identity, in-flight attempt, last outcome) rather
//! than stored, so an impossible combination cannot be represented.

use td_api_types::{NetworkId, WalletAddress};
use td_wallet::{ProviderHandle, WalletIdentity};
use tracing::{debug, warn};

use crate::error::ClaimError;
use crate::network::{self, network_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimState {
    WalletNotInstalled,
    Connecting,
    Disconnected,
    WrongNetwork,
    Ready,
    Claiming,
    Succeeded,
    Failed,
}

/// Result of the last completed attempt. `success` and `error` are never both set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimOutcome {
    success: bool,
    error: Option<String>,
    notice: Option<String>,
}

impl ClaimOutcome {
    fn succeeded(notice: String) -> Self {
        Self {
            success: true,
            error: None,
            notice: Some(notice),
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            error: Some(error),
            notice: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        !self.success && self.error.is_none()
    }
}

/// Proof that a claim attempt was started, carrying the identity it was started for.
#[derive(Debug, Clone)]
pub struct ClaimTicket {
    attempt: u64,
    account: WalletAddress,
    signer: ProviderHandle,
}

impl ClaimTicket {
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn account(&self) -> &WalletAddress {
        &self.account
    }

    pub fn signer(&self) -> &ProviderHandle {
        &self.signer
    }
}

pub struct ClaimStateMachine {
    target: NetworkId,
    success_notice: String,
    installed: bool,
    connecting: bool,
    identity: WalletIdentity,
    in_flight: Option<u64>,
    next_attempt: u64,
    outcome: ClaimOutcome,
}

impl ClaimStateMachine {
    pub fn new(target: NetworkId, installed: bool) -> Self {
        Self {
            target,
            success_notice: format!(
                "{} ETH has been dispatched to your wallet. You should receive it within 3 minutes.",
                network_name(target)
            ),
            installed,
            connecting: false,
            identity: WalletIdentity::disconnected(),
            in_flight: None,
            next_attempt: 1,
            outcome: ClaimOutcome::default(),
        }
    }

    pub fn state(&self) -> ClaimState {
        if !self.installed {
            ClaimState::WalletNotInstalled
        } else if self.connecting {
            ClaimState::Connecting
        } else if !self.identity.is_connected() {
            ClaimState::Disconnected
        } else if !network::matches(self.identity.network, self.target) {
            ClaimState::WrongNetwork
        } else if self.in_flight.is_some() {
            ClaimState::Claiming
        } else if self.outcome.success {
            ClaimState::Succeeded
        } else if self.outcome.error.is_some() {
            ClaimState::Failed
        } else {
            ClaimState::Ready
        }
    }

    pub fn outcome(&self) -> &ClaimOutcome {
        &self.outcome
    }

    pub fn identity(&self) -> &WalletIdentity {
        &self.identity
    }

    pub fn target_network(&self) -> NetworkId {
        self.target
    }

    pub fn set_installed(&mut self, installed: bool) {
        self.installed = installed;
    }

    pub fn set_connecting(&mut self, connecting: bool) {
        self.connecting = connecting;
    }

    /// Takes a new session snapshot. A different account abandons the
    /// in-flight attempt and drops the previous account's outcome.
    pub fn observe_identity(&mut self, identity: WalletIdentity) {
        let same_account = match (&self.identity.account, &identity.account) {
            (Some(previous), Some(current)) => previous.matches(current),
            (None, None) => true,
            _ => false,
        };

        if !same_account {
            if let Some(attempt) = self.in_flight.take() {
                debug!(attempt, "account changed during claim; attempt abandoned");
            }
            self.outcome = ClaimOutcome::default();
        }

        self.identity = identity;
    }

    /// Enters `Claiming`. Only allowed where the claim action is offered:
    /// `Ready`, `Succeeded` or `Failed`. Clears the previous outcome.
    pub fn begin_claim(&mut self) -> Result<ClaimTicket, ClaimError> {
        match self.state() {
            ClaimState::WalletNotInstalled => return Err(ClaimError::WalletMissing),
            ClaimState::Connecting | ClaimState::Disconnected => {
                return Err(ClaimError::WalletNotConnected);
            }
            ClaimState::WrongNetwork => {
                return Err(ClaimError::NetworkMismatch {
                    target: self.target,
                });
            }
            ClaimState::Claiming => return Err(ClaimError::ClaimInProgress),
            ClaimState::Ready | ClaimState::Succeeded | ClaimState::Failed => {}
        }

        let (Some(account), Some(signer)) = (&self.identity.account, &self.identity.provider) else {
            return Err(ClaimError::WalletNotConnected);
        };

        let attempt = self.next_attempt;
        self.next_attempt += 1;
        self.in_flight = Some(attempt);
        self.outcome = ClaimOutcome::default();

        Ok(ClaimTicket {
            attempt,
            account: account.clone(),
            signer: signer.clone(),
        })
    }

    /// Records the result of `ticket`'s attempt. Returns `false` and leaves
    /// the outcome untouched when the attempt is no longer the current one
    /// or was started for a different account.
    pub fn apply_outcome(&mut self, ticket: &ClaimTicket, result: Result<(), ClaimError>) -> bool {
        if self.in_flight != Some(ticket.attempt) {
            warn!(attempt = ticket.attempt, "discarding outcome of stale claim attempt");
            return false;
        }

        let still_active = self
            .identity
            .account
            .as_ref()
            .is_some_and(|current| current.matches(&ticket.account));
        if !still_active {
            warn!(attempt = ticket.attempt, "discarding claim outcome for inactive account");
            self.in_flight = None;
            return false;
        }

        self.in_flight = None;
        self.outcome = match result {
            Ok(()) => ClaimOutcome::succeeded(self.success_notice.clone()),
            Err(err) => {
                warn!(attempt = ticket.attempt, "claim failed: {}", err);
                ClaimOutcome::failed(err.user_message())
            }
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GENERIC_FAILURE_MESSAGE;
    use std::sync::Arc;
    use td_wallet::{LocalKeyWallet, WalletProvider};

    fn identity(account: &str, network: u64, generation: u64) -> WalletIdentity {
        let provider: Arc<dyn WalletProvider> = Arc::new(LocalKeyWallet::random(NetworkId(network)));
        WalletIdentity {
            account: Some(WalletAddress(account.to_owned())),
            network: Some(NetworkId(network)),
            provider: Some(ProviderHandle::new(generation, provider)),
        }
    }

    fn ready_machine() -> ClaimStateMachine {
        let mut machine = ClaimStateMachine::new(NetworkId(5), true);
        machine.observe_identity(identity("0xaa", 5, 1));
        machine
    }

    fn assert_exclusive(outcome: &ClaimOutcome) {
        match (outcome.is_success(), outcome.error()) {
            (true, None) => {}
            (false, Some(error)) => assert!(!error.is_empty()),
            other => panic!("outcome violates exclusivity: {other:?}"),
        }
    }

    #[test]
    fn install_check_overrides_everything() {
        let mut machine = ready_machine();
        machine.set_installed(false);
        machine.set_connecting(true);
        assert_eq!(machine.state(), ClaimState::WalletNotInstalled);
        assert_eq!(machine.begin_claim().unwrap_err(), ClaimError::WalletMissing);
    }

    #[test]
    fn connection_lifecycle() {
        let mut machine = ClaimStateMachine::new(NetworkId(5), true);
        assert_eq!(machine.state(), ClaimState::Disconnected);

        machine.set_connecting(true);
        assert_eq!(machine.state(), ClaimState::Connecting);

        machine.set_connecting(false);
        assert_eq!(machine.state(), ClaimState::Disconnected);

        machine.observe_identity(identity("0xaa", 5, 1));
        assert_eq!(machine.state(), ClaimState::Ready);
    }

    #[test]
    fn network_mismatch_blocks_claim() {
        let mut machine = ClaimStateMachine::new(NetworkId(5), true);
        machine.observe_identity(identity("0xaa", 1, 1));
        assert_eq!(machine.state(), ClaimState::WrongNetwork);
        assert!(matches!(
            machine.begin_claim(),
            Err(ClaimError::NetworkMismatch { target: NetworkId(5) })
        ));

        machine.observe_identity(identity("0xaa", 5, 2));
        assert_eq!(machine.state(), ClaimState::Ready);
    }

    #[test]
    fn success_then_failure_never_merge() {
        let mut machine = ready_machine();

        let ticket = machine.begin_claim().unwrap();
        assert_eq!(machine.state(), ClaimState::Claiming);
        assert_eq!(machine.begin_claim().unwrap_err(), ClaimError::ClaimInProgress);
        assert!(machine.apply_outcome(&ticket, Ok(())));
        assert_eq!(machine.state(), ClaimState::Succeeded);
        assert_exclusive(machine.outcome());
        assert!(machine.outcome().notice().unwrap().starts_with("Görli ETH"));

        let ticket = machine.begin_claim().unwrap();
        assert!(machine.outcome().is_empty());
        assert!(machine.apply_outcome(
            &ticket,
            Err(ClaimError::ApplicationRejection("Already claimed today".to_owned()))
        ));
        assert_eq!(machine.state(), ClaimState::Failed);
        assert_eq!(machine.outcome().error(), Some("Already claimed today"));
        assert!(!machine.outcome().is_success());
        assert_eq!(machine.outcome().notice(), None);

        let ticket = machine.begin_claim().unwrap();
        assert!(machine.apply_outcome(&ticket, Ok(())));
        assert_exclusive(machine.outcome());
        assert_eq!(machine.outcome().error(), None);
    }

    #[test]
    fn transport_failure_uses_generic_message() {
        let mut machine = ready_machine();
        let ticket = machine.begin_claim().unwrap();
        machine.apply_outcome(
            &ticket,
            Err(ClaimError::TransportFailure {
                detail: "connection refused".to_owned(),
            }),
        );
        assert_eq!(machine.outcome().error(), Some(GENERIC_FAILURE_MESSAGE));
    }

    #[test]
    fn stale_attempt_is_discarded_after_account_change() {
        let mut machine = ready_machine();
        let ticket = machine.begin_claim().unwrap();

        machine.observe_identity(identity("0xbb", 5, 2));
        assert_eq!(machine.state(), ClaimState::Ready);

        assert!(!machine.apply_outcome(&ticket, Ok(())));
        assert!(machine.outcome().is_empty());
        assert_eq!(machine.state(), ClaimState::Ready);
    }

    #[test]
    fn account_change_clears_previous_outcome() {
        let mut machine = ready_machine();
        let ticket = machine.begin_claim().unwrap();
        machine.apply_outcome(&ticket, Err(ClaimError::UserRejectedSignature));
        assert_eq!(machine.state(), ClaimState::Failed);

        machine.observe_identity(identity("0xAA", 5, 2));
        assert_eq!(machine.state(), ClaimState::Failed, "same account, new checksum casing");

        machine.observe_identity(identity("0xcc", 5, 3));
        assert_eq!(machine.state(), ClaimState::Ready);
    }

    #[test]
    fn superseded_ticket_cannot_write() {
        let mut machine = ready_machine();
        let first = machine.begin_claim().unwrap();
        machine.observe_identity(WalletIdentity::disconnected());
        machine.observe_identity(identity("0xaa", 5, 2));
        let second = machine.begin_claim().unwrap();

        assert!(!machine.apply_outcome(&first, Err(ClaimError::WalletNotConnected)));
        assert_eq!(machine.state(), ClaimState::Claiming);
        assert!(machine.apply_outcome(&second, Ok(())));
        assert_eq!(machine.state(), ClaimState::Succeeded);
    }
}
