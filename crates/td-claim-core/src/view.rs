use td_api_types::NetworkId;

use crate::balance::BalanceObserver;
use crate::machine::{ClaimState, ClaimStateMachine};
use crate::network::network_name;
use crate::units::format_ether;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionControl {
    InstallWallet { label: String, url: String },
    Loading,
    Connect { label: String },
    SwitchNetwork { target: NetworkId, label: String },
    Claim { label: String, enabled: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    Success(String),
    Error(String),
}

/// Everything the page shows, computed from the state machine and balance
/// observer alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimView {
    pub state: ClaimState,
    pub action: ActionControl,
    pub banner: Option<Banner>,
    pub balance_line: String,
    pub claimable_line: String,
}

impl ClaimView {
    pub fn render(machine: &ClaimStateMachine, balance: &BalanceObserver, install_url: &str) -> Self {
        let state = machine.state();
        let target = machine.target_network();
        let network = network_name(target);

        let action = match state {
            ClaimState::WalletNotInstalled => ActionControl::InstallWallet {
                label: "Install MetaMask".to_owned(),
                url: install_url.to_owned(),
            },
            ClaimState::Connecting => ActionControl::Loading,
            ClaimState::Disconnected => ActionControl::Connect {
                label: "Connect wallet".to_owned(),
            },
            ClaimState::WrongNetwork => ActionControl::SwitchNetwork {
                target,
                label: format!("Switch to {network} network"),
            },
            ClaimState::Ready | ClaimState::Succeeded | ClaimState::Failed | ClaimState::Claiming => {
                ActionControl::Claim {
                    label: format!("Claim {network} ETH"),
                    enabled: state != ClaimState::Claiming,
                }
            }
        };

        let outcome = machine.outcome();
        let banner = match state {
            ClaimState::Succeeded => outcome.notice().map(|notice| Banner::Success(notice.to_owned())),
            ClaimState::Failed => outcome.error().map(|error| Banner::Error(error.to_owned())),
            _ => None,
        };

        Self {
            state,
            action,
            banner,
            balance_line: format!("{} ETH (testnet)", balance.balance().render()),
            claimable_line: format!("{} ETH", format_ether(balance.claimable())),
        }
    }

    pub fn offers_claim(&self) -> bool {
        matches!(self.action, ActionControl::Claim { .. })
    }
}
