use std::sync::Arc;
use td_wallet::WalletIdentity;
use tracing::warn;

use crate::eligibility::EligibilityAmountProvider;
use crate::units::format_ether;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceDisplay {
    /// No account connected. Not the same thing as a zero balance.
    Unknown,
    Known(u128),
}

impl BalanceDisplay {
    pub fn render(&self) -> String {
        match self {
            Self::Unknown => "\u{2013}".to_owned(),
            Self::Known(wei) => format_ether(*wei),
        }
    }
}

/// Wallet balance and claimable amount as displayed to the user.
///
/// A failed balance read keeps whatever was shown before; the display goes
/// stale instead of erroring.
pub struct BalanceObserver {
    eligibility: Arc<dyn EligibilityAmountProvider>,
    balance: BalanceDisplay,
    claimable: u128,
    observed: Option<(Option<String>, Option<u64>)>,
}

impl BalanceObserver {
    pub fn new(eligibility: Arc<dyn EligibilityAmountProvider>) -> Self {
        let claimable = eligibility.eligible_amount(None);
        Self {
            eligibility,
            balance: BalanceDisplay::Unknown,
            claimable,
            observed: None,
        }
    }

    pub fn balance(&self) -> BalanceDisplay {
        self.balance
    }

    pub fn claimable(&self) -> u128 {
        self.claimable
    }

    /// Recomputes only if account or provider identity differ from the last
    /// observed snapshot. Returns whether a recompute happened.
    pub async fn observe(&mut self, identity: &WalletIdentity) -> bool {
        let key = identity.observation_key();
        if self.observed.as_ref() == Some(&key) {
            return false;
        }
        self.observed = Some(key);
        self.refresh(identity).await;
        true
    }

    /// Unconditional re-read, e.g. on a timer or when a new block is seen.
    pub async fn refresh(&mut self, identity: &WalletIdentity) {
        self.claimable = self.eligibility.eligible_amount(identity.account.as_ref());

        let (Some(account), Some(handle)) = (&identity.account, &identity.provider) else {
            self.balance = BalanceDisplay::Unknown;
            return;
        };

        match handle.provider().get_balance(account).await {
            Ok(wei) => self.balance = BalanceDisplay::Known(wei),
            Err(err) => warn!(%account, "balance read failed, keeping last value: {}", err),
        }
    }
}
