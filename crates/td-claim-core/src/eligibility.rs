use std::collections::HashMap;
use td_api_types::WalletAddress;

/// Source of the amount an account may claim, in wei.
pub trait EligibilityAmountProvider: Send + Sync {
    fn eligible_amount(&self, account: Option<&WalletAddress>) -> u128;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticAmount {
    amount_wei: u128,
}

impl StaticAmount {
    pub fn new(amount_wei: u128) -> Self {
        Self { amount_wei }
    }
}

impl EligibilityAmountProvider for StaticAmount {
    fn eligible_amount(&self, _account: Option<&WalletAddress>) -> u128 {
        self.amount_wei
    }
}

type Lookup = Box<dyn Fn(&WalletAddress) -> Option<u128> + Send + Sync>;

/// Per-account amounts. Accounts the lookup does not know, and the
/// no-account case, fall back to `default_wei`.
pub struct PerAccountLookup {
    default_wei: u128,
    lookup: Lookup,
}

impl PerAccountLookup {
    pub fn new<F>(default_wei: u128, lookup: F) -> Self
    where
        F: Fn(&WalletAddress) -> Option<u128> + Send + Sync + 'static,
    {
        Self {
            default_wei,
            lookup: Box::new(lookup),
        }
    }

    pub fn from_table(default_wei: u128, table: HashMap<String, u128>) -> Self {
        let table: HashMap<String, u128> = table
            .into_iter()
            .map(|(address, amount)| (address.to_ascii_lowercase(), amount))
            .collect();
        Self::new(default_wei, move |account| {
            table.get(&account.0.to_ascii_lowercase()).copied()
        })
    }
}

impl EligibilityAmountProvider for PerAccountLookup {
    fn eligible_amount(&self, account: Option<&WalletAddress>) -> u128 {
        account
            .and_then(|account| (self.lookup)(account))
            .unwrap_or(self.default_wei)
    }
}
