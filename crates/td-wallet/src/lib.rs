//! Wallet-provider boundary.
//!
//! `WalletProvider` is the seam to the external wallet (a browser extension
//! behind EIP-1193, or the in-process `LocalKeyWallet`). `WalletIdentity` is
//! the immutable snapshot the rest of the client reasons about.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use td_api_types::{NetworkId, WalletAddress};
use thiserror::Error;

pub mod local;

pub use local::LocalKeyWallet;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("wallet software is not installed")]
    NotInstalled,
    #[error("wallet is not connected")]
    NotConnected,
    #[error("request rejected by user")]
    UserRejected,
    #[error("network {0} is not supported by the wallet")]
    UnsupportedNetwork(NetworkId),
    #[error("wallet request failed: {0}")]
    Provider(String),
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn is_installed(&self) -> bool;
    /// Suspends until the user answers the wallet prompt.
    async fn connect(&self) -> Result<WalletAddress, WalletError>;
    async fn get_account(&self) -> Result<Option<WalletAddress>, WalletError>;
    async fn get_chain_id(&self) -> Result<NetworkId, WalletError>;
    async fn switch_chain(&self, target: NetworkId) -> Result<(), WalletError>;
    /// Returns a `0x`-prefixed 65-byte `personal_sign` signature.
    async fn sign_message(&self, message: &str) -> Result<String, WalletError>;
    /// Native balance in wei on the wallet's active network.
    async fn get_balance(&self, account: &WalletAddress) -> Result<u128, WalletError>;
}

/// A provider bound to one published session snapshot. Two handles are equal
/// only if they come from the same snapshot generation.
#[derive(Clone)]
pub struct ProviderHandle {
    generation: u64,
    provider: Arc<dyn WalletProvider>,
}

impl ProviderHandle {
    pub fn new(generation: u64, provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            generation,
            provider,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn provider(&self) -> &Arc<dyn WalletProvider> {
        &self.provider
    }
}

impl PartialEq for ProviderHandle {
    fn eq(&self, other: &Self) -> bool {
        self.generation == other.generation
    }
}

impl Eq for ProviderHandle {}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletIdentity {
    pub account: Option<WalletAddress>,
    pub network: Option<NetworkId>,
    pub provider: Option<ProviderHandle>,
}

impl WalletIdentity {
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.account.is_some() && self.provider.is_some()
    }

    /// Key used by dependents to decide whether a recompute is needed.
    pub fn observation_key(&self) -> (Option<String>, Option<u64>) {
        (
            self.account.as_ref().map(|a| a.0.to_ascii_lowercase()),
            self.provider.as_ref().map(ProviderHandle::generation),
        )
    }
}
