use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use td_api_types::{NetworkId, WalletAddress};
use td_crypto::{MessageSigner, Secp256k1Signer, to_prefixed_hex};
use tokio::sync::RwLock;
use tracing::debug;

use crate::{WalletError, WalletProvider};

/// In-process wallet holding secp256k1 keys. Answers prompts according to
/// its approval switches instead of asking a human.
pub struct LocalKeyWallet {
    installed: bool,
    supported_networks: Vec<NetworkId>,
    approve_connect: AtomicBool,
    approve_signatures: AtomicBool,
    approve_switch: AtomicBool,
    balance_available: AtomicBool,
    state: RwLock<LocalWalletState>,
}

struct LocalWalletState {
    accounts: Vec<Secp256k1Signer>,
    active: usize,
    connected: bool,
    chain: NetworkId,
    balances: HashMap<(NetworkId, String), u128>,
}

impl LocalKeyWallet {
    pub fn new(signer: Secp256k1Signer, chain: NetworkId) -> Self {
        Self {
            installed: true,
            supported_networks: Vec::new(),
            approve_connect: AtomicBool::new(true),
            approve_signatures: AtomicBool::new(true),
            approve_switch: AtomicBool::new(true),
            balance_available: AtomicBool::new(true),
            state: RwLock::new(LocalWalletState {
                accounts: vec![signer],
                active: 0,
                connected: false,
                chain,
                balances: HashMap::new(),
            }),
        }
    }

    pub fn random(chain: NetworkId) -> Self {
        Self::new(Secp256k1Signer::new_random(), chain)
    }

    /// A provider that reports the wallet software as absent.
    pub fn not_installed() -> Self {
        let mut wallet = Self::random(NetworkId(1));
        wallet.installed = false;
        wallet
    }

    /// Restricts `switch_chain` to the listed networks. Empty means any.
    pub fn with_supported_networks(mut self, networks: Vec<NetworkId>) -> Self {
        self.supported_networks = networks;
        self
    }

    pub async fn add_account(&self, signer: Secp256k1Signer) -> WalletAddress {
        let address = WalletAddress(signer.address());
        self.state.write().await.accounts.push(signer);
        address
    }

    pub async fn active_address(&self) -> WalletAddress {
        let guard = self.state.read().await;
        WalletAddress(guard.accounts[guard.active].address())
    }

    /// Makes `address` the active account, as if the user picked it in the wallet UI.
    pub async fn select_account(&self, address: &WalletAddress) -> Result<(), WalletError> {
        let mut guard = self.state.write().await;
        let index = guard
            .accounts
            .iter()
            .position(|signer| address.matches(&WalletAddress(signer.address())))
            .ok_or_else(|| WalletError::Provider(format!("unknown account {address}")))?;
        guard.active = index;
        Ok(())
    }

    pub async fn set_balance(&self, network: NetworkId, account: &WalletAddress, wei: u128) {
        let mut guard = self.state.write().await;
        guard
            .balances
            .insert((network, account.0.to_ascii_lowercase()), wei);
    }

    pub async fn disconnect(&self) {
        self.state.write().await.connected = false;
    }

    pub fn set_approve_connect(&self, approve: bool) {
        self.approve_connect.store(approve, Ordering::SeqCst);
    }

    pub fn set_approve_signatures(&self, approve: bool) {
        self.approve_signatures.store(approve, Ordering::SeqCst);
    }

    pub fn set_approve_switch(&self, approve: bool) {
        self.approve_switch.store(approve, Ordering::SeqCst);
    }

    pub fn set_balance_available(&self, available: bool) {
        self.balance_available.store(available, Ordering::SeqCst);
    }

    fn ensure_installed(&self) -> Result<(), WalletError> {
        if self.installed {
            Ok(())
        } else {
            Err(WalletError::NotInstalled)
        }
    }
}

#[async_trait]
impl WalletProvider for LocalKeyWallet {
    fn is_installed(&self) -> bool {
        self.installed
    }

    async fn connect(&self) -> Result<WalletAddress, WalletError> {
        self.ensure_installed()?;
        if !self.approve_connect.load(Ordering::SeqCst) {
            return Err(WalletError::UserRejected);
        }

        let mut guard = self.state.write().await;
        guard.connected = true;
        let address = WalletAddress(guard.accounts[guard.active].address());
        debug!(account = %address, "local wallet connected");
        Ok(address)
    }

    async fn get_account(&self) -> Result<Option<WalletAddress>, WalletError> {
        self.ensure_installed()?;
        let guard = self.state.read().await;
        Ok(guard
            .connected
            .then(|| WalletAddress(guard.accounts[guard.active].address())))
    }

    async fn get_chain_id(&self) -> Result<NetworkId, WalletError> {
        self.ensure_installed()?;
        Ok(self.state.read().await.chain)
    }

    async fn switch_chain(&self, target: NetworkId) -> Result<(), WalletError> {
        self.ensure_installed()?;
        if !self.supported_networks.is_empty() && !self.supported_networks.contains(&target) {
            return Err(WalletError::UnsupportedNetwork(target));
        }
        if !self.approve_switch.load(Ordering::SeqCst) {
            return Err(WalletError::UserRejected);
        }

        self.state.write().await.chain = target;
        Ok(())
    }

    async fn sign_message(&self, message: &str) -> Result<String, WalletError> {
        self.ensure_installed()?;
        let guard = self.state.read().await;
        if !guard.connected {
            return Err(WalletError::NotConnected);
        }
        if !self.approve_signatures.load(Ordering::SeqCst) {
            return Err(WalletError::UserRejected);
        }

        let signature = guard.accounts[guard.active]
            .sign_message(message.as_bytes())
            .map_err(|err| WalletError::Provider(err.to_string()))?;
        Ok(to_prefixed_hex(&signature))
    }

    async fn get_balance(&self, account: &WalletAddress) -> Result<u128, WalletError> {
        self.ensure_installed()?;
        if !self.balance_available.load(Ordering::SeqCst) {
            return Err(WalletError::Provider("balance unavailable".to_owned()));
        }

        let guard = self.state.read().await;
        Ok(guard
            .balances
            .get(&(guard.chain, account.0.to_ascii_lowercase()))
            .copied()
            .unwrap_or(0))
    }
}
