//! Wallet session.
//!
//! Owns the current `WalletIdentity` and republishes a wholly new snapshot on
//! every connect, disconnect, account change and network change. Dependents
//! subscribe through `watch` receivers instead of reading shared state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use td_api_types::{NetworkId, WalletAddress};
use td_wallet::{ProviderHandle, WalletError, WalletIdentity, WalletProvider};
use tokio::sync::watch;
use tracing::{info, warn};

pub struct WalletSession {
    provider: Option<Arc<dyn WalletProvider>>,
    generation: AtomicU64,
    identity: watch::Sender<WalletIdentity>,
    connecting: watch::Sender<bool>,
}

impl WalletSession {
    /// `provider` is `None` when no wallet software was detected.
    pub fn new(provider: Option<Arc<dyn WalletProvider>>) -> Self {
        let (identity, _) = watch::channel(WalletIdentity::disconnected());
        let (connecting, _) = watch::channel(false);
        Self {
            provider,
            generation: AtomicU64::new(0),
            identity,
            connecting,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.provider
            .as_ref()
            .is_some_and(|provider| provider.is_installed())
    }

    pub fn identity(&self) -> WalletIdentity {
        self.identity.borrow().clone()
    }

    pub fn account(&self) -> Option<WalletAddress> {
        self.identity.borrow().account.clone()
    }

    pub fn network(&self) -> Option<NetworkId> {
        self.identity.borrow().network
    }

    pub fn is_connecting(&self) -> bool {
        *self.connecting.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<WalletIdentity> {
        self.identity.subscribe()
    }

    pub fn subscribe_connecting(&self) -> watch::Receiver<bool> {
        self.connecting.subscribe()
    }

    /// Asks the wallet to connect. Waits as long as the user takes to answer.
    /// On refusal the session stays as it was.
    pub async fn connect(&self) -> Result<WalletIdentity, WalletError> {
        let provider = self.installed_provider()?;

        self.connecting.send_replace(true);
        let result = provider.connect().await;
        let network = match &result {
            Ok(_) => provider.get_chain_id().await.ok(),
            Err(_) => None,
        };
        self.connecting.send_replace(false);

        match result {
            Ok(account) => {
                info!(account = %account, network = ?network, "wallet connected");
                Ok(self.publish(Some(account), network))
            }
            Err(err) => {
                warn!("wallet connection not established: {}", err);
                Err(err)
            }
        }
    }

    /// Asks the wallet to change network. A refusal is recoverable; the
    /// snapshot is left untouched so the action can be retried.
    pub async fn switch_network(&self, target: NetworkId) -> Result<(), WalletError> {
        let provider = self.installed_provider()?;
        let Some(account) = self.account() else {
            return Err(WalletError::NotConnected);
        };

        if let Err(err) = provider.switch_chain(target).await {
            warn!(%target, "network switch refused: {}", err);
            return Err(err);
        }

        let network = match provider.get_chain_id().await {
            Ok(network) => network,
            Err(err) => {
                warn!(%target, "network read after switch failed, assuming target: {}", err);
                target
            }
        };
        info!(%network, "wallet network switched");
        self.publish(Some(account), Some(network));
        Ok(())
    }

    /// Re-reads account and network from the provider.
    pub async fn sync(&self) -> Result<WalletIdentity, WalletError> {
        let provider = self.installed_provider()?;
        let account = provider.get_account().await?;
        let network = match account {
            Some(_) => Some(provider.get_chain_id().await?),
            None => None,
        };
        Ok(self.publish(account, network))
    }

    /// Wallet-emitted `accountsChanged`. An empty list means the wallet disconnected.
    /// The network is read from the wallet; the previous snapshot's network
    /// is only a fallback when that read fails.
    pub async fn accounts_changed(&self, accounts: Vec<WalletAddress>) -> WalletIdentity {
        let account = accounts.into_iter().next();
        let network = match (&account, &self.provider) {
            (Some(_), Some(provider)) => match provider.get_chain_id().await {
                Ok(network) => Some(network),
                Err(err) => {
                    warn!("network read after account change failed: {}", err);
                    self.network()
                }
            },
            _ => None,
        };
        self.publish(account, network)
    }

    /// Wallet-emitted `chainChanged`.
    pub fn chain_changed(&self, network: NetworkId) -> WalletIdentity {
        self.publish(self.account(), Some(network))
    }

    pub fn disconnect(&self) -> WalletIdentity {
        self.publish(None, None)
    }

    fn installed_provider(&self) -> Result<Arc<dyn WalletProvider>, WalletError> {
        match &self.provider {
            Some(provider) if provider.is_installed() => Ok(Arc::clone(provider)),
            _ => Err(WalletError::NotInstalled),
        }
    }

    fn publish(&self, account: Option<WalletAddress>, network: Option<NetworkId>) -> WalletIdentity {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let provider = match (&account, &self.provider) {
            (Some(_), Some(provider)) => Some(ProviderHandle::new(generation, Arc::clone(provider))),
            _ => None,
        };
        let snapshot = WalletIdentity {
            network: account.as_ref().and(network),
            account,
            provider,
        };
        self.identity.send_replace(snapshot.clone());
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;
    use td_wallet::LocalKeyWallet;

    /// Local wallet whose chain-id reads can be made to fail.
    struct ChainReadFails {
        inner: LocalKeyWallet,
        fail: AtomicBool,
    }

    #[async_trait]
    impl WalletProvider for ChainReadFails {
        fn is_installed(&self) -> bool {
            self.inner.is_installed()
        }

        async fn connect(&self) -> Result<WalletAddress, WalletError> {
            self.inner.connect().await
        }

        async fn get_account(&self) -> Result<Option<WalletAddress>, WalletError> {
            self.inner.get_account().await
        }

        async fn get_chain_id(&self) -> Result<NetworkId, WalletError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(WalletError::Provider("chain id unavailable".to_owned()));
            }
            self.inner.get_chain_id().await
        }

        async fn switch_chain(&self, target: NetworkId) -> Result<(), WalletError> {
            self.inner.switch_chain(target).await
        }

        async fn sign_message(&self, message: &str) -> Result<String, WalletError> {
            self.inner.sign_message(message).await
        }

        async fn get_balance(&self, account: &WalletAddress) -> Result<u128, WalletError> {
            self.inner.get_balance(account).await
        }
    }

    fn session_with(wallet: &Arc<LocalKeyWallet>) -> WalletSession {
        let provider: Arc<dyn WalletProvider> = wallet.clone();
        WalletSession::new(Some(provider))
    }

    #[tokio::test]
    async fn connect_publishes_new_snapshot() -> anyhow::Result<()> {
        let wallet = Arc::new(LocalKeyWallet::random(NetworkId(5)));
        let session = session_with(&wallet);
        let mut rx = session.subscribe();

        let identity = session.connect().await?;
        assert!(rx.has_changed()?);
        assert_eq!(*rx.borrow_and_update(), identity);
        assert_eq!(identity.account, Some(wallet.active_address().await));
        assert_eq!(identity.network, Some(NetworkId(5)));
        assert!(identity.is_connected());
        assert!(!session.is_connecting());
        Ok(())
    }

    #[tokio::test]
    async fn declined_connect_leaves_session_disconnected() {
        let wallet = Arc::new(LocalKeyWallet::random(NetworkId(5)));
        wallet.set_approve_connect(false);
        let session = session_with(&wallet);

        assert_eq!(session.connect().await, Err(WalletError::UserRejected));
        assert_eq!(session.identity(), WalletIdentity::disconnected());
        assert!(!session.is_connecting());
    }

    #[tokio::test]
    async fn missing_wallet_cannot_connect() {
        let session = WalletSession::new(None);
        assert!(!session.is_installed());
        assert_eq!(session.connect().await, Err(WalletError::NotInstalled));

        let absent: Arc<dyn WalletProvider> = Arc::new(LocalKeyWallet::not_installed());
        let session = WalletSession::new(Some(absent));
        assert!(!session.is_installed());
    }

    #[tokio::test]
    async fn switch_network_is_retryable_after_refusal() -> anyhow::Result<()> {
        let wallet = Arc::new(LocalKeyWallet::random(NetworkId(1)));
        let session = session_with(&wallet);
        session.connect().await?;

        wallet.set_approve_switch(false);
        assert_eq!(
            session.switch_network(NetworkId(5)).await,
            Err(WalletError::UserRejected)
        );
        assert_eq!(session.network(), Some(NetworkId(1)));

        wallet.set_approve_switch(true);
        session.switch_network(NetworkId(5)).await?;
        assert_eq!(session.network(), Some(NetworkId(5)));
        Ok(())
    }

    #[tokio::test]
    async fn every_change_gets_a_new_provider_generation() -> anyhow::Result<()> {
        let wallet = Arc::new(LocalKeyWallet::random(NetworkId(5)));
        let session = session_with(&wallet);
        let first = session.connect().await?;
        let second = session.chain_changed(NetworkId(5));

        assert_ne!(first.provider, second.provider);
        assert_eq!(first.account, second.account);

        let gone = session.accounts_changed(Vec::new()).await;
        assert_eq!(gone, WalletIdentity::disconnected());
        Ok(())
    }

    #[tokio::test]
    async fn sync_reads_wallet_state() -> anyhow::Result<()> {
        let wallet = Arc::new(LocalKeyWallet::random(NetworkId(5)));
        let session = session_with(&wallet);
        session.connect().await?;

        let other = wallet
            .add_account(td_crypto::Secp256k1Signer::new_random())
            .await;
        wallet.select_account(&other).await?;
        let identity = session.sync().await?;
        assert_eq!(identity.account, Some(other));

        wallet.disconnect().await;
        assert_eq!(session.sync().await?, WalletIdentity::disconnected());
        Ok(())
    }

    #[tokio::test]
    async fn account_event_reads_network_from_wallet() -> anyhow::Result<()> {
        let wallet = Arc::new(LocalKeyWallet::random(NetworkId(5)));
        let account = wallet.connect().await?;
        let session = session_with(&wallet);
        assert_eq!(session.network(), None);

        let identity = session.accounts_changed(vec![account.clone()]).await;
        assert_eq!(identity.account, Some(account));
        assert_eq!(identity.network, Some(NetworkId(5)));
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_network_keeps_previous_value_or_target() -> anyhow::Result<()> {
        let wallet = Arc::new(ChainReadFails {
            inner: LocalKeyWallet::random(NetworkId(1)),
            fail: AtomicBool::new(false),
        });
        let provider: Arc<dyn WalletProvider> = wallet.clone();
        let session = WalletSession::new(Some(provider));
        let account = session.connect().await?.account;
        assert_eq!(session.network(), Some(NetworkId(1)));

        wallet.fail.store(true, Ordering::SeqCst);
        session.switch_network(NetworkId(5)).await?;
        assert_eq!(session.network(), Some(NetworkId(5)));

        let identity = session.accounts_changed(account.into_iter().collect()).await;
        assert_eq!(identity.network, Some(NetworkId(5)));
        Ok(())
    }
}
