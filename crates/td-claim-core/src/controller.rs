//! Event-loop façade over the claim client.
//!
//! Owns the session subscription, balance observer, state machine and claim
//! flow. Every user action ends with a `sync`, so the next `view()` reflects
//! whatever the wallet published in the meantime. Connect and claim also come
//! split into begin/finish steps so a host can keep rendering while the
//! wallet or the faucet is answering.

use std::sync::Arc;
use td_faucet_client::{FaucetApi, HttpFaucetApi};
use td_wallet::{WalletError, WalletIdentity, WalletProvider};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::balance::BalanceObserver;
use crate::config::FaucetConfig;
use crate::error::ClaimError;
use crate::flow::ClaimFlow;
use crate::machine::{ClaimState, ClaimStateMachine, ClaimTicket};
use crate::session::WalletSession;
use crate::view::ClaimView;

pub struct FaucetController {
    config: FaucetConfig,
    session: Arc<WalletSession>,
    identity_rx: watch::Receiver<WalletIdentity>,
    connecting_rx: watch::Receiver<bool>,
    balance: BalanceObserver,
    machine: ClaimStateMachine,
    flow: Arc<ClaimFlow>,
}

impl FaucetController {
    /// `provider` is `None` when no wallet software was detected.
    pub fn new(
        config: FaucetConfig,
        provider: Option<Arc<dyn WalletProvider>>,
        api: Arc<dyn FaucetApi>,
    ) -> Self {
        let session = Arc::new(WalletSession::new(provider));
        let identity_rx = session.subscribe();
        let connecting_rx = session.subscribe_connecting();
        let machine = ClaimStateMachine::new(config.target_network, session.is_installed());

        Self {
            balance: BalanceObserver::new(config.eligibility.build()),
            flow: Arc::new(ClaimFlow::new(api)),
            config,
            session,
            identity_rx,
            connecting_rx,
            machine,
        }
    }

    /// Talks to the faucet over HTTP at `config.api_url`.
    pub fn with_http(config: FaucetConfig, provider: Option<Arc<dyn WalletProvider>>) -> Self {
        let api = Arc::new(HttpFaucetApi::new(config.api_url.as_str()));
        Self::new(config, provider, api)
    }

    /// Shared handle for forwarding wallet events (`accounts_changed`,
    /// `chain_changed`, `disconnect`) from the host.
    pub fn session(&self) -> Arc<WalletSession> {
        Arc::clone(&self.session)
    }

    pub fn config(&self) -> &FaucetConfig {
        &self.config
    }

    pub fn machine(&self) -> &ClaimStateMachine {
        &self.machine
    }

    pub fn balance(&self) -> &BalanceObserver {
        &self.balance
    }

    pub fn state(&self) -> ClaimState {
        self.machine.state()
    }

    /// Applies every snapshot the session published since the last call.
    pub async fn sync(&mut self) {
        self.machine.set_installed(self.session.is_installed());

        if self.connecting_rx.has_changed().unwrap_or(false) {
            let connecting = *self.connecting_rx.borrow_and_update();
            self.machine.set_connecting(connecting);
        }

        if self.identity_rx.has_changed().unwrap_or(false) {
            let identity = self.identity_rx.borrow_and_update().clone();
            self.machine.observe_identity(identity.clone());
            self.balance.observe(&identity).await;
        }
    }

    /// Marks a connection as pending and hands back the session to connect
    /// on. While the host awaits `WalletSession::connect`, `view()` shows
    /// the loading control.
    pub fn begin_connect(&mut self) -> Arc<WalletSession> {
        self.machine.set_connecting(true);
        self.session()
    }

    pub async fn finish_connect(
        &mut self,
        result: Result<WalletIdentity, WalletError>,
    ) -> Result<ClaimState, WalletError> {
        self.machine.set_connecting(self.session.is_connecting());
        self.sync().await;
        result.map(|_| self.machine.state())
    }

    pub async fn connect(&mut self) -> Result<ClaimState, WalletError> {
        let session = self.begin_connect();
        let result = session.connect().await;
        self.finish_connect(result).await
    }

    /// Asks the wallet to move to the configured target network.
    pub async fn switch_network(&mut self) -> Result<ClaimState, WalletError> {
        let result = self.session.switch_network(self.machine.target_network()).await;
        self.sync().await;
        result.map(|()| self.machine.state())
    }

    /// Enters `Claiming`. Gating errors (nothing to claim with, wrong
    /// network, attempt already running) are returned without touching the
    /// displayed outcome. The host runs the ticket through `claim_flow()`
    /// and hands the result to `finish_claim`.
    pub async fn begin_claim(&mut self) -> Result<ClaimTicket, ClaimError> {
        self.sync().await;
        let ticket = self.machine.begin_claim()?;
        info!(attempt = ticket.attempt(), account = %ticket.account(), "claim started");
        Ok(ticket)
    }

    pub fn claim_flow(&self) -> Arc<ClaimFlow> {
        Arc::clone(&self.flow)
    }

    /// Records the attempt's result unless the wallet moved on in the meantime.
    pub async fn finish_claim(&mut self, ticket: &ClaimTicket, result: Result<(), ClaimError>) -> ClaimState {
        self.sync().await;
        let succeeded = result.is_ok();
        if self.machine.apply_outcome(ticket, result) && succeeded {
            let identity = self.session.identity();
            self.balance.refresh(&identity).await;
        }
        self.machine.state()
    }

    /// Runs one claim attempt start to finish.
    pub async fn claim(&mut self) -> Result<ClaimState, ClaimError> {
        let ticket = self.begin_claim().await?;
        let flow = self.claim_flow();
        let result = flow.run(&ticket).await;
        Ok(self.finish_claim(&ticket, result).await)
    }

    pub async fn refresh_balance(&mut self) {
        self.sync().await;
        let identity = self.session.identity();
        self.balance.refresh(&identity).await;
    }

    /// Re-reads account and network from the wallet, e.g. on page load.
    pub async fn reload(&mut self) -> Result<ClaimState, WalletError> {
        let result = self.session.sync().await;
        if let Err(err) = &result {
            warn!("wallet state could not be read: {}", err);
        }
        self.sync().await;
        result.map(|_| self.machine.state())
    }

    pub fn view(&self) -> ClaimView {
        ClaimView::render(&self.machine, &self.balance, &self.config.install_url)
    }
}
