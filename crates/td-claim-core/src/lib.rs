//! TestDrip claim client core.
//!
//! Orchestrates the faucet claim protocol: wallet session tracking, network
//! gating, balance/eligibility display, nonce challenge, wallet signature,
//! submission and the UI state machine that renders the result.

pub mod balance;
pub mod challenge;
pub mod config;
pub mod controller;
pub mod eligibility;
pub mod error;
pub mod flow;
pub mod machine;
pub mod network;
pub mod session;
pub mod submit;
pub mod telemetry;
pub mod units;
pub mod view;

pub use balance::{BalanceDisplay, BalanceObserver};
pub use challenge::ChallengeClient;
pub use config::{EligibilityConfig, FaucetConfig};
pub use controller::FaucetController;
pub use eligibility::{EligibilityAmountProvider, PerAccountLookup, StaticAmount};
pub use error::{ClaimError, GENERIC_FAILURE_MESSAGE};
pub use flow::ClaimFlow;
pub use machine::{ClaimOutcome, ClaimState, ClaimStateMachine, ClaimTicket};
pub use session::WalletSession;
pub use submit::ClaimSubmitter;
pub use telemetry::init_tracing;
pub use view::{ActionControl, Banner, ClaimView};
