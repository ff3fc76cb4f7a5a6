use td_api_types::NetworkId;
use td_faucet_client::TransportFailure;
use td_wallet::WalletError;
use thiserror::Error;

/// Shown when the faucet could not be reached or answered without a structured body.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClaimError {
    #[error("Wallet software is not installed")]
    WalletMissing,
    #[error("Wallet is not connected")]
    WalletNotConnected,
    #[error("Wallet cannot sign right now: {0}")]
    WalletUnavailable(String),
    #[error("Signature request was rejected")]
    UserRejectedSignature,
    #[error("Wallet is on the wrong network; switch to network {target}")]
    NetworkMismatch { target: NetworkId },
    #[error("A claim is already in progress")]
    ClaimInProgress,
    #[error("faucet transport failure: {detail}")]
    TransportFailure { detail: String },
    #[error("{0}")]
    ApplicationRejection(String),
}

impl ClaimError {
    /// Text for the error banner. Server rejections are shown verbatim,
    /// transport failures get the generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            Self::TransportFailure { .. } => GENERIC_FAILURE_MESSAGE.to_owned(),
            Self::ApplicationRejection(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// Maps a wallet failure that happened while asking for a signature.
    pub fn from_signing(err: WalletError) -> Self {
        match err {
            WalletError::UserRejected => Self::UserRejectedSignature,
            WalletError::NotConnected => Self::WalletNotConnected,
            WalletError::NotInstalled => Self::WalletMissing,
            other => Self::WalletUnavailable(other.to_string()),
        }
    }
}

impl From<TransportFailure> for ClaimError {
    fn from(failure: TransportFailure) -> Self {
        Self::TransportFailure {
            detail: failure.detail,
        }
    }
}
