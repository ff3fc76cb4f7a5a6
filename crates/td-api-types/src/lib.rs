use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed text signed by the wallet and re-derived by the faucet server.
/// Any change here breaks signature verification on the server side.
pub const CLAIM_MESSAGE_PREFIX: &str =
    "Sign this message to prove you own this wallet and claim test funds.\n\nNonce: ";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct WalletAddress(pub String);

impl WalletAddress {
    /// Addresses compare case-insensitively; checksum casing is presentation only.
    pub fn matches(&self, other: &WalletAddress) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct NetworkId(pub u64);

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-issued single-use token. Deliberately not `Clone`: a nonce lives
/// for exactly one claim attempt and is dropped with it.
#[derive(Debug, PartialEq, Eq)]
pub struct Nonce(String);

impl Nonce {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimMessage(String);

impl ClaimMessage {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Canonical claim message for a nonce.
pub fn claim_message(nonce: &Nonce) -> ClaimMessage {
    let mut text = String::with_capacity(CLAIM_MESSAGE_PREFIX.len() + nonce.0.len());
    text.push_str(CLAIM_MESSAGE_PREFIX);
    text.push_str(&nonce.0);
    ClaimMessage(text)
}

/// Recovers the nonce embedded in a claim message, if the message follows the template.
pub fn nonce_from_message(message: &str) -> Option<&str> {
    message
        .strip_prefix(CLAIM_MESSAGE_PREFIX)
        .filter(|nonce| !nonce.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonceResponse {
    pub nonce: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimRequest {
    pub account: String,
    pub message: String,
    pub signature: String,
}

/// Structured application-level rejection returned by the faucet with a non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRejection {
    pub message: String,
}
