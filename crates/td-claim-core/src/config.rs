use anyhow::{Context, Result, anyhow};
use std::collections::HashMap;
use std::sync::Arc;
use td_api_types::NetworkId;
use td_faucet_client::DEFAULT_API_URL;

use crate::eligibility::{EligibilityAmountProvider, PerAccountLookup, StaticAmount};
use crate::network::network_name;
use crate::units::{WEI_PER_ETHER, parse_ether};

pub const DEFAULT_TARGET_NETWORK: NetworkId = NetworkId(5);
pub const DEFAULT_CLAIM_AMOUNT_WEI: u128 = WEI_PER_ETHER / 10;
pub const DEFAULT_INSTALL_URL: &str = "https://metamask.io/download/";

/// Which eligibility strategy the client runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EligibilityConfig {
    Static {
        amount_wei: u128,
    },
    PerAccount {
        default_wei: u128,
        table: HashMap<String, u128>,
    },
}

impl EligibilityConfig {
    pub fn build(&self) -> Arc<dyn EligibilityAmountProvider> {
        match self {
            Self::Static { amount_wei } => Arc::new(StaticAmount::new(*amount_wei)),
            Self::PerAccount { default_wei, table } => {
                Arc::new(PerAccountLookup::from_table(*default_wei, table.clone()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaucetConfig {
    pub api_url: String,
    pub target_network: NetworkId,
    pub eligibility: EligibilityConfig,
    pub install_url: String,
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            target_network: DEFAULT_TARGET_NETWORK,
            eligibility: EligibilityConfig::Static {
                amount_wei: DEFAULT_CLAIM_AMOUNT_WEI,
            },
            install_url: DEFAULT_INSTALL_URL.to_owned(),
        }
    }
}

impl FaucetConfig {
    /// Reads `TESTDRIP_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let api_url = read("TESTDRIP_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();

        let target_network = match read("TESTDRIP_TARGET_CHAIN_ID") {
            Some(raw) => NetworkId(
                raw.parse::<u64>()
                    .with_context(|| format!("TESTDRIP_TARGET_CHAIN_ID must be a number, got '{raw}'"))?,
            ),
            None => DEFAULT_TARGET_NETWORK,
        };

        let amount_wei = match read("TESTDRIP_CLAIM_AMOUNT") {
            Some(raw) => parse_ether(&raw).context("TESTDRIP_CLAIM_AMOUNT")?,
            None => DEFAULT_CLAIM_AMOUNT_WEI,
        };

        let mode = read("TESTDRIP_ELIGIBILITY_MODE").unwrap_or_else(|| "static".to_owned());
        let eligibility = match mode.to_ascii_lowercase().as_str() {
            "static" => EligibilityConfig::Static { amount_wei },
            "per-account" => EligibilityConfig::PerAccount {
                default_wei: amount_wei,
                table: parse_table(read("TESTDRIP_ELIGIBILITY_TABLE").as_deref().unwrap_or_default())
                    .context("TESTDRIP_ELIGIBILITY_TABLE")?,
            },
            other => {
                return Err(anyhow!(
                    "TESTDRIP_ELIGIBILITY_MODE must be 'static' or 'per-account', got '{other}'"
                ));
            }
        };

        let install_url = read("TESTDRIP_INSTALL_URL").unwrap_or_else(|| DEFAULT_INSTALL_URL.to_owned());

        Ok(Self {
            api_url,
            target_network,
            eligibility,
            install_url,
        })
    }

    pub fn target_network_name(&self) -> String {
        network_name(self.target_network)
    }
}

/// `0xabc=1.5,0xdef=0.25`
fn parse_table(raw: &str) -> Result<HashMap<String, u128>> {
    let mut table = HashMap::new();
    for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let (address, amount) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("entry '{entry}' must look like address=amount"))?;
        let address = address.trim();
        if address.is_empty() {
            return Err(anyhow!("entry '{entry}' has an empty address"));
        }
        table.insert(address.to_ascii_lowercase(), parse_ether(amount)?);
    }
    Ok(table)
}
