//! Network gating. Pure functions over network ids.

use td_api_types::NetworkId;

/// True only when the wallet is on the target network. An unknown active network never matches.
pub fn matches(active: Option<NetworkId>, target: NetworkId) -> bool {
    active == Some(target)
}

pub fn network_name(id: NetworkId) -> String {
    match id.0 {
        1 => "Ethereum".to_owned(),
        5 => "Görli".to_owned(),
        17000 => "Holesky".to_owned(),
        11155111 => "Sepolia".to_owned(),
        other => format!("Chain {other}"),
    }
}
