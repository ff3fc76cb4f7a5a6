use anyhow::{Result, anyhow};

pub const ETHER_DECIMALS: usize = 18;
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Formats wei as ether with trailing zeros trimmed, keeping one fractional digit.
pub fn format_ether(wei: u128) -> String {
    let whole = wei / WEI_PER_ETHER;
    let mut fraction = format!("{:0width$}", wei % WEI_PER_ETHER, width = ETHER_DECIMALS);
    while fraction.len() > 1 && fraction.ends_with('0') {
        fraction.pop();
    }
    format!("{whole}.{fraction}")
}

/// Parses a decimal ether amount such as `"0.1"` into wei.
pub fn parse_ether(text: &str) -> Result<u128> {
    let text = text.trim();
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));

    if whole.is_empty() && fraction.is_empty() {
        return Err(anyhow!("empty ether amount"));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(anyhow!("invalid ether amount '{text}'"));
    }
    if fraction.len() > ETHER_DECIMALS {
        return Err(anyhow!("ether amount '{text}' has more than {ETHER_DECIMALS} decimals"));
    }

    let whole_wei = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u128>()
            .map_err(|err| anyhow!("invalid ether amount '{text}': {err}"))?
            .checked_mul(WEI_PER_ETHER)
            .ok_or_else(|| anyhow!("ether amount '{text}' overflows"))?
    };

    let fraction_wei = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{fraction:0<width$}", width = ETHER_DECIMALS);
        padded
            .parse::<u128>()
            .map_err(|err| anyhow!("invalid ether amount '{text}': {err}"))?
    };

    whole_wei
        .checked_add(fraction_wei)
        .ok_or_else(|| anyhow!("ether amount '{text}' overflows"))
}
