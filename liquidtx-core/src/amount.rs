use bitcoin::{Amount, Denomination};

/// Number of minimal units in one whole unit of any Elements asset.
pub const SATS_PER_BTC: u64 = 100_000_000;

const BTC_DECIMALS: usize = 8;

/// Error type for amount conversion and parsing
#[derive(Debug, thiserror::Error)]
pub enum AmountError {
    #[error("Empty amount string")]
    EmptyAmount,
    #[error("Amount cannot be negative: '{0}'")]
    NegativeAmount(String),
    #[error("Amount must be greater than zero")]
    NotPositive,
    #[error("Invalid BTC amount: '{0}'")]
    InvalidBtcAmount(String),
    #[error("Invalid satoshi amount: '{0}'")]
    InvalidSatoshiAmount(String),
    #[error("Invalid asset amount: '{0}'. Non-bitcoin assets take an integer count of units")]
    InvalidUnitAmount(String),
    #[error("Amount out of range: {0}")]
    OutOfRange(String),
    #[error("Expected a numeric amount, got: {0}")]
    NotANumber(serde_json::Value),
}

/// Renders a satoshi count as a BTC-denominated string with exactly eight
/// fractional digits. The conversion is exact for every `u64`.
///
/// # Examples
/// ```
/// use liquidtx_core::amount::sats_to_btc_string;
///
/// assert_eq!(sats_to_btc_string(0), "0.00000000");
/// assert_eq!(sats_to_btc_string(1), "0.00000001");
/// assert_eq!(sats_to_btc_string(150_000_000), "1.50000000");
/// ```
pub fn sats_to_btc_string(sats: u64) -> String {
    format!(
        "{whole}.{frac:0width$}",
        whole = sats / SATS_PER_BTC,
        frac = sats % SATS_PER_BTC,
        width = BTC_DECIMALS
    )
}

/// Parses a BTC-denominated decimal string into satoshis without going
/// through floating point.
///
/// # Examples
/// ```
/// use liquidtx_core::amount::btc_to_sats;
///
/// assert_eq!(btc_to_sats("1.5")?, 150_000_000);
/// assert_eq!(btc_to_sats("0.00000001")?, 1);
/// # Ok::<(), liquidtx_core::amount::AmountError>(())
/// ```
pub fn btc_to_sats(btc: &str) -> Result<u64, AmountError> {
    let btc = btc.trim();
    if btc.is_empty() {
        return Err(AmountError::EmptyAmount);
    }
    if btc.starts_with('-') {
        return Err(AmountError::NegativeAmount(btc.to_string()));
    }
    Amount::from_str_in(btc, Denomination::Bitcoin)
        .map(|amount| amount.to_sat())
        .map_err(|_| AmountError::InvalidBtcAmount(btc.to_string()))
}

/// Converts an amount reported by the node (JSON number or string, BTC
/// denominated) into satoshis.
pub fn btc_value_to_sats(value: &serde_json::Value) -> Result<u64, AmountError> {
    match value {
        serde_json::Value::String(s) => btc_to_sats(s),
        serde_json::Value::Number(n) => match n.as_u64() {
            Some(whole) => whole
                .checked_mul(SATS_PER_BTC)
                .ok_or_else(|| AmountError::OutOfRange(n.to_string())),
            None => btc_f64_to_sats(
                n.as_f64()
                    .ok_or_else(|| AmountError::NotANumber(value.clone()))?,
            ),
        },
        other => Err(AmountError::NotANumber(other.clone())),
    }
}

/// Converts a floating point BTC amount into satoshis, rounding to the
/// nearest satoshi the way the node displays eight decimals.
pub fn btc_f64_to_sats(btc: f64) -> Result<u64, AmountError> {
    if btc < 0.0 {
        return Err(AmountError::NegativeAmount(btc.to_string()));
    }
    let sats = (btc * SATS_PER_BTC as f64).round();
    if !sats.is_finite() || sats > u64::MAX as f64 {
        return Err(AmountError::OutOfRange(btc.to_string()));
    }
    Ok(sats as u64)
}

/// Parses a user-supplied send amount into minimal units.
///
/// Bitcoin accepts `"0.5"`, `"0.5btc"` or `"50000000sats"` (suffixes are
/// case-insensitive). Any other asset only accepts a plain integer count of
/// units. Zero is rejected.
pub fn parse_send_amount(input: &str, is_bitcoin: bool) -> Result<u64, AmountError> {
    let s = input.trim().to_lowercase();
    if s.is_empty() {
        return Err(AmountError::EmptyAmount);
    }
    if s.starts_with('-') {
        return Err(AmountError::NegativeAmount(s));
    }

    let sats = if is_bitcoin {
        if let Some(number_part) = s.strip_suffix("sats").or_else(|| s.strip_suffix("sat")) {
            number_part
                .trim()
                .parse::<u64>()
                .map_err(|_| AmountError::InvalidSatoshiAmount(number_part.to_string()))?
        } else {
            let number_part = s.strip_suffix("btc").unwrap_or(s.as_str());
            btc_to_sats(number_part)?
        }
    } else {
        s.parse::<u64>()
            .map_err(|_| AmountError::InvalidUnitAmount(s.clone()))?
    };

    if sats == 0 {
        return Err(AmountError::NotPositive);
    }
    Ok(sats)
}
