//! Conversion between human-readable decimal amounts and integer base units
//! (wei, lamports, token atoms).
//!
//! Every amount that crosses the presentation boundary goes through these two
//! functions. Parsing is done on the decimal string itself, never through a
//! float, so 18-decimal assets keep full precision.

use alloy_primitives::U256;

use crate::error::WalletError;

/// Largest decimal count whose scale (10^d) fits in 256 bits.
pub const MAX_DECIMALS: u8 = 77;

fn scale(decimals: u8) -> Result<U256, WalletError> {
    if decimals > MAX_DECIMALS {
        return Err(WalletError::InvalidAmount(format!(
            "{decimals} decimals exceed the 256-bit base unit range"
        )));
    }
    Ok(U256::from(10u64).pow(U256::from(decimals)))
}

fn parse_digits(digits: &str, input: &str) -> Result<U256, WalletError> {
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 10)
        .map_err(|_| WalletError::InvalidAmount(format!("{input} is too large")))
}

/// Parses a non-negative decimal string into base units.
///
/// Fractional digits beyond `decimals` are truncated, not rounded. Signs,
/// exponents, separators and empty input are rejected with `InvalidAmount`,
/// as is any value that does not fit in 256 bits.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<U256, WalletError> {
    let input = amount.trim();
    let (int_part, frac_part) = input.split_once('.').unwrap_or((input, ""));

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(WalletError::InvalidAmount(format!(
            "{amount:?} is not a decimal number"
        )));
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(WalletError::InvalidAmount(format!(
            "{amount:?} is not a non-negative decimal number"
        )));
    }

    let unit = scale(decimals)?;
    let kept = &frac_part[..frac_part.len().min(decimals as usize)];
    let frac_scale = scale(decimals - kept.len() as u8)?;

    let whole = parse_digits(int_part, input)?;
    let frac = parse_digits(kept, input)?;

    whole
        .checked_mul(unit)
        .and_then(|w| frac.checked_mul(frac_scale).and_then(|f| w.checked_add(f)))
        .ok_or_else(|| WalletError::InvalidAmount(format!("{input} is too large")))
}

/// Renders base units as the shortest exact decimal string.
///
/// Total for every input: `to_base_units(&from_base_units(x, d), d) == x`.
pub fn from_base_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let d = decimals as usize;
    if d == 0 {
        return digits;
    }

    let (int_part, frac_part) = if digits.len() > d {
        let (i, f) = digits.split_at(digits.len() - d);
        (i.to_string(), f.to_string())
    } else {
        ("0".to_string(), format!("{digits:0>d$}"))
    };

    let frac = frac_part.trim_end_matches('0');
    if frac.is_empty() {
        int_part
    } else {
        format!("{int_part}.{frac}")
    }
}
