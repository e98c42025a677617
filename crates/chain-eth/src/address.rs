use sha3::{Digest, Keccak256};

use crate::error::EthError;

const ADDRESS_HEX_LEN: usize = 40;

/// Splits off the `0x` prefix and checks the 40-character hex body.
fn hex_body(address: &str) -> Result<&str, EthError> {
    let body = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| EthError::InvalidAddress("address must start with 0x".into()))?;

    if body.len() != ADDRESS_HEX_LEN {
        return Err(EthError::InvalidAddress(format!(
            "expected {ADDRESS_HEX_LEN} hex characters, got {}",
            body.len()
        )));
    }

    if !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(EthError::InvalidAddress(
            "address contains non-hex characters".into(),
        ));
    }

    Ok(body)
}

/// Checks an address string against the EVM address grammar.
///
/// Returns `Ok(true)` for a well-formed address, `Ok(false)` for a
/// well-formed mixed-case address whose EIP-55 checksum does not match,
/// and an error when the string is not an address at all.
pub fn validate_address(address: &str) -> Result<bool, EthError> {
    let body = hex_body(address)?;

    let has_lower = body.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = body.bytes().any(|b| b.is_ascii_uppercase());
    if !(has_lower && has_upper) {
        return Ok(true);
    }

    Ok(checksum_address(address)?[2..] == *body)
}

/// Recipient predicate used by the account client: grammar and checksum
/// both have to pass.
pub fn is_valid_address(address: &str) -> bool {
    matches!(validate_address(address), Ok(true))
}

/// Applies EIP-55 mixed-case checksum encoding.
pub fn checksum_address(address: &str) -> Result<String, EthError> {
    let lower = hex_body(address)?.to_ascii_lowercase();
    let hash = Keccak256::digest(lower.as_bytes());

    let mut out = String::with_capacity(ADDRESS_HEX_LEN + 2);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    Ok(out)
}
