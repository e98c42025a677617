//! Solana address grammar.
//!
//! An address is the Base58 encoding of a raw 32-byte Ed25519 public key,
//! which puts valid strings between 32 and 44 characters long.

use crate::error::SolError;

const PUBKEY_LEN: usize = 32;
const MIN_ADDRESS_LEN: usize = 32;
const MAX_ADDRESS_LEN: usize = 44;

/// Decodes an address into its 32 public-key bytes.
pub fn address_to_bytes(address: &str) -> Result<[u8; 32], SolError> {
    if !(MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN).contains(&address.len()) {
        return Err(SolError::InvalidAddress(format!(
            "expected {MIN_ADDRESS_LEN}-{MAX_ADDRESS_LEN} characters, got {}",
            address.len()
        )));
    }

    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| SolError::InvalidAddress(format!("base58 decode failed: {e}")))?;

    bytes.try_into().map_err(|v: Vec<u8>| {
        SolError::InvalidAddress(format!("expected {PUBKEY_LEN} bytes, got {}", v.len()))
    })
}

/// Encodes 32 public-key bytes as an address.
pub fn bytes_to_address(bytes: &[u8; 32]) -> String {
    bs58::encode(bytes).into_string()
}

/// Validates a Solana address string; errors describe why it is not one.
pub fn validate_address(address: &str) -> Result<bool, SolError> {
    address_to_bytes(address).map(|_| true)
}

/// Recipient predicate used by the account client.
pub fn is_valid_address(address: &str) -> bool {
    address_to_bytes(address).is_ok()
}
