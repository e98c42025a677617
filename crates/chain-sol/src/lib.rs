//! Solana-like chain family support for the multi-chain wallet.
//!
//! Solana addresses are Base58-encoded 32-byte Ed25519 public keys. This
//! crate checks that grammar and carries the static cluster table (RPC and
//! websocket endpoints, explorer cluster parameter, known SPL mints).
//! Transaction building, signing and RPC belong to the wallet SDK.

pub mod address;
pub mod clusters;
pub mod error;

// Re-export key public types for ergonomic imports.
pub use address::{address_to_bytes, bytes_to_address, is_valid_address, validate_address};
pub use clusters::{by_key, supported_clusters, SolCluster, SplToken, NATIVE_DECIMALS};
pub use error::SolError;
