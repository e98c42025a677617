//! EVM-like chain family support for the multi-chain wallet.
//!
//! This crate provides:
//! - Address grammar checks (`0x` + 40 hex characters, EIP-55 checksum
//!   verified on mixed-case input)
//! - EIP-55 checksum encoding
//! - Static EVM network definitions with known ERC-20 assets
//!
//! Signing, RPC and fee estimation live behind the wallet SDK boundary in
//! `wallet-core`; nothing here performs I/O.

pub mod address;
pub mod chains;
pub mod error;

pub use address::{checksum_address, is_valid_address, validate_address};
pub use chains::{by_key, supported_chains, Erc20Token, EvmChain, NATIVE_DECIMALS};
pub use error::EthError;
