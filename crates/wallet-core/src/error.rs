use thiserror::Error;

use crate::sdk::SdkError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Key derivation failed: {0}")]
    DerivationError(String),

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("No liquidity: {0}")]
    NoLiquidity(String),

    #[error("Broadcast failed: {0}")]
    BroadcastError(String),

    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("Balance unavailable: {0}")]
    BalanceUnavailable(String),

    /// A caller used a client after `dispose()`. This is a lifecycle bug in
    /// the caller, not a runtime condition to recover from.
    #[error("Client disposed")]
    ClientDisposed,

    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl WalletError {
    /// Classifies an SDK failure raised while broadcasting. Anything that is
    /// not a funds or liquidity problem counts as a rejected broadcast.
    pub fn from_broadcast(e: SdkError) -> Self {
        match e {
            SdkError::InsufficientFunds(msg) => WalletError::InsufficientFunds(msg),
            SdkError::NoLiquidity(msg) => WalletError::NoLiquidity(msg),
            SdkError::Derivation(msg) => WalletError::DerivationError(msg),
            SdkError::Transport(msg) | SdkError::Rejected(msg) | SdkError::Other(msg) => {
                WalletError::BroadcastError(msg)
            }
        }
    }
}

impl From<SdkError> for WalletError {
    fn from(e: SdkError) -> Self {
        match e {
            SdkError::Derivation(msg) => WalletError::DerivationError(msg),
            SdkError::InsufficientFunds(msg) => WalletError::InsufficientFunds(msg),
            SdkError::NoLiquidity(msg) => WalletError::NoLiquidity(msg),
            SdkError::Transport(msg) => WalletError::NetworkUnavailable(msg),
            SdkError::Rejected(msg) => WalletError::BroadcastError(msg),
            SdkError::Other(msg) => WalletError::Unknown(msg),
        }
    }
}

impl From<chain_eth::EthError> for WalletError {
    fn from(e: chain_eth::EthError) -> Self {
        match e {
            chain_eth::EthError::InvalidAddress(msg) => WalletError::InvalidRecipient(msg),
            other => WalletError::UnsupportedNetwork(format!("EVM: {other}")),
        }
    }
}

impl From<chain_sol::SolError> for WalletError {
    fn from(e: chain_sol::SolError) -> Self {
        match e {
            chain_sol::SolError::InvalidAddress(msg) => WalletError::InvalidRecipient(msg),
            other => WalletError::UnsupportedNetwork(format!("Solana: {other}")),
        }
    }
}
