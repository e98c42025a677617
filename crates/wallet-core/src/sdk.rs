//! Boundary to the external wallet SDK and DEX/bridge services.
//!
//! The core never signs, derives keys or talks RPC itself. Each chain family
//! plugs in a [`WalletSdk`] whose managers derive accounts from the session
//! seed; swap and bridge services plug in behind [`SwapAggregator`] and
//! [`BridgeProtocol`].

use std::sync::Arc;

use alloy_primitives::U256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::network::NetworkDescriptor;
use crate::seed::Seed;
use crate::types::{ChainFamily, DestinationCredit};

/// Failure reported by an SDK or external service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SdkError {
    #[error("derivation failed: {0}")]
    Derivation(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("no liquidity: {0}")]
    NoLiquidity(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("{0}")]
    Other(String),
}

impl SdkError {
    /// Classifies a raw SDK error string. SDKs written against untyped
    /// runtimes only give us a message, so this matches the substrings they
    /// are known to use.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("insufficient funds")
            || lower.contains("exceeds balance")
            || lower.contains("insufficient balance")
        {
            SdkError::InsufficientFunds(message)
        } else if message.contains("INSUFFICIENT")
            || lower.contains("liquidity")
            || lower.contains("route")
        {
            // Router reverts such as INSUFFICIENT_OUTPUT_AMOUNT mean the pool
            // cannot fill the order.
            SdkError::NoLiquidity(message)
        } else if lower.contains("user rejected") || lower.contains("denied") {
            SdkError::Rejected(message)
        } else if lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("network")
            || lower.contains("fetch")
            || lower.contains("connection")
            || lower.contains("rate")
            || lower.contains("price")
        {
            SdkError::Transport(message)
        } else if lower.contains("rejected")
            || lower.contains("reverted")
            || lower.contains("nonce")
            || lower.contains("max fee")
        {
            SdkError::Rejected(message)
        } else if lower.contains("mnemonic") || lower.contains("derivation") {
            SdkError::Derivation(message)
        } else {
            SdkError::Other(message)
        }
    }
}

/// Parameters handed to an SDK manager when it connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub rpc_url: String,
    pub ws_url: Option<String>,
    pub chain_id: Option<u64>,
    /// Upper bound on the fee of a single transfer, in native base units.
    pub transfer_max_fee: U256,
    /// Solana commitment level; unused by EVM managers.
    pub commitment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeTransfer {
    pub to: String,
    pub value: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTransfer {
    /// Contract address or mint.
    pub token: String,
    pub recipient: String,
    pub amount: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    pub fee: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkReceipt {
    pub hash: String,
    pub fee: U256,
}

/// Network fee rates in native base units, as reported by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRates {
    pub normal: U256,
    pub fast: U256,
}

/// Factory for per-network managers of one chain family.
#[async_trait]
pub trait WalletSdk: Send + Sync {
    fn family(&self) -> ChainFamily;

    async fn connect(
        &self,
        seed: &Seed,
        network: &NetworkDescriptor,
        options: ConnectOptions,
    ) -> Result<Arc<dyn WalletManager>, SdkError>;
}

/// One SDK connection bound to a seed and a network.
#[async_trait]
pub trait WalletManager: Send + Sync {
    async fn derive_account(&self, index: u32) -> Result<Arc<dyn SdkAccount>, SdkError>;

    async fn fee_rates(&self) -> Result<FeeRates, SdkError>;

    /// Releases the connection. Must tolerate being called more than once.
    fn dispose(&self);
}

/// A derived account. Amounts are base units throughout.
#[async_trait]
pub trait SdkAccount: Send + Sync {
    async fn address(&self) -> Result<String, SdkError>;

    async fn balance(&self) -> Result<U256, SdkError>;

    async fn token_balance(&self, token: &str) -> Result<U256, SdkError>;

    async fn quote_send_transaction(&self, tx: &NativeTransfer) -> Result<FeeEstimate, SdkError>;

    async fn send_transaction(&self, tx: &NativeTransfer) -> Result<SdkReceipt, SdkError>;

    async fn quote_transfer(&self, transfer: &TokenTransfer) -> Result<FeeEstimate, SdkError>;

    async fn transfer(&self, transfer: &TokenTransfer) -> Result<SdkReceipt, SdkError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    /// Token addresses or mints; the native asset is passed in its wrapped
    /// form.
    pub token_in: String,
    pub token_out: String,
    pub token_in_amount: U256,
    /// Cap on the swap's network fee, in native base units.
    pub max_fee: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapEstimate {
    pub fee: U256,
    pub token_out_amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapReceipt {
    pub hash: String,
    pub fee: U256,
    pub token_in_amount: U256,
    pub token_out_amount: U256,
}

/// Live DEX aggregator, available on some networks only.
#[async_trait]
pub trait SwapAggregator: Send + Sync {
    fn supports(&self, network: &NetworkDescriptor) -> bool;

    async fn quote_swap(
        &self,
        account: &dyn SdkAccount,
        request: &SwapRequest,
    ) -> Result<SwapEstimate, SdkError>;

    async fn swap(
        &self,
        account: &dyn SdkAccount,
        request: &SwapRequest,
    ) -> Result<SwapReceipt, SdkError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeRequest {
    pub source_network: String,
    pub destination_network: String,
    pub asset: String,
    pub amount: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeEstimate {
    /// Total fee in source native base units.
    pub fee: U256,
    /// Amount credited on the destination, in destination asset units.
    pub expected_output: U256,
}

/// External cross-chain settlement service. The core only performs the
/// source debit; crediting the destination is the protocol's job.
#[async_trait]
pub trait BridgeProtocol: Send + Sync {
    /// Address on `network` that bridge deposits are sent to.
    fn deposit_address(&self, network: &NetworkDescriptor) -> Option<String>;

    async fn quote_bridge(&self, request: &BridgeRequest) -> Result<BridgeEstimate, SdkError>;

    /// Records what the destination leg should credit once the source debit
    /// with `source_hash` settles. Returns the protocol's tracking id.
    async fn register_credit(
        &self,
        source_hash: &str,
        credit: &DestinationCredit,
    ) -> Result<String, SdkError>;
}
