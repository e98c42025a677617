use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::WalletError;
use crate::network::NetworkDescriptor;

/// Chain families the wallet can hold accounts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainFamily {
    EvmLike,
    SolanaLike,
}

impl ChainFamily {
    pub const ALL: [ChainFamily; 2] = [ChainFamily::EvmLike, ChainFamily::SolanaLike];

    /// Base-unit scale of the native currency (wei vs lamports).
    pub fn native_decimals(&self) -> u8 {
        match self {
            ChainFamily::EvmLike => chain_eth::NATIVE_DECIMALS,
            ChainFamily::SolanaLike => chain_sol::NATIVE_DECIMALS,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ChainFamily::EvmLike => "EVM",
            ChainFamily::SolanaLike => "Solana",
        }
    }

    /// Address grammar predicate for this family.
    pub fn is_valid_address(&self, address: &str) -> bool {
        match self {
            ChainFamily::EvmLike => chain_eth::is_valid_address(address),
            ChainFamily::SolanaLike => chain_sol::is_valid_address(address),
        }
    }

    /// Checks a user-entered recipient. Empty input gets its own message.
    pub fn validate_recipient(&self, address: &str) -> Result<(), WalletError> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(WalletError::InvalidRecipient(
                "recipient address is required".into(),
            ));
        }
        let valid = match self {
            ChainFamily::EvmLike => chain_eth::validate_address(trimmed)?,
            ChainFamily::SolanaLike => chain_sol::validate_address(trimmed)?,
        };
        if !valid {
            return Err(WalletError::InvalidRecipient(format!(
                "{trimmed} fails its checksum"
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Whether a quote came from a live SDK/aggregator or the fallback table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteMode {
    Live,
    Simulated,
}

/// Fee and expected-output estimate for a not-yet-broadcast transaction.
///
/// Amounts are base units. `fee` is in the source network's native
/// currency; `expected_output` is in the destination asset's units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub fee: U256,
    pub expected_output: Option<U256>,
    pub mode: QuoteMode,
}

impl Quote {
    pub fn live(fee: U256) -> Self {
        Self {
            fee,
            expected_output: None,
            mode: QuoteMode::Live,
        }
    }

    pub fn with_output(mut self, output: U256) -> Self {
        self.expected_output = Some(output);
        self
    }

    pub fn is_simulated(&self) -> bool {
        self.mode == QuoteMode::Simulated
    }
}

/// Outcome of a broadcast native send (or swap leg).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub hash: String,
    pub fee: U256,
    pub from: String,
    pub to: String,
    pub value: U256,
    /// Registry key of the network the transaction was broadcast on.
    pub network: String,
}

impl TransactionResult {
    pub fn explorer_url(&self, network: &NetworkDescriptor) -> String {
        network.tx_url(&self.hash)
    }
}

/// Outcome of a broadcast token transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub hash: String,
    pub fee: U256,
    pub from: String,
    pub to: String,
    /// Token contract address or mint.
    pub token: String,
    pub amount: U256,
    pub network: String,
}

impl TransferResult {
    pub fn explorer_url(&self, network: &NetworkDescriptor) -> String {
        network.tx_url(&self.hash)
    }
}

/// Token transfers report the moved amount as the transaction value.
impl From<TransferResult> for TransactionResult {
    fn from(t: TransferResult) -> Self {
        Self {
            hash: t.hash,
            fee: t.fee,
            from: t.from,
            to: t.to,
            value: t.amount,
            network: t.network,
        }
    }
}

/// Source leg of a bridge: what leaves the user's account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDebit {
    pub network: String,
    pub from: String,
    /// Deposit address of the bridge on the source network.
    pub to: String,
    pub asset: String,
    pub amount: U256,
}

/// Destination leg of a bridge: what the user expects to receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DestinationCredit {
    pub network: String,
    pub recipient: String,
    pub asset: String,
    pub expected_amount: U256,
}
