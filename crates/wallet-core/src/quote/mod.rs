//! Debounced fee/output quoting for pending send, swap and bridge inputs.

mod engine;
mod fallback;
mod sources;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::WalletError;
use crate::types::Quote;

pub use engine::QuoteEngine;
pub use fallback::FallbackEstimator;
pub use sources::{BridgeQuoteSource, SendQuoteSource, SwapQuoteSource};
pub(crate) use sources::{bridge_networks, positive_amount, swap_request};

/// Raw user input a quote is computed for. A quote is only valid for the
/// exact input that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteInput {
    /// Registry key of the source network.
    pub network: String,
    /// Bridge destination; `None` for same-network operations.
    pub destination_network: Option<String>,
    pub from_asset: String,
    /// Swap/bridge output asset. Equal to `from_asset` for a send.
    pub to_asset: String,
    /// Decimal amount as typed by the user.
    pub amount: String,
    /// Empty when the operation has no explicit recipient.
    pub recipient: String,
}

impl QuoteInput {
    pub fn send(network: &str, asset: &str, recipient: &str, amount: &str) -> Self {
        Self {
            network: network.to_string(),
            destination_network: None,
            from_asset: asset.to_string(),
            to_asset: asset.to_string(),
            amount: amount.to_string(),
            recipient: recipient.to_string(),
        }
    }

    pub fn swap(network: &str, from_asset: &str, to_asset: &str, amount: &str) -> Self {
        Self {
            network: network.to_string(),
            destination_network: None,
            from_asset: from_asset.to_string(),
            to_asset: to_asset.to_string(),
            amount: amount.to_string(),
            recipient: String::new(),
        }
    }

    pub fn bridge(source: &str, destination: &str, asset: &str, amount: &str) -> Self {
        Self {
            network: source.to_string(),
            destination_network: Some(destination.to_string()),
            from_asset: asset.to_string(),
            to_asset: asset.to_string(),
            amount: amount.to_string(),
            recipient: String::new(),
        }
    }

    pub fn with_recipient(mut self, recipient: &str) -> Self {
        self.recipient = recipient.to_string();
        self
    }

    pub fn with_amount(mut self, amount: &str) -> Self {
        self.amount = amount.to_string();
        self
    }

    /// Empty or all-zero amounts never produce a quote.
    pub fn is_blank(&self) -> bool {
        let amount = self.amount.trim();
        amount.chars().all(|c| c == '0' || c == '.')
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteReason {
    NoLiquidity,
    InvalidInput,
    NetworkUnavailable,
    Unknown,
}

/// User-facing reason a quote could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct QuoteFailure {
    pub reason: QuoteReason,
    pub message: String,
}

impl QuoteFailure {
    pub fn new(reason: QuoteReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(QuoteReason::InvalidInput, message)
    }

    pub fn no_liquidity(message: impl Into<String>) -> Self {
        Self::new(QuoteReason::NoLiquidity, message)
    }
}

impl From<WalletError> for QuoteFailure {
    fn from(e: WalletError) -> Self {
        let reason = match &e {
            WalletError::InvalidAmount(_)
            | WalletError::InvalidRecipient(_)
            | WalletError::UnsupportedNetwork(_)
            | WalletError::InsufficientFunds(_) => QuoteReason::InvalidInput,
            WalletError::NoLiquidity(_) => QuoteReason::NoLiquidity,
            WalletError::NetworkUnavailable(_)
            | WalletError::BalanceUnavailable(_)
            | WalletError::BroadcastError(_) => QuoteReason::NetworkUnavailable,
            WalletError::DerivationError(_)
            | WalletError::ClientDisposed
            | WalletError::InvalidSeed(_)
            | WalletError::Config(_)
            | WalletError::Unknown(_) => QuoteReason::Unknown,
        };
        Self::new(reason, e.to_string())
    }
}

/// Where a quote session stands. Every state after `Idle` carries the input
/// it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteState {
    Idle,
    Debouncing { input: QuoteInput },
    Fetching { input: QuoteInput },
    Ready { input: QuoteInput, quote: Quote },
    Failed { input: QuoteInput, failure: QuoteFailure },
}

impl QuoteState {
    pub fn input(&self) -> Option<&QuoteInput> {
        match self {
            QuoteState::Idle => None,
            QuoteState::Debouncing { input }
            | QuoteState::Fetching { input }
            | QuoteState::Ready { input, .. }
            | QuoteState::Failed { input, .. } => Some(input),
        }
    }

    pub fn quote(&self) -> Option<&Quote> {
        match self {
            QuoteState::Ready { quote, .. } => Some(quote),
            _ => None,
        }
    }

    /// True once the session has stopped working on its input.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            QuoteState::Idle | QuoteState::Ready { .. } | QuoteState::Failed { .. }
        )
    }
}

/// Produces a quote for one input snapshot.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quote(&self, input: &QuoteInput) -> Result<Quote, QuoteFailure>;
}
