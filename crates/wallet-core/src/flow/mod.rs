//! Send, swap and bridge controllers.
//!
//! Each controller runs validate, quote, confirm, execute and report over
//! the wallet façade, and only ever hands [`FlowError`] to its caller.

mod bridge;
mod send;
mod swap;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use alloy_primitives::U256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::WalletError;
use crate::network::NetworkDescriptor;
use crate::quote::{QuoteEngine, QuoteFailure, QuoteInput, QuoteReason, QuoteSource, QuoteState};
use crate::types::{ChainFamily, Quote, QuoteMode, TransactionResult};
use crate::units;
use crate::wallet::MultiChainWallet;

pub use bridge::{BridgeFlow, BridgeOutcome, BridgePlan, CreditStatus};
pub use send::SendFlow;
pub use swap::SwapFlow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowErrorKind {
    ValidationFailed,
    InsufficientFunds,
    NoLiquidity,
    UserCancelled,
    NetworkError,
    Unknown,
}

/// The only error a flow controller reports to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct FlowError {
    pub kind: FlowErrorKind,
    pub message: String,
}

impl FlowError {
    pub fn new(kind: FlowErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(FlowErrorKind::ValidationFailed, message)
    }

    pub fn insufficient_funds(message: impl Into<String>) -> Self {
        Self::new(FlowErrorKind::InsufficientFunds, message)
    }

    pub fn cancelled() -> Self {
        Self::new(FlowErrorKind::UserCancelled, "cancelled by user")
    }
}

impl From<WalletError> for FlowError {
    fn from(e: WalletError) -> Self {
        let kind = match &e {
            WalletError::InvalidAmount(_)
            | WalletError::InvalidRecipient(_)
            | WalletError::UnsupportedNetwork(_)
            | WalletError::InvalidSeed(_) => FlowErrorKind::ValidationFailed,
            WalletError::InsufficientFunds(_) => FlowErrorKind::InsufficientFunds,
            WalletError::NoLiquidity(_) => FlowErrorKind::NoLiquidity,
            WalletError::BroadcastError(_)
            | WalletError::NetworkUnavailable(_)
            | WalletError::BalanceUnavailable(_) => FlowErrorKind::NetworkError,
            WalletError::DerivationError(_)
            | WalletError::ClientDisposed
            | WalletError::Config(_)
            | WalletError::Unknown(_) => FlowErrorKind::Unknown,
        };
        Self::new(kind, e.to_string())
    }
}

impl From<QuoteFailure> for FlowError {
    fn from(f: QuoteFailure) -> Self {
        let kind = match f.reason {
            QuoteReason::InvalidInput => FlowErrorKind::ValidationFailed,
            QuoteReason::NoLiquidity => FlowErrorKind::NoLiquidity,
            QuoteReason::NetworkUnavailable => FlowErrorKind::NetworkError,
            QuoteReason::Unknown => FlowErrorKind::Unknown,
        };
        Self::new(kind, f.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowAction {
    Send,
    Swap,
    Bridge,
}

/// What the user is asked to approve. Amounts are display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmationPrompt {
    pub action: FlowAction,
    pub network: String,
    pub destination_network: Option<String>,
    pub asset: String,
    pub to_asset: String,
    pub amount: String,
    pub recipient: String,
    /// Network fee in the source network's native currency.
    pub fee: String,
    pub fee_symbol: String,
    pub expected_output: Option<String>,
    pub mode: QuoteMode,
    pub is_testnet: bool,
    /// Source and destination belong to different chain families.
    pub cross_chain: bool,
}

impl ConfirmationPrompt {
    fn new(action: FlowAction, network: &NetworkDescriptor, input: &QuoteInput, quote: &Quote) -> Self {
        Self {
            action,
            network: network.key().to_string(),
            destination_network: None,
            asset: input.from_asset.to_ascii_uppercase(),
            to_asset: input.to_asset.to_ascii_uppercase(),
            amount: input.amount.trim().to_string(),
            recipient: input.recipient.trim().to_string(),
            fee: units::from_base_units(quote.fee, network.native_decimals()),
            fee_symbol: network.native_symbol().to_string(),
            expected_output: None,
            mode: quote.mode,
            is_testnet: network.is_testnet(),
            cross_chain: false,
        }
    }

    fn with_output(mut self, network: &NetworkDescriptor, quote: &Quote) -> Self {
        self.expected_output = quote
            .expected_output
            .map(|out| units::from_base_units(out, network.asset_decimals(&self.to_asset)));
        self
    }
}

/// Asks the user to approve a pending operation.
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &ConfirmationPrompt) -> bool;
}

/// Approves everything. For headless callers that confirm elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

#[async_trait]
impl Confirmer for AutoConfirm {
    async fn confirm(&self, _prompt: &ConfirmationPrompt) -> bool {
        true
    }
}

/// Balance read after a completed operation settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceSnapshot {
    pub network: String,
    pub family: ChainFamily,
    pub balance: String,
}

/// Result of a broadcast send or swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowOutcome {
    pub result: TransactionResult,
    pub asset: String,
    /// Output amount reported by the aggregator for swaps.
    pub output: Option<U256>,
    pub explorer_url: String,
}

/// State every controller shares: the quote session, the confirmation
/// policy and the post-operation balance refresh.
struct FlowCore {
    wallet: Arc<MultiChainWallet>,
    confirmer: Arc<dyn Confirmer>,
    source: Arc<dyn QuoteSource>,
    engine: QuoteEngine,
    settle_delay: Duration,
    require_testnet_confirmation: bool,
    balances: watch::Sender<Option<BalanceSnapshot>>,
    refresh: Mutex<Option<JoinHandle<()>>>,
}

impl FlowCore {
    fn new(
        wallet: Arc<MultiChainWallet>,
        confirmer: Arc<dyn Confirmer>,
        source: Arc<dyn QuoteSource>,
    ) -> Self {
        let config = wallet.config();
        let debounce = Duration::from_millis(config.quote.debounce_ms);
        let settle_delay = Duration::from_millis(config.flow.settle_delay_ms);
        let require_testnet_confirmation = config.flow.require_testnet_confirmation;
        let (balances, _) = watch::channel(None);
        Self {
            engine: QuoteEngine::new(source.clone(), debounce),
            wallet,
            confirmer,
            source,
            settle_delay,
            require_testnet_confirmation,
            balances,
            refresh: Mutex::new(None),
        }
    }

    fn quote_state(&self) -> QuoteState {
        self.engine.state()
    }

    /// The settled quote for exactly `input`, or a direct fetch when the
    /// session has none.
    async fn quote_for(&self, input: &QuoteInput) -> Result<Quote, FlowError> {
        if let Some(quote) = self.engine.ready_quote_for(input) {
            return Ok(quote);
        }
        debug!(network = %input.network, "no settled quote for input, fetching");
        Ok(self.source.fetch_quote(input).await?)
    }

    /// Mainnet operations and bridges always ask; testnet sends and swaps
    /// ask unless configured otherwise.
    async fn confirm(&self, prompt: &ConfirmationPrompt) -> Result<(), FlowError> {
        let ask = !prompt.is_testnet
            || self.require_testnet_confirmation
            || prompt.action == FlowAction::Bridge;
        if ask && !self.confirmer.confirm(prompt).await {
            return Err(FlowError::cancelled());
        }
        Ok(())
    }

    /// Best-effort balance check: `amount` of `asset` plus `fee` in native
    /// units must be covered. Unreadable balances skip the check; the
    /// broadcast outcome stays authoritative.
    async fn check_funds(
        &self,
        network: &NetworkDescriptor,
        asset: &str,
        amount: U256,
        fee: U256,
    ) -> Result<(), FlowError> {
        let client = self.wallet.client(network)?;
        let Some(native) = readable(client.balance_base_units(0).await, network)? else {
            return Ok(());
        };

        if network.is_native(asset) {
            let covered = amount.checked_add(fee).is_some_and(|need| need <= native);
            if !covered {
                return Err(FlowError::insufficient_funds(format!(
                    "amount plus fee exceeds your {} balance",
                    network.native_symbol()
                )));
            }
            return Ok(());
        }

        if fee > native {
            return Err(FlowError::insufficient_funds(format!(
                "not enough {} to pay the network fee",
                network.native_symbol()
            )));
        }
        let token = network.token_address(asset)?;
        if let Some(held) = readable(client.token_balance_base_units(token, 0).await, network)? {
            if amount > held {
                return Err(FlowError::insufficient_funds(format!(
                    "amount exceeds your {} balance",
                    asset.to_ascii_uppercase()
                )));
            }
        }
        Ok(())
    }

    /// Clears the quote session after any outcome. The network's balance is
    /// refreshed once the settle delay has passed on success, and after a
    /// network error, since the transaction may have been accepted anyway.
    fn finish<T>(
        &self,
        action: FlowAction,
        network: &NetworkDescriptor,
        result: Result<T, FlowError>,
    ) -> Result<T, FlowError> {
        self.engine.clear();
        match &result {
            Ok(_) => self.schedule_refresh(*network),
            Err(e) => {
                warn!(?action, network = %network, kind = ?e.kind, error = %e, "flow failed");
                if e.kind == FlowErrorKind::NetworkError {
                    self.schedule_refresh(*network);
                }
            }
        }
        result
    }

    fn schedule_refresh(&self, network: NetworkDescriptor) {
        let wallet = self.wallet.clone();
        let balances = self.balances.clone();
        let delay = self.settle_delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Skip if the user moved the family to another network meanwhile.
            if wallet.active_network(network.family()) != Some(network) {
                return;
            }
            let client = match wallet.client(&network) {
                Ok(client) => client,
                Err(e) => {
                    debug!(network = %network, error = %e, "balance refresh skipped");
                    return;
                }
            };
            if let Ok(balance) = client.get_balance(0).await {
                balances.send_replace(Some(BalanceSnapshot {
                    network: network.key().to_string(),
                    family: network.family(),
                    balance,
                }));
            }
        });

        let mut slot = self.refresh.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
    }
}

impl Drop for FlowCore {
    fn drop(&mut self) {
        let slot = self.refresh.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = slot.take() {
            task.abort();
        }
    }
}

/// `Ok(None)` for an unreadable balance, which the funds check tolerates.
fn readable(
    balance: Result<U256, WalletError>,
    network: &NetworkDescriptor,
) -> Result<Option<U256>, FlowError> {
    match balance {
        Ok(b) => Ok(Some(b)),
        Err(WalletError::BalanceUnavailable(msg)) => {
            warn!(network = %network, error = %msg, "balance unreadable, skipping funds check");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
