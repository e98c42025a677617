//! Per-network account client.
//!
//! Wraps exactly one SDK manager bound to the session seed and one network.
//! The manager is connected lazily on first use and derived accounts are
//! cached by index. After `dispose()` every operation fails with
//! `ClientDisposed` without touching the SDK.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy_primitives::U256;
use tracing::{debug, info, warn};

use crate::config::FeeConfig;
use crate::error::WalletError;
use crate::network::NetworkDescriptor;
use crate::sdk::{
    ConnectOptions, FeeRates, NativeTransfer, SdkAccount, SdkError, TokenTransfer, WalletManager,
    WalletSdk,
};
use crate::seed::Seed;
use crate::types::{ChainFamily, Quote, TransactionResult, TransferResult};
use crate::units;

const SOLANA_COMMITMENT: &str = "confirmed";

enum ClientState {
    Idle,
    Connected {
        manager: Arc<dyn WalletManager>,
        accounts: HashMap<u32, Arc<dyn SdkAccount>>,
    },
    Disposed,
}

pub struct ChainAccountClient {
    network: NetworkDescriptor,
    seed: Seed,
    sdk: Arc<dyn WalletSdk>,
    options: ConnectOptions,
    state: Mutex<ClientState>,
}

/// Derivation failures keep their transport category so callers can tell a
/// bad seed from an unreachable SDK.
fn derivation_error(e: SdkError) -> WalletError {
    match e {
        SdkError::Transport(msg) => WalletError::NetworkUnavailable(msg),
        SdkError::Derivation(msg) | SdkError::Other(msg) | SdkError::Rejected(msg) => {
            WalletError::DerivationError(msg)
        }
        other => WalletError::DerivationError(other.to_string()),
    }
}

impl ChainAccountClient {
    pub fn new(
        seed: Seed,
        network: NetworkDescriptor,
        sdk: Arc<dyn WalletSdk>,
        fees: &FeeConfig,
    ) -> Result<Self, WalletError> {
        if sdk.family() != network.family() {
            return Err(WalletError::UnsupportedNetwork(format!(
                "{} SDK cannot serve {}",
                sdk.family(),
                network.key()
            )));
        }

        let (transfer_max_fee, commitment) = match network.family() {
            ChainFamily::EvmLike => (U256::from(fees.evm_transfer_max_fee), None),
            ChainFamily::SolanaLike => (
                U256::from(fees.solana_transfer_max_fee),
                Some(SOLANA_COMMITMENT.to_string()),
            ),
        };
        let options = ConnectOptions {
            rpc_url: network.rpc_url().to_string(),
            ws_url: network.ws_url().map(str::to_string),
            chain_id: network.chain_id(),
            transfer_max_fee,
            commitment,
        };

        Ok(Self {
            network,
            seed,
            sdk,
            options,
            state: Mutex::new(ClientState::Idle),
        })
    }

    pub fn network(&self) -> &NetworkDescriptor {
        &self.network
    }

    pub fn family(&self) -> ChainFamily {
        self.network.family()
    }

    pub fn is_disposed(&self) -> bool {
        matches!(*self.lock(), ClientState::Disposed)
    }

    fn lock(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_live(&self) -> Result<(), WalletError> {
        if self.is_disposed() {
            return Err(WalletError::ClientDisposed);
        }
        Ok(())
    }

    /// Connected manager, or `None` while idle.
    fn current_manager(&self) -> Result<Option<Arc<dyn WalletManager>>, WalletError> {
        match &*self.lock() {
            ClientState::Connected { manager, .. } => Ok(Some(manager.clone())),
            ClientState::Disposed => Err(WalletError::ClientDisposed),
            ClientState::Idle => Ok(None),
        }
    }

    fn cached_account(&self, index: u32) -> Option<Arc<dyn SdkAccount>> {
        match &*self.lock() {
            ClientState::Connected { accounts, .. } => accounts.get(&index).cloned(),
            _ => None,
        }
    }

    async fn manager(&self) -> Result<Arc<dyn WalletManager>, WalletError> {
        if let Some(manager) = self.current_manager()? {
            return Ok(manager);
        }

        debug!(network = %self.network, "connecting wallet manager");
        let connected = self
            .sdk
            .connect(&self.seed, &self.network, self.options.clone())
            .await
            .map_err(derivation_error)?;

        let mut state = self.lock();
        match &*state {
            ClientState::Idle => {
                *state = ClientState::Connected {
                    manager: connected.clone(),
                    accounts: HashMap::new(),
                };
                Ok(connected)
            }
            // Another caller connected while we were waiting.
            ClientState::Connected { manager, .. } => {
                connected.dispose();
                Ok(manager.clone())
            }
            ClientState::Disposed => {
                connected.dispose();
                Err(WalletError::ClientDisposed)
            }
        }
    }

    /// Derived account at `index`, cached for the life of the connection.
    pub(crate) async fn account(&self, index: u32) -> Result<Arc<dyn SdkAccount>, WalletError> {
        let manager = self.manager().await?;
        if let Some(account) = self.cached_account(index) {
            return Ok(account);
        }

        let derived = manager
            .derive_account(index)
            .await
            .map_err(derivation_error)?;

        let mut state = self.lock();
        match &mut *state {
            ClientState::Connected { accounts, .. } => {
                Ok(accounts.entry(index).or_insert(derived).clone())
            }
            _ => Err(WalletError::ClientDisposed),
        }
    }

    pub async fn get_address(&self, index: u32) -> Result<String, WalletError> {
        let account = self.account(index).await?;
        let address = account.address().await.map_err(derivation_error)?;
        self.ensure_live()?;
        Ok(address)
    }

    /// Native balance for display. Read failures are logged and shown as
    /// `"0"`; use [`Self::balance_base_units`] when zero must mean zero.
    pub async fn get_balance(&self, index: u32) -> Result<String, WalletError> {
        match self.balance_base_units(index).await {
            Ok(balance) => Ok(units::from_base_units(balance, self.network.native_decimals())),
            Err(WalletError::ClientDisposed) => Err(WalletError::ClientDisposed),
            Err(e) => {
                warn!(network = %self.network, index, error = %e, "balance fetch failed, showing zero");
                Ok("0".to_string())
            }
        }
    }

    /// Native balance in base units. Fails with `BalanceUnavailable` when the
    /// SDK cannot read it.
    pub async fn balance_base_units(&self, index: u32) -> Result<U256, WalletError> {
        let account = self.account(index).await.map_err(|e| match e {
            WalletError::NetworkUnavailable(msg) => WalletError::BalanceUnavailable(msg),
            other => other,
        })?;
        let balance = account
            .balance()
            .await
            .map_err(|e| WalletError::BalanceUnavailable(e.to_string()))?;
        self.ensure_live()?;
        Ok(balance)
    }

    /// Token balance for display, with the same zero-on-failure policy as
    /// [`Self::get_balance`]. `symbol` must be deployed on this network.
    pub async fn get_token_balance(&self, symbol: &str, index: u32) -> Result<String, WalletError> {
        let token = self.network.token_address(symbol)?;
        let decimals = self.network.asset_decimals(symbol);
        match self.token_balance_base_units(token, index).await {
            Ok(balance) => Ok(units::from_base_units(balance, decimals)),
            Err(WalletError::ClientDisposed) => Err(WalletError::ClientDisposed),
            Err(e) => {
                warn!(network = %self.network, token = symbol, error = %e, "token balance fetch failed, showing zero");
                Ok("0".to_string())
            }
        }
    }

    pub async fn token_balance_base_units(
        &self,
        token: &str,
        index: u32,
    ) -> Result<U256, WalletError> {
        let account = self.account(index).await?;
        let balance = account
            .token_balance(token)
            .await
            .map_err(|e| WalletError::BalanceUnavailable(e.to_string()))?;
        self.ensure_live()?;
        Ok(balance)
    }

    /// Checks recipient grammar before anything reaches the SDK.
    fn native_transfer(&self, to: &str, amount: &str) -> Result<NativeTransfer, WalletError> {
        self.ensure_live()?;
        self.family().validate_recipient(to)?;
        let value = units::to_base_units(amount, self.network.native_decimals())?;
        Ok(NativeTransfer {
            to: to.trim().to_string(),
            value,
        })
    }

    pub async fn quote_send_transaction(
        &self,
        to: &str,
        amount: &str,
        index: u32,
    ) -> Result<Quote, WalletError> {
        let tx = self.native_transfer(to, amount)?;
        self.quote_native(&tx, index).await
    }

    pub(crate) async fn quote_native(
        &self,
        tx: &NativeTransfer,
        index: u32,
    ) -> Result<Quote, WalletError> {
        let account = self.account(index).await?;
        let estimate = account.quote_send_transaction(tx).await?;
        self.ensure_live()?;
        Ok(Quote::live(estimate.fee))
    }

    pub async fn send_transaction(
        &self,
        to: &str,
        amount: &str,
        index: u32,
    ) -> Result<TransactionResult, WalletError> {
        let tx = self.native_transfer(to, amount)?;
        self.send_value(&tx.to, tx.value, index).await
    }

    /// Broadcasts a native transfer of `value` base units.
    pub async fn send_value(
        &self,
        to: &str,
        value: U256,
        index: u32,
    ) -> Result<TransactionResult, WalletError> {
        self.ensure_live()?;
        self.family().validate_recipient(to)?;
        let account = self.account(index).await?;
        let from = account.address().await.map_err(derivation_error)?;
        let tx = NativeTransfer {
            to: to.trim().to_string(),
            value,
        };

        info!(network = %self.network, %from, to = %tx.to, %value, "broadcasting native transfer");
        let receipt = account
            .send_transaction(&tx)
            .await
            .map_err(WalletError::from_broadcast)?;
        info!(network = %self.network, hash = %receipt.hash, fee = %receipt.fee, "native transfer broadcast");

        Ok(TransactionResult {
            hash: receipt.hash,
            fee: receipt.fee,
            from,
            to: tx.to,
            value,
            network: self.network.key().to_string(),
        })
    }

    fn token_transfer(
        &self,
        token: &str,
        recipient: &str,
        amount: U256,
    ) -> Result<TokenTransfer, WalletError> {
        self.ensure_live()?;
        self.family().validate_recipient(recipient)?;
        let well_formed = match self.family() {
            ChainFamily::EvmLike => chain_eth::validate_address(token).is_ok(),
            ChainFamily::SolanaLike => chain_sol::validate_address(token).is_ok(),
        };
        if !well_formed {
            return Err(WalletError::UnsupportedNetwork(format!(
                "{token} is not a token address on {}",
                self.network.name()
            )));
        }
        Ok(TokenTransfer {
            token: token.to_string(),
            recipient: recipient.trim().to_string(),
            amount,
        })
    }

    /// Fee estimate for a token transfer. `amount` is already in the
    /// token's base units.
    pub async fn quote_transfer(
        &self,
        token: &str,
        recipient: &str,
        amount: U256,
        index: u32,
    ) -> Result<Quote, WalletError> {
        let transfer = self.token_transfer(token, recipient, amount)?;
        let account = self.account(index).await?;
        let estimate = account.quote_transfer(&transfer).await?;
        self.ensure_live()?;
        Ok(Quote::live(estimate.fee))
    }

    pub async fn transfer_token(
        &self,
        token: &str,
        recipient: &str,
        amount: U256,
        index: u32,
    ) -> Result<TransferResult, WalletError> {
        let transfer = self.token_transfer(token, recipient, amount)?;
        let account = self.account(index).await?;
        let from = account.address().await.map_err(derivation_error)?;

        info!(network = %self.network, %from, token, %amount, "broadcasting token transfer");
        let receipt = account
            .transfer(&transfer)
            .await
            .map_err(WalletError::from_broadcast)?;
        info!(network = %self.network, hash = %receipt.hash, "token transfer broadcast");

        Ok(TransferResult {
            hash: receipt.hash,
            fee: receipt.fee,
            from,
            to: transfer.recipient,
            token: transfer.token,
            amount,
            network: self.network.key().to_string(),
        })
    }

    pub async fn fee_rates(&self) -> Result<FeeRates, WalletError> {
        let manager = self.manager().await?;
        let rates = manager.fee_rates().await?;
        self.ensure_live()?;
        Ok(rates)
    }

    /// Releases the SDK connection and forgets derived accounts. Safe to call
    /// more than once.
    pub fn dispose(&self) {
        let previous = std::mem::replace(&mut *self.lock(), ClientState::Disposed);
        if let ClientState::Connected { manager, .. } = previous {
            manager.dispose();
            debug!(network = %self.network, "wallet manager disposed");
        }
    }
}

impl std::fmt::Debug for ChainAccountClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainAccountClient")
            .field("network", &self.network.key())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Drop for ChainAccountClient {
    fn drop(&mut self) {
        self.dispose();
    }
}
