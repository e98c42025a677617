use std::sync::Arc;

use alloy_primitives::U256;
use tokio::sync::watch;
use tracing::info;

use super::{BalanceSnapshot, ConfirmationPrompt, Confirmer, FlowAction, FlowCore, FlowError, FlowOutcome};
use crate::network::{self, NetworkDescriptor};
use crate::quote::{positive_amount, QuoteInput, QuoteState, SendQuoteSource};
use crate::sdk::NativeTransfer;
use crate::types::TransactionResult;
use crate::units;
use crate::wallet::MultiChainWallet;

/// Native sends and token transfers on a single network.
pub struct SendFlow {
    core: FlowCore,
}

/// Recipient first, then a positive amount in the asset's decimals.
fn validate_on(network: &NetworkDescriptor, input: &QuoteInput) -> Result<U256, FlowError> {
    network.family().validate_recipient(&input.recipient)?;
    if !network.is_native(&input.from_asset) {
        network.token_address(&input.from_asset)?;
    }
    Ok(positive_amount(network, &input.from_asset, &input.amount)?)
}

impl SendFlow {
    pub fn new(wallet: Arc<MultiChainWallet>, confirmer: Arc<dyn Confirmer>) -> Self {
        let source = Arc::new(SendQuoteSource::new(wallet.clone()));
        Self {
            core: FlowCore::new(wallet, confirmer, source),
        }
    }

    /// Feeds the latest form state to the quote session.
    pub fn on_input(&self, input: QuoteInput) {
        self.core.engine.update_input(input);
    }

    pub fn refresh_quote(&self) {
        self.core.engine.refresh();
    }

    pub fn quote_state(&self) -> QuoteState {
        self.core.quote_state()
    }

    pub fn subscribe(&self) -> watch::Receiver<QuoteState> {
        self.core.engine.subscribe()
    }

    /// Balances read after each successful send has settled.
    pub fn balance_updates(&self) -> watch::Receiver<Option<BalanceSnapshot>> {
        self.core.balances.subscribe()
    }

    /// Local checks only; never reaches the SDK. Returns the amount in
    /// base units.
    pub fn validate(&self, input: &QuoteInput) -> Result<U256, FlowError> {
        let network = network::lookup(&input.network)?;
        validate_on(&network, input)
    }

    /// Validates, quotes, checks funds, asks for confirmation and
    /// broadcasts.
    pub async fn submit(&self, input: &QuoteInput) -> Result<FlowOutcome, FlowError> {
        let network = network::lookup(&input.network)?;
        let result = self.execute(&network, input).await;
        self.core.finish(FlowAction::Send, &network, result)
    }

    async fn execute(
        &self,
        network: &NetworkDescriptor,
        input: &QuoteInput,
    ) -> Result<FlowOutcome, FlowError> {
        let amount = validate_on(network, input)?;
        let quote = self.core.quote_for(input).await?;
        self.core
            .check_funds(network, &input.from_asset, amount, quote.fee)
            .await?;
        let prompt = ConfirmationPrompt::new(FlowAction::Send, network, input, &quote);
        self.core.confirm(&prompt).await?;

        let client = self.core.wallet.client(network)?;
        let recipient = input.recipient.trim();
        let result: TransactionResult = if network.is_native(&input.from_asset) {
            client.send_value(recipient, amount, 0).await?
        } else {
            let token = network.token_address(&input.from_asset)?;
            client
                .transfer_token(token, recipient, amount, 0)
                .await?
                .into()
        };
        info!(network = %network, hash = %result.hash, asset = %input.from_asset, "send complete");

        let explorer_url = result.explorer_url(network);
        Ok(FlowOutcome {
            result,
            asset: input.from_asset.to_ascii_uppercase(),
            output: None,
            explorer_url,
        })
    }

    /// Largest amount of the input's asset that can be sent. For the native
    /// asset this is the balance less the best known fee, saturating at
    /// zero; tokens can be sent in full.
    pub async fn max_sendable(&self, input: &QuoteInput) -> Result<String, FlowError> {
        let network = network::lookup(&input.network)?;
        let client = self.core.wallet.client(&network)?;

        if !network.is_native(&input.from_asset) {
            let token = network.token_address(&input.from_asset)?;
            let held = client.token_balance_base_units(token, 0).await?;
            return Ok(units::from_base_units(
                held,
                network.asset_decimals(&input.from_asset),
            ));
        }

        let balance = client.balance_base_units(0).await?;
        let known_fee = match self.core.quote_state() {
            QuoteState::Ready { input: quoted, quote }
                if quoted.network == input.network && network.is_native(&quoted.from_asset) =>
            {
                Some(quote.fee)
            }
            _ => None,
        };
        let fee = match known_fee {
            Some(fee) => fee,
            None => {
                let to = match input.recipient.trim() {
                    "" => client.get_address(0).await?,
                    given => {
                        network.family().validate_recipient(given)?;
                        given.to_string()
                    }
                };
                client
                    .quote_native(&NativeTransfer { to, value: balance }, 0)
                    .await?
                    .fee
            }
        };
        Ok(units::from_base_units(
            balance.saturating_sub(fee),
            network.native_decimals(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::WalletConfig;
    use crate::flow::FlowErrorKind;
    use crate::seed::{Seed, Session};
    use crate::testing::{MockCall, MockSdk, ScriptedConfirmer};

    const RECIPIENT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
    const ONE_ETH: u128 = 1_000_000_000_000_000_000;

    fn wallet_with(evm: &MockSdk, config: WalletConfig) -> Arc<MultiChainWallet> {
        let seed = Seed::from_phrase(
            "abandon abandon abandon abandon abandon abandon \
             abandon abandon abandon abandon abandon about",
        )
        .unwrap();
        Arc::new(
            MultiChainWallet::new(&Session::new(seed, config))
                .with_sdk(Arc::new(evm.clone()))
                .with_sdk(Arc::new(MockSdk::solana())),
        )
    }

    fn flow(evm: &MockSdk, confirmer: &ScriptedConfirmer) -> SendFlow {
        SendFlow::new(
            wallet_with(evm, WalletConfig::default()),
            Arc::new(confirmer.clone()),
        )
    }

    fn eth(amount: &str) -> QuoteInput {
        QuoteInput::send("sepolia", "ETH", RECIPIENT, amount)
    }

    fn sends(evm: &MockSdk) -> usize {
        evm.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::Send { .. } | MockCall::Transfer { .. }))
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn native_send_confirms_and_broadcasts() {
        let evm = MockSdk::evm().with_balance(U256::from(ONE_ETH));
        let confirmer = ScriptedConfirmer::accept();
        let flow = flow(&evm, &confirmer);

        let outcome = flow.submit(&eth("0.5")).await.unwrap();
        assert_eq!(outcome.result.value, U256::from(ONE_ETH / 2));
        assert_eq!(outcome.result.to, RECIPIENT);
        assert!(outcome
            .explorer_url
            .starts_with("https://sepolia.etherscan.io/tx/0x"));

        let prompts = confirmer.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].is_testnet);
        assert_eq!(prompts[0].fee, "0.0001");
        assert_eq!(flow.quote_state(), QuoteState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_recipient_fails_before_any_network_call() {
        let evm = MockSdk::evm();
        let flow = flow(&evm, &ScriptedConfirmer::accept());
        let err = flow
            .submit(&QuoteInput::send("sepolia", "ETH", "  ", "1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, FlowErrorKind::ValidationFailed);
        assert_eq!(evm.network_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_amount_is_rejected() {
        let evm = MockSdk::evm();
        let flow = flow(&evm, &ScriptedConfirmer::accept());
        assert_eq!(
            flow.validate(&eth("0.000")).unwrap_err().kind,
            FlowErrorKind::ValidationFailed
        );
        assert_eq!(flow.validate(&eth("0.25")), Ok(U256::from(ONE_ETH / 4)));
        assert_eq!(evm.network_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn amount_plus_fee_over_balance_is_insufficient() {
        let evm = MockSdk::evm().with_balance(U256::from(ONE_ETH / 2));
        let confirmer = ScriptedConfirmer::accept();
        let flow = flow(&evm, &confirmer);

        let err = flow.submit(&eth("0.5")).await.unwrap_err();
        assert_eq!(err.kind, FlowErrorKind::InsufficientFunds);
        assert_eq!(sends(&evm), 0);
        assert!(confirmer.prompts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_balance_skips_the_funds_check() {
        let evm = MockSdk::evm().with_balance_error("connection refused");
        let flow = flow(&evm, &ScriptedConfirmer::accept());
        flow.submit(&eth("0.5")).await.unwrap();
        assert_eq!(sends(&evm), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn declining_cancels_without_broadcast() {
        let evm = MockSdk::evm().with_balance(U256::from(ONE_ETH));
        let flow = flow(&evm, &ScriptedConfirmer::decline());
        flow.on_input(eth("0.5"));
        tokio::time::sleep(Duration::from_millis(600)).await;

        let err = flow.submit(&eth("0.5")).await.unwrap_err();
        assert_eq!(err.kind, FlowErrorKind::UserCancelled);
        assert_eq!(sends(&evm), 0);
        assert_eq!(flow.quote_state(), QuoteState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_broadcast_is_a_network_error() {
        let evm = MockSdk::evm()
            .with_balance(U256::from(ONE_ETH))
            .with_send_error("nonce too low");
        let flow = flow(&evm, &ScriptedConfirmer::accept());
        let err = flow.submit(&eth("0.1")).await.unwrap_err();
        assert_eq!(err.kind, FlowErrorKind::NetworkError);
    }

    #[tokio::test(start_paused = true)]
    async fn network_error_still_refreshes_the_balance() {
        let evm = MockSdk::evm()
            .with_balance(U256::from(ONE_ETH))
            .with_send_error("network request failed");
        let flow = flow(&evm, &ScriptedConfirmer::accept());
        let mut updates = flow.balance_updates();

        let err = flow.submit(&eth("0.1")).await.unwrap_err();
        assert_eq!(err.kind, FlowErrorKind::NetworkError);
        assert_eq!(flow.quote_state(), QuoteState::Idle);

        // The broadcast may have landed despite the error.
        evm.set_balance(U256::from(ONE_ETH * 9 / 10));
        updates.changed().await.unwrap();
        assert_eq!(updates.borrow().clone().unwrap().balance, "0.9");
    }

    #[tokio::test(start_paused = true)]
    async fn local_failure_does_not_refresh() {
        let evm = MockSdk::evm().with_balance(U256::from(ONE_ETH / 2));
        let flow = flow(&evm, &ScriptedConfirmer::accept());
        let updates = flow.balance_updates();

        let err = flow.submit(&eth("0.5")).await.unwrap_err();
        assert_eq!(err.kind, FlowErrorKind::InsufficientFunds);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(updates.borrow().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn settled_quote_is_reused() {
        let evm = MockSdk::evm().with_balance(U256::from(ONE_ETH));
        let flow = flow(&evm, &ScriptedConfirmer::accept());
        flow.on_input(eth("0.5"));
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(matches!(flow.quote_state(), QuoteState::Ready { .. }));

        flow.submit(&eth("0.5")).await.unwrap();
        let quotes = evm
            .calls()
            .iter()
            .filter(|c| matches!(c, MockCall::QuoteSend { .. }))
            .count();
        assert_eq!(quotes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn balance_refreshes_after_settle_delay() {
        let evm = MockSdk::evm().with_balance(U256::from(ONE_ETH));
        let flow = flow(&evm, &ScriptedConfirmer::accept());
        let mut updates = flow.balance_updates();

        flow.submit(&eth("0.5")).await.unwrap();
        evm.set_balance(U256::from(ONE_ETH / 2));

        tokio::time::sleep(Duration::from_millis(1_999)).await;
        assert!(updates.borrow().is_none());

        updates.changed().await.unwrap();
        let snapshot = updates.borrow().clone().unwrap();
        assert_eq!(snapshot.network, "sepolia");
        assert_eq!(snapshot.balance, "0.5");
    }

    #[tokio::test(start_paused = true)]
    async fn token_send_uses_token_decimals() {
        let evm = MockSdk::evm()
            .with_balance(U256::from(ONE_ETH))
            .with_token_balance(U256::from(100_000_000u64));
        let flow = flow(&evm, &ScriptedConfirmer::accept());

        let outcome = flow
            .submit(&QuoteInput::send("sepolia", "usdt", RECIPIENT, "12.5"))
            .await
            .unwrap();
        assert_eq!(outcome.asset, "USDT");
        assert!(evm.calls().iter().any(|c| matches!(
            c,
            MockCall::Transfer { amount, recipient, .. }
                if *amount == U256::from(12_500_000u64) && recipient == RECIPIENT
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn token_send_over_token_balance_is_insufficient() {
        let evm = MockSdk::evm()
            .with_balance(U256::from(ONE_ETH))
            .with_token_balance(U256::from(1_000_000u64));
        let flow = flow(&evm, &ScriptedConfirmer::accept());
        let err = flow
            .submit(&QuoteInput::send("sepolia", "USDT", RECIPIENT, "2"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, FlowErrorKind::InsufficientFunds);
    }

    #[tokio::test(start_paused = true)]
    async fn testnet_confirmation_can_be_disabled() {
        let evm = MockSdk::evm().with_balance(U256::from(ONE_ETH));
        let mut config = WalletConfig::default();
        config.flow.require_testnet_confirmation = false;
        let confirmer = ScriptedConfirmer::decline();
        let flow = SendFlow::new(wallet_with(&evm, config), Arc::new(confirmer.clone()));

        flow.submit(&eth("0.1")).await.unwrap();
        assert!(confirmer.prompts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn max_sendable_subtracts_the_fee() {
        let evm = MockSdk::evm().with_balance(U256::from(ONE_ETH));
        let flow = flow(&evm, &ScriptedConfirmer::accept());
        assert_eq!(flow.max_sendable(&eth("")).await.unwrap(), "0.9999");

        let dust = MockSdk::evm().with_balance(U256::from(10u64));
        let flow = SendFlow::new(
            wallet_with(&dust, WalletConfig::default()),
            Arc::new(ScriptedConfirmer::accept()),
        );
        assert_eq!(flow.max_sendable(&eth("")).await.unwrap(), "0");
    }
}
