use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use super::{BalanceSnapshot, ConfirmationPrompt, Confirmer, FlowAction, FlowCore, FlowError, FlowOutcome};
use crate::error::WalletError;
use crate::network::{self, NetworkDescriptor};
use crate::quote::{positive_amount, swap_request, QuoteInput, QuoteState, SwapQuoteSource};
use crate::sdk::SwapAggregator;
use crate::types::{QuoteMode, TransactionResult};
use crate::wallet::MultiChainWallet;

/// Same-network swaps through a live aggregator. Networks without one are
/// quoted from the fallback table but never executed.
pub struct SwapFlow {
    core: FlowCore,
    source: Arc<SwapQuoteSource>,
}

impl SwapFlow {
    pub fn new(
        wallet: Arc<MultiChainWallet>,
        confirmer: Arc<dyn Confirmer>,
        aggregator: Option<Arc<dyn SwapAggregator>>,
    ) -> Self {
        let source = Arc::new(SwapQuoteSource::new(wallet.clone(), aggregator));
        Self {
            core: FlowCore::new(wallet, confirmer, source.clone()),
            source,
        }
    }

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

    pub fn balance_updates(&self) -> watch::Receiver<Option<BalanceSnapshot>> {
        self.core.balances.subscribe()
    }

    /// Whether quotes on `network` come from a live aggregator or the
    /// fallback table. For disclosure next to the quote.
    pub fn mode_for(&self, network: &str) -> Result<QuoteMode, FlowError> {
        let network = network::lookup(network)?;
        Ok(self.source.mode_for(&network))
    }

    pub async fn submit(&self, input: &QuoteInput) -> Result<FlowOutcome, FlowError> {
        let network = network::lookup(&input.network)?;
        let result = self.execute(&network, input).await;
        self.core.finish(FlowAction::Swap, &network, result)
    }

    async fn execute(
        &self,
        network: &NetworkDescriptor,
        input: &QuoteInput,
    ) -> Result<FlowOutcome, FlowError> {
        if input.from_asset.eq_ignore_ascii_case(&input.to_asset) {
            return Err(FlowError::validation("choose two different assets"));
        }
        let amount_in = positive_amount(network, &input.from_asset, &input.amount)?;

        let quote = self.core.quote_for(input).await?;
        if quote.is_simulated() {
            return Err(FlowError::validation(format!(
                "swap quotes on {} are simulated and cannot be executed",
                network.name()
            )));
        }
        let aggregator = self.source.live_aggregator(network).ok_or_else(|| {
            FlowError::validation(format!("no swap aggregator serves {}", network.name()))
        })?;

        self.core
            .check_funds(network, &input.from_asset, amount_in, quote.fee)
            .await?;
        let prompt = ConfirmationPrompt::new(FlowAction::Swap, network, input, &quote)
            .with_output(network, &quote);
        self.core.confirm(&prompt).await?;

        let request = swap_request(
            network,
            &input.from_asset,
            &input.to_asset,
            amount_in,
            self.source.max_fee(),
        )?;
        let account = self.core.wallet.client(network)?.account(0).await?;
        let from = account.address().await.map_err(WalletError::from)?;

        info!(network = %network, from = %input.from_asset, to = %input.to_asset, %amount_in, "broadcasting swap");
        let receipt = aggregator
            .swap(account.as_ref(), &request)
            .await
            .map_err(WalletError::from_broadcast)?;
        info!(network = %network, hash = %receipt.hash, "swap broadcast");

        let result = TransactionResult {
            hash: receipt.hash,
            fee: receipt.fee,
            from,
            to: request.token_out,
            value: receipt.token_in_amount,
            network: network.key().to_string(),
        };
        let explorer_url = result.explorer_url(network);
        Ok(FlowOutcome {
            result,
            asset: input.from_asset.to_ascii_uppercase(),
            output: Some(receipt.token_out_amount),
            explorer_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;

    use super::*;
    use crate::config::WalletConfig;
    use crate::flow::FlowErrorKind;
    use crate::seed::{Seed, Session};
    use crate::testing::{MockAggregator, MockSdk, ScriptedConfirmer};

    const ONE_ETH: u128 = 1_000_000_000_000_000_000;

    fn wallet(evm: &MockSdk) -> Arc<MultiChainWallet> {
        let seed = Seed::from_phrase(
            "abandon abandon abandon abandon abandon abandon \
             abandon abandon abandon abandon abandon about",
        )
        .unwrap();
        Arc::new(
            MultiChainWallet::new(&Session::new(seed, WalletConfig::default()))
                .with_sdk(Arc::new(evm.clone()))
                .with_sdk(Arc::new(MockSdk::solana())),
        )
    }

    fn mainnet_aggregator() -> MockAggregator {
        MockAggregator::new(&["ethereum"], U256::from(3_000_000_000_000_000u64), U256::from(2_440_000_000u64))
    }

    #[tokio::test(start_paused = true)]
    async fn live_swap_executes_through_aggregator() {
        let evm = MockSdk::evm().with_balance(U256::from(2 * ONE_ETH));
        let aggregator = mainnet_aggregator();
        let confirmer = ScriptedConfirmer::accept();
        let flow = SwapFlow::new(
            wallet(&evm),
            Arc::new(confirmer.clone()),
            Some(Arc::new(aggregator.clone())),
        );

        let outcome = flow
            .submit(&QuoteInput::swap("ethereum", "ETH", "USDC", "1"))
            .await
            .unwrap();
        assert_eq!(outcome.output, Some(U256::from(2_440_000_000u64)));
        assert_eq!(outcome.result.value, U256::from(ONE_ETH));
        assert!(outcome.explorer_url.starts_with("https://etherscan.io/tx/"));
        assert_eq!(aggregator.swap_requests().len(), 1);

        let prompt = &confirmer.prompts()[0];
        assert!(!prompt.is_testnet);
        assert_eq!(prompt.expected_output.as_deref(), Some("2440"));
        assert_eq!(prompt.mode, QuoteMode::Live);
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_quote_is_never_executed() {
        let evm = MockSdk::evm().with_balance(U256::from(2 * ONE_ETH));
        let aggregator = mainnet_aggregator();
        let confirmer = ScriptedConfirmer::accept();
        let flow = SwapFlow::new(
            wallet(&evm),
            Arc::new(confirmer.clone()),
            Some(Arc::new(aggregator.clone())),
        );
        assert_eq!(flow.mode_for("sepolia"), Ok(QuoteMode::Simulated));
        assert_eq!(flow.mode_for("ethereum"), Ok(QuoteMode::Live));

        let err = flow
            .submit(&QuoteInput::swap("sepolia", "WETH", "USDC", "1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, FlowErrorKind::ValidationFailed);
        assert!(err.message.contains("simulated"));
        assert!(aggregator.swap_requests().is_empty());
        assert!(confirmer.prompts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn no_route_is_no_liquidity() {
        let evm = MockSdk::evm().with_balance(U256::from(2 * ONE_ETH));
        let aggregator = mainnet_aggregator().with_error("no route found for pair");
        let flow = SwapFlow::new(
            wallet(&evm),
            Arc::new(ScriptedConfirmer::accept()),
            Some(Arc::new(aggregator)),
        );
        let err = flow
            .submit(&QuoteInput::swap("ethereum", "USDC", "WETH", "10"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, FlowErrorKind::NoLiquidity);
    }

    #[tokio::test(start_paused = true)]
    async fn same_asset_is_rejected_locally() {
        let evm = MockSdk::evm();
        let flow = SwapFlow::new(wallet(&evm), Arc::new(ScriptedConfirmer::accept()), None);
        let err = flow
            .submit(&QuoteInput::swap("sepolia", "USDC", "USDC", "1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, FlowErrorKind::ValidationFailed);
        assert_eq!(evm.network_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn swap_fee_must_be_covered() {
        let evm = MockSdk::evm().with_balance(U256::from(ONE_ETH));
        let aggregator = mainnet_aggregator();
        let flow = SwapFlow::new(
            wallet(&evm),
            Arc::new(ScriptedConfirmer::accept()),
            Some(Arc::new(aggregator.clone())),
        );
        let err = flow
            .submit(&QuoteInput::swap("ethereum", "ETH", "USDC", "1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, FlowErrorKind::InsufficientFunds);
        assert!(aggregator.swap_requests().is_empty());
    }
}
