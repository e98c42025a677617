use std::sync::Arc;

use alloy_primitives::U256;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use super::{BalanceSnapshot, ConfirmationPrompt, Confirmer, FlowAction, FlowCore, FlowError};
use crate::network::{self, NetworkDescriptor};
use crate::quote::{bridge_networks, positive_amount, BridgeQuoteSource, QuoteInput, QuoteState};
use crate::sdk::BridgeProtocol;
use crate::types::{DestinationCredit, Quote, QuoteMode, SourceDebit, TransactionResult};
use crate::wallet::MultiChainWallet;

/// Both legs of a bridge, resolved but not yet executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgePlan {
    pub debit: SourceDebit,
    pub credit: DestinationCredit,
    pub quote: Quote,
    /// Source and destination belong to different chain families.
    pub cross_chain: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum CreditStatus {
    /// The protocol accepted the credit expectation under this id.
    Registered(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeOutcome {
    pub source: TransactionResult,
    pub explorer_url: String,
    pub credit: DestinationCredit,
    pub credit_status: CreditStatus,
}

/// Bridges as two separable legs: a debit to the protocol's deposit
/// address on the source network, then registration of the expected
/// credit on the destination. Settlement belongs to the protocol.
pub struct BridgeFlow {
    core: FlowCore,
    source: Arc<BridgeQuoteSource>,
    protocol: Option<Arc<dyn BridgeProtocol>>,
}

impl BridgeFlow {
    pub fn new(
        wallet: Arc<MultiChainWallet>,
        confirmer: Arc<dyn Confirmer>,
        protocol: Option<Arc<dyn BridgeProtocol>>,
    ) -> Self {
        let source = Arc::new(BridgeQuoteSource::new(&wallet, protocol.clone()));
        Self {
            core: FlowCore::new(wallet, confirmer, source.clone()),
            source,
            protocol,
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

    pub fn mode(&self) -> QuoteMode {
        self.source.mode()
    }

    /// Resolves both legs. The credit goes to the input's recipient when
    /// given, otherwise to the wallet's own address on the destination
    /// family.
    pub async fn plan(&self, input: &QuoteInput) -> Result<BridgePlan, FlowError> {
        let (source, destination) = bridge_networks(input)?;
        if !source.is_native(&input.from_asset) {
            source.token_address(&input.from_asset)?;
        }
        let amount = positive_amount(&source, &input.from_asset, &input.amount)?;
        let given = input.recipient.trim();
        if !given.is_empty() {
            destination.family().validate_recipient(given)?;
        }

        let quote = self.core.quote_for(input).await?;
        if quote.is_simulated() {
            return Err(FlowError::validation(
                "bridge quote is simulated and cannot be executed",
            ));
        }
        let protocol = self
            .protocol
            .as_ref()
            .ok_or_else(|| FlowError::validation("no bridge protocol configured"))?;
        let deposit = protocol.deposit_address(&source).ok_or_else(|| {
            FlowError::validation(format!("bridge has no deposit address on {}", source.name()))
        })?;

        let from = self.core.wallet.client(&source)?.get_address(0).await?;
        let cross_chain = source.family() != destination.family();
        let recipient = if !given.is_empty() {
            given.to_string()
        } else if !cross_chain {
            // One seed, one address across a family's networks.
            from.clone()
        } else {
            self.own_address_on(&destination).await?
        };

        Ok(BridgePlan {
            debit: SourceDebit {
                network: source.key().to_string(),
                from,
                to: deposit,
                asset: input.from_asset.to_ascii_uppercase(),
                amount,
            },
            credit: DestinationCredit {
                network: destination.key().to_string(),
                recipient,
                asset: input.to_asset.to_ascii_uppercase(),
                expected_amount: quote.expected_output.unwrap_or(U256::ZERO),
            },
            quote,
            cross_chain,
        })
    }

    /// Address on the destination family, read through whichever network
    /// that family is already on so no client gets switched.
    async fn own_address_on(&self, destination: &NetworkDescriptor) -> Result<String, FlowError> {
        let wallet = &self.core.wallet;
        let network = wallet
            .active_network(destination.family())
            .unwrap_or(*destination);
        Ok(wallet.client(&network)?.get_address(0).await?)
    }

    pub async fn submit(&self, input: &QuoteInput) -> Result<BridgeOutcome, FlowError> {
        let source = network::lookup(&input.network)?;
        let result = self.execute(&source, input).await;
        self.core.finish(FlowAction::Bridge, &source, result)
    }

    async fn execute(
        &self,
        source: &NetworkDescriptor,
        input: &QuoteInput,
    ) -> Result<BridgeOutcome, FlowError> {
        let plan = self.plan(input).await?;
        self.core
            .check_funds(source, &plan.debit.asset, plan.debit.amount, plan.quote.fee)
            .await?;

        let destination = network::lookup(&plan.credit.network)?;
        let mut prompt = ConfirmationPrompt::new(FlowAction::Bridge, source, input, &plan.quote)
            .with_output(&destination, &plan.quote);
        prompt.destination_network = Some(plan.credit.network.clone());
        prompt.recipient = plan.credit.recipient.clone();
        prompt.cross_chain = plan.cross_chain;
        self.core.confirm(&prompt).await?;

        let debit = self.execute_source_leg(&plan).await?;
        let credit_status = self.register_destination_leg(&plan, &debit.hash).await;
        let explorer_url = debit.explorer_url(source);
        Ok(BridgeOutcome {
            source: debit,
            explorer_url,
            credit: plan.credit,
            credit_status,
        })
    }

    /// Broadcasts the debit to the deposit address. Does not ask for
    /// confirmation.
    pub async fn execute_source_leg(&self, plan: &BridgePlan) -> Result<TransactionResult, FlowError> {
        let network = network::lookup(&plan.debit.network)?;
        let client = self.core.wallet.client(&network)?;
        let debit = &plan.debit;

        info!(source = %network, destination = %plan.credit.network, asset = %debit.asset, amount = %debit.amount, "bridge source leg");
        if network.is_native(&debit.asset) {
            return Ok(client.send_value(&debit.to, debit.amount, 0).await?);
        }
        let token = network.token_address(&debit.asset)?;
        Ok(client
            .transfer_token(token, &debit.to, debit.amount, 0)
            .await?
            .into())
    }

    /// Hands the credit expectation to the protocol. A failure here is
    /// reported in the outcome; the debit has already been broadcast.
    pub async fn register_destination_leg(&self, plan: &BridgePlan, source_hash: &str) -> CreditStatus {
        let Some(protocol) = &self.protocol else {
            return CreditStatus::Failed("no bridge protocol configured".into());
        };
        match protocol.register_credit(source_hash, &plan.credit).await {
            Ok(id) => {
                info!(%id, destination = %plan.credit.network, "bridge credit registered");
                CreditStatus::Registered(id)
            }
            Err(e) => {
                warn!(source_hash, destination = %plan.credit.network, error = %e, "bridge credit registration failed");
                CreditStatus::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WalletConfig;
    use crate::flow::FlowErrorKind;
    use crate::seed::{Seed, Session};
    use crate::testing::{MockBridge, MockCall, MockSdk, ScriptedConfirmer};
    use crate::types::ChainFamily;

    const ONE_ETH: u128 = 1_000_000_000_000_000_000;

    fn wallet(evm: &MockSdk, sol: &MockSdk) -> Arc<MultiChainWallet> {
        let seed = Seed::from_phrase(
            "abandon abandon abandon abandon abandon abandon \
             abandon abandon abandon abandon abandon about",
        )
        .unwrap();
        Arc::new(
            MultiChainWallet::new(&Session::new(seed, WalletConfig::default()))
                .with_sdk(Arc::new(evm.clone()))
                .with_sdk(Arc::new(sol.clone())),
        )
    }

    fn eth_to_sol(amount: &str) -> QuoteInput {
        let mut input = QuoteInput::bridge("sepolia", "solana-devnet", "ETH", amount);
        input.to_asset = "SOL".into();
        input
    }

    #[tokio::test(start_paused = true)]
    async fn cross_family_bridge_runs_both_legs() {
        let evm = MockSdk::evm().with_balance(U256::from(ONE_ETH));
        let sol = MockSdk::solana();
        let bridge = MockBridge::new(U256::from(100_000_000_000_000u64), U256::from(13_600_000_000u64));
        let confirmer = ScriptedConfirmer::accept();
        let flow = BridgeFlow::new(
            wallet(&evm, &sol),
            Arc::new(confirmer.clone()),
            Some(Arc::new(bridge.clone())),
        );

        let outcome = flow.submit(&eth_to_sol("0.5")).await.unwrap();
        assert_eq!(outcome.credit_status, CreditStatus::Registered("bridge-1".into()));
        assert_eq!(outcome.source.to, bridge.deposit_address_for(ChainFamily::EvmLike).unwrap());
        assert_eq!(outcome.credit.network, "solana-devnet");
        assert!(ChainFamily::SolanaLike.is_valid_address(&outcome.credit.recipient));

        let credits = bridge.registered_credits();
        assert_eq!(credits.len(), 1);
        assert_eq!(credits[0].0, outcome.source.hash);

        let prompt = &confirmer.prompts()[0];
        assert!(prompt.cross_chain);
        assert_eq!(prompt.destination_network.as_deref(), Some("solana-devnet"));
        assert_eq!(prompt.expected_output.as_deref(), Some("13.6"));
    }

    #[tokio::test(start_paused = true)]
    async fn same_family_bridge_credits_own_address_without_switching() {
        let (evm, sol) = (MockSdk::evm(), MockSdk::solana());
        let bridge = MockBridge::new(U256::from(1u64), U256::from(99u64));
        let flow = BridgeFlow::new(
            wallet(&evm, &sol),
            Arc::new(ScriptedConfirmer::accept()),
            Some(Arc::new(bridge)),
        );

        let plan = flow
            .plan(&QuoteInput::bridge("sepolia", "ethereum", "USDC", "100"))
            .await
            .unwrap();
        assert!(!plan.cross_chain);
        assert_eq!(plan.credit.recipient, plan.debit.from);
        assert_eq!(plan.debit.amount, U256::from(100_000_000u64));
        assert_eq!(plan.credit.expected_amount, U256::from(99u64));
        assert_eq!(evm.dispose_count(), 0);
        assert!(sol.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_bridge_is_refused() {
        let evm = MockSdk::evm().with_balance(U256::from(ONE_ETH));
        let flow = BridgeFlow::new(
            wallet(&evm, &MockSdk::solana()),
            Arc::new(ScriptedConfirmer::accept()),
            None,
        );
        assert_eq!(flow.mode(), QuoteMode::Simulated);

        // Same asset on both sides, so the fallback can quote it.
        let input = QuoteInput::bridge("sepolia", "solana-devnet", "ETH", "0.5");
        let err = flow.submit(&input).await.unwrap_err();
        assert_eq!(err.kind, FlowErrorKind::ValidationFailed);
        assert!(!evm.calls().iter().any(|c| matches!(c, MockCall::Send { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn recipient_must_match_destination_family() {
        let (evm, sol) = (MockSdk::evm(), MockSdk::solana());
        let flow = BridgeFlow::new(
            wallet(&evm, &sol),
            Arc::new(ScriptedConfirmer::accept()),
            Some(Arc::new(MockBridge::new(U256::ZERO, U256::ZERO))),
        );
        let input = eth_to_sol("1").with_recipient("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
        let err = flow.plan(&input).await.unwrap_err();
        assert_eq!(err.kind, FlowErrorKind::ValidationFailed);
        assert_eq!(evm.network_calls() + sol.network_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_registration_keeps_the_broadcast_debit() {
        let evm = MockSdk::evm().with_balance(U256::from(ONE_ETH));
        let bridge = MockBridge::new(U256::from(1u64), U256::from(1u64))
            .with_register_error("connection reset");
        let flow = BridgeFlow::new(
            wallet(&evm, &MockSdk::solana()),
            Arc::new(ScriptedConfirmer::accept()),
            Some(Arc::new(bridge)),
        );

        let outcome = flow.submit(&eth_to_sol("0.1")).await.unwrap();
        assert!(matches!(outcome.credit_status, CreditStatus::Failed(_)));
        assert_eq!(outcome.source.value, U256::from(ONE_ETH / 10));
    }

    #[tokio::test(start_paused = true)]
    async fn declined_bridge_broadcasts_nothing() {
        let evm = MockSdk::evm().with_balance(U256::from(ONE_ETH));
        let bridge = MockBridge::new(U256::from(1u64), U256::from(1u64));
        let flow = BridgeFlow::new(
            wallet(&evm, &MockSdk::solana()),
            Arc::new(ScriptedConfirmer::decline()),
            Some(Arc::new(bridge.clone())),
        );
        let err = flow.submit(&eth_to_sol("0.1")).await.unwrap_err();
        assert_eq!(err.kind, FlowErrorKind::UserCancelled);
        assert!(bridge.registered_credits().is_empty());
    }
}
