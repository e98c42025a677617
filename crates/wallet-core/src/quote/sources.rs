use std::sync::Arc;

use alloy_primitives::U256;
use async_trait::async_trait;

use super::{FallbackEstimator, QuoteFailure, QuoteInput, QuoteSource};
use crate::error::WalletError;
use crate::network::{self, NetworkDescriptor};
use crate::sdk::{BridgeProtocol, BridgeRequest, SwapAggregator, SwapRequest};
use crate::types::{Quote, QuoteMode};
use crate::units;
use crate::wallet::MultiChainWallet;

/// Parses the input amount in `asset`'s decimals and rejects zero.
pub(crate) fn positive_amount(
    network: &NetworkDescriptor,
    asset: &str,
    amount: &str,
) -> Result<U256, WalletError> {
    let value = units::to_base_units(amount, network.asset_decimals(asset))?;
    if value.is_zero() {
        return Err(WalletError::InvalidAmount(
            "amount must be greater than zero".into(),
        ));
    }
    Ok(value)
}

/// Aggregators trade the native asset in its wrapped form.
fn swap_token(network: &NetworkDescriptor, symbol: &str) -> Result<String, WalletError> {
    let symbol = if network.is_native(symbol) {
        format!("W{}", network.native_symbol())
    } else {
        symbol.to_string()
    };
    Ok(network.token_address(&symbol)?.to_string())
}

pub(crate) fn swap_request(
    network: &NetworkDescriptor,
    from_asset: &str,
    to_asset: &str,
    amount_in: U256,
    max_fee: U256,
) -> Result<SwapRequest, WalletError> {
    Ok(SwapRequest {
        token_in: swap_token(network, from_asset)?,
        token_out: swap_token(network, to_asset)?,
        token_in_amount: amount_in,
        max_fee,
    })
}

/// Network fee of a native send or token transfer, straight from the SDK.
pub struct SendQuoteSource {
    wallet: Arc<MultiChainWallet>,
}

impl SendQuoteSource {
    pub fn new(wallet: Arc<MultiChainWallet>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl QuoteSource for SendQuoteSource {
    async fn fetch_quote(&self, input: &QuoteInput) -> Result<Quote, QuoteFailure> {
        let network = network::lookup(&input.network)?;
        let client = self.wallet.client(&network)?;

        if network.is_native(&input.from_asset) {
            return Ok(client
                .quote_send_transaction(&input.recipient, &input.amount, 0)
                .await?);
        }

        let token = network.token_address(&input.from_asset)?;
        let amount = units::to_base_units(&input.amount, network.asset_decimals(&input.from_asset))?;
        Ok(client.quote_transfer(token, &input.recipient, amount, 0).await?)
    }
}

/// Swap quotes from a live aggregator where one serves the network, and
/// from the fallback rate table everywhere else.
pub struct SwapQuoteSource {
    wallet: Arc<MultiChainWallet>,
    aggregator: Option<Arc<dyn SwapAggregator>>,
    fallback: FallbackEstimator,
    max_fee: U256,
}

impl SwapQuoteSource {
    pub fn new(wallet: Arc<MultiChainWallet>, aggregator: Option<Arc<dyn SwapAggregator>>) -> Self {
        let config = wallet.config();
        let fallback = FallbackEstimator::new(&config.fallback);
        let max_fee = U256::from(config.fees.swap_max_fee);
        Self {
            wallet,
            aggregator,
            fallback,
            max_fee,
        }
    }

    /// Mode quotes for `network` will carry.
    pub fn mode_for(&self, network: &NetworkDescriptor) -> QuoteMode {
        match self.live_aggregator(network) {
            Some(_) => QuoteMode::Live,
            None => QuoteMode::Simulated,
        }
    }

    pub(crate) fn live_aggregator(
        &self,
        network: &NetworkDescriptor,
    ) -> Option<&Arc<dyn SwapAggregator>> {
        self.aggregator.as_ref().filter(|a| a.supports(network))
    }

    pub(crate) fn max_fee(&self) -> U256 {
        self.max_fee
    }
}

#[async_trait]
impl QuoteSource for SwapQuoteSource {
    async fn fetch_quote(&self, input: &QuoteInput) -> Result<Quote, QuoteFailure> {
        let network = network::lookup(&input.network)?;
        if input.from_asset.eq_ignore_ascii_case(&input.to_asset) {
            return Err(QuoteFailure::invalid_input("choose two different assets"));
        }
        let amount_in = positive_amount(&network, &input.from_asset, &input.amount)?;

        let Some(aggregator) = self.live_aggregator(&network) else {
            return self
                .fallback
                .swap_quote(&network, &input.from_asset, &input.to_asset, amount_in);
        };

        let request = swap_request(
            &network,
            &input.from_asset,
            &input.to_asset,
            amount_in,
            self.max_fee,
        )?;
        let account = self.wallet.client(&network)?.account(0).await?;
        let estimate = aggregator
            .quote_swap(account.as_ref(), &request)
            .await
            .map_err(WalletError::from)?;
        Ok(Quote::live(estimate.fee).with_output(estimate.token_out_amount))
    }
}

/// Bridge quotes from the configured protocol, or the fallback estimate
/// when none is available.
pub struct BridgeQuoteSource {
    protocol: Option<Arc<dyn BridgeProtocol>>,
    fallback: FallbackEstimator,
}

impl BridgeQuoteSource {
    pub fn new(wallet: &MultiChainWallet, protocol: Option<Arc<dyn BridgeProtocol>>) -> Self {
        Self {
            protocol,
            fallback: FallbackEstimator::new(&wallet.config().fallback),
        }
    }

    pub fn mode(&self) -> QuoteMode {
        match self.protocol {
            Some(_) => QuoteMode::Live,
            None => QuoteMode::Simulated,
        }
    }
}

/// Source and destination networks of a bridge input.
pub(crate) fn bridge_networks(
    input: &QuoteInput,
) -> Result<(NetworkDescriptor, NetworkDescriptor), WalletError> {
    let source = network::lookup(&input.network)?;
    let destination_key = input.destination_network.as_deref().ok_or_else(|| {
        WalletError::UnsupportedNetwork("bridge needs a destination network".into())
    })?;
    let destination = network::lookup(destination_key)?;
    if source == destination {
        return Err(WalletError::UnsupportedNetwork(
            "source and destination networks must differ".into(),
        ));
    }
    Ok((source, destination))
}

#[async_trait]
impl QuoteSource for BridgeQuoteSource {
    async fn fetch_quote(&self, input: &QuoteInput) -> Result<Quote, QuoteFailure> {
        let (source, destination) = bridge_networks(input)?;
        if !input.recipient.trim().is_empty() {
            destination.family().validate_recipient(&input.recipient)?;
        }
        let amount_in = positive_amount(&source, &input.from_asset, &input.amount)?;

        match &self.protocol {
            Some(protocol) => {
                let request = BridgeRequest {
                    source_network: source.key().to_string(),
                    destination_network: destination.key().to_string(),
                    asset: input.from_asset.clone(),
                    amount: amount_in,
                };
                let estimate = protocol
                    .quote_bridge(&request)
                    .await
                    .map_err(WalletError::from)?;
                Ok(Quote::live(estimate.fee).with_output(estimate.expected_output))
            }
            None => self.fallback.bridge_quote(
                &source,
                &destination,
                &input.from_asset,
                &input.to_asset,
                amount_in,
            ),
        }
    }
}
