//! Deterministic estimates for networks without a live aggregator or bridge.
//!
//! Quotes from here are always tagged `Simulated`.

use alloy_primitives::U256;

use super::QuoteFailure;
use crate::config::FallbackConfig;
use crate::network::NetworkDescriptor;
use crate::types::{ChainFamily, Quote, QuoteMode};
use crate::units;

const BPS_DENOMINATOR: u64 = 10_000;

/// Rates are scaled by 10^18.
const RATE_DECIMALS: u8 = 18;

/// (from, to, units of `to` per unit of `from`). Native assets are listed
/// under their wrapped symbol on EVM and as `SOL` on Solana.
const RATES: RateTable = &[
    ("WETH", "USDT", "2450"),
    ("WETH", "USDC", "2450"),
    ("WETH", "DAI", "2450"),
    ("USDT", "WETH", "0.00041"),
    ("USDC", "WETH", "0.00041"),
    ("DAI", "WETH", "0.00041"),
    ("USDT", "USDC", "1"),
    ("USDT", "DAI", "1"),
    ("USDC", "USDT", "1"),
    ("USDC", "DAI", "1"),
    ("DAI", "USDT", "1"),
    ("DAI", "USDC", "1"),
    ("SOL", "USDC", "178.5"),
    ("SOL", "USDT", "178.45"),
    ("SOL", "RAY", "89.25"),
    ("USDC", "SOL", "0.0056"),
    ("USDC", "RAY", "0.5"),
    ("USDT", "SOL", "0.0056"),
    ("RAY", "SOL", "0.0112"),
    ("RAY", "USDC", "2"),
    ("RAY", "USDT", "2"),
];

/// Solana stable pairs differ slightly from the EVM table.
const SOLANA_OVERRIDES: RateTable = &[
    ("USDC", "USDT", "0.9998"),
    ("USDT", "USDC", "1.0002"),
    ("USDT", "RAY", "0.5"),
];

fn canonical(symbol: &str) -> String {
    match symbol.to_ascii_uppercase().as_str() {
        "ETH" => "WETH".to_string(),
        "WSOL" => "SOL".to_string(),
        other => other.to_string(),
    }
}

type RateTable = &'static [(&'static str, &'static str, &'static str)];

fn find_rate(table: RateTable, from: &str, to: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(f, t, _)| *f == from && *t == to)
        .map(|(_, _, rate)| *rate)
}

/// Rate table lookup. Identical assets trade at 1.
pub fn fallback_rate(family: ChainFamily, from: &str, to: &str) -> Option<&'static str> {
    let (from, to) = (canonical(from), canonical(to));
    if from == to {
        return Some("1");
    }
    if family == ChainFamily::SolanaLike {
        if let Some(rate) = find_rate(SOLANA_OVERRIDES, &from, &to) {
            return Some(rate);
        }
    }
    find_rate(RATES, &from, &to)
}

fn pow10(exp: u8) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

/// `amount` of an asset with `from_decimals` converted at `rate` into base
/// units of an asset with `to_decimals`, rounding down.
fn convert(amount: U256, rate: &str, from_decimals: u8, to_decimals: u8) -> Result<U256, QuoteFailure> {
    let rate = units::to_base_units(rate, RATE_DECIMALS)?;
    let too_large = || QuoteFailure::invalid_input("amount is too large to quote");
    if to_decimals > units::MAX_DECIMALS || from_decimals > units::MAX_DECIMALS {
        return Err(too_large());
    }
    let scaled = amount
        .checked_mul(rate)
        .and_then(|v| v.checked_mul(pow10(to_decimals)))
        .ok_or_else(too_large)?;
    Ok(scaled / pow10(RATE_DECIMALS) / pow10(from_decimals))
}

fn less_bps(amount: U256, bps: u32) -> U256 {
    let keep = U256::from(BPS_DENOMINATOR.saturating_sub(u64::from(bps)));
    match amount.checked_mul(keep) {
        Some(v) => v / U256::from(BPS_DENOMINATOR),
        // Only reachable near the 256-bit limit; divide first instead.
        None => amount / U256::from(BPS_DENOMINATOR) * keep,
    }
}

#[derive(Debug, Clone)]
pub struct FallbackEstimator {
    config: FallbackConfig,
}

impl FallbackEstimator {
    pub fn new(config: &FallbackConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Fixed network fee of a swap, in native base units.
    pub fn swap_fee(&self, network: &NetworkDescriptor) -> Result<U256, QuoteFailure> {
        match network.family() {
            ChainFamily::EvmLike => Ok(units::to_base_units(
                &self.config.evm_network_fee,
                network.native_decimals(),
            )?),
            ChainFamily::SolanaLike => Ok(U256::from(self.config.solana_swap_fee_lamports)),
        }
    }

    /// Fixed network fee of a bridge deposit, in native base units.
    pub fn bridge_network_fee(&self, network: &NetworkDescriptor) -> Result<U256, QuoteFailure> {
        let fee = match network.family() {
            ChainFamily::EvmLike => &self.config.evm_network_fee,
            ChainFamily::SolanaLike => &self.config.solana_network_fee,
        };
        Ok(units::to_base_units(fee, network.native_decimals())?)
    }

    /// Table-rate swap. Output is net of the swap fee; the network fee is
    /// reported separately. Unknown pairs have no liquidity.
    pub fn swap_quote(
        &self,
        network: &NetworkDescriptor,
        from_asset: &str,
        to_asset: &str,
        amount_in: U256,
    ) -> Result<Quote, QuoteFailure> {
        let rate = fallback_rate(network.family(), from_asset, to_asset).ok_or_else(|| {
            QuoteFailure::no_liquidity(format!(
                "no liquidity for {from_asset}/{to_asset} on {}",
                network.name()
            ))
        })?;
        let gross = convert(
            amount_in,
            rate,
            network.asset_decimals(from_asset),
            network.asset_decimals(to_asset),
        )?;
        Ok(Quote {
            fee: self.swap_fee(network)?,
            expected_output: Some(less_bps(gross, self.config.swap_fee_bps)),
            mode: QuoteMode::Simulated,
        })
    }

    /// Bridge estimate: the bridge fee and, for native deposits, the network
    /// fee come out of the amount; the rest arrives on the destination in its
    /// own decimals.
    pub fn bridge_quote(
        &self,
        source: &NetworkDescriptor,
        destination: &NetworkDescriptor,
        from_asset: &str,
        to_asset: &str,
        amount_in: U256,
    ) -> Result<Quote, QuoteFailure> {
        let network_fee = self.bridge_network_fee(source)?;
        let mut net = less_bps(amount_in, self.config.bridge_fee_bps);
        if source.is_native(from_asset) {
            net = net.saturating_sub(network_fee);
        }

        let rate = fallback_rate(destination.family(), from_asset, to_asset).ok_or_else(|| {
            QuoteFailure::no_liquidity(format!(
                "cannot bridge {from_asset} to {to_asset} on {}",
                destination.name()
            ))
        })?;
        let output = convert(
            net,
            rate,
            source.asset_decimals(from_asset),
            destination.asset_decimals(to_asset),
        )?;
        Ok(Quote {
            fee: network_fee,
            expected_output: Some(output),
            mode: QuoteMode::Simulated,
        })
    }
}
