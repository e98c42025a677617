use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::WalletError;

/// Runtime tuning for the wallet core. Every section has defaults, so an
/// empty TOML document is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub quote: QuoteConfig,
    pub flow: FlowConfig,
    pub fees: FeeConfig,
    pub fallback: FallbackConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteConfig {
    /// Quiet period after the last input change before a quote is fetched.
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Wait before re-reading the balance after a broadcast.
    pub settle_delay_ms: u64,
    pub require_testnet_confirmation: bool,
}

/// Upper bounds on fees handed to the SDK when it connects, in native base
/// units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    pub evm_transfer_max_fee: u64,
    pub solana_transfer_max_fee: u64,
    pub swap_max_fee: u64,
}

/// Parameters of the deterministic estimator used when no live swap or
/// bridge quote is available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub swap_fee_bps: u32,
    pub bridge_fee_bps: u32,
    /// Decimal amount of native currency.
    pub evm_network_fee: String,
    /// Decimal amount of native currency.
    pub solana_network_fee: String,
    pub solana_swap_fee_lamports: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 2000,
            require_testnet_confirmation: true,
        }
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            evm_transfer_max_fee: 100_000_000_000_000,
            solana_transfer_max_fee: 10_000_000,
            swap_max_fee: 500_000_000_000_000,
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            swap_fee_bps: 30,
            bridge_fee_bps: 30,
            evm_network_fee: "0.001".into(),
            solana_network_fee: "0.00001".into(),
            solana_swap_fee_lamports: 5000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Text,
        }
    }
}

impl WalletConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, WalletError> {
        let config: WalletConfig =
            toml::from_str(s).map_err(|e| WalletError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, WalletError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| WalletError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), WalletError> {
        const MAX_BPS: u32 = 10_000;
        if self.fallback.swap_fee_bps > MAX_BPS || self.fallback.bridge_fee_bps > MAX_BPS {
            return Err(WalletError::Config(format!(
                "fallback fee bps must be at most {MAX_BPS}"
            )));
        }
        for (name, fee) in [
            ("fallback.evm_network_fee", &self.fallback.evm_network_fee),
            ("fallback.solana_network_fee", &self.fallback.solana_network_fee),
        ] {
            crate::units::to_base_units(fee, 18)
                .map_err(|e| WalletError::Config(format!("{name}: {e}")))?;
        }
        if self.logging.level.trim().is_empty() {
            return Err(WalletError::Config("logging.level must not be empty".into()));
        }
        Ok(())
    }
}
