//! Registry of deployable networks across both chain families.
//!
//! Descriptors are static configuration built into the chain crates and
//! shared by reference; nothing here is ever mutated.

use chain_eth::EvmChain;
use chain_sol::SolCluster;
use serde::Serialize;

use crate::error::WalletError;
use crate::types::ChainFamily;

/// Decimals of every asset symbol the wallet knows about. The one place
/// asset scale is decided; features must not carry their own defaults.
const KNOWN_DECIMALS: &[(&str, u8)] = &[
    ("ETH", 18),
    ("WETH", 18),
    ("DAI", 18),
    ("USDT", 6),
    ("USDC", 6),
    ("SOL", 9),
    ("WSOL", 9),
    ("RAY", 6),
];

/// Immutable description of one network.
#[derive(Debug, Clone, Copy)]
pub enum NetworkDescriptor {
    Evm(&'static EvmChain),
    Solana(&'static SolCluster),
}

/// An asset as seen on one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    pub symbol: String,
    /// Contract address or mint; `None` for the native currency or an
    /// asset not deployed on this network.
    pub address: Option<&'static str>,
    pub decimals: u8,
}

impl PartialEq for NetworkDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for NetworkDescriptor {}

impl NetworkDescriptor {
    pub fn key(&self) -> &'static str {
        match self {
            NetworkDescriptor::Evm(c) => c.key,
            NetworkDescriptor::Solana(c) => c.key,
        }
    }

    pub fn family(&self) -> ChainFamily {
        match self {
            NetworkDescriptor::Evm(_) => ChainFamily::EvmLike,
            NetworkDescriptor::Solana(_) => ChainFamily::SolanaLike,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NetworkDescriptor::Evm(c) => c.name,
            NetworkDescriptor::Solana(c) => c.name,
        }
    }

    pub fn rpc_url(&self) -> &'static str {
        match self {
            NetworkDescriptor::Evm(c) => c.rpc_url,
            NetworkDescriptor::Solana(c) => c.rpc_url,
        }
    }

    pub fn ws_url(&self) -> Option<&'static str> {
        match self {
            NetworkDescriptor::Evm(_) => None,
            NetworkDescriptor::Solana(c) => Some(c.ws_url),
        }
    }

    pub fn chain_id(&self) -> Option<u64> {
        match self {
            NetworkDescriptor::Evm(c) => Some(c.chain_id),
            NetworkDescriptor::Solana(_) => None,
        }
    }

    pub fn explorer_url(&self) -> String {
        match self {
            NetworkDescriptor::Evm(c) => c.explorer_url.to_string(),
            NetworkDescriptor::Solana(c) => c.explorer_url(),
        }
    }

    pub fn tx_url(&self, hash: &str) -> String {
        match self {
            NetworkDescriptor::Evm(c) => c.tx_url(hash),
            NetworkDescriptor::Solana(c) => c.tx_url(hash),
        }
    }

    pub fn native_symbol(&self) -> &'static str {
        match self {
            NetworkDescriptor::Evm(c) => c.symbol,
            NetworkDescriptor::Solana(_) => SolCluster::SYMBOL,
        }
    }

    pub fn native_decimals(&self) -> u8 {
        match self {
            NetworkDescriptor::Evm(c) => c.decimals,
            NetworkDescriptor::Solana(_) => chain_sol::NATIVE_DECIMALS,
        }
    }

    pub fn is_testnet(&self) -> bool {
        match self {
            NetworkDescriptor::Evm(c) => c.is_testnet,
            NetworkDescriptor::Solana(c) => c.is_testnet,
        }
    }

    pub fn faucets(&self) -> &'static [&'static str] {
        match self {
            NetworkDescriptor::Evm(c) => c.faucets,
            NetworkDescriptor::Solana(c) => c.faucets,
        }
    }

    pub fn is_native(&self, symbol: &str) -> bool {
        self.native_symbol().eq_ignore_ascii_case(symbol)
    }

    /// Decimals for an asset symbol on this network. Deployed tokens use
    /// their registered decimals; otherwise the known-asset table; an
    /// unknown symbol falls back to the native scale.
    pub fn asset_decimals(&self, symbol: &str) -> u8 {
        if self.is_native(symbol) {
            return self.native_decimals();
        }
        let deployed = match self {
            NetworkDescriptor::Evm(c) => c.token(symbol).map(|t| t.decimals),
            NetworkDescriptor::Solana(c) => c.token(symbol).map(|t| t.decimals),
        };
        deployed
            .or_else(|| known_decimals(symbol))
            .unwrap_or_else(|| self.native_decimals())
    }

    pub fn asset(&self, symbol: &str) -> Asset {
        let address = match self {
            _ if self.is_native(symbol) => None,
            NetworkDescriptor::Evm(c) => c.token(symbol).map(|t| t.address),
            NetworkDescriptor::Solana(c) => c.token(symbol).map(|t| t.mint),
        };
        Asset {
            symbol: symbol.to_ascii_uppercase(),
            address,
            decimals: self.asset_decimals(symbol),
        }
    }

    /// Contract address or mint of a token deployed on this network.
    pub fn token_address(&self, symbol: &str) -> Result<&'static str, WalletError> {
        self.asset(symbol).address.ok_or_else(|| {
            WalletError::UnsupportedNetwork(format!(
                "{symbol} is not available on {}",
                self.name()
            ))
        })
    }
}

impl std::fmt::Display for NetworkDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

fn known_decimals(symbol: &str) -> Option<u8> {
    KNOWN_DECIMALS
        .iter()
        .find(|(s, _)| s.eq_ignore_ascii_case(symbol))
        .map(|(_, d)| *d)
}

/// Resolves a registry key such as `"sepolia"` or `"solana-devnet"`.
pub fn lookup(key: &str) -> Result<NetworkDescriptor, WalletError> {
    if let Ok(chain) = chain_eth::by_key(key) {
        return Ok(NetworkDescriptor::Evm(chain));
    }
    chain_sol::by_key(key)
        .map(NetworkDescriptor::Solana)
        .map_err(|_| WalletError::UnsupportedNetwork(key.to_string()))
}

/// Resolves a key and checks it belongs to `family`.
pub fn lookup_in(family: ChainFamily, key: &str) -> Result<NetworkDescriptor, WalletError> {
    let network = lookup(key)?;
    if network.family() != family {
        return Err(WalletError::UnsupportedNetwork(format!(
            "{key} is not a {family} network"
        )));
    }
    Ok(network)
}

pub fn all() -> Vec<NetworkDescriptor> {
    chain_eth::supported_chains()
        .into_iter()
        .map(NetworkDescriptor::Evm)
        .chain(
            chain_sol::supported_clusters()
                .into_iter()
                .map(NetworkDescriptor::Solana),
        )
        .collect()
}

/// Network a family connects to when the caller does not pick one.
pub fn default_for(family: ChainFamily) -> NetworkDescriptor {
    match family {
        ChainFamily::EvmLike => NetworkDescriptor::Evm(&chain_eth::chains::SEPOLIA),
        ChainFamily::SolanaLike => NetworkDescriptor::Solana(&chain_sol::clusters::DEVNET),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_resolves_both_families() {
        assert_eq!(lookup("sepolia").unwrap().family(), ChainFamily::EvmLike);
        assert_eq!(lookup("solana-devnet").unwrap().family(), ChainFamily::SolanaLike);
        assert!(matches!(lookup("goerli"), Err(WalletError::UnsupportedNetwork(_))));
    }

    #[test]
    fn lookup_in_rejects_family_mismatch() {
        assert!(lookup_in(ChainFamily::SolanaLike, "sepolia").is_err());
        assert!(lookup_in(ChainFamily::EvmLike, "ethereum").is_ok());
    }

    #[test]
    fn defaults_are_testnets() {
        for family in ChainFamily::ALL {
            let n = default_for(family);
            assert!(n.is_testnet());
            assert_eq!(n.family(), family);
        }
        assert_eq!(default_for(ChainFamily::EvmLike).key(), "sepolia");
        assert_eq!(default_for(ChainFamily::SolanaLike).key(), "solana-devnet");
    }

    #[test]
    fn registry_has_five_networks_with_unique_keys() {
        let networks = all();
        assert_eq!(networks.len(), 5);
        let mut keys: Vec<_> = networks.iter().map(|n| n.key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 5);
    }

    #[test]
    fn asset_decimals_come_from_one_table() {
        let sepolia = lookup("sepolia").unwrap();
        assert_eq!(sepolia.asset_decimals("ETH"), 18);
        assert_eq!(sepolia.asset_decimals("usdt"), 6);
        assert_eq!(sepolia.asset_decimals("DAI"), 18);
        // Not deployed on devnet, still known.
        let devnet = lookup("solana-devnet").unwrap();
        assert_eq!(devnet.asset_decimals("USDC"), 6);
        assert_eq!(devnet.asset_decimals("SOL"), 9);
        // Unknown symbols use the native scale.
        assert_eq!(devnet.asset_decimals("BONK"), 9);
        assert_eq!(sepolia.asset_decimals("PEPE"), 18);
    }

    #[test]
    fn asset_addresses() {
        let mainnet = lookup("solana-mainnet").unwrap();
        assert_eq!(
            mainnet.token_address("USDC").unwrap(),
            "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"
        );
        assert_eq!(mainnet.asset("SOL").address, None);
        assert!(lookup("solana-devnet").unwrap().token_address("USDC").is_err());
    }

    #[test]
    fn family_specific_fields() {
        let sepolia = lookup("sepolia").unwrap();
        assert_eq!(sepolia.chain_id(), Some(11155111));
        assert_eq!(sepolia.ws_url(), None);
        let devnet = lookup("solana-devnet").unwrap();
        assert_eq!(devnet.chain_id(), None);
        assert!(devnet.ws_url().unwrap().starts_with("wss://"));
        assert_eq!(devnet.native_symbol(), "SOL");
    }

    #[test]
    fn descriptors_compare_by_key() {
        assert_eq!(lookup("sepolia").unwrap(), default_for(ChainFamily::EvmLike));
        assert_ne!(lookup("sepolia").unwrap(), lookup("ethereum").unwrap());
    }
}
