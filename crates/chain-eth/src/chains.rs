use serde::Serialize;

use crate::error::EthError;

/// Wei per ether is 10^18.
pub const NATIVE_DECIMALS: u8 = 18;

/// A known ERC-20 asset on one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Erc20Token {
    pub symbol: &'static str,
    pub address: &'static str,
    pub decimals: u8,
}

/// Definition of an EVM-compatible network the wallet can connect to.
#[derive(Debug, Clone, Serialize)]
pub struct EvmChain {
    /// Registry key, e.g. `"sepolia"`.
    pub key: &'static str,
    pub chain_id: u64,
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
    pub rpc_url: &'static str,
    pub explorer_url: &'static str,
    pub tokens: &'static [Erc20Token],
    pub faucets: &'static [&'static str],
    pub is_testnet: bool,
}

impl EvmChain {
    /// Looks up a known asset by symbol (case-insensitive).
    pub fn token(&self, symbol: &str) -> Option<&'static Erc20Token> {
        self.tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Block explorer page for a transaction hash.
    pub fn tx_url(&self, hash: &str) -> String {
        format!("{}/tx/{hash}", self.explorer_url)
    }

}

/// Sepolia Testnet (chain ID 11155111).
pub const SEPOLIA: EvmChain = EvmChain {
    key: "sepolia",
    chain_id: 11155111,
    name: "Sepolia Testnet",
    symbol: "ETH",
    decimals: NATIVE_DECIMALS,
    rpc_url: "https://sepolia.drpc.org",
    explorer_url: "https://sepolia.etherscan.io",
    tokens: &[
        Erc20Token {
            symbol: "WETH",
            address: "0x7b79995e5f793A07Bc00c21412e50Ecae098E7f9",
            decimals: 18,
        },
        Erc20Token {
            symbol: "USDT",
            address: "0xd077a400968890eacc75cdc901f0356c943e4fdb",
            decimals: 6,
        },
        Erc20Token {
            symbol: "USDC",
            address: "0x94a9D9AC8a22534E3FaCa9F4e7F2E2cf85d5E4C8",
            decimals: 6,
        },
        Erc20Token {
            symbol: "DAI",
            address: "0xFF34B3d4Aee8ddCd6F9AFFFB6Fe49bD371b8a357",
            decimals: 18,
        },
    ],
    faucets: &[
        "https://dashboard.pimlico.io/test-erc20-faucet",
        "https://dashboard.candide.dev/faucet",
        "https://sepoliafaucet.com",
    ],
    is_testnet: true,
};

/// Ethereum Mainnet (chain ID 1).
pub const ETHEREUM: EvmChain = EvmChain {
    key: "ethereum",
    chain_id: 1,
    name: "Ethereum Mainnet",
    symbol: "ETH",
    decimals: NATIVE_DECIMALS,
    rpc_url: "https://eth.llamarpc.com",
    explorer_url: "https://etherscan.io",
    tokens: &[
        Erc20Token {
            symbol: "WETH",
            address: "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
            decimals: 18,
        },
        Erc20Token {
            symbol: "USDT",
            address: "0xdAC17F958D2ee523a2206206994597C13D831ec7",
            decimals: 6,
        },
        Erc20Token {
            symbol: "USDC",
            address: "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
            decimals: 6,
        },
        Erc20Token {
            symbol: "DAI",
            address: "0x6B175474E89094C44Da98b954EedeAC495271d0F",
            decimals: 18,
        },
    ],
    faucets: &[],
    is_testnet: false,
};

const ALL_CHAINS: &[&EvmChain] = &[&SEPOLIA, &ETHEREUM];

/// Returns the chain definition for a registry key such as `"sepolia"`.
pub fn by_key(key: &str) -> Result<&'static EvmChain, EthError> {
    ALL_CHAINS
        .iter()
        .find(|c| c.key == key)
        .copied()
        .ok_or_else(|| EthError::UnknownNetwork(key.to_string()))
}

/// Returns all supported EVM chain definitions.
pub fn supported_chains() -> Vec<&'static EvmChain> {
    ALL_CHAINS.to_vec()
}
