use serde::Serialize;

use crate::error::SolError;

/// Lamports per SOL is 10^9.
pub const NATIVE_DECIMALS: u8 = 9;

const EXPLORER_URL: &str = "https://explorer.solana.com";

/// A known SPL token mint on one cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SplToken {
    pub symbol: &'static str,
    pub mint: &'static str,
    pub decimals: u8,
}

/// Definition of a Solana cluster the wallet can connect to.
#[derive(Debug, Clone, Serialize)]
pub struct SolCluster {
    /// Registry key, e.g. `"solana-devnet"`.
    pub key: &'static str,
    pub name: &'static str,
    pub rpc_url: &'static str,
    pub ws_url: &'static str,
    /// Value of the explorer `?cluster=` parameter; `None` on mainnet.
    pub explorer_cluster: Option<&'static str>,
    pub tokens: &'static [SplToken],
    pub faucets: &'static [&'static str],
    pub is_testnet: bool,
}

impl SolCluster {
    pub const SYMBOL: &'static str = "SOL";

    pub fn token(&self, symbol: &str) -> Option<&'static SplToken> {
        self.tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Explorer landing page, including the cluster parameter.
    pub fn explorer_url(&self) -> String {
        match self.explorer_cluster {
            Some(cluster) => format!("{EXPLORER_URL}/?cluster={cluster}"),
            None => EXPLORER_URL.to_string(),
        }
    }

    /// Explorer page for a transaction signature.
    pub fn tx_url(&self, signature: &str) -> String {
        match self.explorer_cluster {
            Some(cluster) => format!("{EXPLORER_URL}/tx/{signature}?cluster={cluster}"),
            None => format!("{EXPLORER_URL}/tx/{signature}"),
        }
    }
}

pub const TESTNET: SolCluster = SolCluster {
    key: "solana-testnet",
    name: "Solana Testnet",
    rpc_url: "https://api.testnet.solana.com",
    ws_url: "wss://api.testnet.solana.com/",
    explorer_cluster: Some("testnet"),
    tokens: &[],
    faucets: &["https://faucet.solana.com/"],
    is_testnet: true,
};

pub const DEVNET: SolCluster = SolCluster {
    key: "solana-devnet",
    name: "Solana Devnet",
    rpc_url: "https://api.devnet.solana.com",
    ws_url: "wss://api.devnet.solana.com/",
    explorer_cluster: Some("devnet"),
    tokens: &[],
    faucets: &["https://faucet.solana.com/"],
    is_testnet: true,
};

pub const MAINNET: SolCluster = SolCluster {
    key: "solana-mainnet",
    name: "Solana Mainnet",
    rpc_url: "https://api.mainnet-beta.solana.com",
    ws_url: "wss://api.mainnet-beta.solana.com/",
    explorer_cluster: None,
    tokens: &[
        SplToken {
            symbol: "USDT",
            mint: "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB",
            decimals: 6,
        },
        SplToken {
            symbol: "USDC",
            mint: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            decimals: 6,
        },
        SplToken {
            symbol: "WSOL",
            mint: "So11111111111111111111111111111111111111112",
            decimals: 9,
        },
        SplToken {
            symbol: "RAY",
            mint: "4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R",
            decimals: 6,
        },
    ],
    faucets: &[],
    is_testnet: false,
};

const ALL_CLUSTERS: &[&SolCluster] = &[&TESTNET, &DEVNET, &MAINNET];

/// Returns the cluster definition for a registry key.
pub fn by_key(key: &str) -> Result<&'static SolCluster, SolError> {
    ALL_CLUSTERS
        .iter()
        .find(|c| c.key == key)
        .copied()
        .ok_or_else(|| SolError::UnknownCluster(key.to_string()))
}

pub fn supported_clusters() -> Vec<&'static SolCluster> {
    ALL_CLUSTERS.to_vec()
}
