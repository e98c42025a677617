//! Multi-chain wallet core.
//!
//! Derives EVM and Solana accounts from one session seed through an
//! external wallet SDK, converts amounts between decimal strings and base
//! units, produces debounced fee/output quotes, and drives send, swap and
//! bridge operations from validation to broadcast.
//!
//! Signing, key derivation and RPC live behind the [`sdk`] traits; this
//! crate never touches key material beyond handing the seed to the SDK.

pub mod client;
pub mod config;
pub mod error;
pub mod flow;
pub mod logging;
pub mod network;
pub mod quote;
pub mod sdk;
pub mod seed;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;
pub mod units;
pub mod wallet;

pub use client::ChainAccountClient;
pub use config::WalletConfig;
pub use error::WalletError;
pub use flow::{
    AutoConfirm, BridgeFlow, ConfirmationPrompt, Confirmer, FlowError, FlowErrorKind, SendFlow,
    SwapFlow,
};
pub use network::NetworkDescriptor;
pub use quote::{QuoteEngine, QuoteFailure, QuoteInput, QuoteReason, QuoteState};
pub use seed::{Seed, Session};
pub use types::{ChainFamily, Quote, QuoteMode, TransactionResult, TransferResult};
pub use units::{from_base_units, to_base_units};
pub use wallet::MultiChainWallet;
