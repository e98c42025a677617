use thiserror::Error;

/// Solana chain family errors.
#[derive(Debug, Error)]
pub enum SolError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("unknown cluster: {0}")]
    UnknownCluster(String),
}
