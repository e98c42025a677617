//! Session seed.
//!
//! The mnemonic is the single root of trust for every chain account. It is
//! held in memory for the session only, behind a `secrecy` wrapper that
//! zeroizes on drop, and is only ever read by the SDK boundary when an
//! account client connects.

use std::sync::Arc;

use bip39::{Language, Mnemonic};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroize;

use crate::config::WalletConfig;
use crate::error::WalletError;

/// Entropy for a 24-word phrase.
const ENTROPY_BYTES: usize = 32;

/// A validated BIP-39 mnemonic. Cloning shares the same secret.
#[derive(Clone)]
pub struct Seed {
    phrase: Arc<SecretString>,
    word_count: usize,
}

impl Seed {
    /// Generates a fresh 24-word English mnemonic from OS entropy.
    pub fn generate() -> Result<Self, WalletError> {
        let mut entropy = [0u8; ENTROPY_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut entropy);
        let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)
            .map_err(|e| WalletError::InvalidSeed(e.to_string()));
        entropy.zeroize();
        Ok(Self::from_mnemonic(mnemonic?))
    }

    /// Validates a user-supplied phrase. Extra whitespace and letter case
    /// are normalized before the checksum is verified.
    pub fn from_phrase(phrase: &str) -> Result<Self, WalletError> {
        let mut normalized = phrase
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let parsed = Mnemonic::parse_in_normalized(Language::English, &normalized)
            .map_err(|e| WalletError::InvalidSeed(e.to_string()));
        normalized.zeroize();
        Ok(Self::from_mnemonic(parsed?))
    }

    fn from_mnemonic(mnemonic: Mnemonic) -> Self {
        Self {
            word_count: mnemonic.word_count(),
            phrase: Arc::new(SecretString::from(mnemonic.to_string())),
        }
    }

    /// Raw phrase for the SDK boundary. Do not log or persist it.
    pub fn expose_phrase(&self) -> &str {
        self.phrase.expose_secret()
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }
}

impl std::fmt::Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Seed")
            .field("word_count", &self.word_count)
            .field("phrase", &"[REDACTED]")
            .finish()
    }
}

/// Per-login context. Owns the seed; dropping the session drops the last
/// reference the wallet holds.
#[derive(Debug, Clone)]
pub struct Session {
    seed: Seed,
    config: WalletConfig,
}

impl Session {
    pub fn new(seed: Seed, config: WalletConfig) -> Self {
        Self { seed, config }
    }

    pub fn seed(&self) -> &Seed {
        &self.seed
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }
}
