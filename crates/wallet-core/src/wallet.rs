//! Multi-chain wallet façade.
//!
//! Holds at most one live [`ChainAccountClient`] per chain family for the
//! session seed. Switching a family to another network disposes the old
//! client before building the new one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy_primitives::U256;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::client::ChainAccountClient;
use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::network::{self, NetworkDescriptor};
use crate::sdk::WalletSdk;
use crate::seed::{Seed, Session};
use crate::types::ChainFamily;

#[derive(Default)]
struct Clients {
    by_family: HashMap<ChainFamily, Arc<ChainAccountClient>>,
    disposed: bool,
}

pub struct MultiChainWallet {
    seed: Seed,
    config: WalletConfig,
    sdks: HashMap<ChainFamily, Arc<dyn WalletSdk>>,
    clients: Mutex<Clients>,
}

impl MultiChainWallet {
    /// Creates an empty façade for the session. Register one SDK per chain
    /// family with [`Self::with_sdk`].
    pub fn new(session: &Session) -> Self {
        Self {
            seed: session.seed().clone(),
            config: session.config().clone(),
            sdks: HashMap::new(),
            clients: Mutex::new(Clients::default()),
        }
    }

    pub fn with_sdk(mut self, sdk: Arc<dyn WalletSdk>) -> Self {
        self.sdks.insert(sdk.family(), sdk);
        self
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    /// Families with a registered SDK, in a stable order.
    pub fn families(&self) -> Vec<ChainFamily> {
        ChainFamily::ALL
            .into_iter()
            .filter(|f| self.sdks.contains_key(f))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Clients> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Client bound to `network`. Returns the cached client when it is
    /// already bound there; otherwise the family's stale client is disposed
    /// and replaced.
    pub fn client(&self, network: &NetworkDescriptor) -> Result<Arc<ChainAccountClient>, WalletError> {
        let family = network.family();
        let sdk = self.sdks.get(&family).ok_or_else(|| {
            WalletError::UnsupportedNetwork(format!("no {family} SDK registered"))
        })?;

        let (fresh, stale) = {
            let mut clients = self.lock();
            if clients.disposed {
                return Err(WalletError::ClientDisposed);
            }
            match clients.by_family.get(&family) {
                Some(existing) if existing.network() == network && !existing.is_disposed() => {
                    return Ok(existing.clone());
                }
                _ => {}
            }

            let fresh = Arc::new(ChainAccountClient::new(
                self.seed.clone(),
                *network,
                sdk.clone(),
                &self.config.fees,
            )?);
            let stale = clients.by_family.insert(family, fresh.clone());
            (fresh, stale)
        };

        if let Some(old) = stale {
            debug!(%family, from = %old.network(), to = %network, "switching network");
            old.dispose();
        }
        Ok(fresh)
    }

    /// Client for `family` on the network registered under `key`.
    pub fn client_for(
        &self,
        family: ChainFamily,
        key: &str,
    ) -> Result<Arc<ChainAccountClient>, WalletError> {
        let network = network::lookup_in(family, key)?;
        self.client(&network)
    }

    /// The family's current client, or one on the family's default network.
    pub fn default_client(&self, family: ChainFamily) -> Result<Arc<ChainAccountClient>, WalletError> {
        if let Some(existing) = self.cached(family) {
            return Ok(existing);
        }
        self.client(&network::default_for(family))
    }

    fn cached(&self, family: ChainFamily) -> Option<Arc<ChainAccountClient>> {
        self.lock()
            .by_family
            .get(&family)
            .filter(|c| !c.is_disposed())
            .cloned()
    }

    /// Network the family's live client is bound to, if any.
    pub fn active_network(&self, family: ChainFamily) -> Option<NetworkDescriptor> {
        self.cached(family).map(|c| *c.network())
    }

    /// Display balances of every registered family, fetched concurrently.
    /// A failing family shows `"0"` (see [`ChainAccountClient::get_balance`])
    /// and never blocks the others.
    pub async fn all_balances(&self) -> HashMap<ChainFamily, String> {
        let fetches = self.families().into_iter().map(|family| async move {
            let balance = match self.default_client(family) {
                Ok(client) => client.get_balance(0).await,
                Err(e) => Err(e),
            };
            (family, balance)
        });

        join_all(fetches)
            .await
            .into_iter()
            .filter_map(|(family, result)| match result {
                Ok(balance) => Some((family, balance)),
                Err(e) => {
                    warn!(%family, error = %e, "balance skipped");
                    None
                }
            })
            .collect()
    }

    /// Base-unit balances with failures reported per family, for callers
    /// that must not mistake an unreadable balance for zero.
    pub async fn try_all_balances(&self) -> HashMap<ChainFamily, Result<U256, WalletError>> {
        let fetches = self.families().into_iter().map(|family| async move {
            let balance = match self.default_client(family) {
                Ok(client) => client.balance_base_units(0).await,
                Err(e) => Err(e),
            };
            (family, balance)
        });
        join_all(fetches).await.into_iter().collect()
    }

    /// Account 0 address of every registered family. Families that fail to
    /// derive are logged and left out.
    pub async fn all_addresses(&self) -> HashMap<ChainFamily, String> {
        let fetches = self.families().into_iter().map(|family| async move {
            let address = match self.default_client(family) {
                Ok(client) => client.get_address(0).await,
                Err(e) => Err(e),
            };
            (family, address)
        });

        join_all(fetches)
            .await
            .into_iter()
            .filter_map(|(family, result)| match result {
                Ok(address) => Some((family, address)),
                Err(e) => {
                    warn!(%family, error = %e, "address skipped");
                    None
                }
            })
            .collect()
    }

    /// Disposes every cached client. The façade refuses new clients
    /// afterwards.
    pub fn dispose(&self) {
        let clients: Vec<_> = {
            let mut state = self.lock();
            state.disposed = true;
            state.by_family.drain().map(|(_, c)| c).collect()
        };
        for client in clients {
            client.dispose();
        }
    }
}

impl Drop for MultiChainWallet {
    fn drop(&mut self) {
        self.dispose();
    }
}
