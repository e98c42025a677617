//! Scriptable in-memory doubles for the SDK, DEX and bridge boundaries.
//!
//! Every mock records the calls it receives so tests can assert on exactly
//! what reached the "network". Clones share state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use alloy_primitives::U256;
use async_trait::async_trait;

use crate::flow::{ConfirmationPrompt, Confirmer};
use crate::network::NetworkDescriptor;
use crate::quote::{QuoteFailure, QuoteInput, QuoteSource};
use crate::sdk::{
    BridgeEstimate, BridgeProtocol, BridgeRequest, ConnectOptions, FeeEstimate, FeeRates,
    NativeTransfer, SdkAccount, SdkError, SdkReceipt, SwapAggregator, SwapEstimate, SwapReceipt,
    SwapRequest, TokenTransfer, WalletManager, WalletSdk,
};
use crate::seed::Seed;
use crate::types::{ChainFamily, DestinationCredit, Quote};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn delay(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

/// A call that reached the mock SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Connect { network: String },
    DeriveAccount(u32),
    FeeRates,
    Address(u32),
    Balance(u32),
    TokenBalance { index: u32, token: String },
    QuoteSend { index: u32, to: String, value: U256 },
    Send { index: u32, to: String, value: U256 },
    QuoteTransfer { index: u32, token: String, amount: U256 },
    Transfer { index: u32, token: String, recipient: String, amount: U256 },
    Dispose,
}

impl MockCall {
    /// True for calls a real SDK would answer over RPC.
    pub fn is_network(&self) -> bool {
        !matches!(
            self,
            MockCall::DeriveAccount(_) | MockCall::Address(_) | MockCall::Dispose
        )
    }
}

#[derive(Debug)]
struct MockScript {
    balance: Result<U256, SdkError>,
    token_balance: Result<U256, SdkError>,
    fee: U256,
    quote_error: Option<SdkError>,
    send_error: Option<SdkError>,
    connect_error: Option<SdkError>,
    derive_error: Option<SdkError>,
    latency: Duration,
    fee_rates: FeeRates,
    calls: Vec<MockCall>,
    last_connect: Option<ConnectOptions>,
    dispose_count: usize,
    next_hash: u64,
}

/// In-memory [`WalletSdk`] for one chain family.
#[derive(Debug, Clone)]
pub struct MockSdk {
    family: ChainFamily,
    script: Arc<Mutex<MockScript>>,
}

impl MockSdk {
    pub fn new(family: ChainFamily) -> Self {
        let fee = match family {
            ChainFamily::EvmLike => U256::from(100_000_000_000_000u64),
            ChainFamily::SolanaLike => U256::from(5_000u64),
        };
        Self {
            family,
            script: Arc::new(Mutex::new(MockScript {
                balance: Ok(U256::ZERO),
                token_balance: Ok(U256::ZERO),
                fee,
                quote_error: None,
                send_error: None,
                connect_error: None,
                derive_error: None,
                latency: Duration::ZERO,
                fee_rates: FeeRates {
                    normal: fee,
                    fast: fee * U256::from(2u64),
                },
                calls: Vec::new(),
                last_connect: None,
                dispose_count: 0,
                next_hash: 1,
            })),
        }
    }

    pub fn evm() -> Self {
        Self::new(ChainFamily::EvmLike)
    }

    pub fn solana() -> Self {
        Self::new(ChainFamily::SolanaLike)
    }

    fn script(&self) -> MutexGuard<'_, MockScript> {
        lock(&self.script)
    }

    pub fn with_balance(self, balance: U256) -> Self {
        self.script().balance = Ok(balance);
        self
    }

    /// Balance reads fail with `message`, classified like a real SDK error.
    pub fn with_balance_error(self, message: &str) -> Self {
        self.script().balance = Err(SdkError::from_message(message));
        self
    }

    pub fn with_token_balance(self, balance: U256) -> Self {
        self.script().token_balance = Ok(balance);
        self
    }

    pub fn with_fee(self, fee: U256) -> Self {
        self.script().fee = fee;
        self
    }

    pub fn with_quote_error(self, message: &str) -> Self {
        self.script().quote_error = Some(SdkError::from_message(message));
        self
    }

    pub fn with_send_error(self, message: &str) -> Self {
        self.script().send_error = Some(SdkError::from_message(message));
        self
    }

    pub fn with_connect_error(self, message: &str) -> Self {
        self.script().connect_error = Some(SdkError::Derivation(message.to_string()));
        self
    }

    pub fn with_derive_error(self, message: &str) -> Self {
        self.script().derive_error = Some(SdkError::Derivation(message.to_string()));
        self
    }

    /// Delay applied to every balance, quote and broadcast call.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.script().latency = latency;
        self
    }

    pub fn set_balance(&self, balance: U256) {
        self.script().balance = Ok(balance);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.script().calls.clone()
    }

    pub fn network_calls(&self) -> usize {
        self.script().calls.iter().filter(|c| c.is_network()).count()
    }

    pub fn last_connect_options(&self) -> Option<ConnectOptions> {
        self.script().last_connect.clone()
    }

    pub fn dispose_count(&self) -> usize {
        self.script().dispose_count
    }

    fn record(&self, call: MockCall) {
        self.script().calls.push(call);
    }

    fn latency(&self) -> Duration {
        self.script().latency
    }

    fn address_for(&self, index: u32) -> String {
        match self.family {
            ChainFamily::EvmLike => format!("0x{:040x}", u64::from(index) + 1),
            ChainFamily::SolanaLike => {
                chain_sol::bytes_to_address(&[(index % 255) as u8 + 1; 32])
            }
        }
    }

    fn next_hash(&self) -> String {
        let mut script = self.script();
        let n = script.next_hash;
        script.next_hash += 1;
        match self.family {
            ChainFamily::EvmLike => format!("0x{n:064x}"),
            ChainFamily::SolanaLike => format!("{}{n}", chain_sol::bytes_to_address(&[7u8; 32])),
        }
    }
}

#[async_trait]
impl WalletSdk for MockSdk {
    fn family(&self) -> ChainFamily {
        self.family
    }

    async fn connect(
        &self,
        _seed: &Seed,
        network: &NetworkDescriptor,
        options: ConnectOptions,
    ) -> Result<Arc<dyn WalletManager>, SdkError> {
        self.record(MockCall::Connect {
            network: network.key().to_string(),
        });
        let mut script = self.script();
        script.last_connect = Some(options);
        if let Some(e) = script.connect_error.clone() {
            return Err(e);
        }
        drop(script);
        Ok(Arc::new(MockManager { sdk: self.clone() }))
    }
}

struct MockManager {
    sdk: MockSdk,
}

#[async_trait]
impl WalletManager for MockManager {
    async fn derive_account(&self, index: u32) -> Result<Arc<dyn SdkAccount>, SdkError> {
        self.sdk.record(MockCall::DeriveAccount(index));
        if let Some(e) = self.sdk.script().derive_error.clone() {
            return Err(e);
        }
        Ok(Arc::new(MockAccount {
            sdk: self.sdk.clone(),
            index,
        }))
    }

    async fn fee_rates(&self) -> Result<FeeRates, SdkError> {
        self.sdk.record(MockCall::FeeRates);
        Ok(self.sdk.script().fee_rates)
    }

    fn dispose(&self) {
        self.sdk.record(MockCall::Dispose);
        self.sdk.script().dispose_count += 1;
    }
}

struct MockAccount {
    sdk: MockSdk,
    index: u32,
}

impl MockAccount {
    fn quote(&self) -> Result<FeeEstimate, SdkError> {
        let script = self.sdk.script();
        match &script.quote_error {
            Some(e) => Err(e.clone()),
            None => Ok(FeeEstimate { fee: script.fee }),
        }
    }

    fn receipt(&self) -> Result<SdkReceipt, SdkError> {
        let (error, fee) = {
            let script = self.sdk.script();
            (script.send_error.clone(), script.fee)
        };
        match error {
            Some(e) => Err(e),
            None => Ok(SdkReceipt {
                hash: self.sdk.next_hash(),
                fee,
            }),
        }
    }
}

#[async_trait]
impl SdkAccount for MockAccount {
    async fn address(&self) -> Result<String, SdkError> {
        self.sdk.record(MockCall::Address(self.index));
        Ok(self.sdk.address_for(self.index))
    }

    async fn balance(&self) -> Result<U256, SdkError> {
        self.sdk.record(MockCall::Balance(self.index));
        delay(self.sdk.latency()).await;
        self.sdk.script().balance.clone()
    }

    async fn token_balance(&self, token: &str) -> Result<U256, SdkError> {
        self.sdk.record(MockCall::TokenBalance {
            index: self.index,
            token: token.to_string(),
        });
        delay(self.sdk.latency()).await;
        self.sdk.script().token_balance.clone()
    }

    async fn quote_send_transaction(&self, tx: &NativeTransfer) -> Result<FeeEstimate, SdkError> {
        self.sdk.record(MockCall::QuoteSend {
            index: self.index,
            to: tx.to.clone(),
            value: tx.value,
        });
        delay(self.sdk.latency()).await;
        self.quote()
    }

    async fn send_transaction(&self, tx: &NativeTransfer) -> Result<SdkReceipt, SdkError> {
        self.sdk.record(MockCall::Send {
            index: self.index,
            to: tx.to.clone(),
            value: tx.value,
        });
        delay(self.sdk.latency()).await;
        self.receipt()
    }

    async fn quote_transfer(&self, transfer: &TokenTransfer) -> Result<FeeEstimate, SdkError> {
        self.sdk.record(MockCall::QuoteTransfer {
            index: self.index,
            token: transfer.token.clone(),
            amount: transfer.amount,
        });
        delay(self.sdk.latency()).await;
        self.quote()
    }

    async fn transfer(&self, transfer: &TokenTransfer) -> Result<SdkReceipt, SdkError> {
        self.sdk.record(MockCall::Transfer {
            index: self.index,
            token: transfer.token.clone(),
            recipient: transfer.recipient.clone(),
            amount: transfer.amount,
        });
        delay(self.sdk.latency()).await;
        self.receipt()
    }
}

#[derive(Debug)]
struct AggregatorScript {
    networks: Vec<String>,
    fee: U256,
    output: Result<U256, SdkError>,
    quotes: Vec<SwapRequest>,
    swaps: Vec<SwapRequest>,
}

/// Live swap aggregator returning a fixed output for any pair.
#[derive(Debug, Clone)]
pub struct MockAggregator {
    script: Arc<Mutex<AggregatorScript>>,
}

impl MockAggregator {
    /// Serves the given network keys.
    pub fn new(networks: &[&str], fee: U256, output: U256) -> Self {
        Self {
            script: Arc::new(Mutex::new(AggregatorScript {
                networks: networks.iter().map(|n| n.to_string()).collect(),
                fee,
                output: Ok(output),
                quotes: Vec::new(),
                swaps: Vec::new(),
            })),
        }
    }

    pub fn with_error(self, message: &str) -> Self {
        lock(&self.script).output = Err(SdkError::from_message(message));
        self
    }

    pub fn quote_requests(&self) -> Vec<SwapRequest> {
        lock(&self.script).quotes.clone()
    }

    pub fn swap_requests(&self) -> Vec<SwapRequest> {
        lock(&self.script).swaps.clone()
    }
}

#[async_trait]
impl SwapAggregator for MockAggregator {
    fn supports(&self, network: &NetworkDescriptor) -> bool {
        lock(&self.script).networks.iter().any(|n| n == network.key())
    }

    async fn quote_swap(
        &self,
        _account: &dyn SdkAccount,
        request: &SwapRequest,
    ) -> Result<SwapEstimate, SdkError> {
        let mut script = lock(&self.script);
        script.quotes.push(request.clone());
        let token_out_amount = script.output.clone()?;
        Ok(SwapEstimate {
            fee: script.fee,
            token_out_amount,
        })
    }

    async fn swap(
        &self,
        _account: &dyn SdkAccount,
        request: &SwapRequest,
    ) -> Result<SwapReceipt, SdkError> {
        let mut script = lock(&self.script);
        script.swaps.push(request.clone());
        let token_out_amount = script.output.clone()?;
        Ok(SwapReceipt {
            hash: format!("0x{:064x}", script.swaps.len()),
            fee: script.fee,
            token_in_amount: request.token_in_amount,
            token_out_amount,
        })
    }
}

#[derive(Debug)]
struct BridgeScript {
    deposit_addresses: HashMap<ChainFamily, String>,
    estimate: Result<BridgeEstimate, SdkError>,
    register_error: Option<SdkError>,
    credits: Vec<(String, DestinationCredit)>,
}

/// Bridge protocol with one deposit address per chain family.
#[derive(Debug, Clone)]
pub struct MockBridge {
    script: Arc<Mutex<BridgeScript>>,
}

impl MockBridge {
    pub fn new(fee: U256, expected_output: U256) -> Self {
        let deposit_addresses = HashMap::from([
            (
                ChainFamily::EvmLike,
                "0x000000000000000000000000000000000000b51d".to_string(),
            ),
            (
                ChainFamily::SolanaLike,
                chain_sol::bytes_to_address(&[0xb5; 32]),
            ),
        ]);
        Self {
            script: Arc::new(Mutex::new(BridgeScript {
                deposit_addresses,
                estimate: Ok(BridgeEstimate {
                    fee,
                    expected_output,
                }),
                register_error: None,
                credits: Vec::new(),
            })),
        }
    }

    pub fn with_error(self, message: &str) -> Self {
        lock(&self.script).estimate = Err(SdkError::from_message(message));
        self
    }

    /// Credit registration fails with `message`; quotes still succeed.
    pub fn with_register_error(self, message: &str) -> Self {
        lock(&self.script).register_error = Some(SdkError::from_message(message));
        self
    }

    pub fn deposit_address_for(&self, family: ChainFamily) -> Option<String> {
        lock(&self.script).deposit_addresses.get(&family).cloned()
    }

    pub fn registered_credits(&self) -> Vec<(String, DestinationCredit)> {
        lock(&self.script).credits.clone()
    }
}

#[async_trait]
impl BridgeProtocol for MockBridge {
    fn deposit_address(&self, network: &NetworkDescriptor) -> Option<String> {
        self.deposit_address_for(network.family())
    }

    async fn quote_bridge(&self, _request: &BridgeRequest) -> Result<BridgeEstimate, SdkError> {
        lock(&self.script).estimate.clone()
    }

    async fn register_credit(
        &self,
        source_hash: &str,
        credit: &DestinationCredit,
    ) -> Result<String, SdkError> {
        let mut script = lock(&self.script);
        if let Some(e) = script.register_error.clone() {
            return Err(e);
        }
        script
            .credits
            .push((source_hash.to_string(), credit.clone()));
        Ok(format!("bridge-{}", script.credits.len()))
    }
}

/// Confirmer with a fixed answer that keeps every prompt it was shown.
#[derive(Debug, Clone)]
pub struct ScriptedConfirmer {
    answer: bool,
    prompts: Arc<Mutex<Vec<ConfirmationPrompt>>>,
}

impl ScriptedConfirmer {
    pub fn accept() -> Self {
        Self {
            answer: true,
            prompts: Arc::default(),
        }
    }

    pub fn decline() -> Self {
        Self {
            answer: false,
            prompts: Arc::default(),
        }
    }

    pub fn prompts(&self) -> Vec<ConfirmationPrompt> {
        lock(&self.prompts).clone()
    }
}

#[async_trait]
impl Confirmer for ScriptedConfirmer {
    async fn confirm(&self, prompt: &ConfirmationPrompt) -> bool {
        lock(&self.prompts).push(prompt.clone());
        self.answer
    }
}

/// Quote source whose answer and delay depend on the requested amount.
/// Unscripted amounts answer immediately with `default_fee`.
#[derive(Debug, Clone)]
pub struct ScriptedQuoteSource {
    default_fee: U256,
    responses: Arc<Mutex<HashMap<String, (Duration, Result<Quote, QuoteFailure>)>>>,
    fetched: Arc<Mutex<Vec<QuoteInput>>>,
}

impl ScriptedQuoteSource {
    pub fn new(default_fee: U256) -> Self {
        Self {
            default_fee,
            responses: Arc::default(),
            fetched: Arc::default(),
        }
    }

    pub fn respond(self, amount: &str, after: Duration, result: Result<Quote, QuoteFailure>) -> Self {
        lock(&self.responses).insert(amount.to_string(), (after, result));
        self
    }

    /// Inputs of every fetch issued so far, in order.
    pub fn fetched(&self) -> Vec<QuoteInput> {
        lock(&self.fetched).clone()
    }
}

#[async_trait]
impl QuoteSource for ScriptedQuoteSource {
    async fn fetch_quote(&self, input: &QuoteInput) -> Result<Quote, QuoteFailure> {
        lock(&self.fetched).push(input.clone());
        let scripted = lock(&self.responses).get(&input.amount).cloned();
        match scripted {
            Some((after, result)) => {
                delay(after).await;
                result
            }
            None => Ok(Quote::live(self.default_fee)),
        }
    }
}
