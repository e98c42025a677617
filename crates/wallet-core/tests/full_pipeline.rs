//! Cross-module integration tests exercising the full pipeline:
//! seed -> façade -> client -> quote -> flow -> broadcast.
//!
//! Everything goes through the public API of wallet_core with the
//! in-memory SDK doubles standing in for the chain SDKs.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::U256;
use wallet_core::flow::CreditStatus;
use wallet_core::quote::SendQuoteSource;
use wallet_core::testing::{MockBridge, MockCall, MockSdk, ScriptedConfirmer};
use wallet_core::*;

const TEST_MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

const RECIPIENT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

fn session(config: WalletConfig) -> Session {
    Session::new(Seed::from_phrase(TEST_MNEMONIC).unwrap(), config)
}

fn wallet(evm: &MockSdk, sol: &MockSdk) -> Arc<MultiChainWallet> {
    Arc::new(
        MultiChainWallet::new(&session(WalletConfig::default()))
            .with_sdk(Arc::new(evm.clone()))
            .with_sdk(Arc::new(sol.clone())),
    )
}

fn quote_sends(sdk: &MockSdk) -> Vec<U256> {
    sdk.calls()
        .into_iter()
        .filter_map(|c| match c {
            MockCall::QuoteSend { value, .. } => Some(value),
            _ => None,
        })
        .collect()
}

// ─── Client scenarios ────────────────────────────────────────────────

#[tokio::test]
async fn quote_native_send_on_sepolia() {
    // 1. Amount conversion
    assert_eq!(
        to_base_units("0.5", 18).unwrap(),
        U256::from(500_000_000_000_000_000u128)
    );

    // 2. Quote through the façade's client
    let evm = MockSdk::evm().with_fee(U256::from(100_000_000_000_000u64));
    let w = wallet(&evm, &MockSdk::solana());
    let client = w.client_for(ChainFamily::EvmLike, "sepolia").unwrap();
    let quote = client.quote_send_transaction(RECIPIENT, "0.5", 0).await.unwrap();
    assert_eq!(quote, Quote::live(U256::from(100_000_000_000_000u64)));

    // 3. The SDK saw the exact base-unit value
    assert_eq!(quote_sends(&evm), vec![U256::from(500_000_000_000_000_000u128)]);
}

#[tokio::test]
async fn malformed_recipient_never_reaches_the_sdk() {
    let evm = MockSdk::evm();
    let w = wallet(&evm, &MockSdk::solana());
    let client = w.client_for(ChainFamily::EvmLike, "sepolia").unwrap();

    let err = client
        .quote_send_transaction("not-an-address", "0.5", 0)
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InvalidRecipient(_)));
    assert_eq!(evm.network_calls(), 0);
}

#[tokio::test]
async fn failing_balance_shows_zero_and_others_still_load() {
    let evm = MockSdk::evm().with_balance_error("fetch failed: ECONNRESET");
    let sol = MockSdk::solana().with_balance(U256::from(2_500_000_000u64));
    let w = wallet(&evm, &sol);

    let client = w.default_client(ChainFamily::EvmLike).unwrap();
    assert_eq!(client.get_balance(0).await.unwrap(), "0");

    let balances = w.all_balances().await;
    assert_eq!(balances[&ChainFamily::EvmLike], "0");
    assert_eq!(balances[&ChainFamily::SolanaLike], "2.5");

    // Strict callers can tell the failure apart from an empty wallet.
    let strict = w.try_all_balances().await;
    assert!(matches!(
        strict[&ChainFamily::EvmLike],
        Err(WalletError::BalanceUnavailable(_))
    ));
    assert_eq!(strict[&ChainFamily::SolanaLike], Ok(U256::from(2_500_000_000u64)));
}

#[tokio::test]
async fn disposed_client_fails_without_network_calls() {
    let sol = MockSdk::solana().with_balance(U256::from(1u64));
    let w = wallet(&MockSdk::evm(), &sol);
    let client = w.default_client(ChainFamily::SolanaLike).unwrap();
    client.get_balance(0).await.unwrap();

    client.dispose();
    client.dispose();
    let before = sol.network_calls();
    assert_eq!(client.get_balance(0).await, Err(WalletError::ClientDisposed));
    assert_eq!(sol.network_calls(), before);
    assert_eq!(sol.dispose_count(), 1);
}

#[tokio::test]
async fn solana_client_connects_with_cluster_options() {
    let sol = MockSdk::solana();
    let w = wallet(&MockSdk::evm(), &sol);
    let client = w.client_for(ChainFamily::SolanaLike, "solana-devnet").unwrap();
    let address = client.get_address(0).await.unwrap();
    assert!(ChainFamily::SolanaLike.is_valid_address(&address));

    let options = sol.last_connect_options().unwrap();
    assert_eq!(options.commitment.as_deref(), Some("confirmed"));
    assert_eq!(options.transfer_max_fee, U256::from(10_000_000u64));
    assert_eq!(options.chain_id, None);
}

// ─── Quote engine over a real source ─────────────────────────────────

#[tokio::test(start_paused = true)]
async fn rapid_edits_issue_one_quote_for_the_last_amount() {
    let evm = MockSdk::evm();
    let w = wallet(&evm, &MockSdk::solana());
    let engine = QuoteEngine::new(
        Arc::new(SendQuoteSource::new(w.clone())),
        Duration::from_millis(500),
    );

    for amount in ["0.1", "0.12", "0.125"] {
        engine.update_input(QuoteInput::send("sepolia", "ETH", RECIPIENT, amount));
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    let settled = engine.wait_settled().await;

    assert!(matches!(settled, QuoteState::Ready { .. }));
    assert_eq!(
        quote_sends(&evm),
        vec![U256::from(125_000_000_000_000_000u128)]
    );
}

#[tokio::test(start_paused = true)]
async fn slow_quote_for_old_input_is_discarded() {
    let evm = MockSdk::evm().with_latency(Duration::from_secs(3));
    let w = wallet(&evm, &MockSdk::solana());
    let engine = QuoteEngine::new(
        Arc::new(SendQuoteSource::new(w.clone())),
        Duration::from_millis(500),
    );

    let first = QuoteInput::send("sepolia", "ETH", RECIPIENT, "1");
    let second = first.clone().with_amount("2");
    engine.update_input(first);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(matches!(engine.state(), QuoteState::Fetching { .. }));

    engine.update_input(second.clone());
    let settled = engine.wait_settled().await;
    assert_eq!(settled.input(), Some(&second));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(engine.state().input(), Some(&second));
}

#[tokio::test(start_paused = true)]
async fn sdk_timeout_while_quoting_settles_as_network_unavailable() {
    let evm = MockSdk::evm().with_quote_error("request timed out");
    let w = wallet(&evm, &MockSdk::solana());
    let engine = QuoteEngine::new(
        Arc::new(SendQuoteSource::new(w.clone())),
        Duration::from_millis(500),
    );

    let input = QuoteInput::send("sepolia", "ETH", RECIPIENT, "0.3");
    engine.update_input(input.clone());
    match engine.wait_settled().await {
        QuoteState::Failed { input: failed, failure } => {
            assert_eq!(failed, input);
            assert_eq!(failure.reason, QuoteReason::NetworkUnavailable);
        }
        other => panic!("expected a failed quote, got {other:?}"),
    }
}

// ─── Flows end to end ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn configured_send_flow_from_toml() {
    // 1. Config and session
    let config = WalletConfig::from_toml_str(
        r#"
        [quote]
        debounce_ms = 250

        [flow]
        settle_delay_ms = 1000
        "#,
    )
    .unwrap();
    assert_eq!(config.fees, WalletConfig::default().fees);

    let evm = MockSdk::evm().with_balance(U256::from(1_000_000_000_000_000_000u128));
    let w = Arc::new(
        MultiChainWallet::new(&session(config))
            .with_sdk(Arc::new(evm.clone()))
            .with_sdk(Arc::new(MockSdk::solana())),
    );
    let confirmer = ScriptedConfirmer::accept();
    let flow = SendFlow::new(w, Arc::new(confirmer.clone()));

    // 2. Quote settles after the configured debounce
    let input = QuoteInput::send("sepolia", "ETH", RECIPIENT, "0.25");
    flow.on_input(input.clone());
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(
        flow.quote_state().quote().map(|q| q.fee),
        Some(U256::from(100_000_000_000_000u64))
    );

    // 3. Submit, confirm, broadcast
    let mut balances = flow.balance_updates();
    let outcome = flow.submit(&input).await.unwrap();
    assert_eq!(outcome.result.network, "sepolia");
    assert_eq!(confirmer.prompts()[0].amount, "0.25");
    assert_eq!(flow.quote_state(), QuoteState::Idle);

    // 4. Balance refreshed after the settle delay
    evm.set_balance(U256::from(749_900_000_000_000_000u128));
    balances.changed().await.unwrap();
    assert_eq!(balances.borrow().clone().unwrap().balance, "0.7499");
}

#[tokio::test(start_paused = true)]
async fn bridge_evm_to_solana_registers_the_credit() {
    let evm = MockSdk::evm().with_balance(U256::from(1_000_000_000_000_000_000u128));
    let sol = MockSdk::solana();
    let bridge = MockBridge::new(
        U256::from(100_000_000_000_000u64),
        U256::from(3_400_000_000u64),
    );
    let w = wallet(&evm, &sol);
    let flow = BridgeFlow::new(
        w.clone(),
        Arc::new(ScriptedConfirmer::accept()),
        Some(Arc::new(bridge.clone())),
    );

    let mut input = QuoteInput::bridge("sepolia", "solana-devnet", "ETH", "0.25");
    input.to_asset = "SOL".into();
    let outcome = flow.submit(&input).await.unwrap();

    assert!(matches!(outcome.credit_status, CreditStatus::Registered(_)));
    assert_eq!(outcome.credit.expected_amount, U256::from(3_400_000_000u64));
    let addresses = w.all_addresses().await;
    assert_eq!(outcome.credit.recipient, addresses[&ChainFamily::SolanaLike]);
    assert_eq!(outcome.source.from, addresses[&ChainFamily::EvmLike]);
    assert!(outcome
        .explorer_url
        .starts_with("https://sepolia.etherscan.io/tx/"));
}

#[tokio::test(start_paused = true)]
async fn swap_without_aggregator_quotes_but_refuses_to_execute() {
    let w = wallet(&MockSdk::evm(), &MockSdk::solana());
    let flow = SwapFlow::new(w, Arc::new(ScriptedConfirmer::accept()), None);
    let input = QuoteInput::swap("solana-devnet", "SOL", "USDC", "2");

    flow.on_input(input.clone());
    tokio::time::sleep(Duration::from_millis(600)).await;
    let quote = flow.quote_state().quote().cloned().unwrap();
    assert_eq!(quote.mode, QuoteMode::Simulated);
    assert_eq!(quote.expected_output, Some(to_base_units("355.929", 6).unwrap()));

    let err = flow.submit(&input).await.unwrap_err();
    assert_eq!(err.kind, FlowErrorKind::ValidationFailed);
}

// ─── Seeds ───────────────────────────────────────────────────────────

#[test]
fn generated_seed_round_trips_through_validation() {
    let seed = Seed::generate().unwrap();
    assert_eq!(seed.word_count(), 24);
    let again = Seed::from_phrase(seed.expose_phrase()).unwrap();
    assert_eq!(again.expose_phrase(), seed.expose_phrase());
    assert!(!format!("{seed:?}").contains(seed.expose_phrase()));

    assert!(matches!(
        Seed::from_phrase("abandon abandon abandon"),
        Err(WalletError::InvalidSeed(_))
    ));
}
