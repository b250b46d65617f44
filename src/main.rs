//! Pair Trading Layer Simulation.
//!
//! Runs the layer over an in-memory chain: account setup, collateral flows, paired quote
//! minting, the completeness gate on tracked operations, guards, and rollback.

use pair_layer::protocol::{
    cancel_quote_payload, lock_quote_payload, open_position_payload, send_quote_payload,
};
use pair_layer::*;
use alloy_primitives::U256;
use alloy_sol_types::SolCall;
use tracing_subscriber::EnvFilter;

const LAYER: Address = Address::new([0xF0; 20]);
const ADMIN: Address = Address::new([0xAD; 20]);
const ALICE: Address = Address::new([0x0A; 20]);
const HEDGER: Address = Address::new([0x0B; 20]);
const BOT: Address = Address::new([0xB0; 20]);

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    println!("Pair Trading Layer Simulation");
    println!("Proxy Accounts, Paired Quotes, Atomic Batches\n");

    scenario_1_accounts_and_balances();
    scenario_2_pair_minting();
    scenario_3_completeness_gate();
    scenario_4_guards();
    scenario_5_rollback();

    println!("\nAll simulations completed successfully.");
}

fn units(n: i64) -> Amount {
    Amount::new_unchecked(rust_decimal::Decimal::from(n))
}

/// A configured layer with a funded PartyA owner and a registered hedger account.
fn setup() -> (PairTradingLayer<SimulatedChain>, Address, Address) {
    let mut layer = PairTradingLayer::with_defaults(LAYER, ADMIN, SYMMIO_ADDRESS, SimulatedChain::new(ADMIN));
    layer.set_time(Timestamp::now());
    layer.apply_config(ADMIN, &LayerConfig::symmio()).unwrap();
    layer.set_party_implementation(ADMIN, b"party-account-v1").unwrap();

    layer.host_mut().fund(ALICE, units(10_000)).unwrap();
    layer.host_mut().approve_max(ALICE, LAYER);
    layer.host_mut().fund(HEDGER, units(10_000)).unwrap();
    layer.host_mut().approve_max(HEDGER, LAYER);

    let party_a = layer.create_party_a_account(ALICE, "alice-main").unwrap();
    layer
        .deposit_and_allocate_for_party_a_account(ALICE, party_a, units(1_000))
        .unwrap();

    layer.grant_role(ADMIN, Role::party_b_manager(), HEDGER).unwrap();
    let party_b = layer.create_party_b_account(HEDGER, &[BOT]).unwrap();
    layer.host_mut().register_party_b(party_b);

    (layer, party_a, party_b)
}

fn quote(quantity: i64) -> Vec<u8> {
    send_quote_payload(Vec::new(), 1, units(quantity).to_wire().unwrap(), units(50_000).to_wire().unwrap())
}

/// Account creation, deposits and withdrawals.
fn scenario_1_accounts_and_balances() {
    println!("Scenario 1: Accounts and Balances\n");

    let mut layer = PairTradingLayer::with_defaults(LAYER, ADMIN, SYMMIO_ADDRESS, SimulatedChain::new(ADMIN));
    layer.host_mut().fund(ALICE, units(500)).unwrap();
    layer.host_mut().approve_max(ALICE, LAYER);

    let main = layer.create_party_a_account(ALICE, "main").unwrap();
    layer.advance_time(60_000);
    let hedge = layer.create_party_a_account(ALICE, "hedge").unwrap();
    println!("  Alice owns {} accounts: {} and {}", layer.accounts_len(ALICE), main, hedge);
    for account in layer.get_accounts(ALICE, 0, 10) {
        println!("    {} created at {}s", account.name, account.created_at.as_secs());
    }

    layer.deposit_for_account(ALICE, main, units(100)).unwrap();
    println!("  Deposit 100, protocol balance: {}", layer.host().symmio_balance(main));

    layer.withdraw_from_account_party_a(ALICE, main, units(50)).unwrap();
    println!("  Withdraw 50, protocol balance: {}", layer.host().symmio_balance(main));
    println!("  Alice wallet: {}", layer.host().collateral_balance(ALICE));

    let denied = layer.withdraw_from_account_party_a(BOT, main, units(1));
    println!("  Stranger withdraw rejected: {}\n", denied.unwrap_err());
}

/// Two sendQuotes in one batch become a pair.
fn scenario_2_pair_minting() {
    println!("Scenario 2: Pair Minting\n");

    let (mut layer, party_a, _) = setup();

    let single = layer.party_a_call(ALICE, party_a, &[quote(1)]).unwrap();
    println!("  Single sendQuote, paired: {}", single.new_pair.is_some());

    let batch = layer.party_a_call(ALICE, party_a, &[quote(1), quote(2)]).unwrap();
    let (first, second) = batch.new_pair.unwrap();
    println!("  Batched sendQuotes minted pair ({}, {})", first, second);
    println!(
        "  forward[{}] = {:?}, backward[{}] = {:?}",
        first,
        layer.pairs().forward(first),
        second,
        layer.pairs().backward(second)
    );

    let three = layer.party_a_call(ALICE, party_a, &[quote(1), quote(1), quote(1)]);
    println!("  Three sendQuotes rejected: {}\n", three.unwrap_err());
}

/// Tracked lifecycle calls must move whole pairs.
fn scenario_3_completeness_gate() {
    println!("Scenario 3: Completeness Gate\n");

    let (mut layer, party_a, party_b) = setup();
    let (a1, a2) = layer
        .party_a_call(ALICE, party_a, &[quote(1), quote(1)])
        .unwrap()
        .new_pair
        .unwrap();
    let (b1, _) = layer
        .party_a_call(ALICE, party_a, &[quote(1), quote(1)])
        .unwrap()
        .new_pair
        .unwrap();

    let half = layer.party_b_call(BOT, party_b, &[lock_quote_payload(a1)]);
    println!("  Lock {} alone: {}", a1, half.unwrap_err());

    let mixed = layer.party_b_call(BOT, party_b, &[lock_quote_payload(a1), lock_quote_payload(b1)]);
    println!("  Lock {} with {}: {}", a1, b1, mixed.unwrap_err());

    layer
        .party_b_call(BOT, party_b, &[lock_quote_payload(a1), lock_quote_payload(a2)])
        .unwrap();
    println!("  Lock {} with {}: ok", a1, a2);

    let fill = units(1).to_wire().unwrap();
    let price = units(50_000).to_wire().unwrap();
    layer
        .party_b_call(
            HEDGER,
            party_b,
            &[open_position_payload(a1, fill, price), open_position_payload(a2, fill, price)],
        )
        .unwrap();
    println!("  Admin opened both positions");

    let cancel = layer.party_a_call(ALICE, party_a, &[cancel_quote_payload(b1)]);
    println!("  Cancel {} alone: {}\n", b1, cancel.unwrap_err());
}

/// Additional calldata conditions on a selector.
fn scenario_4_guards() {
    println!("Scenario 4: Calldata Guards\n");

    let (mut layer, party_a, _) = setup();
    let send = Selector(ISymmio::sendQuoteCall::SELECTOR);

    // symbolId is the second head word
    let mut expected = vec![0u8; 31];
    expected.push(1);
    layer
        .add_additional_condition(ADMIN, send, AdditionalCondition::new("symbol not allowed", 4 + 32, expected))
        .unwrap();

    let allowed = layer.party_a_call(ALICE, party_a, &[quote(1)]);
    println!("  Symbol 1 quote: {}", if allowed.is_ok() { "ok" } else { "rejected" });

    let other = send_quote_payload(Vec::new(), 2, units(1).to_wire().unwrap(), units(1).to_wire().unwrap());
    let blocked = layer.party_a_call(ALICE, party_a, &[other]);
    println!("  Symbol 2 quote: {}\n", blocked.unwrap_err());
}

/// Failed batches leave no trace.
fn scenario_5_rollback() {
    println!("Scenario 5: Rollback\n");

    let (mut layer, party_a, _) = setup();
    let events = layer.events().len();
    let quotes = layer.host().symmio.quote_count();

    // second payload reverts inside the protocol after the first minted a quote
    let zero = send_quote_payload(Vec::new(), 1, U256::ZERO, U256::ZERO);
    let err = layer.party_a_call(ALICE, party_a, &[quote(1), zero]).unwrap_err();
    println!("  Batch reverted: {}", err);
    println!(
        "  Events {} -> {}, quotes {} -> {}, pairs {}",
        events,
        layer.events().len(),
        quotes,
        layer.host().symmio.quote_count(),
        layer.pairs().len()
    );

    layer.pause(ADMIN).unwrap();
    let paused = layer.party_a_call(ALICE, party_a, &[quote(1)]);
    println!("  Paused layer: {}", paused.unwrap_err());
    layer.unpause(ADMIN).unwrap();
}
