//! Pairing invariant tests.
//!
//! These tests drive the layer end to end over the simulated chain and check that paired
//! quotes can only ever move together.

use alloy_primitives::U256;
use alloy_sol_types::SolCall;
use pair_layer::protocol::{
    cancel_quote_payload, close_position_payload, fill_close_payload, lock_quote_payload, open_position_payload,
    send_quote_payload, unlock_quote_payload,
};
use pair_layer::*;
use rust_decimal::Decimal;

const LAYER: Address = Address::new([0xF0; 20]);
const ADMIN: Address = Address::new([0xAD; 20]);
const ALICE: Address = Address::new([0x0A; 20]);
const HEDGER: Address = Address::new([0x0B; 20]);
const BOT: Address = Address::new([0xB0; 20]);

struct Fixture {
    layer: PairTradingLayer<SimulatedChain>,
    party_a: Address,
    party_b: Address,
}

fn units(n: i64) -> Amount {
    Amount::new_unchecked(Decimal::from(n))
}

fn fixture() -> Fixture {
    let mut layer = PairTradingLayer::with_defaults(LAYER, ADMIN, SYMMIO_ADDRESS, SimulatedChain::new(ADMIN));
    layer.apply_config(ADMIN, &LayerConfig::symmio()).unwrap();

    layer.host_mut().fund(ALICE, units(10_000)).unwrap();
    layer.host_mut().approve_max(ALICE, LAYER);

    let party_a = layer.create_party_a_account(ALICE, "main").unwrap();
    layer
        .deposit_and_allocate_for_party_a_account(ALICE, party_a, units(1_000))
        .unwrap();

    layer.grant_role(ADMIN, Role::party_b_manager(), HEDGER).unwrap();
    let party_b = layer.create_party_b_account(HEDGER, &[BOT]).unwrap();
    layer.host_mut().register_party_b(party_b);

    Fixture {
        layer,
        party_a,
        party_b,
    }
}

fn quote() -> Vec<u8> {
    send_quote_payload(Vec::new(), 1, units(1).to_wire().unwrap(), units(100).to_wire().unwrap())
}

fn lock(id: u64) -> Vec<u8> {
    lock_quote_payload(QuoteId::new(id))
}

/// Mints pairs (1, 2), (3, 4), ... in order.
fn mint_pairs(f: &mut Fixture, count: usize) -> Vec<(QuoteId, QuoteId)> {
    (0..count)
        .map(|_| {
            f.layer
                .party_a_call(ALICE, f.party_a, &[quote(), quote()])
                .unwrap()
                .new_pair
                .unwrap()
        })
        .collect()
}

#[test]
fn two_send_quotes_mint_a_symmetric_pair() {
    let mut f = fixture();
    let result = f.layer.party_a_call(ALICE, f.party_a, &[quote(), quote()]).unwrap();

    assert_eq!(result.new_pair, Some((QuoteId::new(1), QuoteId::new(2))));
    assert_eq!(result.outputs.len(), 2);
    assert_eq!(f.layer.pairs().forward(QuoteId::new(1)), Some(QuoteId::new(2)));
    assert_eq!(f.layer.pairs().backward(QuoteId::new(2)), Some(QuoteId::new(1)));
    assert_eq!(f.layer.pairs().partner_of(QuoteId::new(2)), Some(QuoteId::new(1)));

    let created = f
        .layer
        .events()
        .iter()
        .filter(|e| matches!(e.payload, EventPayload::PairCreated(_)))
        .count();
    assert_eq!(created, 1);
}

#[test]
fn single_send_quote_is_not_paired() {
    let mut f = fixture();
    let result = f.layer.party_a_call(ALICE, f.party_a, &[quote()]).unwrap();
    assert!(result.new_pair.is_none());
    assert!(f.layer.pairs().is_empty());
    assert_eq!(f.layer.host().symmio.quote_count(), 1);
}

#[test]
fn three_send_quotes_rejected() {
    let mut f = fixture();
    let err = f
        .layer
        .party_a_call(ALICE, f.party_a, &[quote(), quote(), quote()])
        .unwrap_err();

    assert_eq!(err, LayerError::Pairing(PairingError::TooManySendQuotes(3)));
    assert_eq!(
        err.to_string(),
        "PairTradingLayer: Only two callData can be there in send quote functions (got 3)"
    );
    assert_eq!(f.layer.host().symmio.quote_count(), 0);
}

#[test]
fn partial_pair_operation_rejected() {
    let mut f = fixture();
    mint_pairs(&mut f, 1);

    for id in [1, 2] {
        let err = f.layer.party_b_call(BOT, f.party_b, &[lock(id)]).unwrap_err();
        assert_eq!(err, LayerError::Pairing(PairingError::PartialPair(QuoteId::new(id))));
        assert_eq!(err.to_string(), "PairTradingLayer: Can't perform on only one quote from a pair");
    }
    assert!(f.layer.host().symmio.quote(QuoteId::new(1)).unwrap().party_b.is_none());
}

#[test]
fn partners_lock_together_strangers_do_not() {
    let mut f = fixture();
    mint_pairs(&mut f, 2);

    let err = f.layer.party_b_call(BOT, f.party_b, &[lock(1), lock(3)]).unwrap_err();
    assert!(matches!(err, LayerError::Pairing(PairingError::NotPartners { .. })));

    let result = f.layer.party_b_call(BOT, f.party_b, &[lock(1), lock(2)]).unwrap();
    assert_eq!(result.tracked, vec![QuoteId::new(1), QuoteId::new(2)]);

    // reverse order is the same pair
    f.layer.party_b_call(BOT, f.party_b, &[lock(4), lock(3)]).unwrap();

    for id in 1..=4 {
        let quote = f.layer.host().symmio.quote(QuoteId::new(id)).unwrap();
        assert_eq!(quote.party_b, Some(f.party_b));
    }
}

#[test]
fn duplicate_id_is_not_a_pair() {
    let mut f = fixture();
    mint_pairs(&mut f, 1);
    let err = f.layer.party_b_call(BOT, f.party_b, &[lock(1), lock(1)]).unwrap_err();
    assert!(matches!(err, LayerError::Pairing(PairingError::NotPartners { .. })));
}

#[test]
fn more_than_one_pair_per_batch_rejected() {
    let mut f = fixture();
    mint_pairs(&mut f, 2);
    let err = f
        .layer
        .party_b_call(BOT, f.party_b, &[lock(1), lock(2), lock(3), lock(4)])
        .unwrap_err();
    assert_eq!(err, LayerError::Pairing(PairingError::TooManyTracked(4)));
}

#[test]
fn unpaired_quote_moves_alone() {
    let mut f = fixture();
    f.layer.party_a_call(ALICE, f.party_a, &[quote()]).unwrap();
    f.layer.party_b_call(BOT, f.party_b, &[lock(1)]).unwrap();
    f.layer
        .party_b_call(BOT, f.party_b, &[unlock_quote_payload(QuoteId::new(1))])
        .unwrap();
    f.layer
        .party_a_call(ALICE, f.party_a, &[cancel_quote_payload(QuoteId::new(1))])
        .unwrap();
    assert_eq!(
        f.layer.host().symmio.quote(QuoteId::new(1)).unwrap().status,
        mock::QuoteStatus::Canceled
    );
}

#[test]
fn quote_ids_beyond_64_bits_pair_and_gate() {
    let mut f = fixture();
    let wide = U256::from(u64::MAX) + U256::from(1u64);
    f.layer.host_mut().symmio.set_next_quote_id(wide);

    // an unpaired wide id goes straight through to the protocol
    f.layer.party_a_call(ALICE, f.party_a, &[quote()]).unwrap();
    f.layer
        .party_a_call(ALICE, f.party_a, &[cancel_quote_payload(QuoteId(wide))])
        .unwrap();
    assert_eq!(
        f.layer.host().symmio.quote(QuoteId(wide)).unwrap().status,
        mock::QuoteStatus::Canceled
    );

    let (first, second) = f
        .layer
        .party_a_call(ALICE, f.party_a, &[quote(), quote()])
        .unwrap()
        .new_pair
        .unwrap();
    assert_eq!(first, QuoteId(wide + U256::from(1u64)));
    assert_eq!(second, QuoteId(wide + U256::from(2u64)));

    let err = f
        .layer
        .party_b_call(BOT, f.party_b, &[lock_quote_payload(second)])
        .unwrap_err();
    assert_eq!(err, LayerError::Pairing(PairingError::PartialPair(second)));
    f.layer
        .party_b_call(BOT, f.party_b, &[lock_quote_payload(second), lock_quote_payload(first)])
        .unwrap();
}

#[test]
fn full_lifecycle_in_pairs() {
    let mut f = fixture();
    let (a, b) = mint_pairs(&mut f, 1)[0];
    let amount = units(1).to_wire().unwrap();
    let price = units(100).to_wire().unwrap();

    f.layer
        .party_b_call(BOT, f.party_b, &[lock_quote_payload(a), lock_quote_payload(b)])
        .unwrap();
    f.layer
        .party_b_call(
            HEDGER,
            f.party_b,
            &[open_position_payload(a, amount, price), open_position_payload(b, amount, price)],
        )
        .unwrap();
    f.layer
        .party_a_call(
            ALICE,
            f.party_a,
            &[close_position_payload(a, price, amount), close_position_payload(b, price, amount)],
        )
        .unwrap();

    let err = f
        .layer
        .party_b_call(BOT, f.party_b, &[fill_close_payload(a, amount, price)])
        .unwrap_err();
    assert!(matches!(err, LayerError::Pairing(PairingError::PartialPair(_))));

    f.layer
        .party_b_call(
            BOT,
            f.party_b,
            &[fill_close_payload(b, amount, price), fill_close_payload(a, amount, price)],
        )
        .unwrap();

    for id in [a, b] {
        assert_eq!(f.layer.host().symmio.quote(id).unwrap().status, mock::QuoteStatus::Closed);
    }
    // pairs outlive the quotes
    assert_eq!(f.layer.pairs().partner_of(a), Some(b));
}

#[test]
fn untracked_payloads_skip_the_gate() {
    let mut f = fixture();
    mint_pairs(&mut f, 1);
    let balance = ISymmio::balanceOfCall { user: f.party_a }.abi_encode();

    let result = f
        .layer
        .party_a_call(ALICE, f.party_a, &[balance.clone(), cancel_quote_payload(QuoteId::new(1))]);
    assert!(matches!(result, Err(LayerError::Pairing(PairingError::PartialPair(_)))));

    let result = f
        .layer
        .party_a_call(
            ALICE,
            f.party_a,
            &[balance, cancel_quote_payload(QuoteId::new(1)), cancel_quote_payload(QuoteId::new(2))],
        )
        .unwrap();
    assert_eq!(result.outputs.len(), 3);
}

#[test]
fn reverted_batch_leaves_no_trace() {
    let mut f = fixture();
    let events = f.layer.events().to_vec();
    let balance = f.layer.host().symmio_allocated(f.party_a);

    // first sendQuote succeeds in the protocol, second reverts on zero quantity
    let zero = send_quote_payload(Vec::new(), 1, U256::ZERO, U256::ZERO);
    let err = f.layer.party_a_call(ALICE, f.party_a, &[quote(), zero]).unwrap_err();
    assert_eq!(err.to_string(), "PartyAFacet: Quantity should be bigger than zero");

    assert_eq!(f.layer.host().symmio.quote_count(), 0);
    assert!(f.layer.pairs().is_empty());
    assert_eq!(f.layer.events().len(), events.len());
    assert_eq!(f.layer.events().last().map(|e| e.id), events.last().map(|e| e.id));
    assert_eq!(f.layer.host().symmio_allocated(f.party_a), balance);

    // the next quote still gets id 1
    let result = f.layer.party_a_call(ALICE, f.party_a, &[quote(), quote()]).unwrap();
    assert_eq!(result.new_pair, Some((QuoteId::new(1), QuoteId::new(2))));
}

#[test]
fn condition_failure_reports_its_message() {
    let mut f = fixture();
    let send = Selector(ISymmio::sendQuoteCall::SELECTOR);
    let mut symbol_one = vec![0u8; 31];
    symbol_one.push(1);
    f.layer
        .add_additional_condition(ADMIN, send, AdditionalCondition::new("Symbol not allowed", 36, symbol_one))
        .unwrap();

    f.layer.party_a_call(ALICE, f.party_a, &[quote()]).unwrap();

    let other_symbol = send_quote_payload(Vec::new(), 7, units(1).to_wire().unwrap(), units(1).to_wire().unwrap());
    let err = f
        .layer
        .party_a_call(ALICE, f.party_a, &[quote(), other_symbol])
        .unwrap_err();
    assert_eq!(err.to_string(), "Symbol not allowed");
    assert_eq!(f.layer.host().symmio.quote_count(), 1);

    f.layer.remove_additional_condition(ADMIN, send, 0).unwrap();
    assert!(f.layer.policy().additional_conditions(send).is_empty());
}

#[test]
fn untracking_a_selector_lifts_the_gate() {
    let mut f = fixture();
    mint_pairs(&mut f, 1);
    let lock_selector = Selector(ISymmio::lockQuoteCall::SELECTOR);

    f.layer.remove_pair_ops_selector(ADMIN, lock_selector).unwrap();
    f.layer.party_b_call(BOT, f.party_b, &[lock(1)]).unwrap();

    // the pair itself is untouched
    assert_eq!(f.layer.pairs().partner_of(QuoteId::new(1)), Some(QuoteId::new(2)));
}

#[test]
fn tracked_argument_position_is_per_selector() {
    let mut f = fixture();
    mint_pairs(&mut f, 1);

    // requestToClosePosition: track the quote id, then move tracking to a non-uint argument
    let close = Selector(ISymmio::requestToClosePositionCall::SELECTOR);
    assert_eq!(f.layer.policy().pair_ops_selector(close), Some(0));
    let err = f.layer.add_pair_ops_selector(ADMIN, close, 3).unwrap_err();
    assert!(matches!(
        err,
        LayerError::Policy(PolicyError::InvalidTrackedArgument { arg_index: 3, .. })
    ));
    assert_eq!(f.layer.policy().pair_ops_selector(close), Some(0));

    // closePrice is a uint256, so it can be tracked, and the head offset follows
    let tracked = f.layer.add_pair_ops_selector(ADMIN, close, 1).unwrap();
    assert_eq!(tracked.byte_offset, 4 + 32);
}
