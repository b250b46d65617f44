//! Property-based tests for the pairing and policy invariants.
//!
//! These tests verify invariants hold under random inputs.

use pair_layer::protocol::{lock_quote_payload, send_quote_payload};
use pair_layer::*;
use proptest::prelude::*;
use rust_decimal::Decimal;

const LAYER: Address = Address::new([0xF0; 20]);
const ADMIN: Address = Address::new([0xAD; 20]);
const ALICE: Address = Address::new([0x0A; 20]);

// Strategies for generating test data
fn id_strategy() -> impl Strategy<Value = u64> {
    1u64..64
}

fn id_pairs_strategy() -> impl Strategy<Value = Vec<(u64, u64)>> {
    proptest::collection::vec((id_strategy(), id_strategy()), 0..40)
}

fn address_strategy() -> impl Strategy<Value = Address> {
    (1u8..16).prop_map(Address::repeat_byte)
}

fn book_from(pairs: &[(u64, u64)]) -> PairBook {
    let mut book = PairBook::new();
    for (a, b) in pairs {
        // rejected pairs are fine, the book must stay consistent either way
        let _ = book.pair(QuoteId::new(*a), QuoteId::new(*b));
    }
    book
}

fn symmio_policy() -> SelectorPolicy {
    let mut policy = SelectorPolicy::new(ProtocolInterface::symmio());
    let config = LayerConfig::symmio();
    for entry in &config.pair_ops {
        let selector = policy.interface().by_name(&entry.function).unwrap().selector;
        policy.add_pair_ops_selector(selector, entry.tracked_arg).unwrap();
    }
    let send = policy.interface().by_name("sendQuote").unwrap().selector;
    policy.set_send_quote_selector(send).unwrap();
    policy
}

fn quote() -> Vec<u8> {
    send_quote_payload(Vec::new(), 1, Amount::new_unchecked(Decimal::ONE).to_wire().unwrap(), Default::default())
}

proptest! {
    /// forward[a] = b <=> backward[b] = a, and no id sits in two pairs.
    #[test]
    fn pair_book_stays_symmetric(pairs in id_pairs_strategy()) {
        let book = book_from(&pairs);

        let mut seen = std::collections::HashSet::new();
        for (a, b) in book.pairs() {
            prop_assert_eq!(book.forward(a), Some(b));
            prop_assert_eq!(book.backward(b), Some(a));
            prop_assert_eq!(book.partner_of(b), Some(a));
            prop_assert!(a != b);
            prop_assert!(seen.insert(a));
            prop_assert!(seen.insert(b));
        }
    }

    /// A single paired id is always a partial pair; a single unpaired id always passes.
    #[test]
    fn single_id_gate(pairs in id_pairs_strategy(), id in id_strategy()) {
        let book = book_from(&pairs);
        let result = book.check_batch(&[QuoteId::new(id)]);
        if book.is_paired(QuoteId::new(id)) {
            prop_assert_eq!(result, Err(PairingError::PartialPair(QuoteId::new(id))));
        } else {
            prop_assert!(result.is_ok());
        }
    }

    /// Two ids pass iff they are each other's partner, in either order.
    #[test]
    fn two_id_gate(pairs in id_pairs_strategy(), a in id_strategy(), b in id_strategy()) {
        let book = book_from(&pairs);
        let partners = a != b && book.partner_of(QuoteId::new(a)) == Some(QuoteId::new(b));
        prop_assert_eq!(book.check_batch(&[QuoteId::new(a), QuoteId::new(b)]).is_ok(), partners);
        prop_assert_eq!(book.check_batch(&[QuoteId::new(b), QuoteId::new(a)]).is_ok(), partners);
    }

    /// Send-quote batches larger than a pair never pass planning.
    #[test]
    fn oversized_send_quote_batches_rejected(size in 3usize..8) {
        let policy = symmio_policy();
        let payloads: Vec<_> = (0..size).map(|_| quote()).collect();
        prop_assert_eq!(
            plan_batch_result(&policy, &payloads),
            Err(PairingError::TooManySendQuotes(size))
        );
    }

    /// Tracked ids are decoded from the configured argument, whatever the id.
    #[test]
    fn tracked_decoder_reads_any_id(id in any::<u64>()) {
        let policy = symmio_policy();
        let payload = lock_quote_payload(QuoteId::new(id));
        let selector = Selector::of(&payload).unwrap();
        prop_assert_eq!(policy.tracked(selector).unwrap().decode(&payload), Ok(QuoteId::new(id)));
    }

    /// A condition holds exactly when the calldata slice equals the expected bytes.
    #[test]
    fn condition_matches_slice(
        calldata in proptest::collection::vec(any::<u8>(), 0..96),
        start in 0usize..100,
        len in 1usize..8,
    ) {
        let expected = calldata.get(start..start + len).map(<[u8]>::to_vec);
        match expected {
            Some(bytes) => {
                prop_assert!(AdditionalCondition::new("x", start, bytes.clone()).holds(&calldata));
                let mut flipped = bytes;
                flipped[0] ^= 0xFF;
                prop_assert!(!AdditionalCondition::new("x", start, flipped).holds(&calldata));
            }
            None => {
                prop_assert!(!AdditionalCondition::new("x", start, vec![0; len]).holds(&calldata));
            }
        }
    }

    /// Removing any set that contains an absent address fails and changes nothing.
    #[test]
    fn trusted_removal_is_all_or_nothing(
        trusted in proptest::collection::vec(address_strategy(), 1..8),
        removal in proptest::collection::vec(address_strategy(), 1..8),
    ) {
        let mut layer = PairTradingLayer::with_defaults(LAYER, ADMIN, SYMMIO_ADDRESS, SimulatedChain::new(ADMIN));
        let account = layer.create_party_b_account(ADMIN, &trusted).unwrap();
        let before = layer.party_b_account(account).unwrap().trusted.clone();

        let mut remaining = before.clone();
        let removable = removal.iter().all(|address| {
            match remaining.iter().position(|a| a == address) {
                Some(index) => {
                    remaining.remove(index);
                    true
                }
                None => false,
            }
        });

        let result = layer.remove_trusted_addresses(ADMIN, account, &removal);
        let after = layer.party_b_account(account).unwrap().trusted.clone();
        if removable {
            prop_assert!(result.is_ok());
            prop_assert_eq!(after, remaining);
        } else {
            prop_assert!(result.unwrap_err().is_not_found());
            prop_assert_eq!(after, before);
        }
    }

    /// Every minted pair shows up in the book, and pairs never overlap.
    #[test]
    fn layer_mints_disjoint_pairs(batches in proptest::collection::vec(1usize..=2, 1..8)) {
        let mut layer = PairTradingLayer::with_defaults(LAYER, ADMIN, SYMMIO_ADDRESS, SimulatedChain::new(ADMIN));
        layer.apply_config(ADMIN, &LayerConfig::symmio()).unwrap();
        layer.host_mut().fund(ALICE, Amount::new_unchecked(Decimal::from(100))).unwrap();
        layer.host_mut().approve_max(ALICE, LAYER);
        let account = layer.create_party_a_account(ALICE, "main").unwrap();
        layer
            .deposit_and_allocate_for_party_a_account(ALICE, account, Amount::new_unchecked(Decimal::from(100)))
            .unwrap();

        let mut minted = 0;
        for size in &batches {
            let payloads: Vec<_> = (0..*size).map(|_| quote()).collect();
            let result = layer.party_a_call(ALICE, account, &payloads).unwrap();
            prop_assert_eq!(result.new_pair.is_some(), *size == 2);
            if let Some((a, b)) = result.new_pair {
                prop_assert_eq!(layer.pairs().partner_of(a), Some(b));
                minted += 1;
            }
        }
        prop_assert_eq!(layer.pairs().len(), minted);
        prop_assert_eq!(layer.host().symmio.quote_count(), batches.iter().sum::<usize>());
    }
}

fn plan_batch_result(policy: &SelectorPolicy, payloads: &[Vec<u8>]) -> Result<BatchPlan, PairingError> {
    pairing::plan_batch(policy, &PairBook::new(), payloads)
}
