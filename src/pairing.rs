// 3.0: the pairing engine. two quotes minted in the same send-quote batch become a permanent pair,
// and from then on no tracked operation may touch one of them without the other in the same batch.
//
// state per quote id: Unpaired -> Paired. Paired is terminal; nothing here ever removes a pair.

use crate::policy::{DecodeError, SelectorPolicy};
use crate::types::{QuoteId, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Send-quote batches carry one quote or one pair, never more.
pub const MAX_SEND_QUOTES: usize = 2;

// 3.1: symmetric relation. forward[a] = b <=> backward[b] = a.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PairBook {
    forward: HashMap<QuoteId, QuoteId>,
    backward: HashMap<QuoteId, QuoteId>,
}

impl PairBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a pair. Both ids must be fresh and distinct.
    pub fn pair(&mut self, first: QuoteId, second: QuoteId) -> Result<(), PairingError> {
        if first == second {
            return Err(PairingError::SelfPair(first));
        }
        for id in [first, second] {
            if self.is_paired(id) {
                return Err(PairingError::AlreadyPaired(id));
            }
        }
        self.forward.insert(first, second);
        self.backward.insert(second, first);
        Ok(())
    }

    pub fn forward(&self, id: QuoteId) -> Option<QuoteId> {
        self.forward.get(&id).copied()
    }

    pub fn backward(&self, id: QuoteId) -> Option<QuoteId> {
        self.backward.get(&id).copied()
    }

    pub fn partner_of(&self, id: QuoteId) -> Option<QuoteId> {
        self.forward(id).or_else(|| self.backward(id))
    }

    pub fn is_paired(&self, id: QuoteId) -> bool {
        self.forward.contains_key(&id) || self.backward.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// All pairs as (first, second), sorted by first id.
    pub fn pairs(&self) -> Vec<(QuoteId, QuoteId)> {
        let mut pairs: Vec<_> = self.forward.iter().map(|(a, b)| (*a, *b)).collect();
        pairs.sort();
        pairs
    }

    // 3.2: the completeness gate. a tracked batch touches nothing, one unpaired quote, or one whole pair.
    pub fn check_batch(&self, tracked: &[QuoteId]) -> Result<(), PairingError> {
        match tracked {
            [] => Ok(()),
            [only] => {
                if self.is_paired(*only) {
                    Err(PairingError::PartialPair(*only))
                } else {
                    Ok(())
                }
            }
            [first, second] => {
                if first != second && self.partner_of(*first) == Some(*second) {
                    Ok(())
                } else {
                    Err(PairingError::NotPartners {
                        first: *first,
                        second: *second,
                    })
                }
            }
            more => Err(PairingError::TooManyTracked(more.len())),
        }
    }
}

/// How the forwarder must treat a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchPlan {
    /// Every payload mints a quote. Two of them get paired after forwarding.
    NewQuotes { count: usize },
    /// Ids decoded from tracked payloads, in batch order. Already validated.
    Tracked(Vec<QuoteId>),
}

impl BatchPlan {
    pub fn pairs_after_forward(&self) -> bool {
        matches!(self, BatchPlan::NewQuotes { count } if *count == MAX_SEND_QUOTES)
    }
}

/// Classify a batch and run the pairing checks that must pass before anything is forwarded.
pub fn plan_batch(
    policy: &SelectorPolicy,
    book: &PairBook,
    payloads: &[Vec<u8>],
) -> Result<BatchPlan, PairingError> {
    let selectors = payloads
        .iter()
        .enumerate()
        .map(|(i, p)| Selector::of(p).ok_or(PairingError::MalformedPayload(i)))
        .collect::<Result<Vec<_>, _>>()?;

    if !selectors.is_empty() && selectors.iter().all(|s| policy.is_send_quote(*s)) {
        if selectors.len() > MAX_SEND_QUOTES {
            return Err(PairingError::TooManySendQuotes(selectors.len()));
        }
        return Ok(BatchPlan::NewQuotes {
            count: selectors.len(),
        });
    }

    let mut tracked = Vec::new();
    for (selector, payload) in selectors.iter().zip(payloads) {
        if let Some(decoder) = policy.tracked(*selector) {
            tracked.push(decoder.decode(payload)?);
        }
    }
    book.check_batch(&tracked)?;
    Ok(BatchPlan::Tracked(tracked))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PairingError {
    #[error("PairTradingLayer: Only two callData can be there in send quote functions (got {0})")]
    TooManySendQuotes(usize),

    #[error("PairTradingLayer: Can't perform on only one quote from a pair")]
    PartialPair(QuoteId),

    #[error("PairTradingLayer: Quotes {first} and {second} are not a pair")]
    NotPartners { first: QuoteId, second: QuoteId },

    #[error("PairTradingLayer: At most two paired quotes per batch (got {0})")]
    TooManyTracked(usize),

    #[error("PairTradingLayer: Quote {0} is already paired")]
    AlreadyPaired(QuoteId),

    #[error("PairTradingLayer: Quote {0} can't be paired with itself")]
    SelfPair(QuoteId),

    #[error("PairTradingLayer: Payload {0} has no selector")]
    MalformedPayload(usize),

    #[error("PairTradingLayer: sendQuote did not return a quote id")]
    MissingQuoteId,

    #[error("PairTradingLayer: {0}")]
    Decode(#[from] DecodeError),
}
