// 6.4 layer/calls.rs: the call forwarder. one routine serves both account kinds:
// authorize, guard, plan the batch against the pair book, relay, then mint a pair if the
// batch was two fresh quotes.

use super::core::PairTradingLayer;
use super::results::{ForwardResult, LayerError};
use crate::events::{CallForwardedEvent, EventPayload, PairCreatedEvent};
use crate::pairing::{plan_batch, BatchPlan, PairingError};
use crate::protocol::{returned_quote_id, Host};
use crate::registry::AccountKind;
use crate::types::{Address, QuoteId, Selector};
use tracing::{debug, info};

impl<H: Host + Clone> PairTradingLayer<H> {
    /// Forward a batch as a PartyA account. Only the owner may call.
    pub fn party_a_call(
        &mut self,
        caller: Address,
        account: Address,
        payloads: &[Vec<u8>],
    ) -> Result<ForwardResult, LayerError> {
        self.atomic(|layer| layer.forward_batch(AccountKind::PartyA, caller, account, payloads))
    }

    /// Forward a batch as a PartyB account. Trusted addresses and admins may call.
    pub fn party_b_call(
        &mut self,
        caller: Address,
        account: Address,
        payloads: &[Vec<u8>],
    ) -> Result<ForwardResult, LayerError> {
        self.atomic(|layer| layer.forward_batch(AccountKind::PartyB, caller, account, payloads))
    }

    fn forward_batch(
        &mut self,
        kind: AccountKind,
        caller: Address,
        account: Address,
        payloads: &[Vec<u8>],
    ) -> Result<ForwardResult, LayerError> {
        self.require_not_paused()?;
        self.registry.authorize(kind, account, caller)?;

        let plan = plan_batch(&self.policy, &self.pairs, payloads)?;
        for payload in payloads {
            // plan_batch already rejected payloads without a selector
            if let Some(selector) = Selector::of(payload) {
                self.policy.check_conditions(selector, payload)?;
            }
        }

        let mut outputs = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let output = self.relay(account, payload)?;
            if let Some(selector) = Selector::of(payload) {
                debug!(account = %account, selector = %selector, "forwarded");
                self.emit_event(EventPayload::CallForwarded(CallForwardedEvent {
                    caller,
                    account,
                    selector,
                }));
            }
            outputs.push(output);
        }

        let new_pair = if plan.pairs_after_forward() {
            Some(self.mint_pair(account, &outputs)?)
        } else {
            None
        };

        let tracked = match plan {
            BatchPlan::Tracked(ids) => ids,
            BatchPlan::NewQuotes { .. } => Vec::new(),
        };

        info!(
            account = %account,
            kind = ?kind,
            payloads = payloads.len(),
            tracked = tracked.len(),
            paired = new_pair.is_some(),
            "batch forwarded"
        );

        Ok(ForwardResult {
            account,
            outputs,
            tracked,
            new_pair,
        })
    }

    // both sendQuote calls returned; read the fresh ids back and record the pair
    fn mint_pair(&mut self, account: Address, outputs: &[Vec<u8>]) -> Result<(QuoteId, QuoteId), LayerError> {
        let [first, second] = outputs else {
            return Err(PairingError::MissingQuoteId.into());
        };
        let first = returned_quote_id(first).ok_or(PairingError::MissingQuoteId)?;
        let second = returned_quote_id(second).ok_or(PairingError::MissingQuoteId)?;

        self.pairs.pair(first, second)?;
        self.emit_event(EventPayload::PairCreated(PairCreatedEvent {
            account,
            first,
            second,
        }));
        info!(account = %account, first = %first, second = %second, "pair created");
        Ok((first, second))
    }
}
