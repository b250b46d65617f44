// 4.0: every state change produces an event. point-in-time notifications for observers;
// nothing in the layer reads them back. a reverted transaction drops its events with it.

use crate::types::{Address, Amount, QuoteId, Role, Selector, Timestamp};
use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    // Account events
    PartyAAccountCreated(PartyAAccountCreatedEvent),
    PartyAAccountRenamed { account: Address, name: String },
    PartyBAccountCreated(PartyBAccountCreatedEvent),
    TrustedAddressAdded { account: Address, address: Address },
    TrustedAddressRemoved { account: Address, address: Address },

    // Pairing and forwarding events
    PairCreated(PairCreatedEvent),
    CallForwarded(CallForwardedEvent),
    DepositForwarded(BalanceForwardedEvent),
    WithdrawalForwarded(BalanceForwardedEvent),

    // Role and lifecycle events
    RoleGranted { role: Role, account: Address, sender: Address },
    RoleRevoked { role: Role, account: Address, sender: Address },
    Paused { by: Address },
    Unpaused { by: Address },

    // Settings events
    ImplementationSet { version: u32, code_hash: B256 },
    SymmioAddressSet { old: Address, new: Address },
    SendQuoteSelectorSet { selector: Selector },
    PairOpsSelectorAdded { selector: Selector, arg_index: usize },
    PairOpsSelectorRemoved { selector: Selector },
    AdditionalConditionAdded { selector: Selector, index: usize },
    AdditionalConditionRemoved { selector: Selector, index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyAAccountCreatedEvent {
    pub owner: Address,
    pub account: Address,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyBAccountCreatedEvent {
    pub admin: Address,
    pub account: Address,
    pub trusted: Vec<Address>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairCreatedEvent {
    pub account: Address,
    pub first: QuoteId,
    pub second: QuoteId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallForwardedEvent {
    pub caller: Address,
    pub account: Address,
    pub selector: Selector,
}

/// Deposit: `counterparty` is the funder. Withdrawal: `counterparty` is the recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceForwardedEvent {
    pub account: Address,
    pub counterparty: Address,
    pub amount: Amount,
}

impl EventPayload {
    /// Short tag for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::PartyAAccountCreated(_) => "party_a_account_created",
            EventPayload::PartyAAccountRenamed { .. } => "party_a_account_renamed",
            EventPayload::PartyBAccountCreated(_) => "party_b_account_created",
            EventPayload::TrustedAddressAdded { .. } => "trusted_address_added",
            EventPayload::TrustedAddressRemoved { .. } => "trusted_address_removed",
            EventPayload::PairCreated(_) => "pair_created",
            EventPayload::CallForwarded(_) => "call_forwarded",
            EventPayload::DepositForwarded(_) => "deposit_forwarded",
            EventPayload::WithdrawalForwarded(_) => "withdrawal_forwarded",
            EventPayload::RoleGranted { .. } => "role_granted",
            EventPayload::RoleRevoked { .. } => "role_revoked",
            EventPayload::Paused { .. } => "paused",
            EventPayload::Unpaused { .. } => "unpaused",
            EventPayload::ImplementationSet { .. } => "implementation_set",
            EventPayload::SymmioAddressSet { .. } => "symmio_address_set",
            EventPayload::SendQuoteSelectorSet { .. } => "send_quote_selector_set",
            EventPayload::PairOpsSelectorAdded { .. } => "pair_ops_selector_added",
            EventPayload::PairOpsSelectorRemoved { .. } => "pair_ops_selector_removed",
            EventPayload::AdditionalConditionAdded { .. } => "additional_condition_added",
            EventPayload::AdditionalConditionRemoved { .. } => "additional_condition_removed",
        }
    }
}
