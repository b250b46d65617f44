//! Selector policy store.
//!
//! Decides how the forwarder treats each payload by its selector: whether it mints a quote
//! that should be paired, where the tracked quote id lives in its arguments, and which
//! calldata guards must hold before it may be forwarded.

use crate::abi::{word_at, FunctionLayout};
use crate::protocol::ProtocolInterface;
use crate::types::{QuoteId, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Calldata equality guard: `calldata[start_idx..start_idx + expected_value.len()] == expected_value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalCondition {
    pub error_message: String,
    pub start_idx: usize,
    pub expected_value: Vec<u8>,
}

impl AdditionalCondition {
    pub fn new(error_message: impl Into<String>, start_idx: usize, expected_value: Vec<u8>) -> Self {
        Self {
            error_message: error_message.into(),
            start_idx,
            expected_value,
        }
    }

    pub fn holds(&self, calldata: &[u8]) -> bool {
        let Some(end) = self.start_idx.checked_add(self.expected_value.len()) else {
            return false;
        };
        calldata.get(self.start_idx..end) == Some(self.expected_value.as_slice())
    }
}

/// Typed decoder for the quote id carried by one call shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedArg {
    pub selector: Selector,
    pub function: String,
    /// Position in the parameter list, as configured.
    pub arg_index: usize,
    /// Head byte offset resolved from the layout, selector included.
    pub byte_offset: usize,
}

impl TrackedArg {
    /// Build a decoder, checking the argument really is a static uint256 in this layout.
    pub fn resolve(layout: &FunctionLayout, arg_index: usize) -> Result<Self, PolicyError> {
        let param = layout.params.get(arg_index).ok_or(PolicyError::InvalidTrackedArgument {
            selector: layout.selector,
            arg_index,
            reason: format!("{} takes {} arguments", layout.name, layout.params.len()),
        })?;
        if !param.is_uint256() {
            return Err(PolicyError::InvalidTrackedArgument {
                selector: layout.selector,
                arg_index,
                reason: format!("argument is {}, expected uint256", param.ty),
            });
        }
        let byte_offset = layout
            .head_offset(arg_index)
            .ok_or(PolicyError::UnknownSelector(layout.selector))?;
        Ok(Self {
            selector: layout.selector,
            function: layout.name.clone(),
            arg_index,
            byte_offset,
        })
    }

    pub fn decode(&self, calldata: &[u8]) -> Result<QuoteId, DecodeError> {
        word_at(calldata, self.byte_offset)
            .map(QuoteId)
            .ok_or(DecodeError::Truncated {
                selector: self.selector,
                needed: self.byte_offset + 32,
                len: calldata.len(),
            })
    }
}

#[derive(Debug, Clone)]
pub struct SelectorPolicy {
    interface: ProtocolInterface,
    send_quote: Option<Selector>,
    pair_ops: HashMap<Selector, TrackedArg>,
    conditions: HashMap<Selector, Vec<AdditionalCondition>>,
}

impl SelectorPolicy {
    pub fn new(interface: ProtocolInterface) -> Self {
        Self {
            interface,
            send_quote: None,
            pair_ops: HashMap::new(),
            conditions: HashMap::new(),
        }
    }

    pub fn interface(&self) -> &ProtocolInterface {
        &self.interface
    }

    pub fn interface_mut(&mut self) -> &mut ProtocolInterface {
        &mut self.interface
    }

    /// Replace the pair-creating selector. Returns the previous one.
    pub fn set_send_quote_selector(&mut self, selector: Selector) -> Result<Option<Selector>, PolicyError> {
        if self.interface.get(&selector).is_none() {
            return Err(PolicyError::UnknownSelector(selector));
        }
        Ok(self.send_quote.replace(selector))
    }

    pub fn send_quote_selector(&self) -> Option<Selector> {
        self.send_quote
    }

    pub fn is_send_quote(&self, selector: Selector) -> bool {
        self.send_quote == Some(selector)
    }

    pub fn add_pair_ops_selector(&mut self, selector: Selector, arg_index: usize) -> Result<&TrackedArg, PolicyError> {
        let layout = self
            .interface
            .get(&selector)
            .ok_or(PolicyError::UnknownSelector(selector))?;
        let tracked = TrackedArg::resolve(layout, arg_index)?;
        self.pair_ops.insert(selector, tracked);
        self.pair_ops
            .get(&selector)
            .ok_or(PolicyError::SelectorNotTracked(selector))
    }

    pub fn remove_pair_ops_selector(&mut self, selector: Selector) -> Result<TrackedArg, PolicyError> {
        self.pair_ops
            .remove(&selector)
            .ok_or(PolicyError::SelectorNotTracked(selector))
    }

    pub fn tracked(&self, selector: Selector) -> Option<&TrackedArg> {
        self.pair_ops.get(&selector)
    }

    /// Configured argument position for a tracked selector.
    pub fn pair_ops_selector(&self, selector: Selector) -> Option<usize> {
        self.pair_ops.get(&selector).map(|t| t.arg_index)
    }

    /// Appends a guard and returns its index.
    pub fn add_additional_condition(
        &mut self,
        selector: Selector,
        condition: AdditionalCondition,
    ) -> Result<usize, PolicyError> {
        if condition.expected_value.is_empty() {
            return Err(PolicyError::EmptyCondition(selector));
        }
        let list = self.conditions.entry(selector).or_default();
        list.push(condition);
        Ok(list.len() - 1)
    }

    /// Removes by index; later conditions shift down by one.
    pub fn remove_additional_condition(
        &mut self,
        selector: Selector,
        index: usize,
    ) -> Result<AdditionalCondition, PolicyError> {
        let list = self
            .conditions
            .get_mut(&selector)
            .filter(|l| index < l.len())
            .ok_or(PolicyError::ConditionNotFound { selector, index })?;
        let removed = list.remove(index);
        if list.is_empty() {
            self.conditions.remove(&selector);
        }
        Ok(removed)
    }

    pub fn additional_conditions(&self, selector: Selector) -> &[AdditionalCondition] {
        self.conditions.get(&selector).map_or(&[], Vec::as_slice)
    }

    /// First failing guard for the payload's selector, reported with its own message.
    pub fn check_conditions(&self, selector: Selector, calldata: &[u8]) -> Result<(), PolicyError> {
        match self
            .additional_conditions(selector)
            .iter()
            .find(|c| !c.holds(calldata))
        {
            Some(failed) => Err(PolicyError::ConditionFailed {
                message: failed.error_message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("payload for {selector} too short: need {needed} bytes, got {len}")]
    Truncated { selector: Selector, needed: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("Selector {0} is not part of the protocol interface")]
    UnknownSelector(Selector),

    #[error("Selector {0} is not a pair ops selector")]
    SelectorNotTracked(Selector),

    #[error("Invalid tracked argument {arg_index} for {selector}: {reason}")]
    InvalidTrackedArgument {
        selector: Selector,
        arg_index: usize,
        reason: String,
    },

    #[error("Condition for {0} has no expected value")]
    EmptyCondition(Selector),

    #[error("Condition {index} for {selector} not found")]
    ConditionNotFound { selector: Selector, index: usize },

    #[error("{message}")]
    ConditionFailed { message: String },
}
