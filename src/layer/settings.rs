// 6.6 layer/settings.rs: SETTER-gated administration. selector policy, the protocol address,
// the account implementation, and bulk configuration from a LayerConfig.

use super::core::PairTradingLayer;
use super::results::LayerError;
use crate::config::{ConfigError, LayerConfig};
use crate::events::EventPayload;
use crate::policy::{AdditionalCondition, TrackedArg};
use crate::protocol::Host;
use crate::types::{Address, Role, Selector};
use alloy_primitives::keccak256;
use tracing::info;

impl<H: Host + Clone> PairTradingLayer<H> {
    /// Install new account code. Accounts created afterwards record the new version.
    pub fn set_party_implementation(&mut self, caller: Address, code: &[u8]) -> Result<u32, LayerError> {
        self.atomic(|layer| {
            layer.access.require(Role::setter(), caller)?;
            let code_hash = keccak256(code);
            layer.implementation = Some(code_hash);
            layer.implementation_version += 1;
            let version = layer.implementation_version;
            layer.emit_event(EventPayload::ImplementationSet { version, code_hash });
            info!(version, code_hash = %code_hash, "party implementation set");
            Ok(version)
        })
    }

    pub fn set_symmio_address(&mut self, caller: Address, symmio: Address) -> Result<(), LayerError> {
        self.atomic(|layer| {
            layer.access.require(Role::setter(), caller)?;
            let old = std::mem::replace(&mut layer.symmio, symmio);
            layer.emit_event(EventPayload::SymmioAddressSet { old, new: symmio });
            Ok(())
        })
    }

    pub fn set_send_quote_selector(&mut self, caller: Address, selector: Selector) -> Result<(), LayerError> {
        self.atomic(|layer| {
            layer.access.require(Role::setter(), caller)?;
            layer.policy.set_send_quote_selector(selector)?;
            layer.emit_event(EventPayload::SendQuoteSelectorSet { selector });
            Ok(())
        })
    }

    /// Track the quote id at parameter position `arg_index` of `selector`.
    pub fn add_pair_ops_selector(
        &mut self,
        caller: Address,
        selector: Selector,
        arg_index: usize,
    ) -> Result<TrackedArg, LayerError> {
        self.atomic(|layer| {
            layer.access.require(Role::setter(), caller)?;
            let tracked = layer.policy.add_pair_ops_selector(selector, arg_index)?.clone();
            layer.emit_event(EventPayload::PairOpsSelectorAdded { selector, arg_index });
            Ok(tracked)
        })
    }

    pub fn remove_pair_ops_selector(&mut self, caller: Address, selector: Selector) -> Result<(), LayerError> {
        self.atomic(|layer| {
            layer.access.require(Role::setter(), caller)?;
            layer.policy.remove_pair_ops_selector(selector)?;
            layer.emit_event(EventPayload::PairOpsSelectorRemoved { selector });
            Ok(())
        })
    }

    pub fn add_additional_condition(
        &mut self,
        caller: Address,
        selector: Selector,
        condition: AdditionalCondition,
    ) -> Result<usize, LayerError> {
        self.atomic(|layer| {
            layer.access.require(Role::setter(), caller)?;
            let index = layer.policy.add_additional_condition(selector, condition)?;
            layer.emit_event(EventPayload::AdditionalConditionAdded { selector, index });
            Ok(index)
        })
    }

    pub fn remove_additional_condition(
        &mut self,
        caller: Address,
        selector: Selector,
        index: usize,
    ) -> Result<(), LayerError> {
        self.atomic(|layer| {
            layer.access.require(Role::setter(), caller)?;
            layer.policy.remove_additional_condition(selector, index)?;
            layer.emit_event(EventPayload::AdditionalConditionRemoved { selector, index });
            Ok(())
        })
    }

    /// Apply a whole configuration in one transaction. Any bad entry leaves the policy untouched.
    pub fn apply_config(&mut self, caller: Address, config: &LayerConfig) -> Result<(), LayerError> {
        config.validate()?;
        self.atomic(|layer| {
            layer.access.require(Role::setter(), caller)?;
            layer.settings = config.settings.clone();

            for signature in &config.extra_signatures {
                layer
                    .policy
                    .interface_mut()
                    .register(signature)
                    .map_err(|e| ConfigError::InvalidSignature(format!("{signature}: {e}")))?;
            }

            if let Some(name) = &config.send_quote {
                let selector = layer.selector_named(name)?;
                layer.policy.set_send_quote_selector(selector)?;
                layer.emit_event(EventPayload::SendQuoteSelectorSet { selector });
            }

            for entry in &config.pair_ops {
                let selector = layer.selector_named(&entry.function)?;
                layer.policy.add_pair_ops_selector(selector, entry.tracked_arg)?;
                layer.emit_event(EventPayload::PairOpsSelectorAdded {
                    selector,
                    arg_index: entry.tracked_arg,
                });
            }

            for entry in &config.conditions {
                let selector = layer.selector_named(&entry.function)?;
                let condition =
                    AdditionalCondition::new(entry.error_message.clone(), entry.start_idx, entry.expected_bytes()?);
                let index = layer.policy.add_additional_condition(selector, condition)?;
                layer.emit_event(EventPayload::AdditionalConditionAdded { selector, index });
            }

            info!(
                pair_ops = config.pair_ops.len(),
                conditions = config.conditions.len(),
                "layer config applied"
            );
            Ok(())
        })
    }

    fn selector_named(&self, name: &str) -> Result<Selector, ConfigError> {
        self.policy
            .interface()
            .by_name(name)
            .map(|layout| layout.selector)
            .ok_or_else(|| ConfigError::UnknownFunction(name.to_string()))
    }
}
