// 5.0: bootstrap configuration for a layer's selector policy. functions are named, not given
// as raw selectors, and are resolved against the protocol interface when applied.

use crate::layer::LayerSettings;
use alloy_primitives::hex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairOpsEntry {
    /// Function name in the protocol interface, e.g. "lockQuote".
    pub function: String,
    /// Position of the quote id among the function's arguments.
    pub tracked_arg: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionEntry {
    pub function: String,
    pub error_message: String,
    pub start_idx: usize,
    /// Hex, with or without 0x.
    pub expected_value: String,
}

impl ConditionEntry {
    pub fn expected_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        hex::decode(&self.expected_value).map_err(|e| ConfigError::InvalidCondition {
            reason: format!("{}: {e}", self.expected_value),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerConfig {
    #[serde(default)]
    pub settings: LayerSettings,
    /// Signatures added to the protocol interface before anything else is resolved.
    #[serde(default)]
    pub extra_signatures: Vec<String>,
    pub send_quote: Option<String>,
    #[serde(default)]
    pub pair_ops: Vec<PairOpsEntry>,
    #[serde(default)]
    pub conditions: Vec<ConditionEntry>,
}

impl LayerConfig {
    // the hedging setup: sendQuote pairs, every per-quote lifecycle step is tracked on its first argument
    pub fn symmio() -> Self {
        let pair_ops = [
            "lockQuote",
            "unlockQuote",
            "openPosition",
            "requestToClosePosition",
            "requestToCancelQuote",
            "fillCloseRequest",
        ]
        .into_iter()
        .map(|function| PairOpsEntry {
            function: function.to_string(),
            tracked_arg: 0,
        })
        .collect();

        Self {
            send_quote: Some("sendQuote".to_string()),
            pair_ops,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    // structural checks only. names and argument layouts are checked against the interface on apply.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.settings.max_events == 0 {
            return Err(ConfigError::InvalidSettings {
                reason: "max_events must be positive".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for entry in &self.pair_ops {
            if !seen.insert(entry.function.as_str()) {
                return Err(ConfigError::DuplicatePairOps {
                    function: entry.function.clone(),
                });
            }
            if self.send_quote.as_deref() == Some(entry.function.as_str()) {
                return Err(ConfigError::SendQuoteTracked {
                    function: entry.function.clone(),
                });
            }
        }

        for condition in &self.conditions {
            if condition.expected_bytes()?.is_empty() {
                return Err(ConfigError::InvalidCondition {
                    reason: format!("empty expected value for {}", condition.function),
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Config parse error: {reason}")]
    Parse { reason: String },

    #[error("Invalid settings: {reason}")]
    InvalidSettings { reason: String },

    #[error("Pair ops function listed twice: {function}")]
    DuplicatePairOps { function: String },

    #[error("Send quote function {function} can't also be a pair ops function")]
    SendQuoteTracked { function: String },

    #[error("Invalid condition: {reason}")]
    InvalidCondition { reason: String },

    #[error("Unknown function in config: {0}")]
    UnknownFunction(String),

    #[error("Invalid signature in config: {0}")]
    InvalidSignature(String),
}
