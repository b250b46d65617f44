// 6.0.2: result types and errors for layer operations.

use crate::access::AccessError;
use crate::config::ConfigError;
use crate::pairing::PairingError;
use crate::policy::PolicyError;
use crate::protocol::Revert;
use crate::registry::RegistryError;
use crate::types::{Address, Amount, QuoteId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardResult {
    pub account: Address,
    /// Raw return data, one entry per payload, in batch order.
    pub outputs: Vec<Vec<u8>>,
    /// Quote ids the pairing gate inspected.
    pub tracked: Vec<QuoteId>,
    /// Set when the batch minted a pair.
    pub new_pair: Option<(QuoteId, QuoteId)>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayerError {
    #[error("Pausable: paused")]
    Paused,

    #[error("Pausable: not paused")]
    NotPaused,

    #[error("PairTradingLayer: {0} returned malformed data")]
    BadReturn(&'static str),

    #[error("PairTradingLayer: amount {0} does not fit in 18-decimal base units")]
    AmountOutOfRange(Amount),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Pairing(#[from] PairingError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    // protocol reverts bubble up with their own reason
    #[error(transparent)]
    External(#[from] Revert),
}

impl LayerError {
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            LayerError::Access(_)
                | LayerError::Registry(
                    RegistryError::NotOwner { .. }
                        | RegistryError::NotAdmin { .. }
                        | RegistryError::NotAuthorized { .. }
                )
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LayerError::Registry(RegistryError::TrustedAddressNotFound { .. })
                | LayerError::Policy(PolicyError::ConditionNotFound { .. } | PolicyError::SelectorNotTracked(_))
        )
    }
}
