//! Layer runtime settings.

use serde::{Deserialize, Serialize};

/// Layer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSettings {
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self { max_events: 100_000 }
    }
}
