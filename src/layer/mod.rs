// 6.0: the pair trading layer. owns every component, authorizes callers, forwards batches
// into the protocol as the account, and keeps the pairing invariant across batches.
// every public mutating call is one transaction: it either completes or leaves no trace.

mod accounts;
mod balances;
mod calls;
mod config;
mod core;
mod results;
mod settings;

pub use config::LayerSettings;
pub use self::core::PairTradingLayer;
pub use results::{ForwardResult, LayerError};
