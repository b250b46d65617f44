// pair-layer: proxy sub-accounts over a perpetuals protocol, with paired-quote forwarding.
// the forwarder is the core: batches go out as the account, and two quotes minted together
// stay locked together for every tracked lifecycle step afterwards.
// all computation is deterministic; the chain is whatever implements Host.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Selector, QuoteId, Amount, Role, Timestamp
//   1.6  abi.rs: signature parsing, argument head offsets
//   2.x  protocol.rs: sol! call shapes, Host trait, protocol interface
//   3.x  pairing.rs: pair book and the batch completeness gate
//   4.x  events.rs: state transition events
//   5.x  config.rs: policy bootstrap config, presets, JSON
//   6.x  layer/: the layer: accounts, forwarding, balances, settings
//   7.x  access.rs: role registry
//   8.x  registry.rs: PartyA / PartyB account registry
//   8.5  policy.rs: selector policy store, tracked-argument decoders
//   9.x  mock.rs: in-memory chain with collateral and protocol (mocked)

// core modules
pub mod layer;
pub mod pairing;
pub mod policy;
pub mod registry;
pub mod types;

// support modules
pub mod abi;
pub mod access;
pub mod config;
pub mod events;
pub mod protocol;

// integration modules
pub mod mock;

// re exports for convenience
pub use events::*;
pub use types::*;
pub use access::{AccessControl, AccessError, RoleChange};
pub use config::{ConditionEntry, ConfigError, LayerConfig, PairOpsEntry};
pub use layer::{ForwardResult, LayerError, LayerSettings, PairTradingLayer};
pub use mock::{SimulatedChain, COLLATERAL_ADDRESS, SYMMIO_ADDRESS};
pub use pairing::{BatchPlan, PairBook, PairingError, MAX_SEND_QUOTES};
pub use policy::{AdditionalCondition, DecodeError, PolicyError, SelectorPolicy, TrackedArg};
pub use protocol::{Host, ProtocolInterface, Revert, IERC20, ISymmio};
pub use registry::{AccountKind, AccountRegistry, CallerPolicy, PartyAAccount, PartyBAccount, RegistryError};
