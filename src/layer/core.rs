// 6.0 layer/core.rs: main layer. holds every component, the host it lives in, and the event log.

use super::config::LayerSettings;
use super::results::LayerError;
use crate::access::{AccessControl, RoleChange};
use crate::events::{Event, EventId, EventPayload};
use crate::pairing::PairBook;
use crate::policy::SelectorPolicy;
use crate::protocol::{Host, ProtocolInterface};
use crate::registry::AccountRegistry;
use crate::types::{Address, Role, Timestamp};
use alloy_primitives::B256;
use tracing::{debug, info, warn};

/** 6.1: main layer struct. all state lives here, including the host so that a revert can roll it back */
#[derive(Debug, Clone)]
pub struct PairTradingLayer<H> {
    pub(super) address: Address,
    pub(super) settings: LayerSettings,
    pub(super) access: AccessControl,
    pub(super) registry: AccountRegistry,
    pub(super) policy: SelectorPolicy,
    pub(super) pairs: PairBook,
    pub(super) host: H,
    pub(super) symmio: Address,
    pub(super) paused: bool,
    pub(super) implementation: Option<B256>,
    pub(super) implementation_version: u32,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) current_time: Timestamp,
}

impl<H: Host + Clone> PairTradingLayer<H> {
    /// Initialize a layer living at `address`. `admin` receives every built-in role.
    pub fn new(
        address: Address,
        admin: Address,
        symmio: Address,
        host: H,
        interface: ProtocolInterface,
        settings: LayerSettings,
    ) -> Self {
        let mut layer = Self {
            address,
            settings,
            access: AccessControl::new(),
            registry: AccountRegistry::new(address),
            policy: SelectorPolicy::new(interface),
            pairs: PairBook::new(),
            host,
            symmio,
            paused: false,
            implementation: None,
            implementation_version: 0,
            events: Vec::new(),
            next_event_id: 1,
            current_time: Timestamp::from_millis(0),
        };

        for role in Role::builtin() {
            layer.access.set_role_admin(role, Role::DEFAULT_ADMIN);
            if layer.access.grant_unchecked(role, admin) == RoleChange::Changed {
                layer.emit_event(EventPayload::RoleGranted {
                    role,
                    account: admin,
                    sender: admin,
                });
            }
        }

        info!(layer = %address, admin = %admin, symmio = %symmio, "pair trading layer initialized");
        layer
    }

    /// Layer over the default protocol interface and settings.
    pub fn with_defaults(address: Address, admin: Address, symmio: Address, host: H) -> Self {
        Self::new(
            address,
            admin,
            symmio,
            host,
            ProtocolInterface::symmio(),
            LayerSettings::default(),
        )
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = Timestamp::from_millis(self.current_time.as_millis() + millis);
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn symmio_address(&self) -> Address {
        self.symmio
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    // direct chain access, outside any layer transaction
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    pub fn registry(&self) -> &AccountRegistry {
        &self.registry
    }

    pub fn policy(&self) -> &SelectorPolicy {
        &self.policy
    }

    pub fn pairs(&self) -> &PairBook {
        &self.pairs
    }

    pub fn settings(&self) -> &LayerSettings {
        &self.settings
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn implementation(&self) -> Option<(u32, B256)> {
        self.implementation.map(|hash| (self.implementation_version, hash))
    }

    pub fn has_role(&self, role: Role, account: Address) -> bool {
        self.access.has_role(role, account)
    }

    /// Role whose holders may grant and revoke `role`.
    pub fn role_admin(&self, role: Role) -> Role {
        self.access.role_admin(role)
    }

    pub fn role_members(&self, role: Role) -> Vec<Address> {
        self.access.members_of(role)
    }

    pub fn grant_role(&mut self, caller: Address, role: Role, account: Address) -> Result<(), LayerError> {
        self.atomic(|layer| {
            if layer.access.grant(caller, role, account)? == RoleChange::Changed {
                layer.emit_event(EventPayload::RoleGranted {
                    role,
                    account,
                    sender: caller,
                });
            }
            Ok(())
        })
    }

    pub fn revoke_role(&mut self, caller: Address, role: Role, account: Address) -> Result<(), LayerError> {
        self.atomic(|layer| {
            if layer.access.revoke(caller, role, account)? == RoleChange::Changed {
                layer.emit_event(EventPayload::RoleRevoked {
                    role,
                    account,
                    sender: caller,
                });
            }
            Ok(())
        })
    }

    pub fn renounce_role(&mut self, caller: Address, role: Role) {
        if self.access.renounce(caller, role) == RoleChange::Changed {
            self.emit_event(EventPayload::RoleRevoked {
                role,
                account: caller,
                sender: caller,
            });
        }
    }

    pub fn pause(&mut self, caller: Address) -> Result<(), LayerError> {
        self.atomic(|layer| {
            layer.access.require(Role::pauser(), caller)?;
            layer.require_not_paused()?;
            layer.paused = true;
            layer.emit_event(EventPayload::Paused { by: caller });
            Ok(())
        })
    }

    pub fn unpause(&mut self, caller: Address) -> Result<(), LayerError> {
        self.atomic(|layer| {
            layer.access.require(Role::unpauser(), caller)?;
            if !layer.paused {
                return Err(LayerError::NotPaused);
            }
            layer.paused = false;
            layer.emit_event(EventPayload::Unpaused { by: caller });
            Ok(())
        })
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub(super) fn require_not_paused(&self) -> Result<(), LayerError> {
        if self.paused {
            Err(LayerError::Paused)
        } else {
            Ok(())
        }
    }

    // 6.2: one transaction. the layer (host included) is snapshotted and restored on any error,
    // so a failed batch leaves accounts, pairs, events and protocol state exactly as they were.
    pub(super) fn atomic<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, LayerError>,
    ) -> Result<T, LayerError> {
        let snapshot = self.clone();
        match op(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(layer = %self.address, error = %err, "transaction reverted");
                *self = snapshot;
                Err(err)
            }
        }
    }

    // relay a payload to the protocol with `sender` as the caller it observes
    pub(super) fn relay(&mut self, sender: Address, calldata: &[u8]) -> Result<Vec<u8>, LayerError> {
        let target = self.symmio;
        Ok(self.host.call(sender, target, calldata)?)
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        debug!(id = event.id.0, kind = event.payload.kind(), "event");

        self.events.push(event);

        if self.events.len() > self.settings.max_events {
            let drain_count = self.events.len() - self.settings.max_events;
            self.events.drain(0..drain_count);
        }
    }
}
