// 6.3 layer/accounts.rs: account lifecycle. PartyA accounts are self-service, PartyB accounts
// are created by a manager and driven by their allow-list.

use super::core::PairTradingLayer;
use super::results::LayerError;
use crate::events::{EventPayload, PartyAAccountCreatedEvent, PartyBAccountCreatedEvent};
use crate::protocol::Host;
use crate::registry::{AccountKind, PartyAAccount, PartyBAccount};
use crate::types::{Address, Role};
use tracing::info;

impl<H: Host + Clone> PairTradingLayer<H> {
    pub fn create_party_a_account(&mut self, caller: Address, name: impl Into<String>) -> Result<Address, LayerError> {
        let name = name.into();
        self.atomic(|layer| {
            layer.require_not_paused()?;
            let (version, now) = (layer.implementation_version, layer.current_time);
            let account = layer
                .registry
                .create_party_a(caller, name.clone(), version, now)
                .account_address;

            layer.emit_event(EventPayload::PartyAAccountCreated(PartyAAccountCreatedEvent {
                owner: caller,
                account,
                name,
            }));
            info!(owner = %caller, account = %account, "party A account created");
            Ok(account)
        })
    }

    pub fn edit_party_a_account_name(
        &mut self,
        caller: Address,
        account: Address,
        name: impl Into<String>,
    ) -> Result<(), LayerError> {
        let name = name.into();
        self.atomic(|layer| {
            layer.require_not_paused()?;
            layer.registry.rename_party_a(caller, account, name.clone())?;
            layer.emit_event(EventPayload::PartyAAccountRenamed { account, name });
            Ok(())
        })
    }

    pub fn create_party_b_account(&mut self, caller: Address, trusted: &[Address]) -> Result<Address, LayerError> {
        self.atomic(|layer| {
            layer.require_not_paused()?;
            layer.access.require(Role::party_b_manager(), caller)?;

            let (version, now) = (layer.implementation_version, layer.current_time);
            let created = layer.registry.create_party_b(caller, trusted, version, now);
            let account = created.account_address;
            let trusted = created.trusted.clone();

            layer.emit_event(EventPayload::PartyBAccountCreated(PartyBAccountCreatedEvent {
                admin: caller,
                account,
                trusted,
            }));
            info!(admin = %caller, account = %account, "party B account created");
            Ok(account)
        })
    }

    /// Appends to a PartyB allow-list. Addresses already on it are skipped.
    pub fn add_trusted_addresses(
        &mut self,
        caller: Address,
        account: Address,
        addresses: &[Address],
    ) -> Result<(), LayerError> {
        self.atomic(|layer| {
            layer.require_not_paused()?;
            let added = layer.registry.add_trusted(caller, account, addresses)?;
            for address in added {
                layer.emit_event(EventPayload::TrustedAddressAdded { account, address });
            }
            Ok(())
        })
    }

    /// Removes from a PartyB allow-list. One absent address fails the whole call.
    pub fn remove_trusted_addresses(
        &mut self,
        caller: Address,
        account: Address,
        addresses: &[Address],
    ) -> Result<(), LayerError> {
        self.atomic(|layer| {
            layer.require_not_paused()?;
            layer.registry.remove_trusted(caller, account, addresses)?;
            for address in addresses {
                layer.emit_event(EventPayload::TrustedAddressRemoved {
                    account,
                    address: *address,
                });
            }
            Ok(())
        })
    }

    pub fn get_accounts(&self, owner: Address, offset: usize, limit: usize) -> Vec<PartyAAccount> {
        self.registry.get_accounts(owner, offset, limit)
    }

    pub fn accounts_len(&self, owner: Address) -> usize {
        self.registry.accounts_len(owner)
    }

    pub fn party_a_account(&self, account: Address) -> Option<&PartyAAccount> {
        self.registry.party_a(account)
    }

    pub fn party_b_account(&self, account: Address) -> Option<&PartyBAccount> {
        self.registry.party_b(account)
    }

    pub fn party_a_owner(&self, account: Address) -> Option<Address> {
        self.registry.party_a_owner(account)
    }

    pub fn is_trusted(&self, account: Address, address: Address) -> bool {
        self.registry.is_trusted(account, address)
    }

    pub fn is_party_b_admin(&self, account: Address, address: Address) -> bool {
        self.registry.is_admin(account, address)
    }

    pub fn trusted_at(&self, account: Address, index: usize) -> Option<Address> {
        self.registry.trusted_at(account, index)
    }

    pub fn account_kind(&self, account: Address) -> Option<AccountKind> {
        self.registry.kind_of(account)
    }
}
