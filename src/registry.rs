//! Proxy account registry.
//!
//! PartyA accounts belong to exactly one owner and carry a human-chosen name. PartyB
//! accounts are managed by an admin set and may be driven by any trusted address on their
//! allow-list. Account addresses are derived from the layer address and a nonce, so they
//! are unique and never reused.

use crate::types::{Address, Timestamp};
use alloy_primitives::keccak256;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountKind {
    PartyA,
    PartyB,
}

/// Who may drive an account. One forwarding path serves both kinds through this.
pub trait CallerPolicy {
    fn kind(&self) -> AccountKind;
    fn address(&self) -> Address;
    fn authorizes(&self, caller: Address) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyAAccount {
    pub account_address: Address,
    pub name: String,
    pub owner: Address,
    pub implementation_version: u32,
    pub created_at: Timestamp,
}

impl CallerPolicy for PartyAAccount {
    fn kind(&self) -> AccountKind {
        AccountKind::PartyA
    }

    fn address(&self) -> Address {
        self.account_address
    }

    fn authorizes(&self, caller: Address) -> bool {
        self.owner == caller
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyBAccount {
    pub account_address: Address,
    pub admins: BTreeSet<Address>,
    /// Allow-list in insertion order.
    pub trusted: Vec<Address>,
    pub implementation_version: u32,
    pub created_at: Timestamp,
}

impl PartyBAccount {
    pub fn is_admin(&self, address: Address) -> bool {
        self.admins.contains(&address)
    }

    pub fn is_trusted(&self, address: Address) -> bool {
        self.trusted.contains(&address)
    }
}

impl CallerPolicy for PartyBAccount {
    fn kind(&self) -> AccountKind {
        AccountKind::PartyB
    }

    fn address(&self) -> Address {
        self.account_address
    }

    fn authorizes(&self, caller: Address) -> bool {
        self.is_trusted(caller) || self.is_admin(caller)
    }
}

#[derive(Debug, Clone)]
pub struct AccountRegistry {
    deployer: Address,
    nonce: u64,
    party_a: HashMap<Address, PartyAAccount>,
    owned: HashMap<Address, Vec<Address>>,
    party_b: HashMap<Address, PartyBAccount>,
}

impl AccountRegistry {
    /// `deployer` is the layer's own address; account addresses derive from it.
    pub fn new(deployer: Address) -> Self {
        Self {
            deployer,
            nonce: 0,
            party_a: HashMap::new(),
            owned: HashMap::new(),
            party_b: HashMap::new(),
        }
    }

    // keccak(deployer ‖ nonce)[12..], the CREATE-style derivation
    fn next_address(&mut self) -> Address {
        self.nonce += 1;
        let mut preimage = Vec::with_capacity(20 + 8);
        preimage.extend_from_slice(self.deployer.as_slice());
        preimage.extend_from_slice(&self.nonce.to_be_bytes());
        Address::from_slice(&keccak256(&preimage)[12..])
    }

    pub fn create_party_a(
        &mut self,
        owner: Address,
        name: String,
        implementation_version: u32,
        now: Timestamp,
    ) -> &PartyAAccount {
        let account_address = self.next_address();
        self.owned.entry(owner).or_default().push(account_address);
        self.party_a.entry(account_address).or_insert(PartyAAccount {
            account_address,
            name,
            owner,
            implementation_version,
            created_at: now,
        })
    }

    pub fn rename_party_a(&mut self, caller: Address, account: Address, name: String) -> Result<(), RegistryError> {
        let entry = self
            .party_a
            .get_mut(&account)
            .ok_or(RegistryError::UnknownAccount(account))?;
        if entry.owner != caller {
            return Err(RegistryError::NotOwner { account, caller });
        }
        entry.name = name;
        Ok(())
    }

    pub fn create_party_b(
        &mut self,
        admin: Address,
        trusted: &[Address],
        implementation_version: u32,
        now: Timestamp,
    ) -> &PartyBAccount {
        let account_address = self.next_address();
        let mut list = Vec::with_capacity(trusted.len());
        for address in trusted {
            if !list.contains(address) {
                list.push(*address);
            }
        }
        self.party_b.entry(account_address).or_insert(PartyBAccount {
            account_address,
            admins: BTreeSet::from([admin]),
            trusted: list,
            implementation_version,
            created_at: now,
        })
    }

    /// Appends to the allow-list. Returns the addresses that were not already present.
    pub fn add_trusted(
        &mut self,
        caller: Address,
        account: Address,
        addresses: &[Address],
    ) -> Result<Vec<Address>, RegistryError> {
        let entry = self.party_b_admin_mut(caller, account)?;
        let mut added = Vec::new();
        for address in addresses {
            if !entry.trusted.contains(address) {
                entry.trusted.push(*address);
                added.push(*address);
            }
        }
        Ok(added)
    }

    /// Removes from the allow-list. Fails without touching the list if any address is absent.
    pub fn remove_trusted(
        &mut self,
        caller: Address,
        account: Address,
        addresses: &[Address],
    ) -> Result<(), RegistryError> {
        let entry = self.party_b_admin_mut(caller, account)?;
        let mut remaining = entry.trusted.clone();
        for address in addresses {
            let index = remaining
                .iter()
                .position(|a| a == address)
                .ok_or(RegistryError::TrustedAddressNotFound {
                    account,
                    address: *address,
                })?;
            remaining.remove(index);
        }
        entry.trusted = remaining;
        Ok(())
    }

    fn party_b_admin_mut(&mut self, caller: Address, account: Address) -> Result<&mut PartyBAccount, RegistryError> {
        let entry = self
            .party_b
            .get_mut(&account)
            .ok_or(RegistryError::UnknownAccount(account))?;
        if !entry.is_admin(caller) {
            return Err(RegistryError::NotAdmin { account, caller });
        }
        Ok(entry)
    }

    /// The account as a caller policy, checked against the expected kind.
    pub fn resolve(&self, kind: AccountKind, account: Address) -> Result<&dyn CallerPolicy, RegistryError> {
        match kind {
            AccountKind::PartyA => self
                .party_a
                .get(&account)
                .map(|a| a as &dyn CallerPolicy)
                .ok_or(RegistryError::UnknownAccount(account)),
            AccountKind::PartyB => self
                .party_b
                .get(&account)
                .map(|b| b as &dyn CallerPolicy)
                .ok_or(RegistryError::UnknownAccount(account)),
        }
    }

    pub fn authorize(&self, kind: AccountKind, account: Address, caller: Address) -> Result<(), RegistryError> {
        let policy = self.resolve(kind, account)?;
        if policy.authorizes(caller) {
            Ok(())
        } else {
            Err(RegistryError::NotAuthorized { account, caller })
        }
    }

    /// Authorize against whichever kind the account is.
    pub fn authorize_any(&self, account: Address, caller: Address) -> Result<AccountKind, RegistryError> {
        let kind = self.kind_of(account).ok_or(RegistryError::UnknownAccount(account))?;
        self.authorize(kind, account, caller)?;
        Ok(kind)
    }

    pub fn kind_of(&self, account: Address) -> Option<AccountKind> {
        if self.party_a.contains_key(&account) {
            Some(AccountKind::PartyA)
        } else if self.party_b.contains_key(&account) {
            Some(AccountKind::PartyB)
        } else {
            None
        }
    }

    pub fn get_accounts(&self, owner: Address, offset: usize, limit: usize) -> Vec<PartyAAccount> {
        self.owned
            .get(&owner)
            .map(|list| {
                list.iter()
                    .skip(offset)
                    .take(limit)
                    .filter_map(|a| self.party_a.get(a).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn accounts_len(&self, owner: Address) -> usize {
        self.owned.get(&owner).map_or(0, Vec::len)
    }

    pub fn party_a(&self, account: Address) -> Option<&PartyAAccount> {
        self.party_a.get(&account)
    }

    pub fn party_b(&self, account: Address) -> Option<&PartyBAccount> {
        self.party_b.get(&account)
    }

    pub fn party_a_owner(&self, account: Address) -> Option<Address> {
        self.party_a.get(&account).map(|a| a.owner)
    }

    pub fn is_trusted(&self, account: Address, address: Address) -> bool {
        self.party_b.get(&account).is_some_and(|b| b.is_trusted(address))
    }

    pub fn is_admin(&self, account: Address, address: Address) -> bool {
        self.party_b.get(&account).is_some_and(|b| b.is_admin(address))
    }

    pub fn trusted_at(&self, account: Address, index: usize) -> Option<Address> {
        self.party_b.get(&account).and_then(|b| b.trusted.get(index).copied())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("MultiAccount: account {0} not found")]
    UnknownAccount(Address),

    #[error("MultiAccount: {caller} is not the owner of {account}")]
    NotOwner { account: Address, caller: Address },

    #[error("MultiAccount: {caller} is not an admin of {account}")]
    NotAdmin { account: Address, caller: Address },

    #[error("MultiAccount: {caller} is not authorized to act for {account}")]
    NotAuthorized { account: Address, caller: Address },

    #[error("MultiAccount: Trusted address not found!")]
    TrustedAddressNotFound { account: Address, address: Address },
}
