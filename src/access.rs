//! Role-based access control.
//!
//! Each role has an admin role whose holders may grant and revoke it. Unless changed, the
//! admin of every role is `Role::DEFAULT_ADMIN`.

use crate::types::{Address, Role};
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct AccessControl {
    members: HashMap<Role, HashSet<Address>>,
    admins: HashMap<Role, Role>,
}

/// What a grant or revoke actually changed. No-ops are reported so callers can skip events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    Changed,
    Unchanged,
}

impl AccessControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry where `admin` holds every built-in role.
    #[cfg(test)]
    pub fn with_admin(admin: Address) -> Self {
        let mut access = Self::new();
        for role in Role::builtin() {
            access.grant_unchecked(role, admin);
        }
        access
    }

    pub fn has_role(&self, role: Role, account: Address) -> bool {
        self.members
            .get(&role)
            .is_some_and(|set| set.contains(&account))
    }

    pub fn require(&self, role: Role, account: Address) -> Result<(), AccessError> {
        if self.has_role(role, account) {
            Ok(())
        } else {
            Err(AccessError::MissingRole { account, role })
        }
    }

    pub fn role_admin(&self, role: Role) -> Role {
        self.admins.get(&role).copied().unwrap_or(Role::DEFAULT_ADMIN)
    }

    pub(crate) fn set_role_admin(&mut self, role: Role, admin_role: Role) {
        self.admins.insert(role, admin_role);
    }

    pub fn grant(&mut self, caller: Address, role: Role, account: Address) -> Result<RoleChange, AccessError> {
        self.require(self.role_admin(role), caller)?;
        Ok(self.grant_unchecked(role, account))
    }

    pub fn revoke(&mut self, caller: Address, role: Role, account: Address) -> Result<RoleChange, AccessError> {
        self.require(self.role_admin(role), caller)?;
        Ok(self.revoke_unchecked(role, account))
    }

    /// A holder dropping its own membership.
    pub fn renounce(&mut self, caller: Address, role: Role) -> RoleChange {
        self.revoke_unchecked(role, caller)
    }

    pub fn members_of(&self, role: Role) -> Vec<Address> {
        self.members
            .get(&role)
            .map(|set| set.iter().copied().collect::<BTreeSet<_>>().into_iter().collect())
            .unwrap_or_default()
    }

    pub(crate) fn grant_unchecked(&mut self, role: Role, account: Address) -> RoleChange {
        if self.members.entry(role).or_default().insert(account) {
            RoleChange::Changed
        } else {
            RoleChange::Unchanged
        }
    }

    fn revoke_unchecked(&mut self, role: Role, account: Address) -> RoleChange {
        match self.members.get_mut(&role) {
            Some(set) => {
                if set.remove(&account) {
                    RoleChange::Changed
                } else {
                    RoleChange::Unchanged
                }
            }
            None => RoleChange::Unchanged,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("AccessControl: account {account} is missing role {role}")]
    MissingRole { account: Address, role: Role },
}
