//! Capability sets gating mutating operations.
//!
//! Each contract instance owns a [`Roles`] table mapping account identities to
//! the capabilities they hold. The deploying account receives every
//! capability at construction; afterwards only Managers may grant more.

use crate::address::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Holds and receives funds (token allocations, native proceeds).
    Fundkeeper,
    /// Administers the contract: whitelists, allocations, rebases, grants.
    Manager,
    /// Sweeps leftover tokens once the contract has ended.
    Recoverer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Fundkeeper, Role::Manager, Role::Recoverer];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Fundkeeper => "fundkeeper",
            Role::Manager => "manager",
            Role::Recoverer => "recoverer",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoleError {
    #[error("account {account} lacks the {role} role")]
    Missing { account: Address, role: Role },
    #[error("roles cannot be granted to the zero address")]
    ZeroAddress,
}

/// Capability table for one contract instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roles {
    members: HashMap<Address, BTreeSet<Role>>,
}

impl Roles {
    /// Grant every role to the deploying account.
    pub fn with_deployer(deployer: Address) -> Self {
        let mut members = HashMap::new();
        members.insert(deployer, Role::ALL.into_iter().collect());
        Self { members }
    }

    pub fn has(&self, account: &Address, role: Role) -> bool {
        self.members
            .get(account)
            .is_some_and(|roles| roles.contains(&role))
    }

    /// Fail with [`RoleError::Missing`] unless `account` holds `role`.
    pub fn require(&self, account: &Address, role: Role) -> Result<(), RoleError> {
        if self.has(account, role) {
            Ok(())
        } else {
            Err(RoleError::Missing {
                account: *account,
                role,
            })
        }
    }

    /// Manager-only: give `account` the `role` capability.
    pub fn grant(&mut self, caller: &Address, account: Address, role: Role) -> Result<(), RoleError> {
        self.require(caller, Role::Manager)?;
        if account.is_zero() {
            return Err(RoleError::ZeroAddress);
        }
        let inserted = self.members.entry(account).or_default().insert(role);
        if inserted {
            info!(target: "roles", %account, %role, granted_by = %caller, "Role granted");
        }
        Ok(())
    }

    /// Roles currently held by `account`.
    pub fn roles_of(&self, account: &Address) -> Vec<Role> {
        self.members
            .get(account)
            .map(|roles| roles.iter().copied().collect())
            .unwrap_or_default()
    }
}
