//! Per-proxy state: the owner and the envoy permission table.

use alloy_primitives::{map::HashMap, Address, Selector};

use crate::constants;

/// Key of a permission entry: an envoy may call `selector` on `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PermissionKey {
    /// The delegated caller
    pub envoy: Address,
    /// The contract the envoy may forward calls to
    pub target: Address,
    /// The function the envoy may invoke on `target`
    pub selector: Selector,
}

impl PermissionKey {
    /// Creates a new permission key.
    pub const fn new(envoy: Address, target: Address, selector: Selector) -> Self {
        Self { envoy, target, selector }
    }
}

/// The state owned by a single proxy account.
///
/// A record without owner is *uninitialized*; setting the owner the first time makes it *active*.
/// The transition happens once and is never undone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRecord {
    owner: Option<Address>,
    /// Absent entries read as `false`.
    permissions: HashMap<PermissionKey, bool>,
    min_gas_reserve: u64,
}

impl Default for ProxyRecord {
    fn default() -> Self {
        Self {
            owner: None,
            permissions: HashMap::default(),
            min_gas_reserve: constants::v1::DEFAULT_MIN_GAS_RESERVE,
        }
    }
}

impl ProxyRecord {
    /// Returns the owner, or `None` if the proxy is uninitialized.
    pub const fn owner(&self) -> Option<Address> {
        self.owner
    }

    /// Returns the owner, reading the zero address for an uninitialized proxy.
    pub fn owner_or_zero(&self) -> Address {
        self.owner.unwrap_or_default()
    }

    /// Returns whether the owner has been set.
    pub const fn is_initialized(&self) -> bool {
        self.owner.is_some()
    }

    /// Returns whether `address` is the owner.
    pub fn is_owner(&self, address: Address) -> bool {
        self.owner == Some(address)
    }

    /// Overwrites the owner.
    pub fn set_owner(&mut self, owner: Address) {
        self.owner = Some(owner);
    }

    /// Returns whether `key.envoy` may call `key.selector` on `key.target`.
    pub fn permission(&self, key: &PermissionKey) -> bool {
        self.permissions.get(key).copied().unwrap_or(false)
    }

    /// Overwrites a permission entry.
    ///
    /// Revoking drops the entry, since an absent entry already reads as `false`.
    pub fn set_permission(&mut self, key: PermissionKey, allowed: bool) {
        if allowed {
            self.permissions.insert(key, true);
        } else {
            self.permissions.remove(&key);
        }
    }

    /// Returns the number of granted permissions.
    pub fn granted_permissions(&self) -> usize {
        self.permissions.len()
    }

    /// Returns the gas kept back when forwarding calls.
    pub const fn min_gas_reserve(&self) -> u64 {
        self.min_gas_reserve
    }

    /// Overwrites the gas kept back when forwarding calls.
    pub fn set_min_gas_reserve(&mut self, min_gas_reserve: u64) {
        self.min_gas_reserve = min_gas_reserve;
    }
}
