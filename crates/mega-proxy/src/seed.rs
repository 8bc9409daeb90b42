//! Per-origin seed ledger of the proxy factory.
//!
//! The ledger lives in the storage of the factory account: the next seed of `origin` is kept at the
//! mapping slot `keccak256(leftpad32(origin) ‖ NEXT_SEEDS_SLOT)`. A slot that was never written
//! reads as [`INITIAL_SEED`](constants::v1::INITIAL_SEED). Host storage is journaled, so the seed
//! of a deployment that is reverted, at any call depth, is handed out again.

use alloy_primitives::{keccak256, Address, B256, U256};

use crate::{constants, FactoryError, Host};

/// A handle to the seed ledger of the factory at a given address.
///
/// Every origin owns an independent slot: advancing one origin never reads or writes another
/// origin's slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeedLedger {
    factory: Address,
}

impl SeedLedger {
    /// Returns the ledger of the factory at `factory`.
    pub const fn at(factory: Address) -> Self {
        Self { factory }
    }

    /// Returns the address of the factory owning the ledger.
    pub const fn factory(&self) -> Address {
        self.factory
    }

    /// Returns the seed the next deployment for `origin` will consume.
    pub fn next_seed<H: Host + ?Sized>(&self, host: &H, origin: Address) -> B256 {
        let stored = host.storage(self.factory, seed_slot(origin));
        if stored.is_zero() {
            constants::v1::INITIAL_SEED
        } else {
            stored.into()
        }
    }

    /// Consumes and returns the current seed of `origin`, then advances its slot by one.
    ///
    /// Fails with [`FactoryError::SeedExhausted`] if the current seed has no successor.
    pub fn advance<H: Host + ?Sized>(
        &self,
        host: &mut H,
        origin: Address,
    ) -> Result<B256, FactoryError> {
        let seed = self.next_seed(host, origin);
        let next = increment(seed).ok_or(FactoryError::SeedExhausted { origin })?;
        host.set_storage(self.factory, seed_slot(origin), U256::from_be_bytes(next.0));
        Ok(seed)
    }
}

/// Returns the storage slot of `key` in the mapping rooted at `slot`.
pub fn mapping_slot(key: Address, slot: U256) -> U256 {
    let mut preimage = [0u8; 64];
    preimage[..32].copy_from_slice(key.into_word().as_slice());
    preimage[32..].copy_from_slice(&slot.to_be_bytes::<32>());
    U256::from_be_bytes(keccak256(preimage).0)
}

/// Returns the factory storage slot holding the next seed of `origin`.
#[inline]
pub fn seed_slot(origin: Address) -> U256 {
    mapping_slot(origin, constants::v1::NEXT_SEEDS_SLOT)
}

/// Returns `seed + 1`, or `None` if `seed` is the largest 256-bit value.
#[inline]
pub fn increment(seed: B256) -> Option<B256> {
    U256::from_be_bytes(seed.0).checked_add(U256::from(1)).map(Into::into)
}
