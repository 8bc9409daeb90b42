//! Deterministic proxy address derivation.
//!
//! A proxy address is fully determined by the factory address, the origin that requests the
//! deployment and the origin's current seed:
//!
//! ```text
//! salt    = keccak256(leftpad32(origin) ‖ seed)
//! address = keccak256(0xff ‖ factory ‖ salt ‖ keccak256(PROXY_INIT_CODE))[12:]
//! ```
//!
//! The second step is the `CREATE2` addressing rule, so an off-chain observer holding the seed
//! returned by `getNextSeed` can compute the address before the deployment is submitted.

use alloy_primitives::{keccak256, Address, B256};

use crate::constants;

/// Computes the deployment key (`CREATE2` salt) for a given origin and seed.
///
/// This is `keccak256(abi.encode(origin, seed))`.
pub fn deployment_key(origin: Address, seed: B256) -> B256 {
    let mut preimage = [0u8; 64];
    preimage[..32].copy_from_slice(origin.into_word().as_slice());
    preimage[32..].copy_from_slice(seed.as_slice());
    keccak256(preimage)
}

/// Computes the address of an account instantiated by `factory` with the given deployment key and
/// init code hash.
#[inline]
pub fn derive_proxy_address(factory: Address, salt: B256, init_code_hash: B256) -> Address {
    factory.create2(salt, init_code_hash)
}

/// Returns the hash of the proxy creation code.
#[inline]
pub fn proxy_init_code_hash() -> B256 {
    keccak256(constants::v1::PROXY_INIT_CODE)
}

/// Predicts the proxy address `factory` deploys for `origin` when consuming `seed`.
pub fn predict_proxy_address(factory: Address, origin: Address, seed: B256) -> Address {
    derive_proxy_address(factory, deployment_key(origin, seed), proxy_init_code_hash())
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, b256, bytes, U256};

    use super::*;

    const FACTORY: Address = address!("0000000000000000000000000000000000fac701");
    const ORIGIN: Address = address!("0000000000000000000000000000000000000aaa");

    #[test]
    fn test_deployment_key_matches_abi_encoding() {
        let seed = B256::from(U256::from(7));
        let mut encoded = Vec::new();
        encoded.extend_from_slice(&[0u8; 12]);
        encoded.extend_from_slice(ORIGIN.as_slice());
        encoded.extend_from_slice(seed.as_slice());
        assert_eq!(deployment_key(ORIGIN, seed), keccak256(encoded));
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let seed = constants::v1::INITIAL_SEED;
        assert_eq!(
            predict_proxy_address(FACTORY, ORIGIN, seed),
            predict_proxy_address(FACTORY, ORIGIN, seed)
        );
    }

    #[test]
    fn test_derivation_separates_inputs() {
        let seed_one = B256::from(U256::from(1));
        let seed_two = B256::from(U256::from(2));
        let other_origin = address!("0000000000000000000000000000000000000bbb");
        let other_factory = address!("0000000000000000000000000000000000fac702");

        let base = predict_proxy_address(FACTORY, ORIGIN, seed_one);
        assert_ne!(base, predict_proxy_address(FACTORY, ORIGIN, seed_two));
        assert_ne!(base, predict_proxy_address(FACTORY, other_origin, seed_one));
        assert_ne!(base, predict_proxy_address(other_factory, ORIGIN, seed_one));
    }

    #[test]
    fn test_create2_rule() {
        // EIP-1014 example 5
        let factory = address!("00000000000000000000000000000000deadbeef");
        let salt = b256!("00000000000000000000000000000000000000000000000000000000cafebabe");
        let init_code = bytes!("deadbeef");
        assert_eq!(
            derive_proxy_address(factory, salt, keccak256(&init_code)),
            address!("60f3f640a8508fC6a86d45DF051962668E1e8AC7")
        );
    }
}
