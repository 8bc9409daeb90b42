//! Protocol constants for the proxy factory and the proxy accounts it deploys.

/// Constants shared by every protocol revision.
pub mod common {
    /// Maximum call depth of the execution environment.
    pub const CALL_STACK_LIMIT: usize = 1024;
}

/// Constants of the first protocol revision.
pub mod v1 {
    use alloy_primitives::{b256, bytes, Bytes, B256, U256};

    /// The version reported by `IProxyFactory.version()`.
    pub const FACTORY_VERSION: u64 = 1;

    /// The seed consumed by the first deployment of every origin.
    pub const INITIAL_SEED: B256 =
        b256!("0000000000000000000000000000000000000000000000000000000000000001");

    /// The gas a proxy keeps for itself when forwarding a call, so that it can still process the
    /// result and emit its event afterwards.
    pub const DEFAULT_MIN_GAS_RESERVE: u64 = 5_000;

    /// Runtime code stored at every proxy address.
    ///
    /// Calls to proxy accounts are intercepted and served natively, so the stored code is a stub
    /// that reverts when interpreted: `PUSH1 0x00 PUSH1 0x00 REVERT`.
    pub const PROXY_RUNTIME_CODE: Bytes = bytes!("60006000fd");

    /// Creation code of a proxy account. Copies [`PROXY_RUNTIME_CODE`] to memory and returns it.
    ///
    /// Its hash is one of the inputs of the `CREATE2` address derivation, so changing it changes
    /// every proxy address.
    pub const PROXY_INIT_CODE: Bytes = bytes!("6005600c60003960056000f360006000fd");

    /// Factory storage slot of the `origin => next seed` mapping.
    pub const NEXT_SEEDS_SLOT: U256 = U256::ZERO;

    /// Factory storage slot of the `proxy => deployed` mapping.
    pub const PROXIES_SLOT: U256 = U256::from_limbs([1, 0, 0, 0]);

    /// Factory storage slot holding the number of deployed proxies.
    pub const PROXY_COUNT_SLOT: U256 = U256::from_limbs([2, 0, 0, 0]);
}
