//! Error types of the proxy factory and the proxy.

use alloy_primitives::{Address, Bytes, Selector, B256};
use alloy_sol_types::SolError;

use crate::{IProxy, IProxyFactory};

/// Errors raised by proxy entry points.
///
/// These map directly to the Solidity errors defined in `IProxy`, except for
/// [`ProxyError::TargetCallFailed`] which re-raises the target's own revert payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProxyError {
    /// The proxy already has an owner.
    #[error("proxy already initialized with owner {owner}")]
    AlreadyInitialized {
        /// The current owner
        owner: Address,
    },
    /// The account being initialized holds no code.
    #[error("no proxy deployed at {proxy}")]
    NotDeployed {
        /// The account being initialized
        proxy: Address,
    },
    /// The caller is not the owner of the proxy.
    #[error("caller {caller} is not the owner {owner}")]
    NotOwner {
        /// The current owner, zero if the proxy is uninitialized
        owner: Address,
        /// The caller of the owner-only operation
        caller: Address,
    },
    /// The caller is neither the owner nor an envoy permitted for `(target, selector)`.
    #[error("caller {caller} is not authorized to call {selector} on {target} (owner {owner})")]
    Unauthorized {
        /// The current owner, zero if the proxy is uninitialized
        owner: Address,
        /// The rejected caller
        caller: Address,
        /// The requested target
        target: Address,
        /// The requested function selector
        selector: Selector,
    },
    /// The target has no code.
    #[error("target {target} has no code")]
    TargetInvalid {
        /// The requested target
        target: Address,
    },
    /// The caller did not provide enough gas to forward the call safely.
    #[error(
        "insufficient gas for call: available {gas_available}, reserve {gas_reserve}, used {gas_used}"
    )]
    InsufficientGasForCall {
        /// Gas available to the proxy frame before forwarding
        gas_available: u64,
        /// Gas the proxy keeps for itself
        gas_reserve: u64,
        /// Gas consumed by the forwarded call
        gas_used: u64,
    },
    /// The target executed and signaled failure.
    #[error("target call failed with output {output:?} after using {gas_used} gas")]
    TargetCallFailed {
        /// The target's revert payload, possibly empty
        output: Bytes,
        /// Gas consumed by the forwarded call
        gas_used: u64,
    },
    /// The owner was changed by the target while the call was forwarded.
    #[error("owner changed from {old_owner} to {new_owner} during execution")]
    OwnerChanged {
        /// The owner before the forwarded call
        old_owner: Address,
        /// The owner after the forwarded call
        new_owner: Address,
        /// Gas consumed by the forwarded call
        gas_used: u64,
    },
}

impl ProxyError {
    /// Returns the gas consumed by the forwarded call, zero if the call was never forwarded.
    pub const fn gas_used(&self) -> u64 {
        match self {
            Self::InsufficientGasForCall { gas_used, .. }
            | Self::TargetCallFailed { gas_used, .. }
            | Self::OwnerChanged { gas_used, .. } => *gas_used,
            _ => 0,
        }
    }

    /// Encodes the error as the revert data a proxy account returns.
    ///
    /// [`ProxyError::TargetCallFailed`] bubbles the target payload up unmodified, falling back to
    /// `ExecutionReverted()` when the target reverted without data.
    pub fn abi_revert_data(&self) -> Bytes {
        match self {
            Self::AlreadyInitialized { owner } => {
                IProxy::AlreadyInitialized { owner: *owner }.abi_encode().into()
            }
            Self::NotDeployed { proxy } => {
                IProxy::ProxyNotDeployed { proxy: *proxy }.abi_encode().into()
            }
            Self::NotOwner { owner, caller } => {
                IProxy::NotOwner { owner: *owner, caller: *caller }.abi_encode().into()
            }
            Self::Unauthorized { owner, caller, target, selector } => {
                IProxy::ExecutionNotAuthorized {
                    owner: *owner,
                    caller: *caller,
                    target: *target,
                    selector: *selector,
                }
                .abi_encode()
                .into()
            }
            Self::TargetInvalid { target } => {
                IProxy::TargetInvalid { target: *target }.abi_encode().into()
            }
            Self::InsufficientGasForCall { gas_available, gas_reserve, gas_used } => {
                IProxy::InsufficientGasForCall {
                    gasAvailable: *gas_available,
                    gasReserve: *gas_reserve,
                    gasUsed: *gas_used,
                }
                .abi_encode()
                .into()
            }
            Self::TargetCallFailed { output, .. } if !output.is_empty() => output.clone(),
            Self::TargetCallFailed { .. } => IProxy::ExecutionReverted {}.abi_encode().into(),
            Self::OwnerChanged { old_owner, new_owner, .. } => {
                IProxy::OwnerChanged { oldOwner: *old_owner, newOwner: *new_owner }
                    .abi_encode()
                    .into()
            }
        }
    }
}

/// Errors raised by the proxy factory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FactoryError {
    /// The environment did not instantiate the proxy, e.g. the address is already taken.
    #[error("proxy deployment failed for salt {salt}")]
    DeploymentFailed {
        /// The deployment key used
        salt: B256,
    },
    /// The environment instantiated the proxy at an unexpected address.
    #[error("proxy deployed at {actual}, expected {expected}")]
    AddressMismatch {
        /// The predicted address
        expected: Address,
        /// The address returned by the environment
        actual: Address,
    },
    /// The initialization call that sets the owner did not succeed.
    #[error("owner initialization of proxy {proxy} failed with output {output:?}")]
    OwnerInitFailed {
        /// The freshly deployed proxy
        proxy: Address,
        /// The revert data of the initialization call
        output: Bytes,
    },
    /// The seed of the origin has no successor, so it cannot be consumed.
    #[error("seed of origin {origin} is exhausted")]
    SeedExhausted {
        /// The transaction origin
        origin: Address,
    },
}

impl FactoryError {
    /// Encodes the error as ABI revert data.
    pub fn abi_revert_data(&self) -> Bytes {
        match self {
            Self::DeploymentFailed { salt } => {
                IProxyFactory::DeploymentFailed { salt: *salt }.abi_encode().into()
            }
            Self::AddressMismatch { expected, actual } => {
                IProxyFactory::ProxyAddressMismatch { expected: *expected, actual: *actual }
                    .abi_encode()
                    .into()
            }
            Self::OwnerInitFailed { proxy, output } => {
                IProxyFactory::OwnerInitFailed { proxy: *proxy, output: output.clone() }
                    .abi_encode()
                    .into()
            }
            Self::SeedExhausted { origin } => {
                IProxyFactory::SeedExhausted { origin: *origin }.abi_encode().into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, bytes, fixed_bytes};

    use super::*;

    #[test]
    fn test_target_failure_payload_is_bubbled_verbatim() {
        let payload = bytes!("08c379a0deadbeef");
        let error = ProxyError::TargetCallFailed { output: payload.clone(), gas_used: 21 };
        assert_eq!(error.abi_revert_data(), payload);
    }

    #[test]
    fn test_empty_target_failure_maps_to_execution_reverted() {
        let error = ProxyError::TargetCallFailed { output: Bytes::new(), gas_used: 0 };
        let data = error.abi_revert_data();
        assert_eq!(data[..4], IProxy::ExecutionReverted::SELECTOR);
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn test_unauthorized_encodes_full_context() {
        let error = ProxyError::Unauthorized {
            owner: address!("00000000000000000000000000000000000000aa"),
            caller: address!("00000000000000000000000000000000000000bb"),
            target: address!("00000000000000000000000000000000000000cc"),
            selector: fixed_bytes!("12345678"),
        };
        let decoded =
            IProxy::ExecutionNotAuthorized::abi_decode(&error.abi_revert_data(), true).unwrap();
        assert_eq!(decoded.owner, address!("00000000000000000000000000000000000000aa"));
        assert_eq!(decoded.caller, address!("00000000000000000000000000000000000000bb"));
        assert_eq!(decoded.target, address!("00000000000000000000000000000000000000cc"));
        assert_eq!(decoded.selector, fixed_bytes!("12345678"));
    }

    #[test]
    fn test_owner_init_failure_keeps_inner_output() {
        let inner = ProxyError::AlreadyInitialized { owner: Address::repeat_byte(0x11) };
        let error = FactoryError::OwnerInitFailed {
            proxy: Address::repeat_byte(0x22),
            output: inner.abi_revert_data(),
        };
        let decoded =
            IProxyFactory::OwnerInitFailed::abi_decode(&error.abi_revert_data(), true).unwrap();
        assert_eq!(decoded.proxy, Address::repeat_byte(0x22));
        assert_eq!(decoded.output, inner.abi_revert_data());
    }

    #[test]
    fn test_gas_used_is_reported_after_forwarding_only() {
        assert_eq!(ProxyError::TargetInvalid { target: Address::ZERO }.gas_used(), 0);
        let failed = ProxyError::TargetCallFailed { output: Bytes::new(), gas_used: 40 };
        assert_eq!(failed.gas_used(), 40);
        let changed = ProxyError::OwnerChanged {
            old_owner: Address::ZERO,
            new_owner: Address::repeat_byte(1),
            gas_used: 7,
        };
        assert_eq!(changed.gas_used(), 7);
    }
}
