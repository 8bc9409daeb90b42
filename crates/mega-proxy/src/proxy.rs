//! The proxy account: a permissioned gateway forwarding calls on behalf of its owner and envoys.
//!
//! # Lifecycle
//!
//! A proxy is instantiated *uninitialized* and becomes *active* when the factory calls
//! [`Proxy::initialize`] in the same transaction. Initializing an active proxy fails with
//! [`ProxyError::AlreadyInitialized`], so a predicted address can never be claimed twice. An
//! account without code cannot be initialized.
//!
//! # Execution
//!
//! [`Proxy::execute`] forwards call data to a target as a delegate call:
//!
//! 1. The caller must be the owner, or an envoy permitted for `(target, selector)`.
//! 2. The target must hold code.
//! 3. The proxy keeps `minGasReserve` gas and forwards the rest.
//! 4. A failure caused by gas starvation is reported as [`ProxyError::InsufficientGasForCall`];
//!    any other failure re-raises the target's revert data unmodified.
//! 5. A target that overwrote the owner fails the execution with [`ProxyError::OwnerChanged`].
//!
//! No proxy state is held across the forwarded call. A reentrant call into the same proxy is
//! authorized against the live permission table.
//!
//! Every mutating entry point is atomic: it runs inside a host checkpoint which is reverted on
//! failure.

use alloy_primitives::{Address, Bytes, Log, Selector, U256};
use alloy_sol_types::{SolCall, SolEvent, SolInterface};
use revm::interpreter::{InstructionResult, InterpreterResult};
use tracing::{debug, trace, warn};

use crate::{
    revert_result, success_result, transact, CallContext, CallInputs, CallScheme, Host,
    IProxy::{self, IProxyCalls},
    PermissionKey, ProxyError, ProxyRecord,
};

/// Returns the function selector of call data, right-padding call data shorter than four bytes
/// with zeroes.
pub fn selector_of(data: &[u8]) -> Selector {
    let mut selector = Selector::ZERO;
    let len = data.len().min(Selector::len_bytes());
    selector[..len].copy_from_slice(&data[..len]);
    selector
}

/// Output of a successful proxy entry point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Executed {
    /// The returned bytes
    pub output: Bytes,
    /// Gas consumed by the forwarded call, zero if nothing was forwarded
    pub gas_used: u64,
}

impl Executed {
    const fn returning(output: Bytes) -> Self {
        Self { output, gas_used: 0 }
    }
}

/// A handle to the proxy account at a given address.
///
/// The handle is stateless: all proxy state lives in the [`Host`] and is read anew by every
/// operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Proxy {
    address: Address,
}

impl Proxy {
    /// Returns the handle of the proxy at `address`.
    pub const fn at(address: Address) -> Self {
        Self { address }
    }

    /// Returns the address of the proxy.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Returns the owner, or `None` if the proxy is uninitialized.
    pub fn owner<H: Host + ?Sized>(&self, host: &H) -> Option<Address> {
        host.proxy_record(self.address).and_then(ProxyRecord::owner)
    }

    /// Returns whether `envoy` may call `selector` on `target` through this proxy.
    pub fn get_permission<H: Host + ?Sized>(
        &self,
        host: &H,
        envoy: Address,
        target: Address,
        selector: Selector,
    ) -> bool {
        host.proxy_record(self.address)
            .is_some_and(|record| record.permission(&PermissionKey::new(envoy, target, selector)))
    }

    /// Returns the gas the proxy keeps back when forwarding calls.
    pub fn min_gas_reserve<H: Host + ?Sized>(&self, host: &H) -> u64 {
        host.proxy_record(self.address)
            .map_or(crate::constants::v1::DEFAULT_MIN_GAS_RESERVE, ProxyRecord::min_gas_reserve)
    }

    /// Sets the first owner of the proxy.
    pub fn initialize<H: Host + ?Sized>(
        &self,
        host: &mut H,
        ctx: &CallContext,
        owner: Address,
    ) -> Result<(), ProxyError> {
        transact(host, |host| {
            if host.code_size(self.address) == 0 {
                return Err(ProxyError::NotDeployed { proxy: self.address });
            }
            let record = host.proxy_record_mut(self.address);
            if let Some(current) = record.owner() {
                warn!(
                    proxy = %self.address,
                    caller = %ctx.caller,
                    %current,
                    "Rejected re-initialization"
                );
                return Err(ProxyError::AlreadyInitialized { owner: current });
            }
            record.set_owner(owner);
            emit(
                host,
                self.address,
                &IProxy::TransferOwnership { oldOwner: Address::ZERO, newOwner: owner },
            );
            trace!(proxy = %self.address, %owner, "Proxy initialized");
            Ok(())
        })
    }

    /// Forwards `data` to `target` and returns the target's output unmodified.
    pub fn execute<H: Host + ?Sized>(
        &self,
        host: &mut H,
        ctx: &CallContext,
        target: Address,
        data: Bytes,
    ) -> Result<Bytes, ProxyError> {
        self.execute_metered(host, ctx, target, data).map(|executed| executed.output)
    }

    /// Same as [`Proxy::execute`], also reporting the gas consumed by the forwarded call.
    pub fn execute_metered<H: Host + ?Sized>(
        &self,
        host: &mut H,
        ctx: &CallContext,
        target: Address,
        data: Bytes,
    ) -> Result<Executed, ProxyError> {
        transact(host, |host| self.forward(host, ctx, target, data))
    }

    fn forward<H: Host + ?Sized>(
        &self,
        host: &mut H,
        ctx: &CallContext,
        target: Address,
        data: Bytes,
    ) -> Result<Executed, ProxyError> {
        let selector = selector_of(&data);
        let record = host.proxy_record(self.address);
        let owner = record.and_then(ProxyRecord::owner);
        let gas_reserve = self.min_gas_reserve(host);

        if owner != Some(ctx.caller) {
            let key = PermissionKey::new(ctx.caller, target, selector);
            if !record.is_some_and(|record| record.permission(&key)) {
                warn!(
                    proxy = %self.address,
                    caller = %ctx.caller,
                    %target,
                    %selector,
                    "Unauthorized execution"
                );
                return Err(ProxyError::Unauthorized {
                    owner: owner.unwrap_or_default(),
                    caller: ctx.caller,
                    target,
                    selector,
                });
            }
        }

        if host.code_size(target) == 0 {
            return Err(ProxyError::TargetInvalid { target });
        }

        let gas_available = ctx.gas_limit;
        if gas_available <= gas_reserve {
            return Err(ProxyError::InsufficientGasForCall {
                gas_available,
                gas_reserve,
                gas_used: 0,
            });
        }
        let stipend = gas_available - gas_reserve;

        trace!(proxy = %self.address, %target, %selector, stipend, "Forwarding call");
        let result = host.call(CallInputs {
            scheme: CallScheme::DelegateCall,
            target_address: self.address,
            code_address: target,
            caller: ctx.caller,
            origin: ctx.origin,
            value: ctx.value,
            input: data.clone(),
            gas_limit: stipend,
        });

        let gas_used = result.gas.spent();
        let owner_after = self.owner(host);
        if owner_after != owner {
            return Err(ProxyError::OwnerChanged {
                old_owner: owner.unwrap_or_default(),
                new_owner: owner_after.unwrap_or_default(),
                gas_used,
            });
        }

        if !result.is_ok() {
            return Err(forward_failure(result, gas_available, gas_reserve, stipend));
        }

        emit(
            host,
            self.address,
            &IProxy::Execute {
                target,
                envoy: ctx.caller,
                selector,
                data,
                response: result.output.clone(),
            },
        );
        debug!(
            proxy = %self.address,
            %target,
            %selector,
            caller = %ctx.caller,
            gas_used,
            "Executed"
        );
        Ok(Executed { output: result.output, gas_used })
    }

    /// Grants or revokes the permission of `envoy` to call `selector` on `target`.
    pub fn grant_permission<H: Host + ?Sized>(
        &self,
        host: &mut H,
        ctx: &CallContext,
        envoy: Address,
        target: Address,
        selector: Selector,
        allowed: bool,
    ) -> Result<(), ProxyError> {
        transact(host, |host| {
            self.ensure_owner(host, ctx.caller)?;
            host.proxy_record_mut(self.address)
                .set_permission(PermissionKey::new(envoy, target, selector), allowed);
            trace!(proxy = %self.address, %envoy, %target, %selector, allowed, "Permission set");
            Ok(())
        })
    }

    /// Hands the proxy over to `new_owner`.
    ///
    /// Permissions granted by the previous owner are kept.
    pub fn transfer_ownership<H: Host + ?Sized>(
        &self,
        host: &mut H,
        ctx: &CallContext,
        new_owner: Address,
    ) -> Result<(), ProxyError> {
        transact(host, |host| {
            let old_owner = self.ensure_owner(host, ctx.caller)?;
            host.proxy_record_mut(self.address).set_owner(new_owner);
            emit(
                host,
                self.address,
                &IProxy::TransferOwnership { oldOwner: old_owner, newOwner: new_owner },
            );
            debug!(proxy = %self.address, %old_owner, %new_owner, "Ownership transferred");
            Ok(())
        })
    }

    fn ensure_owner<H: Host + ?Sized>(
        &self,
        host: &H,
        caller: Address,
    ) -> Result<Address, ProxyError> {
        match self.owner(host) {
            Some(owner) if owner == caller => Ok(owner),
            owner => Err(ProxyError::NotOwner { owner: owner.unwrap_or_default(), caller }),
        }
    }
}

/// Classifies a failed forwarded call.
///
/// A call that ran out of gas, or that consumed its whole stipend, was starved by the caller
/// rather than rejected by the target.
fn forward_failure(
    result: InterpreterResult,
    gas_available: u64,
    gas_reserve: u64,
    stipend: u64,
) -> ProxyError {
    let gas_used = result.gas.spent();
    if result.result == InstructionResult::OutOfGas || gas_used >= stipend {
        return ProxyError::InsufficientGasForCall { gas_available, gas_reserve, gas_used };
    }
    ProxyError::TargetCallFailed { output: result.output, gas_used }
}

fn emit<H: Host + ?Sized, E: SolEvent>(host: &mut H, address: Address, event: &E) {
    host.log(Log { address, data: event.encode_log_data() });
}

/// Serves an ABI-encoded call to a proxy account.
///
/// Hosts route every call whose code address is a proxy through this function. Empty call data is
/// accepted as a plain value transfer; call data that does not decode reverts without output.
/// Entry points that forwarded a call are charged the gas the call consumed, whether they
/// succeed or fail.
pub fn dispatch<H: Host + ?Sized>(host: &mut H, inputs: &CallInputs) -> InterpreterResult {
    let gas_limit = inputs.gas_limit;
    if inputs.input.is_empty() {
        return success_result(Bytes::new(), gas_limit, 0);
    }
    let Ok(call) = IProxyCalls::abi_decode(&inputs.input, true) else {
        return revert_result(Bytes::new(), gas_limit, 0);
    };
    if !inputs.value.is_zero() && !matches!(call, IProxyCalls::execute(_)) {
        return revert_result(Bytes::new(), gas_limit, 0);
    }

    let proxy = Proxy::at(inputs.target_address);
    let ctx = inputs.context();
    let outcome = match call {
        IProxyCalls::initialize(call) => {
            proxy.initialize(host, &ctx, call.owner).map(|()| Executed::default())
        }
        IProxyCalls::execute(call) => {
            proxy.execute_metered(host, &ctx, call.target, call.data).map(|executed| Executed {
                output: IProxy::executeCall::abi_encode_returns(&(executed.output,)).into(),
                gas_used: executed.gas_used,
            })
        }
        IProxyCalls::setPermission(call) => proxy
            .grant_permission(host, &ctx, call.envoy, call.target, call.selector, call.permission)
            .map(|()| Executed::default()),
        IProxyCalls::getPermission(call) => {
            let permission = proxy.get_permission(host, call.envoy, call.target, call.selector);
            Ok(Executed::returning(
                IProxy::getPermissionCall::abi_encode_returns(&(permission,)).into(),
            ))
        }
        IProxyCalls::transferOwnership(call) => {
            proxy.transfer_ownership(host, &ctx, call.newOwner).map(|()| Executed::default())
        }
        IProxyCalls::owner(_) => {
            let owner = proxy.owner(host).unwrap_or_default();
            Ok(Executed::returning(IProxy::ownerCall::abi_encode_returns(&(owner,)).into()))
        }
        IProxyCalls::minGasReserve(_) => {
            let reserve = U256::from(proxy.min_gas_reserve(host));
            Ok(Executed::returning(
                IProxy::minGasReserveCall::abi_encode_returns(&(reserve,)).into(),
            ))
        }
    };

    match outcome {
        Ok(executed) => success_result(executed.output, gas_limit, executed.gas_used),
        Err(error) => revert_result(error.abi_revert_data(), gas_limit, error.gas_used()),
    }
}
