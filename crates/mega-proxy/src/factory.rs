//! The proxy factory.
//!
//! The factory deploys proxies at addresses derived from the transaction origin and the origin's
//! seed, initializes their owner and records them. See [`crate::address`] for the derivation.
//!
//! All factory state lives in the storage of the factory account, laid out like the mappings of a
//! Solidity contract: the [`SeedLedger`] at [`NEXT_SEEDS_SLOT`](constants::v1::NEXT_SEEDS_SLOT),
//! the proxy registry at [`PROXIES_SLOT`](constants::v1::PROXIES_SLOT) and the deployment count at
//! [`PROXY_COUNT_SLOT`](constants::v1::PROXY_COUNT_SLOT). A deployment is reverted as a whole with
//! the host checkpoint enclosing it.

use alloy_primitives::{Address, Bytes, Log, B256, U256};
use alloy_sol_types::{SolCall, SolEvent, SolInterface};
use revm::interpreter::InterpreterResult;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    constants, deployment_key, derive_proxy_address, mapping_slot, proxy_init_code_hash,
    revert_result, success_result, transact, CallContext, CallInputs, FactoryError, Host, IProxy,
    IProxyFactory::{self, IProxyFactoryCalls},
    SeedLedger,
};

/// A successful deployment, mirroring the `DeployProxy` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    /// The transaction origin whose seed was consumed
    pub origin: Address,
    /// The immediate caller of the factory
    pub deployer: Address,
    /// The owner of the new proxy
    pub owner: Address,
    /// The consumed seed
    pub seed: B256,
    /// The deployment key derived from origin and seed
    pub salt: B256,
    /// The address of the new proxy
    pub proxy: Address,
}

/// A handle to the proxy factory at a given address.
///
/// Like [`Proxy`](crate::Proxy), the handle is stateless and reads the factory state from the
/// [`Host`] on every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProxyFactory {
    address: Address,
}

impl ProxyFactory {
    /// Returns the handle of the factory at `address`.
    pub const fn new(address: Address) -> Self {
        Self { address }
    }

    /// Returns the address of the factory.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Returns the seed ledger of the factory.
    pub const fn ledger(&self) -> SeedLedger {
        SeedLedger::at(self.address)
    }

    /// Returns the protocol revision of the factory.
    pub const fn version(&self) -> u64 {
        constants::v1::FACTORY_VERSION
    }

    /// Returns the seed the next deployment requested by `eoa` will consume.
    pub fn get_next_seed<H: Host + ?Sized>(&self, host: &H, eoa: Address) -> B256 {
        self.ledger().next_seed(host, eoa)
    }

    /// Returns the address the next deployment requested by `eoa` will produce.
    pub fn next_proxy_address<H: Host + ?Sized>(&self, host: &H, eoa: Address) -> Address {
        derive_proxy_address(
            self.address,
            deployment_key(eoa, self.get_next_seed(host, eoa)),
            proxy_init_code_hash(),
        )
    }

    /// Returns whether `address` is a proxy deployed by this factory.
    pub fn is_proxy<H: Host + ?Sized>(&self, host: &H, address: Address) -> bool {
        !host.storage(self.address, proxy_slot(address)).is_zero()
    }

    /// Returns the number of proxies deployed by this factory.
    pub fn deployed<H: Host + ?Sized>(&self, host: &H) -> u64 {
        host.storage(self.address, constants::v1::PROXY_COUNT_SLOT).saturating_to()
    }

    /// Deploys a proxy owned by the immediate caller.
    pub fn deploy<H: Host + ?Sized>(
        &self,
        host: &mut H,
        ctx: &CallContext,
    ) -> Result<Address, FactoryError> {
        self.deploy_for(host, ctx, ctx.caller)
    }

    /// Deploys a proxy owned by `owner`.
    pub fn deploy_for<H: Host + ?Sized>(
        &self,
        host: &mut H,
        ctx: &CallContext,
        owner: Address,
    ) -> Result<Address, FactoryError> {
        self.deploy_proxy(host, ctx, owner).map(|deployment| deployment.proxy)
    }

    /// Deploys a proxy owned by `owner` and returns the full deployment record.
    ///
    /// The seed is consumed from the slot of the transaction origin, not of the immediate caller,
    /// so deployments routed through intermediary contracts still advance the initiator's
    /// sequence. Nothing is changed if any step fails.
    pub fn deploy_proxy<H: Host + ?Sized>(
        &self,
        host: &mut H,
        ctx: &CallContext,
        owner: Address,
    ) -> Result<Deployment, FactoryError> {
        let factory = self.address;
        let origin = ctx.origin;

        let deployment = transact(host, |host| {
            let seed = self.ledger().advance(host, origin)?;
            let salt = deployment_key(origin, seed);
            let expected = derive_proxy_address(factory, salt, proxy_init_code_hash());

            let Some(proxy) = host.create2(factory, salt, &constants::v1::PROXY_INIT_CODE) else {
                warn!(%origin, %salt, "Proxy deployment failed");
                return Err(FactoryError::DeploymentFailed { salt });
            };
            if proxy != expected {
                return Err(FactoryError::AddressMismatch { expected, actual: proxy });
            }

            let init = host.call(CallInputs::call(
                origin,
                factory,
                proxy,
                IProxy::initializeCall { owner }.abi_encode().into(),
                ctx.gas_limit,
            ));
            if !init.is_ok() {
                warn!(%proxy, %owner, result = ?init.result, "Proxy owner initialization failed");
                return Err(FactoryError::OwnerInitFailed { proxy, output: init.output });
            }

            host.set_storage(factory, proxy_slot(proxy), U256::from(1));
            let count = host.storage(factory, constants::v1::PROXY_COUNT_SLOT);
            let count = count.saturating_add(U256::from(1));
            host.set_storage(factory, constants::v1::PROXY_COUNT_SLOT, count);

            let deployment =
                Deployment { origin, deployer: ctx.caller, owner, seed, salt, proxy };
            host.log(Log { address: factory, data: deploy_event(&deployment).encode_log_data() });
            Ok(deployment)
        })?;

        debug!(
            %origin,
            deployer = %ctx.caller,
            %owner,
            seed = %deployment.seed,
            proxy = %deployment.proxy,
            "Deployed proxy"
        );
        Ok(deployment)
    }

    /// Serves an ABI-encoded call to the factory.
    ///
    /// Failures revert with the ABI encoding of the [`FactoryError`]. Call data that does not
    /// decode, and any call carrying value, reverts without output.
    pub fn dispatch<H: Host + ?Sized>(
        &self,
        host: &mut H,
        inputs: &CallInputs,
    ) -> InterpreterResult {
        let gas_limit = inputs.gas_limit;
        let Ok(call) = IProxyFactoryCalls::abi_decode(&inputs.input, true) else {
            return revert_result(Bytes::new(), gas_limit, 0);
        };
        if !inputs.value.is_zero() {
            return revert_result(Bytes::new(), gas_limit, 0);
        }

        let ctx = inputs.context();
        let outcome = match call {
            IProxyFactoryCalls::deploy(_) => self.deploy(host, &ctx).map(|proxy| {
                IProxyFactory::deployCall::abi_encode_returns(&(proxy,))
            }),
            IProxyFactoryCalls::deployFor(call) => {
                self.deploy_for(host, &ctx, call.owner).map(|proxy| {
                    IProxyFactory::deployForCall::abi_encode_returns(&(proxy,))
                })
            }
            IProxyFactoryCalls::getNextSeed(call) => {
                Ok(IProxyFactory::getNextSeedCall::abi_encode_returns(&(
                    self.get_next_seed(host, call.eoa),
                )))
            }
            IProxyFactoryCalls::isProxy(call) => {
                let result = self.is_proxy(host, call.proxy);
                Ok(IProxyFactory::isProxyCall::abi_encode_returns(&(result,)))
            }
            IProxyFactoryCalls::version(_) => Ok(IProxyFactory::versionCall::abi_encode_returns(
                &(U256::from(self.version()),),
            )),
        };

        match outcome {
            Ok(output) => success_result(output.into(), gas_limit, 0),
            Err(error) => revert_result(error.abi_revert_data(), gas_limit, 0),
        }
    }
}

/// Returns the factory storage slot recording whether `proxy` was deployed by the factory.
#[inline]
pub fn proxy_slot(proxy: Address) -> U256 {
    mapping_slot(proxy, constants::v1::PROXIES_SLOT)
}

/// Builds the `DeployProxy` event of a deployment.
pub fn deploy_event(deployment: &Deployment) -> IProxyFactory::DeployProxy {
    IProxyFactory::DeployProxy {
        origin: deployment.origin,
        deployer: deployment.deployer,
        owner: deployment.owner,
        seed: deployment.seed,
        salt: deployment.salt,
        proxy: deployment.proxy,
    }
}
