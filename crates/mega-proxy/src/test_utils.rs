//! Test utilities: native target programs and a ready-made world.

use alloy_primitives::{address, Address, Bytes, Log, LogData, B256};
use revm::interpreter::{InstructionResult, InterpreterResult};

use crate::{
    frame_result, revert_result, success_result, CallContext, CallInputs, Host, InMemoryHost,
    Program, Proxy, ProxyFactory,
};

/// Address of the factory in [`TestWorld`].
pub const FACTORY: Address = address!("00000000000000000000000000000000000fac70");
/// Gas limit used by [`TestWorld`] transactions.
pub const TX_GAS_LIMIT: u64 = 1_000_000;
/// Gas charged by the fixed-cost programs of this module.
pub const PROGRAM_GAS: u64 = 100;

/// Returns its input.
#[derive(Debug, Clone, Copy, Default)]
pub struct Echo;

impl Program for Echo {
    fn call(&self, _host: &mut dyn Host, inputs: &CallInputs) -> InterpreterResult {
        success_result(inputs.input.clone(), inputs.gas_limit, PROGRAM_GAS)
    }
}

/// Reverts with a fixed payload, which may be empty.
#[derive(Debug, Clone, Default)]
pub struct Reverter {
    /// The revert data
    pub payload: Bytes,
}

impl Program for Reverter {
    fn call(&self, _host: &mut dyn Host, inputs: &CallInputs) -> InterpreterResult {
        revert_result(self.payload.clone(), inputs.gas_limit, PROGRAM_GAS)
    }
}

/// Burns all gas it is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct GasBurner;

impl Program for GasBurner {
    fn call(&self, _host: &mut dyn Host, inputs: &CallInputs) -> InterpreterResult {
        frame_result(InstructionResult::OutOfGas, Bytes::new(), inputs.gas_limit, inputs.gas_limit)
    }
}

/// Returns the words `address ‖ caller ‖ origin` of the frame it runs in.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextReporter;

impl ContextReporter {
    /// Decodes the output of a reporter into `(address, caller, origin)`.
    pub fn decode(output: &[u8]) -> (Address, Address, Address) {
        let word = |index: usize| Address::from_word(B256::from_slice(&output[index * 32..][..32]));
        (word(0), word(1), word(2))
    }
}

impl Program for ContextReporter {
    fn call(&self, _host: &mut dyn Host, inputs: &CallInputs) -> InterpreterResult {
        let mut output = Vec::with_capacity(96);
        output.extend_from_slice(inputs.target_address.into_word().as_slice());
        output.extend_from_slice(inputs.caller.into_word().as_slice());
        output.extend_from_slice(inputs.origin.into_word().as_slice());
        success_result(output.into(), inputs.gas_limit, PROGRAM_GAS)
    }
}

/// Emits its input as an anonymous log of the frame's context account, then succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct Emitter;

impl Program for Emitter {
    fn call(&self, host: &mut dyn Host, inputs: &CallInputs) -> InterpreterResult {
        host.log(Log {
            address: inputs.target_address,
            data: LogData::new_unchecked(Vec::new(), inputs.input.clone()),
        });
        success_result(Bytes::new(), inputs.gas_limit, PROGRAM_GAS)
    }
}

/// Calls back into the account whose context it runs in with fixed call data, passing the
/// result through.
///
/// Run through a proxy, this reenters the proxy with the proxy itself as caller.
#[derive(Debug, Clone, Default)]
pub struct Reenter {
    /// The call data of the reentrant call
    pub input: Bytes,
}

impl Program for Reenter {
    fn call(&self, host: &mut dyn Host, inputs: &CallInputs) -> InterpreterResult {
        let this = inputs.target_address;
        let inner = host.call(CallInputs::call(
            inputs.origin,
            this,
            this,
            self.input.clone(),
            inputs.gas_limit,
        ));
        frame_result(inner.result, inner.output, inputs.gas_limit, inner.gas.spent())
    }
}

/// Overwrites the owner of the proxy it runs in.
#[derive(Debug, Clone, Copy)]
pub struct OwnerClobber {
    /// The owner written
    pub new_owner: Address,
}

impl Program for OwnerClobber {
    fn call(&self, host: &mut dyn Host, inputs: &CallInputs) -> InterpreterResult {
        host.proxy_record_mut(inputs.target_address).set_owner(self.new_owner);
        success_result(Bytes::new(), inputs.gas_limit, PROGRAM_GAS)
    }
}

/// Overwrites the minimum gas reserve of the proxy it runs in.
#[derive(Debug, Clone, Copy)]
pub struct ReserveClobber {
    /// The reserve written
    pub min_gas_reserve: u64,
}

impl Program for ReserveClobber {
    fn call(&self, host: &mut dyn Host, inputs: &CallInputs) -> InterpreterResult {
        host.proxy_record_mut(inputs.target_address).set_min_gas_reserve(self.min_gas_reserve);
        success_result(Bytes::new(), inputs.gas_limit, PROGRAM_GAS)
    }
}

/// An in-memory host with a factory deployed at [`FACTORY`].
///
/// The factory is installed as a program, so it can also be reached through [`Host::call`].
#[derive(Debug)]
pub struct TestWorld {
    /// The host
    pub host: InMemoryHost,
    /// The factory
    pub factory: ProxyFactory,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    /// Creates a world without proxies.
    pub fn new() -> Self {
        let factory = ProxyFactory::new(FACTORY);
        let mut host = InMemoryHost::new();
        host.insert_factory(factory);
        Self { host, factory }
    }

    /// Binds `program` to `address`.
    pub fn with_program(mut self, address: Address, program: impl Program + 'static) -> Self {
        self.host.insert_program_arc(address, std::sync::Arc::new(program));
        self
    }

    /// Deploys a proxy owned by `owner` in a transaction sent by `owner`.
    pub fn deploy(&mut self, owner: Address) -> Proxy {
        let ctx = tx(owner, FACTORY);
        let address = self.factory.deploy(&mut self.host, &ctx).expect("deployment failed");
        Proxy::at(address)
    }
}

/// Returns the context of a transaction sent by `sender` to `to` with [`TX_GAS_LIMIT`].
pub const fn tx(sender: Address, to: Address) -> CallContext {
    CallContext::transaction(sender, to, TX_GAS_LIMIT)
}
