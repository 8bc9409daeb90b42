//! The execution environment the factory and the proxies run in.

use alloy_primitives::{Address, Bytes, Log, B256, U256};
use auto_impl::auto_impl;
use revm::interpreter::{Gas, InstructionResult, InterpreterResult};

use crate::ProxyRecord;

/// How a forwarded call binds storage and caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallScheme {
    /// Runs the callee's code in the callee's own context.
    Call,
    /// Runs the callee's code in the caller's context, keeping the caller's caller and value.
    DelegateCall,
}

/// Inputs of a call frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallInputs {
    /// How storage and caller are bound
    pub scheme: CallScheme,
    /// The account whose context the code runs in
    pub target_address: Address,
    /// The account whose code is executed
    pub code_address: Address,
    /// The immediate caller, `msg.sender` of the frame
    pub caller: Address,
    /// The external account that started the transaction, `tx.origin`
    pub origin: Address,
    /// The value the frame carries
    pub value: U256,
    /// The call data
    pub input: Bytes,
    /// The gas budget of the frame
    pub gas_limit: u64,
}

impl CallInputs {
    /// Creates the inputs of a plain call from `caller` to `target`.
    pub fn call(
        origin: Address,
        caller: Address,
        target: Address,
        input: Bytes,
        gas_limit: u64,
    ) -> Self {
        Self {
            scheme: CallScheme::Call,
            target_address: target,
            code_address: target,
            caller,
            origin,
            value: U256::ZERO,
            input,
            gas_limit,
        }
    }

    /// Sets the value carried by the frame.
    pub const fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Returns the context of the frame as seen by the code it runs.
    pub const fn context(&self) -> CallContext {
        CallContext {
            origin: self.origin,
            caller: self.caller,
            address: self.target_address,
            value: self.value,
            gas_limit: self.gas_limit,
        }
    }
}

/// The context an entry point is invoked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// The external account that started the transaction, `tx.origin`
    pub origin: Address,
    /// The immediate caller, `msg.sender`
    pub caller: Address,
    /// The account being executed
    pub address: Address,
    /// The value carried by the call
    pub value: U256,
    /// The gas available to the entry point
    pub gas_limit: u64,
}

impl CallContext {
    /// Creates the context of a transaction sent by `sender` to `address`.
    pub const fn transaction(sender: Address, address: Address, gas_limit: u64) -> Self {
        Self { origin: sender, caller: sender, address, value: U256::ZERO, gas_limit }
    }

    /// Replaces the immediate caller, keeping the origin.
    pub const fn with_caller(mut self, caller: Address) -> Self {
        self.caller = caller;
        self
    }

    /// Replaces the gas available to the entry point.
    pub const fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }
}

/// A position in the host journal that state can be reverted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct JournalCheckpoint {
    /// Number of logs emitted before the checkpoint
    pub log_i: usize,
    /// Number of journal entries recorded before the checkpoint
    pub journal_i: usize,
}

/// Environment primitives the factory and the proxies need.
///
/// Every state change made through a host is journaled: it can be undone by reverting to a
/// checkpoint taken before it. Entry points open a checkpoint, and either commit it on success or
/// revert it on failure.
#[auto_impl(&mut, Box)]
pub trait Host {
    /// Returns the size of the code stored at `address`.
    fn code_size(&self, address: Address) -> usize;

    /// Instantiates `init_code` at the `CREATE2` address of `(creator, salt, keccak256(init_code))`.
    ///
    /// Returns `None` if nothing was instantiated, e.g. because the address already holds code or
    /// the init code is not deployable in this environment.
    fn create2(&mut self, creator: Address, salt: B256, init_code: &Bytes) -> Option<Address>;

    /// Executes a call frame and returns its result.
    ///
    /// State changes of a frame that does not succeed are reverted before returning.
    fn call(&mut self, inputs: CallInputs) -> InterpreterResult;

    /// Appends an event log.
    fn log(&mut self, log: Log);

    /// Returns the value of storage `slot` of `address`, zero if never written.
    fn storage(&self, address: Address, slot: U256) -> U256;

    /// Writes `value` to storage `slot` of `address`.
    fn set_storage(&mut self, address: Address, slot: U256, value: U256);

    /// Returns the record of the proxy at `address`, if any.
    fn proxy_record(&self, address: Address) -> Option<&ProxyRecord>;

    /// Returns the record of the proxy at `address`, creating an uninitialized one if missing.
    fn proxy_record_mut(&mut self, address: Address) -> &mut ProxyRecord;

    /// Opens a checkpoint.
    fn checkpoint(&mut self) -> JournalCheckpoint;

    /// Commits the most recently opened checkpoint.
    fn checkpoint_commit(&mut self);

    /// Reverts all state changes made since `checkpoint` was opened and closes it.
    fn checkpoint_revert(&mut self, checkpoint: JournalCheckpoint);
}

/// Runs `f` inside a host checkpoint, committing on `Ok` and reverting on `Err`.
pub fn transact<H, T, E>(host: &mut H, f: impl FnOnce(&mut H) -> Result<T, E>) -> Result<T, E>
where
    H: Host + ?Sized,
{
    let checkpoint = host.checkpoint();
    let result = f(host);
    if result.is_ok() {
        host.checkpoint_commit();
    } else {
        host.checkpoint_revert(checkpoint);
    }
    result
}

/// Builds a successful frame result that used `gas_used` out of `gas_limit`.
pub fn success_result(output: Bytes, gas_limit: u64, gas_used: u64) -> InterpreterResult {
    frame_result(InstructionResult::Return, output, gas_limit, gas_used)
}

/// Builds a reverted frame result that used `gas_used` out of `gas_limit`.
pub fn revert_result(output: Bytes, gas_limit: u64, gas_used: u64) -> InterpreterResult {
    frame_result(InstructionResult::Revert, output, gas_limit, gas_used)
}

/// Builds a frame result with the given instruction result.
pub fn frame_result(
    result: InstructionResult,
    output: Bytes,
    gas_limit: u64,
    gas_used: u64,
) -> InterpreterResult {
    let mut gas = Gas::new(gas_limit);
    if !gas.record_cost(gas_used) {
        gas = Gas::new_spent(gas_limit);
    }
    InterpreterResult::new(result, output, gas)
}
