//! In-memory execution environment.
//!
//! [`InMemoryHost`] keeps accounts in a [`CacheDB`] and executes *native programs*: Rust
//! implementations of [`Program`] bound to an address. Proxy accounts are instantiated from a
//! native template keyed by the hash of [`PROXY_INIT_CODE`](crate::constants::v1::PROXY_INIT_CODE)
//! and served by [`ProxyProgram`].
//!
//! The journal records one undo entry per state change made while a checkpoint is open. Reverting
//! to a checkpoint replays the entries recorded after it in reverse, so the cost of a checkpoint
//! is proportional to the changes made under it, not to the size of the world. A frame that does
//! not succeed is reverted, logs included.

use std::sync::Arc;

use alloy_primitives::{keccak256, map::HashMap, Address, Bytes, Log, B256, U256};
use revm::{
    database::{AccountState, CacheDB, DbAccount, EmptyDB},
    interpreter::{InstructionResult, InterpreterResult},
    state::{AccountInfo, Bytecode},
    DatabaseRef,
};
use tracing::trace;

use crate::{
    constants, dispatch, frame_result, success_result, CallInputs, Host, JournalCheckpoint,
    ProxyFactory, ProxyRecord,
};

/// Code executed natively by an [`InMemoryHost`].
pub trait Program {
    /// Executes a call frame. State changes go through `host`.
    fn call(&self, host: &mut dyn Host, inputs: &CallInputs) -> InterpreterResult;
}

impl<F> Program for F
where
    F: Fn(&mut dyn Host, &CallInputs) -> InterpreterResult,
{
    fn call(&self, host: &mut dyn Host, inputs: &CallInputs) -> InterpreterResult {
        self(host, inputs)
    }
}

/// The program serving proxy accounts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyProgram;

impl Program for ProxyProgram {
    fn call(&self, host: &mut dyn Host, inputs: &CallInputs) -> InterpreterResult {
        dispatch(host, inputs)
    }
}

impl Program for ProxyFactory {
    fn call(&self, host: &mut dyn Host, inputs: &CallInputs) -> InterpreterResult {
        self.dispatch(host, inputs)
    }
}

/// Creation code the host knows how to instantiate.
#[derive(derive_more::Debug, Clone)]
struct Template {
    runtime_code: Bytes,
    #[debug(ignore)]
    program: Arc<dyn Program>,
}

/// Undo information of a single state change.
#[derive(derive_more::Debug)]
enum JournalEntry {
    /// Code was installed at `address`.
    CodeChanged {
        address: Address,
        info: AccountInfo,
        account_state: AccountState,
        #[debug(ignore)]
        program: Option<Arc<dyn Program>>,
    },
    /// A storage slot was written.
    StorageChanged { address: Address, slot: U256, value: U256 },
    /// A proxy record was handed out for mutation.
    ProxyRecordChanged { address: Address, record: Option<ProxyRecord> },
}

/// A [`Host`] holding all state in memory.
#[derive(derive_more::Debug)]
pub struct InMemoryHost {
    db: CacheDB<EmptyDB>,
    #[debug(ignore)]
    programs: HashMap<Address, Arc<dyn Program>>,
    proxies: HashMap<Address, ProxyRecord>,
    logs: Vec<Log>,
    journal: Vec<JournalEntry>,
    checkpoints: usize,
    templates: HashMap<B256, Template>,
    depth: usize,
}

impl Default for InMemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryHost {
    /// Creates an empty world that can instantiate proxy accounts.
    pub fn new() -> Self {
        let mut host = Self {
            db: CacheDB::default(),
            programs: HashMap::default(),
            proxies: HashMap::default(),
            logs: Vec::new(),
            journal: Vec::new(),
            checkpoints: 0,
            templates: HashMap::default(),
            depth: 0,
        };
        host.register_template(
            &constants::v1::PROXY_INIT_CODE,
            constants::v1::PROXY_RUNTIME_CODE,
            Arc::new(ProxyProgram),
        );
        host
    }

    /// Makes `init_code` instantiable through [`Host::create2`], storing `runtime_code` at the
    /// created address and serving calls with `program`.
    pub fn register_template(
        &mut self,
        init_code: &Bytes,
        runtime_code: Bytes,
        program: Arc<dyn Program>,
    ) {
        self.templates.insert(keccak256(init_code), Template { runtime_code, program });
    }

    /// Binds a native program to `address`, replacing any code stored there.
    pub fn insert_program<F>(&mut self, address: Address, program: F)
    where
        F: Fn(&mut dyn Host, &CallInputs) -> InterpreterResult + 'static,
    {
        self.insert_program_arc(address, Arc::new(program));
    }

    /// Binds a shared native program to `address`, replacing any code stored there.
    ///
    /// The account gets a one-byte `INVALID` stub as code so that it is not mistaken for an
    /// externally owned account.
    pub fn insert_program_arc(&mut self, address: Address, program: Arc<dyn Program>) {
        self.install(address, Bytes::from_static(&[0xfe]), program);
    }

    /// Deploys `factory` as a native program at its own address.
    pub fn insert_factory(&mut self, factory: ProxyFactory) {
        self.insert_program_arc(factory.address(), Arc::new(factory));
    }

    fn install(&mut self, address: Address, code: Bytes, program: Arc<dyn Program>) {
        let bytecode = Bytecode::new_legacy(code);
        let code_hash = bytecode.hash_slow();
        let account = self.account_mut(address);
        let info = std::mem::replace(
            &mut account.info,
            AccountInfo { code: Some(bytecode), code_hash, ..Default::default() },
        );
        let account_state = std::mem::replace(&mut account.account_state, AccountState::None);
        let program = self.programs.insert(address, program);
        self.record(JournalEntry::CodeChanged { address, info, account_state, program });
    }

    fn account_mut(&mut self, address: Address) -> &mut DbAccount {
        match self.db.load_account(address) {
            Ok(account) => account,
            Err(never) => match never {},
        }
    }

    fn record(&mut self, entry: JournalEntry) {
        // Changes made outside of any checkpoint can never be reverted
        if self.checkpoints > 0 {
            self.journal.push(entry);
        }
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::CodeChanged { address, info, account_state, program } => {
                let account = self.account_mut(address);
                account.info = info;
                account.account_state = account_state;
                match program {
                    Some(program) => self.programs.insert(address, program),
                    None => self.programs.remove(&address),
                };
            }
            JournalEntry::StorageChanged { address, slot, value } => {
                self.account_mut(address).storage.insert(slot, value);
            }
            JournalEntry::ProxyRecordChanged { address, record } => {
                match record {
                    Some(record) => self.proxies.insert(address, record),
                    None => self.proxies.remove(&address),
                };
            }
        }
    }

    /// Returns the code stored at `address`.
    pub fn code(&self, address: Address) -> Option<Bytecode> {
        match self.db.basic_ref(address) {
            Ok(Some(info)) => info.code.filter(|code| !code.is_empty()),
            _ => None,
        }
    }

    /// Returns all logs emitted so far, in emission order.
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Removes and returns all logs emitted so far.
    pub fn take_logs(&mut self) -> Vec<Log> {
        std::mem::take(&mut self.logs)
    }

    /// Returns the number of proxy records held.
    pub fn proxy_count(&self) -> usize {
        self.proxies.len()
    }

    /// Returns the number of checkpoints currently open.
    pub const fn open_checkpoints(&self) -> usize {
        self.checkpoints
    }

    /// Returns the number of undo entries recorded under the open checkpoints.
    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }
}

impl Host for InMemoryHost {
    fn code_size(&self, address: Address) -> usize {
        self.code(address).map_or(0, |code| code.len())
    }

    fn create2(&mut self, creator: Address, salt: B256, init_code: &Bytes) -> Option<Address> {
        let init_code_hash = keccak256(init_code);
        let template = self.templates.get(&init_code_hash)?.clone();
        let address = creator.create2(salt, init_code_hash);
        if self.code_size(address) != 0 {
            trace!(%creator, %address, "CREATE2 collision");
            return None;
        }
        self.install(address, template.runtime_code, template.program);
        trace!(%creator, %salt, %address, "CREATE2");
        Some(address)
    }

    fn call(&mut self, inputs: CallInputs) -> InterpreterResult {
        if self.depth >= constants::common::CALL_STACK_LIMIT {
            return frame_result(InstructionResult::CallTooDeep, Bytes::new(), inputs.gas_limit, 0);
        }
        let Some(program) = self.programs.get(&inputs.code_address).cloned() else {
            // Calling an account without code succeeds without executing anything
            return success_result(Bytes::new(), inputs.gas_limit, 0);
        };

        let checkpoint = self.checkpoint();
        self.depth += 1;
        let result = program.call(self, &inputs);
        self.depth -= 1;
        if result.is_ok() {
            self.checkpoint_commit();
        } else {
            self.checkpoint_revert(checkpoint);
        }
        trace!(
            scheme = ?inputs.scheme,
            target = %inputs.target_address,
            code = %inputs.code_address,
            result = ?result.result,
            gas_used = result.gas.spent(),
            "Call"
        );
        result
    }

    fn log(&mut self, log: Log) {
        self.logs.push(log);
    }

    fn storage(&self, address: Address, slot: U256) -> U256 {
        self.db.storage_ref(address, slot).unwrap_or_default()
    }

    fn set_storage(&mut self, address: Address, slot: U256, value: U256) {
        let previous = self.account_mut(address).storage.insert(slot, value).unwrap_or_default();
        self.record(JournalEntry::StorageChanged { address, slot, value: previous });
    }

    fn proxy_record(&self, address: Address) -> Option<&ProxyRecord> {
        self.proxies.get(&address)
    }

    fn proxy_record_mut(&mut self, address: Address) -> &mut ProxyRecord {
        if self.checkpoints > 0 {
            let record = self.proxies.get(&address).cloned();
            self.journal.push(JournalEntry::ProxyRecordChanged { address, record });
        }
        self.proxies.entry(address).or_default()
    }

    fn checkpoint(&mut self) -> JournalCheckpoint {
        self.checkpoints += 1;
        JournalCheckpoint { log_i: self.logs.len(), journal_i: self.journal.len() }
    }

    fn checkpoint_commit(&mut self) {
        self.checkpoints = self.checkpoints.saturating_sub(1);
        if self.checkpoints == 0 {
            self.journal.clear();
        }
    }

    fn checkpoint_revert(&mut self, checkpoint: JournalCheckpoint) {
        let entries = self.journal.split_off(checkpoint.journal_i.min(self.journal.len()));
        for entry in entries.into_iter().rev() {
            self.undo(entry);
        }
        self.logs.truncate(checkpoint.log_i);
        self.checkpoints = self.checkpoints.saturating_sub(1);
    }
}
