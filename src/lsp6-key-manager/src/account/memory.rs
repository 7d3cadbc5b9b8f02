use core::{
    cell::{Cell, RefCell},
    fmt,
};
use std::{
    collections::{HashMap, HashSet},
    rc::Rc,
};

use alloy_primitives::{keccak256, Address, Bytes, FixedBytes, B256, U256};
use alloy_sol_types::SolValue;
use lsp6_types::{Erc725YStore, MemoryStore};
use tracing::trace;

use super::{Account, AccountError, KeyManagerHost, OperationType};
use crate::decoder::{decode_account_call, AccountCall, ExecuteCall};

/// What a scripted call target sees when the account calls it.
pub struct CallContext<'a> {
    /// Lets the target call back into the key manager.
    pub host: &'a dyn KeyManagerHost,
    /// The calling account (`msg.sender` for the target).
    pub account: Address,
    pub operation: OperationType,
    pub target: Address,
    pub value: U256,
    pub data: &'a [u8],
}

/// Behaviour of a call target. Returning `Err` reverts the call.
pub type CallHandler = Rc<dyn Fn(&CallContext<'_>) -> Result<Bytes, AccountError>>;

/// An outgoing call or deployment performed by the account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallRecord {
    pub operation: OperationType,
    pub target: Address,
    pub value: U256,
    pub data: Bytes,
}

enum JournalEntry {
    Data { key: B256, previous: Bytes },
    Owner(Address),
    PendingOwner(Address),
    Call,
    Deployment,
}

/// In-memory ERC725 account with journaled state.
///
/// Targets without a registered handler behave like EOAs: the call succeeds and returns nothing.
pub struct MemoryAccount {
    address: Address,
    store: MemoryStore,
    owner: Cell<Address>,
    pending_owner: Cell<Address>,
    block_timestamp: Cell<u64>,
    deployments: Cell<u64>,
    calls: RefCell<Vec<CallRecord>>,
    journal: RefCell<Vec<JournalEntry>>,
    handlers: RefCell<HashMap<Address, CallHandler>>,
    interfaces: RefCell<HashMap<Address, HashSet<FixedBytes<4>>>>,
}

impl fmt::Debug for MemoryAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryAccount")
            .field("address", &self.address)
            .field("owner", &self.owner.get())
            .field("entries", &self.store.len())
            .field("calls", &self.calls.borrow().len())
            .finish()
    }
}

impl MemoryAccount {
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            store: MemoryStore::new(),
            owner: Cell::new(owner),
            pending_owner: Cell::new(Address::ZERO),
            block_timestamp: Cell::new(0),
            deployments: Cell::new(0),
            calls: RefCell::new(Vec::new()),
            journal: RefCell::new(Vec::new()),
            handlers: RefCell::new(HashMap::new()),
            interfaces: RefCell::new(HashMap::new()),
        }
    }

    pub fn owner(&self) -> Address {
        self.owner.get()
    }

    pub fn pending_owner(&self) -> Address {
        self.pending_owner.get()
    }

    pub fn set_block_timestamp(&self, timestamp: u64) {
        self.block_timestamp.set(timestamp);
    }

    /// Every call and deployment made so far, oldest first.
    pub fn calls(&self) -> Vec<CallRecord> {
        self.calls.borrow().clone()
    }

    /// Snapshot of the ERC725Y store.
    pub fn entries(&self) -> Vec<(B256, Bytes)> {
        self.store.entries()
    }

    /// Script the behaviour of `target`.
    pub fn on_call<F>(&self, target: Address, handler: F)
    where
        F: Fn(&CallContext<'_>) -> Result<Bytes, AccountError> + 'static,
    {
        self.handlers.borrow_mut().insert(target, Rc::new(handler));
    }

    /// Make `target` answer `supportsInterface(interface_id) == true`.
    pub fn register_interface(&self, target: Address, interface_id: FixedBytes<4>) {
        self.interfaces
            .borrow_mut()
            .entry(target)
            .or_default()
            .insert(interface_id);
    }

    fn record(&self, entry: JournalEntry) {
        self.journal.borrow_mut().push(entry);
    }

    fn set_owner(&self, owner: Address) {
        self.record(JournalEntry::Owner(self.owner.replace(owner)));
    }

    fn set_pending_owner(&self, pending: Address) {
        self.record(JournalEntry::PendingOwner(self.pending_owner.replace(pending)));
    }

    fn push_call(&self, record: CallRecord) {
        self.calls.borrow_mut().push(record);
        self.record(JournalEntry::Call);
    }

    fn execute_one(
        &self,
        host: &dyn KeyManagerHost,
        call: &ExecuteCall,
    ) -> Result<Bytes, AccountError> {
        match call.operation {
            OperationType::Create | OperationType::Create2 => {
                if call.target != Address::ZERO {
                    return Err(AccountError::CreateRequiresEmptyTarget);
                }
                if call.data.is_empty() {
                    return Err(AccountError::NoContractBytecodeProvided);
                }
                let deployed = self.next_deployment_address(call);
                self.push_call(CallRecord {
                    operation: call.operation,
                    target: deployed,
                    value: call.value,
                    data: call.data.clone(),
                });
                Ok(Bytes::copy_from_slice(deployed.as_slice()))
            }
            OperationType::Call | OperationType::StaticCall | OperationType::DelegateCall => {
                if call.operation != OperationType::Call && !call.value.is_zero() {
                    return Err(AccountError::MsgValueDisallowed(call.operation));
                }
                self.push_call(CallRecord {
                    operation: call.operation,
                    target: call.target,
                    value: call.value,
                    data: call.data.clone(),
                });
                let handler = self.handlers.borrow().get(&call.target).cloned();
                match handler {
                    Some(handler) => handler(&CallContext {
                        host,
                        account: self.address,
                        operation: call.operation,
                        target: call.target,
                        value: call.value,
                        data: &call.data,
                    }),
                    None => Ok(Bytes::new()),
                }
            }
        }
    }

    fn next_deployment_address(&self, call: &ExecuteCall) -> Address {
        let index = self.deployments.get();
        self.deployments.set(index + 1);
        self.record(JournalEntry::Deployment);

        let mut preimage = Vec::with_capacity(20 + 8 + 1 + 32);
        preimage.extend_from_slice(self.address.as_slice());
        preimage.extend_from_slice(&index.to_be_bytes());
        preimage.push(call.operation as u8);
        preimage.extend_from_slice(keccak256(&call.data).as_slice());
        Address::from_slice(&keccak256(preimage)[12..])
    }
}

impl Erc725YStore for MemoryAccount {
    fn get_data(&self, key: &B256) -> Bytes {
        self.store.get_data(key)
    }

    fn set_data(&self, key: B256, value: Bytes) {
        let previous = self.store.get_data(&key);
        self.record(JournalEntry::Data { key, previous });
        self.store.set_data(key, value);
    }
}

impl Account for MemoryAccount {
    fn address(&self) -> Address {
        self.address
    }

    fn block_timestamp(&self) -> u64 {
        self.block_timestamp.get()
    }

    fn supports_interface(&self, target: Address, interface_id: FixedBytes<4>) -> bool {
        self.interfaces
            .borrow()
            .get(&target)
            .is_some_and(|ids| ids.contains(&interface_id))
    }

    fn checkpoint(&self) -> usize {
        self.journal.borrow().len()
    }

    fn revert_to(&self, checkpoint: usize) {
        loop {
            let entry = {
                let mut journal = self.journal.borrow_mut();
                if journal.len() <= checkpoint {
                    break;
                }
                journal.pop()
            };
            match entry {
                Some(JournalEntry::Data { key, previous }) => self.store.set_data(key, previous),
                Some(JournalEntry::Owner(previous)) => self.owner.set(previous),
                Some(JournalEntry::PendingOwner(previous)) => self.pending_owner.set(previous),
                Some(JournalEntry::Call) => {
                    self.calls.borrow_mut().pop();
                }
                Some(JournalEntry::Deployment) => {
                    self.deployments.set(self.deployments.get().saturating_sub(1));
                }
                None => break,
            }
        }
        trace!(checkpoint, "account state reverted");
    }

    fn forward(
        &self,
        host: &dyn KeyManagerHost,
        _msg_value: U256,
        payload: &[u8],
    ) -> Result<Bytes, AccountError> {
        match decode_account_call(payload)? {
            AccountCall::SetData { key, value } => {
                self.set_data(key, value);
                Ok(Bytes::new())
            }
            AccountCall::SetDataBatch { keys, values } => {
                for (key, value) in keys.into_iter().zip(values) {
                    self.set_data(key, value);
                }
                Ok(Bytes::new())
            }
            AccountCall::Execute(call) => self.execute_one(host, &call),
            AccountCall::ExecuteBatch(calls) => {
                let mut results = Vec::with_capacity(calls.len());
                for call in &calls {
                    results.push(self.execute_one(host, call)?);
                }
                Ok(Bytes::from(results.abi_encode()))
            }
            AccountCall::TransferOwnership { new_owner } => {
                self.set_pending_owner(new_owner);
                Ok(Bytes::new())
            }
            AccountCall::AcceptOwnership => {
                let caller = host.address();
                if self.pending_owner.get() != caller {
                    return Err(AccountError::NotPendingOwner { caller });
                }
                self.set_owner(caller);
                self.set_pending_owner(Address::ZERO);
                Ok(Bytes::new())
            }
            AccountCall::RenounceOwnership => {
                self.set_owner(Address::ZERO);
                self.set_pending_owner(Address::ZERO);
                Ok(Bytes::new())
            }
        }
    }
}
