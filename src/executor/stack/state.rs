use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::mem;

use primitive_types::{H160, H256, U256};

use crate::backend::{Apply, Backend, Basic};
use crate::interpreter::{ExitError, ExitFatal, Handler, Log, Transfer};

/// State surface the stack executor drives: everything opcode handlers
/// need ([Handler]) plus checkpointing and the account mutations of the
/// call/create protocol.
pub trait StackState: Handler {
	/// Effective gas price of the enclosing transaction.
	fn gas_price(&self) -> U256;
	/// Nonce of an account.
	fn nonce(&self, address: H160) -> U256;
	/// Bump the nonce of an account.
	fn inc_nonce(&mut self, address: H160);
	/// Install code on an account (contract creation).
	fn set_code(&mut self, address: H160, code: Vec<u8>);
	/// Pull an account into the working copy.
	fn touch(&mut self, address: H160);

	/// Open a checkpoint for a frame about to run.
	fn enter(&mut self);
	/// Merge the innermost checkpoint into its parent.
	fn exit_commit(&mut self) -> Result<(), ExitError>;
	/// Discard the innermost checkpoint. Logs, storage writes and
	/// scheduled deletions made under it are dropped together.
	fn exit_revert(&mut self) -> Result<(), ExitError>;
}

#[derive(Clone, Debug)]
struct StackAccount {
	basic: Basic,
	code: Option<Vec<u8>>,
}

/// One checkpoint layer of the working copy: local account and storage
/// writes, logs, and the selfdestruct set, chained to the layer
/// beneath. Reads walk the chain and fall through to the backend;
/// writes land in the top layer only, so discarding a layer undoes
/// exactly one frame's effects.
#[derive(Clone, Debug)]
pub struct MemoryStackSubstate {
	parent: Option<Box<MemoryStackSubstate>>,
	logs: Vec<Log>,
	accounts: BTreeMap<H160, StackAccount>,
	storages: BTreeMap<(H160, H256), H256>,
	// Selfdestruct set: contract to beneficiary, first insertion wins.
	deletes: BTreeMap<H160, H160>,
}

impl Default for MemoryStackSubstate {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryStackSubstate {
	/// A fresh, empty working copy.
	#[must_use]
	pub const fn new() -> Self {
		Self {
			parent: None,
			logs: Vec::new(),
			accounts: BTreeMap::new(),
			storages: BTreeMap::new(),
			deletes: BTreeMap::new(),
		}
	}

	/// Logs visible at this layer, excluding reverted ones.
	#[must_use]
	pub fn logs(&self) -> &[Log] {
		&self.logs
	}

	/// Collapse the finished working copy into appliable per-account
	/// changes plus the accumulated logs. Scheduled deletions become
	/// [Apply::Delete]; zero storage values erase their keys.
	#[must_use]
	pub fn deconstruct<B: Backend>(
		self,
		backend: &B,
	) -> (
		Vec<Apply<BTreeMap<H256, H256>>>,
		Vec<Log>,
	) {
		debug_assert!(self.parent.is_none());

		let mut applies = Vec::<Apply<BTreeMap<H256, H256>>>::new();

		let mut addresses = alloc::collections::BTreeSet::new();
		for address in self.accounts.keys() {
			addresses.insert(*address);
		}
		for (address, _) in self.storages.keys() {
			addresses.insert(*address);
		}

		for address in addresses {
			if self.deletes.contains_key(&address) {
				continue;
			}

			let mut storage = BTreeMap::new();
			for ((oa, ok), ov) in &self.storages {
				if *oa == address {
					storage.insert(*ok, *ov);
				}
			}

			let (basic, code) = match self.accounts.get(&address) {
				Some(account) => (account.basic.clone(), account.code.clone()),
				None => (backend.basic(address), None),
			};

			applies.push(Apply::Modify {
				address,
				basic,
				code,
				storage,
			});
		}

		for address in self.deletes.keys() {
			applies.push(Apply::Delete { address: *address });
		}

		(applies, self.logs)
	}

	/// Open a checkpoint layer.
	pub fn enter(&mut self) {
		let mut entering = Self::new();
		mem::swap(&mut entering, self);
		self.parent = Some(Box::new(entering));
	}

	/// Merge the innermost layer into its parent.
	pub fn exit_commit(&mut self) -> Result<(), ExitError> {
		let mut exited = *self
			.parent
			.take()
			.ok_or(ExitFatal::Backend("commit on root substate".into()))?;
		mem::swap(&mut exited, self);

		self.logs.append(&mut exited.logs);
		self.accounts.append(&mut exited.accounts);
		self.storages.append(&mut exited.storages);
		for (address, beneficiary) in exited.deletes {
			self.deletes.entry(address).or_insert(beneficiary);
		}

		Ok(())
	}

	/// Discard the innermost layer, logs included.
	pub fn exit_revert(&mut self) -> Result<(), ExitError> {
		let mut exited = *self
			.parent
			.take()
			.ok_or(ExitFatal::Backend("revert on root substate".into()))?;
		mem::swap(&mut exited, self);

		Ok(())
	}

	fn known_account(&self, address: H160) -> Option<&StackAccount> {
		if let Some(account) = self.accounts.get(&address) {
			Some(account)
		} else if let Some(parent) = self.parent.as_ref() {
			parent.known_account(address)
		} else {
			None
		}
	}

	fn known_storage(&self, address: H160, key: H256) -> Option<H256> {
		if let Some(value) = self.storages.get(&(address, key)) {
			return Some(*value);
		}

		if let Some(parent) = self.parent.as_ref() {
			return parent.known_storage(address, key);
		}

		None
	}

	/// Whether the address is in the selfdestruct set of any layer.
	#[must_use]
	pub fn deleted(&self, address: H160) -> bool {
		if self.deletes.contains_key(&address) {
			return true;
		}

		if let Some(parent) = self.parent.as_ref() {
			return parent.deleted(address);
		}

		false
	}

	fn account_mut<B: Backend>(&mut self, address: H160, backend: &B) -> &mut StackAccount {
		if !self.accounts.contains_key(&address) {
			let account = self
				.known_account(address)
				.cloned()
				.unwrap_or_else(|| StackAccount {
					basic: backend.basic(address),
					code: None,
				});
			self.accounts.insert(address, account);
		}

		self.accounts
			.get_mut(&address)
			.expect("account was just inserted; qed")
	}
}

/// The working state of one transaction: a checkpointed overlay over a
/// read-only [Backend].
pub struct MemoryStackState<'backend, B> {
	backend: &'backend B,
	substate: MemoryStackSubstate,
}

impl<'backend, B: Backend> MemoryStackState<'backend, B> {
	/// Create a fresh working state over the backend.
	pub fn new(backend: &'backend B) -> Self {
		Self {
			backend,
			substate: MemoryStackSubstate::new(),
		}
	}

	/// The backend beneath.
	pub fn backend(&self) -> &'backend B {
		self.backend
	}

	/// The overlay itself.
	pub fn substate(&self) -> &MemoryStackSubstate {
		&self.substate
	}

	/// Collapse into appliable changes and logs.
	#[must_use]
	pub fn deconstruct(
		self,
	) -> (
		Vec<Apply<BTreeMap<H256, H256>>>,
		Vec<Log>,
	) {
		self.substate.deconstruct(self.backend)
	}
}

impl<'backend, B: Backend> Handler for MemoryStackState<'backend, B> {
	fn balance(&self, address: H160) -> U256 {
		self.substate
			.known_account(address)
			.map(|a| a.basic.balance)
			.unwrap_or_else(|| self.backend.basic(address).balance)
	}

	fn code(&self, address: H160) -> Vec<u8> {
		self.substate
			.known_account(address)
			.and_then(|a| a.code.clone())
			.unwrap_or_else(|| self.backend.code(address))
	}

	fn code_size(&self, address: H160) -> U256 {
		U256::from(self.code(address).len())
	}

	fn exists(&self, address: H160) -> bool {
		self.substate.known_account(address).is_some() || self.backend.exists(address)
	}

	fn is_empty(&self, address: H160) -> bool {
		self.balance(address) == U256::zero()
			&& self.nonce(address) == U256::zero()
			&& self.code_size(address) == U256::zero()
	}

	fn deleted(&self, address: H160) -> bool {
		self.substate.deleted(address)
	}

	fn storage(&self, address: H160, key: H256) -> H256 {
		self.substate
			.known_storage(address, key)
			.unwrap_or_else(|| self.backend.storage(address, key))
	}

	fn set_storage(&mut self, address: H160, key: H256, value: H256) -> Result<(), ExitError> {
		// Zero markers shadow the backend value; absence is applied at
		// deconstruction.
		self.substate.storages.insert((address, key), value);
		Ok(())
	}

	fn log(&mut self, log: Log) -> Result<(), ExitError> {
		self.substate.logs.push(log);
		Ok(())
	}

	fn mark_delete(&mut self, address: H160, beneficiary: H160) -> bool {
		if self.substate.deleted(address) {
			return false;
		}

		self.substate.deletes.insert(address, beneficiary);
		true
	}

	fn transfer(&mut self, transfer: Transfer) -> Result<(), ExitError> {
		{
			let source = self.substate.account_mut(transfer.source, self.backend);
			if source.basic.balance < transfer.value {
				return Err(crate::interpreter::ExitException::OutOfFund.into());
			}
			source.basic.balance -= transfer.value;
		}

		{
			let target = self.substate.account_mut(transfer.target, self.backend);
			target.basic.balance = target.basic.balance.saturating_add(transfer.value);
		}

		Ok(())
	}

	fn reset_balance(&mut self, address: H160) {
		self.substate.account_mut(address, self.backend).basic.balance = U256::zero();
	}

	fn block_hash(&self, number: U256) -> H256 {
		self.backend.block_hash(number)
	}

	fn block_number(&self) -> U256 {
		self.backend.block_number()
	}

	fn block_coinbase(&self) -> H160 {
		self.backend.block_coinbase()
	}

	fn block_timestamp(&self) -> U256 {
		self.backend.block_timestamp()
	}

	fn block_difficulty(&self) -> U256 {
		self.backend.block_difficulty()
	}

	fn block_gas_limit(&self) -> U256 {
		self.backend.block_gas_limit()
	}
}

impl<'backend, B: Backend> StackState for MemoryStackState<'backend, B> {
	fn gas_price(&self) -> U256 {
		self.backend.gas_price()
	}

	fn nonce(&self, address: H160) -> U256 {
		self.substate
			.known_account(address)
			.map(|a| a.basic.nonce)
			.unwrap_or_else(|| self.backend.basic(address).nonce)
	}

	fn inc_nonce(&mut self, address: H160) {
		let account = self.substate.account_mut(address, self.backend);
		account.basic.nonce += U256::one();
	}

	fn set_code(&mut self, address: H160, code: Vec<u8>) {
		self.substate.account_mut(address, self.backend).code = Some(code);
	}

	fn touch(&mut self, address: H160) {
		self.substate.account_mut(address, self.backend);
	}

	fn enter(&mut self) {
		self.substate.enter();
	}

	fn exit_commit(&mut self) -> Result<(), ExitError> {
		self.substate.exit_commit()
	}

	fn exit_revert(&mut self) -> Result<(), ExitError> {
		self.substate.exit_revert()
	}
}
