use alloc::vec::Vec;
use core::cmp::min;

use primitive_types::{H160, H256, U256};

use crate::error::{ExitError, ExitReason};
use crate::frame::Frame;
use crate::utils::u256_to_h256;

/// Identity of one execution context.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Context {
	/// Address that owns the executing code and the storage being
	/// touched.
	pub address: H160,
	/// Immediate caller of this frame.
	pub caller: H160,
	/// Value apparent to `CALLVALUE`. For `DELEGATECALL` this is
	/// inherited, not re-debited.
	pub apparent_value: U256,
}

/// Per-transaction environment, shared by the whole frame tree.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransactionContext {
	/// Transaction origin, as seen by `ORIGIN`.
	pub origin: H160,
	/// Effective gas price, as seen by `GASPRICE`.
	pub gas_price: U256,
}

/// One log entry: emitting address, up to four topics, opaque data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Log {
	/// Address of the emitting context.
	pub address: H160,
	/// Indexed topics.
	pub topics: Vec<H256>,
	/// Unindexed payload.
	pub data: Vec<u8>,
}

/// Transfer from source to target, with given value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transfer {
	/// Source address.
	pub source: H160,
	/// Target address.
	pub target: H160,
	/// Transfer value.
	pub value: U256,
}

/// Call scheme.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum CallScheme {
	/// `CALL`: callee runs under its own address, value moves.
	Call,
	/// `CALLCODE`: callee code runs under the caller's address; value
	/// is accounted but no balance actually moves.
	CallCode,
	/// `DELEGATECALL`: address, caller and apparent value are all
	/// inherited from the parent.
	DelegateCall,
}

/// Create scheme. Only the nonce-derived legacy scheme exists here.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum CreateScheme {
	/// `keccak(rlp([sender, nonce]))[12..]`.
	Legacy {
		/// Creating address.
		caller: H160,
	},
}

/// What the state backend and block environment offer to opcode
/// handlers. Every method is synchronous; the call/create protocol is
/// the only operation that leaves the frame, and it does so through a
/// trap to the outer driver rather than through this trait.
pub trait Handler {
	/// Balance of an account.
	fn balance(&self, address: H160) -> U256;
	/// Code of an account.
	fn code(&self, address: H160) -> Vec<u8>;
	/// Code size of an account.
	fn code_size(&self, address: H160) -> U256;
	/// Whether an account exists at all.
	fn exists(&self, address: H160) -> bool;
	/// Whether an account is empty: zero nonce, zero balance, no code.
	fn is_empty(&self, address: H160) -> bool;
	/// Whether an account is already scheduled for deletion in this
	/// transaction.
	fn deleted(&self, address: H160) -> bool;

	/// Storage value; absent keys read zero.
	fn storage(&self, address: H160, key: H256) -> H256;
	/// Set a storage value; zero values are stored as absent.
	fn set_storage(&mut self, address: H160, key: H256, value: H256) -> Result<(), ExitError>;

	/// Append a log entry.
	fn log(&mut self, log: Log) -> Result<(), ExitError>;
	/// Schedule deletion of `address` with funds going to
	/// `beneficiary`. Returns whether this is the first selfdestruct of
	/// `address` in the transaction; only the first insertion earns the
	/// refund.
	fn mark_delete(&mut self, address: H160, beneficiary: H160) -> bool;
	/// Move value between accounts, failing on insufficient balance.
	fn transfer(&mut self, transfer: Transfer) -> Result<(), ExitError>;
	/// Zero the balance of an account.
	fn reset_balance(&mut self, address: H160);

	/// Hash of a historical block. Failures for ancient blocks read as
	/// zero, never as an error.
	fn block_hash(&self, number: U256) -> H256;
	/// Current block number.
	fn block_number(&self) -> U256;
	/// Current block beneficiary.
	fn block_coinbase(&self) -> H160;
	/// Current block timestamp.
	fn block_timestamp(&self) -> U256;
	/// Current block difficulty.
	fn block_difficulty(&self) -> U256;
	/// Current block gas limit.
	fn block_gas_limit(&self) -> U256;
}

/// Operand bundle a `CALL`-family opcode hands to the outer driver.
/// Operands are already popped and the memory regions already priced
/// and grown when this is constructed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CallTrapData {
	/// Which member of the call family trapped.
	pub scheme: CallScheme,
	/// Address whose code will run.
	pub target: H160,
	/// Requested gas, untruncated.
	pub gas: U256,
	/// Balance movement, if any. `None` for `DELEGATECALL`.
	pub transfer: Option<Transfer>,
	/// Input bytes, read out of the parent memory.
	pub input: Vec<u8>,
	/// Return-data target region in the parent memory.
	pub out_offset: U256,
	/// Return-data region length.
	pub out_len: U256,
	/// Context the callee runs under.
	pub context: Context,
}

impl CallTrapData {
	/// Feed a finished (or skipped) sub-call back into the parent
	/// frame: bounded return-data copy, then the status word.
	pub fn feedback(
		&self,
		reason: &ExitReason,
		retbuf: &[u8],
		parent: &mut Frame,
	) -> Result<(), ExitError> {
		match reason {
			ExitReason::Succeed(_) => {
				let target_len = min(self.out_len, U256::from(retbuf.len()));
				parent.memory.copy_large(
					self.out_offset,
					U256::zero(),
					target_len,
					retbuf,
				)?;
				parent.stack.push(u256_to_h256(U256::one()))?;
			}
			ExitReason::Exception(_) | ExitReason::Fatal(_) => {
				parent.stack.push(H256::default())?;
			}
		}
		Ok(())
	}
}

/// Operand bundle a `CREATE` opcode hands to the outer driver.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreateTrapData {
	/// Address creating the contract.
	pub scheme: CreateScheme,
	/// Endowment for the new account.
	pub value: U256,
	/// Init code, read out of the parent memory.
	pub init_code: Vec<u8>,
}

impl CreateTrapData {
	/// Feed a finished (or skipped) create back into the parent frame:
	/// the created address on success, zero otherwise.
	pub fn feedback(
		&self,
		result: Result<H160, ()>,
		parent: &mut Frame,
	) -> Result<(), ExitError> {
		match result {
			Ok(address) => parent.stack.push(address.into())?,
			Err(()) => parent.stack.push(H256::default())?,
		}
		Ok(())
	}
}

/// A trapped call or create, to be resolved by the outer driver.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CallCreateTrapData {
	/// `CALL`, `CALLCODE` or `DELEGATECALL`.
	Call(CallTrapData),
	/// `CREATE`.
	Create(CreateTrapData),
}
