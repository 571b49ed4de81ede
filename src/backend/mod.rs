//! Persistent state behind the executor: account reads, block
//! environment, and the transaction-end commit surface.

mod memory;

pub use self::memory::{MemoryAccount, MemoryBackend, MemoryVicinity};

use alloc::vec::Vec;

use primitive_types::{H160, H256, U256};

use crate::interpreter::Log;

/// Basic account information: the pieces every balance or nonce check
/// needs.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Basic {
	/// Account balance.
	pub balance: U256,
	/// Account nonce.
	pub nonce: U256,
}

/// Read surface of the persistent state and block environment. All
/// mutation goes through the executor's checkpointed overlay and lands
/// here only via [ApplyBackend] at transaction end.
pub trait Backend {
	/// Effective gas price of the enclosing transaction.
	fn gas_price(&self) -> U256;

	/// Hash of a historical block; unknown blocks read zero.
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

	/// Whether an account exists.
	fn exists(&self, address: H160) -> bool;
	/// Balance and nonce of an account.
	fn basic(&self, address: H160) -> Basic;
	/// Code of an account.
	fn code(&self, address: H160) -> Vec<u8>;
	/// Storage value of an account at a key; absent keys read zero.
	fn storage(&self, address: H160, key: H256) -> H256;
}

/// Net effect of a transaction on one account.
#[derive(Clone, Debug)]
pub enum Apply<I> {
	/// The account survives with the given state.
	Modify {
		/// Address of the account.
		address: H160,
		/// New balance and nonce.
		basic: Basic,
		/// New code, if it changed.
		code: Option<Vec<u8>>,
		/// Changed storage keys. A zero value erases the key.
		storage: I,
	},
	/// The account is deleted (selfdestruct).
	Delete {
		/// Address of the account.
		address: H160,
	},
}

/// Commit surface: applies the frame tree's net effect at transaction
/// end.
pub trait ApplyBackend {
	/// Apply the given account changes and logs. With `delete_empty`,
	/// accounts left empty are removed entirely.
	fn apply<A, I, L>(&mut self, values: A, logs: L, delete_empty: bool)
	where
		A: IntoIterator<Item = Apply<I>>,
		I: IntoIterator<Item = (H256, H256)>,
		L: IntoIterator<Item = Log>;
}
