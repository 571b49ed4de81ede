//! Per-frame gas metering.
//!
//! The execution loop charges each opcode's base fee from the metadata
//! table, then calls [record_dynamic_cost] for the opcodes whose price
//! depends on operands or state. Memory expansion is priced here from
//! stack peeks, before the handler grows the buffer, so a handler never
//! touches an unpaid range.

use primitive_types::{H256, U256};

use crate::error::ExitException;
use crate::opcode::Opcode;
use crate::runtime::{Context, Handler};
use crate::stack::Stack;
use crate::utils::{h256_to_h160, h256_to_u256};

/// Gas cost constants. The schedule matching the 63/64 forwarding rule,
/// with the two-tier `SSTORE` pricing.
pub mod consts {
	/// Gas for free opcodes.
	pub const G_ZERO: u64 = 0;
	/// Gas for base-tier opcodes.
	pub const G_BASE: u64 = 2;
	/// Gas for very-low-tier opcodes.
	pub const G_VERYLOW: u64 = 3;
	/// Gas for low-tier opcodes.
	pub const G_LOW: u64 = 5;
	/// Gas for mid-tier opcodes.
	pub const G_MID: u64 = 8;
	/// Gas for high-tier opcodes.
	pub const G_HIGH: u64 = 10;

	/// Gas for `EXTCODESIZE` and `EXTCODECOPY`.
	pub const G_EXTCODE: u64 = 700;
	/// Gas for `BALANCE`.
	pub const G_BALANCE: u64 = 400;
	/// Gas for `SLOAD`.
	pub const G_SLOAD: u64 = 200;
	/// Gas for `JUMPDEST`.
	pub const G_JUMPDEST: u64 = 1;
	/// Gas for `BLOCKHASH`.
	pub const G_BLOCKHASH: u64 = 20;

	/// Gas for an `SSTORE` that creates a value from zero.
	pub const G_SSET: u64 = 20000;
	/// Gas for any other `SSTORE`.
	pub const G_SRESET: u64 = 5000;
	/// Refund for an `SSTORE` that clears a value to zero.
	pub const R_SCLEAR: u64 = 15000;

	/// Gas for `SELFDESTRUCT`.
	pub const G_SUICIDE: u64 = 5000;
	/// Refund for the first `SELFDESTRUCT` of an address.
	pub const R_SUICIDE: u64 = 24000;

	/// Gas for `CREATE`.
	pub const G_CREATE: u64 = 32000;
	/// Gas per byte of created contract code.
	pub const G_CODEDEPOSIT: u64 = 200;

	/// Gas for the `CALL` family.
	pub const G_CALL: u64 = 700;
	/// Surcharge for a value-transferring call.
	pub const G_CALLVALUE: u64 = 9000;
	/// Free allowance granted to the callee of a value-transferring
	/// call, on top of the forwarded gas.
	pub const G_CALLSTIPEND: u64 = 2300;
	/// Surcharge for touching a nonexistent or empty account with
	/// value.
	pub const G_NEWACCOUNT: u64 = 25000;

	/// Gas for `EXP`.
	pub const G_EXP: u64 = 10;
	/// Gas per significant byte of the `EXP` exponent.
	pub const G_EXPBYTE: u64 = 10;

	/// Linear coefficient of the memory expansion price.
	pub const G_MEMORY: u64 = 3;
	/// Gas per word of the `*COPY` family.
	pub const G_COPY: u64 = 3;

	/// Gas for `SHA3`.
	pub const G_SHA3: u64 = 30;
	/// Gas per hashed word of `SHA3`.
	pub const G_SHA3WORD: u64 = 6;

	/// Gas per `LOGn`.
	pub const G_LOG: u64 = 375;
	/// Gas per byte of log data.
	pub const G_LOGDATA: u64 = 8;
	/// Gas per log topic.
	pub const G_LOGTOPIC: u64 = 375;
}

/// The 63/64 rule: the most gas a frame may forward to a sub-frame.
#[inline]
#[must_use]
pub const fn l64(gas: u64) -> u64 {
	gas - gas / 64
}

/// Monotonically decreasing gas counter of one frame.
///
/// `memory_gas` holds the highest memory price paid so far, so repeated
/// access to an already-paid range costs nothing.
#[derive(Clone, Debug)]
pub struct Gasometer {
	gas_limit: u64,
	used_gas: u64,
	memory_gas: u64,
	refunded_gas: u64,
}

impl Gasometer {
	/// Create a new gasometer with the given gas limit.
	#[must_use]
	pub const fn new(gas_limit: u64) -> Self {
		Self {
			gas_limit,
			used_gas: 0,
			memory_gas: 0,
			refunded_gas: 0,
		}
	}

	/// Gas limit this frame started with.
	#[inline]
	#[must_use]
	pub const fn gas_limit(&self) -> u64 {
		self.gas_limit
	}

	/// Remaining gas. Never negative: a charge that cannot be covered
	/// fails instead of subtracting.
	#[inline]
	#[must_use]
	pub const fn gas(&self) -> u64 {
		self.gas_limit - self.used_gas - self.memory_gas
	}

	/// Total gas consumed so far, memory expansion included.
	#[inline]
	#[must_use]
	pub const fn total_used_gas(&self) -> u64 {
		self.used_gas + self.memory_gas
	}

	/// Accumulated refund counter. Applied at transaction end, capped
	/// at half the gas used.
	#[inline]
	#[must_use]
	pub const fn refunded_gas(&self) -> u64 {
		self.refunded_gas
	}

	/// Charge an explicit cost, failing with `OutOfGas` when the
	/// counter would go negative.
	pub fn record_cost(&mut self, cost: u64) -> Result<(), ExitException> {
		let all_gas_cost = self
			.total_used_gas()
			.checked_add(cost)
			.ok_or(ExitException::OutOfGas)?;
		if self.gas_limit < all_gas_cost {
			return Err(ExitException::OutOfGas);
		}

		self.used_gas += cost;
		Ok(())
	}

	/// Return gas to the meter: a child's leftover, or a forward that
	/// was never entered.
	pub fn record_stipend(&mut self, stipend: u64) {
		self.used_gas -= stipend;
	}

	/// Credit the refund counter.
	pub fn record_refund(&mut self, refund: u64) {
		self.refunded_gas += refund;
	}

	/// Forfeit everything. Used when the frame exits exceptionally.
	pub fn fail(&mut self) {
		self.memory_gas = 0;
		self.refunded_gas = 0;
		self.used_gas = self.gas_limit;
	}

	/// Price the memory range `offset..offset + len` with the
	/// quadratic rule `3·w + w²/512` and charge the delta over the
	/// highest cost already paid.
	pub fn record_memory_range(&mut self, offset: U256, len: U256) -> Result<(), ExitException> {
		if len == U256::zero() {
			return Ok(());
		}

		let end = offset.checked_add(len).ok_or(ExitException::OutOfGas)?;
		if end > U256::from(u64::MAX) {
			return Err(ExitException::OutOfGas);
		}
		let end = end.as_u64();
		let words = end / 32 + u64::from(end % 32 != 0);

		let cost = memory_cost(words)?;
		if cost <= self.memory_gas {
			return Ok(());
		}

		let all_gas_cost = self
			.used_gas
			.checked_add(cost)
			.ok_or(ExitException::OutOfGas)?;
		if self.gas_limit < all_gas_cost {
			return Err(ExitException::OutOfGas);
		}

		self.memory_gas = cost;
		Ok(())
	}
}

/// Memory price for a total of `words` 32-byte words.
pub fn memory_cost(words: u64) -> Result<u64, ExitException> {
	let words = u128::from(words);
	let cost = u128::from(consts::G_MEMORY) * words + words * words / 512;
	u64::try_from(cost).map_err(|_| ExitException::OutOfGas)
}

fn word_count(len: U256) -> Result<U256, ExitException> {
	let (words, rem) = (len / U256::from(32), len % U256::from(32));
	words
		.checked_add(U256::from(u64::from(rem != U256::zero())))
		.ok_or(ExitException::OutOfGas)
}

fn linear_word_cost(len: U256, per_word: u64) -> Result<u64, ExitException> {
	let gas = word_count(len)?
		.checked_mul(U256::from(per_word))
		.ok_or(ExitException::OutOfGas)?;
	if gas > U256::from(u64::MAX) {
		return Err(ExitException::OutOfGas);
	}
	Ok(gas.as_u64())
}

/// Word-dependent part of the `SHA3` price.
pub fn sha3_cost(len: U256) -> Result<u64, ExitException> {
	linear_word_cost(len, consts::G_SHA3WORD)
}

/// Word-dependent part of the `*COPY` price.
pub fn copy_cost(len: U256) -> Result<u64, ExitException> {
	linear_word_cost(len, consts::G_COPY)
}

/// Topic and data part of the `LOGn` price.
pub fn log_cost(n: u8, len: U256) -> Result<u64, ExitException> {
	let gas = U256::from(consts::G_LOGTOPIC * u64::from(n))
		.checked_add(
			U256::from(consts::G_LOGDATA)
				.checked_mul(len)
				.ok_or(ExitException::OutOfGas)?,
		)
		.ok_or(ExitException::OutOfGas)?;
	if gas > U256::from(u64::MAX) {
		return Err(ExitException::OutOfGas);
	}
	Ok(gas.as_u64())
}

/// Byte-length part of the `EXP` price. A zero exponent charges the
/// base fee only.
#[must_use]
pub fn exp_cost(power: U256) -> u64 {
	if power == U256::zero() {
		0
	} else {
		let bytes = (power.bits() as u64 + 7) / 8;
		consts::G_EXPBYTE * bytes
	}
}

/// Two-tier `SSTORE` price: `(cost, refund)`.
#[must_use]
pub fn sstore_cost(current: H256, new: H256) -> (u64, u64) {
	if current == H256::default() && new != H256::default() {
		(consts::G_SSET, 0)
	} else if current != H256::default() && new == H256::default() {
		(consts::G_SRESET, consts::R_SCLEAR)
	} else {
		(consts::G_SRESET, 0)
	}
}

fn peek_u256(stack: &Stack, no_from_top: usize) -> Result<U256, ExitException> {
	Ok(h256_to_u256(stack.peek(no_from_top)?))
}

/// Charge the operand- and state-dependent part of an opcode's price.
/// Runs after the base fee, before the handler.
pub fn record_dynamic_cost<H: Handler>(
	opcode: Opcode,
	stack: &Stack,
	context: &Context,
	handler: &H,
	gasometer: &mut Gasometer,
) -> Result<(), ExitException> {
	match opcode {
		Opcode::SHA3 => {
			let (offset, len) = (peek_u256(stack, 0)?, peek_u256(stack, 1)?);
			gasometer.record_memory_range(offset, len)?;
			gasometer.record_cost(sha3_cost(len)?)?;
		}
		Opcode::EXP => {
			gasometer.record_cost(exp_cost(peek_u256(stack, 1)?))?;
		}
		Opcode::CALLDATACOPY | Opcode::CODECOPY => {
			let (offset, len) = (peek_u256(stack, 0)?, peek_u256(stack, 2)?);
			gasometer.record_memory_range(offset, len)?;
			gasometer.record_cost(copy_cost(len)?)?;
		}
		Opcode::EXTCODECOPY => {
			let (offset, len) = (peek_u256(stack, 1)?, peek_u256(stack, 3)?);
			gasometer.record_memory_range(offset, len)?;
			gasometer.record_cost(copy_cost(len)?)?;
		}
		Opcode::MLOAD | Opcode::MSTORE => {
			gasometer.record_memory_range(peek_u256(stack, 0)?, U256::from(32))?;
		}
		Opcode::MSTORE8 => {
			gasometer.record_memory_range(peek_u256(stack, 0)?, U256::one())?;
		}
		Opcode::RETURN => {
			gasometer.record_memory_range(peek_u256(stack, 0)?, peek_u256(stack, 1)?)?;
		}
		Opcode(n) if n >= Opcode::LOG0.as_u8() && n <= Opcode::LOG4.as_u8() => {
			let (offset, len) = (peek_u256(stack, 0)?, peek_u256(stack, 1)?);
			gasometer.record_memory_range(offset, len)?;
			gasometer.record_cost(log_cost(n - Opcode::LOG0.as_u8(), len)?)?;
		}
		Opcode::SSTORE => {
			let key = stack.peek(0)?;
			let new = stack.peek(1)?;
			let current = handler.storage(context.address, key);
			let (cost, refund) = sstore_cost(current, new);
			gasometer.record_cost(cost)?;
			if refund != 0 {
				gasometer.record_refund(refund);
			}
		}
		Opcode::SELFDESTRUCT => {
			let target = h256_to_h160(stack.peek(0)?);
			if (!handler.exists(target) || handler.is_empty(target))
				&& handler.balance(context.address) > U256::zero()
			{
				gasometer.record_cost(consts::G_NEWACCOUNT)?;
			}
		}
		Opcode::CREATE => {
			gasometer.record_memory_range(peek_u256(stack, 1)?, peek_u256(stack, 2)?)?;
		}
		Opcode::CALL | Opcode::CALLCODE => {
			gasometer.record_memory_range(peek_u256(stack, 3)?, peek_u256(stack, 4)?)?;
			gasometer.record_memory_range(peek_u256(stack, 5)?, peek_u256(stack, 6)?)?;

			let value = peek_u256(stack, 2)?;
			if value != U256::zero() {
				gasometer.record_cost(consts::G_CALLVALUE)?;

				if opcode == Opcode::CALL {
					let target = h256_to_h160(stack.peek(1)?);
					if !handler.exists(target) || handler.is_empty(target) {
						gasometer.record_cost(consts::G_NEWACCOUNT)?;
					}
				}
			}
		}
		Opcode::DELEGATECALL => {
			gasometer.record_memory_range(peek_u256(stack, 2)?, peek_u256(stack, 3)?)?;
			gasometer.record_memory_range(peek_u256(stack, 4)?, peek_u256(stack, 5)?)?;
		}
		_ => {}
	}

	Ok(())
}
