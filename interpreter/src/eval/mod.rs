//! Opcode handler implementations.
//!
//! Every handler shares one signature so the dispatch table can hold
//! plain function pointers. Operand arity and the base fee are already
//! validated and charged by the frame loop before a handler runs.

#[macro_use]
mod macros;
pub mod arithmetic;
pub mod bitwise;
mod misc;
mod system;

use core::ops::{BitAnd, BitOr, BitXor};

use primitive_types::U256;

use crate::error::ExitSucceed;
use crate::etable::Control;
use crate::frame::Frame;
use crate::opcode::Opcode;
use crate::runtime::{CallScheme, Handler};

/// `STOP`
pub fn eval_stop<H: Handler>(_machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	Control::Exit(ExitSucceed::Stopped.into())
}

/// `ADD`
pub fn eval_add<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	op2_u256_tuple!(machine, overflowing_add)
}

/// `MUL`
pub fn eval_mul<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	op2_u256_tuple!(machine, overflowing_mul)
}

/// `SUB`
pub fn eval_sub<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	op2_u256_tuple!(machine, overflowing_sub)
}

/// `DIV`
pub fn eval_div<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	op2_u256_fn!(machine, self::arithmetic::div)
}

/// `SDIV`
pub fn eval_sdiv<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	op2_u256_fn!(machine, self::arithmetic::sdiv)
}

/// `MOD`
pub fn eval_mod<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	op2_u256_fn!(machine, self::arithmetic::rem)
}

/// `SMOD`
pub fn eval_smod<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	op2_u256_fn!(machine, self::arithmetic::srem)
}

/// `ADDMOD`
pub fn eval_addmod<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	op3_u256_fn!(machine, self::arithmetic::addmod)
}

/// `MULMOD`
pub fn eval_mulmod<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	op3_u256_fn!(machine, self::arithmetic::mulmod)
}

/// `EXP`
pub fn eval_exp<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	op2_u256_fn!(machine, self::arithmetic::exp)
}

/// `SIGNEXTEND`
pub fn eval_signextend<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	op2_u256_fn!(machine, self::arithmetic::signextend)
}

/// `LT`
pub fn eval_lt<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	op2_u256_bool_ref!(machine, lt)
}

/// `GT`
pub fn eval_gt<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	op2_u256_bool_ref!(machine, gt)
}

/// `SLT`
pub fn eval_slt<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	op2_u256_fn!(machine, self::bitwise::slt)
}

/// `SGT`
pub fn eval_sgt<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	op2_u256_fn!(machine, self::bitwise::sgt)
}

/// `EQ`
pub fn eval_eq<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	op2_u256_bool_ref!(machine, eq)
}

/// `ISZERO`
pub fn eval_iszero<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	op1_u256_fn!(machine, self::bitwise::iszero)
}

/// `AND`
pub fn eval_and<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	op2_u256!(machine, bitand)
}

/// `OR`
pub fn eval_or<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	op2_u256!(machine, bitor)
}

/// `XOR`
pub fn eval_xor<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	op2_u256!(machine, bitxor)
}

/// `NOT`
pub fn eval_not<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	op1_u256_fn!(machine, self::bitwise::not)
}

/// `BYTE`
pub fn eval_byte<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	op2_u256_fn!(machine, self::bitwise::byte)
}

/// `SHA3`
pub fn eval_sha3<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::system::sha3(machine)
}

/// `ADDRESS`
pub fn eval_address<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::system::address(machine)
}

/// `BALANCE`
pub fn eval_balance<H: Handler>(machine: &mut Frame, handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::system::balance(machine, handle)
}

/// `ORIGIN`
pub fn eval_origin<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::system::origin(machine)
}

/// `CALLER`
pub fn eval_caller<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::system::caller(machine)
}

/// `CALLVALUE`
pub fn eval_callvalue<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::system::callvalue(machine)
}

/// `CALLDATALOAD`
pub fn eval_calldataload<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::misc::calldataload(machine)
}

/// `CALLDATASIZE`
pub fn eval_calldatasize<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::misc::calldatasize(machine)
}

/// `CALLDATACOPY`
pub fn eval_calldatacopy<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::misc::calldatacopy(machine)
}

/// `CODESIZE`
pub fn eval_codesize<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::misc::codesize(machine)
}

/// `CODECOPY`
pub fn eval_codecopy<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::misc::codecopy(machine)
}

/// `GASPRICE`
pub fn eval_gasprice<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::system::gasprice(machine)
}

/// `EXTCODESIZE`
pub fn eval_extcodesize<H: Handler>(machine: &mut Frame, handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::system::extcodesize(machine, handle)
}

/// `EXTCODECOPY`
pub fn eval_extcodecopy<H: Handler>(machine: &mut Frame, handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::system::extcodecopy(machine, handle)
}

/// `BLOCKHASH`
pub fn eval_blockhash<H: Handler>(machine: &mut Frame, handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::system::blockhash(machine, handle)
}

/// `COINBASE`
pub fn eval_coinbase<H: Handler>(machine: &mut Frame, handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::system::coinbase(machine, handle)
}

/// `TIMESTAMP`
pub fn eval_timestamp<H: Handler>(machine: &mut Frame, handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::system::timestamp(machine, handle)
}

/// `NUMBER`
pub fn eval_number<H: Handler>(machine: &mut Frame, handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::system::number(machine, handle)
}

/// `DIFFICULTY`
pub fn eval_difficulty<H: Handler>(machine: &mut Frame, handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::system::difficulty(machine, handle)
}

/// `GASLIMIT`
pub fn eval_gaslimit<H: Handler>(machine: &mut Frame, handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::system::gaslimit(machine, handle)
}

/// `POP`
pub fn eval_pop<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::misc::pop(machine)
}

/// `MLOAD`
pub fn eval_mload<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::misc::mload(machine)
}

/// `MSTORE`
pub fn eval_mstore<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::misc::mstore(machine)
}

/// `MSTORE8`
pub fn eval_mstore8<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::misc::mstore8(machine)
}

/// `SLOAD`
pub fn eval_sload<H: Handler>(machine: &mut Frame, handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::system::sload(machine, handle)
}

/// `SSTORE`
pub fn eval_sstore<H: Handler>(machine: &mut Frame, handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::system::sstore(machine, handle)
}

/// `JUMP`
pub fn eval_jump<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::misc::jump(machine)
}

/// `JUMPI`
pub fn eval_jumpi<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::misc::jumpi(machine)
}

/// `PC`
pub fn eval_pc<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, position: usize) -> Control {
	self::misc::pc(machine, position)
}

/// `MSIZE`
pub fn eval_msize<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::misc::msize(machine)
}

/// `GAS`
pub fn eval_gas<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::system::gas(machine)
}

/// `JUMPDEST`
pub fn eval_jumpdest<H: Handler>(_machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	Control::Continue(1)
}

/// `PUSHn`, with `n` derived from the opcode byte.
pub fn eval_push<H: Handler>(machine: &mut Frame, _handle: &mut H, opcode: Opcode, position: usize) -> Control {
	self::misc::push(machine, (opcode.as_u8() - 0x5f) as usize, position)
}

/// `DUPn`, with `n` derived from the opcode byte.
pub fn eval_dup<H: Handler>(machine: &mut Frame, _handle: &mut H, opcode: Opcode, _position: usize) -> Control {
	self::misc::dup(machine, (opcode.as_u8() - 0x7f) as usize)
}

/// `SWAPn`, with `n` derived from the opcode byte.
pub fn eval_swap<H: Handler>(machine: &mut Frame, _handle: &mut H, opcode: Opcode, _position: usize) -> Control {
	self::misc::swap(machine, (opcode.as_u8() - 0x8f) as usize)
}

/// `LOGn`, with `n` derived from the opcode byte.
pub fn eval_log<H: Handler>(machine: &mut Frame, handle: &mut H, opcode: Opcode, _position: usize) -> Control {
	self::system::log(machine, opcode.as_u8() - 0xa0, handle)
}

/// `CREATE`
pub fn eval_create<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::system::create(machine)
}

/// `CALL`
pub fn eval_call<H: Handler>(machine: &mut Frame, handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::system::call(machine, CallScheme::Call, handle)
}

/// `CALLCODE`
pub fn eval_callcode<H: Handler>(machine: &mut Frame, handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::system::call(machine, CallScheme::CallCode, handle)
}

/// `DELEGATECALL`
pub fn eval_delegatecall<H: Handler>(machine: &mut Frame, handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::system::call(machine, CallScheme::DelegateCall, handle)
}

/// `RETURN`
pub fn eval_return<H: Handler>(machine: &mut Frame, _handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::misc::ret(machine)
}

/// `SELFDESTRUCT`
pub fn eval_suicide<H: Handler>(machine: &mut Frame, handle: &mut H, _opcode: Opcode, _position: usize) -> Control {
	self::system::suicide(machine, handle)
}
