//! The opcode dispatch table: a fixed 256-entry array of handler
//! function pointers, each carrying its mnemonic, stack arity and base
//! fee. A byte without an entry is an invalid opcode.

use crate::error::ExitReason;
use crate::eval::*;
use crate::frame::Frame;
use crate::gasometer::consts;
use crate::opcode::Opcode;
use crate::runtime::{CallCreateTrapData, Handler};

/// What a handler tells the frame loop to do next.
#[derive(Clone, Debug)]
pub enum Control {
	/// Advance the program counter by the given amount.
	Continue(usize),
	/// Jump to an absolute, already-validated position.
	Jump(usize),
	/// Exit the frame.
	Exit(ExitReason),
	/// Suspend into the call/create protocol.
	Trap(CallCreateTrapData),
}

/// Evaluation function type.
pub type Efn<H> = fn(&mut Frame, &mut H, Opcode, usize) -> Control;

/// Static per-opcode metadata: mnemonic, pop/push arity and base fee.
/// Operand-dependent parts of the price are charged separately by the
/// gasometer.
#[derive(Clone, Copy, Debug)]
pub struct OpcodeMeta {
	/// Canonical mnemonic.
	pub mnemonic: &'static str,
	/// Words popped from the stack.
	pub pops: u8,
	/// Words pushed onto the stack.
	pub pushes: u8,
	/// Base fee, charged before dispatch.
	pub gas: u64,
}

/// One dispatch table entry.
pub struct OpEntry<H> {
	/// Handler to invoke.
	pub eval: Efn<H>,
	/// Static metadata.
	pub meta: OpcodeMeta,
}

impl<H> Clone for OpEntry<H> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<H> Copy for OpEntry<H> {}

const PUSH_MNEMONICS: [&str; 32] = [
	"PUSH1", "PUSH2", "PUSH3", "PUSH4", "PUSH5", "PUSH6", "PUSH7", "PUSH8", "PUSH9", "PUSH10",
	"PUSH11", "PUSH12", "PUSH13", "PUSH14", "PUSH15", "PUSH16", "PUSH17", "PUSH18", "PUSH19",
	"PUSH20", "PUSH21", "PUSH22", "PUSH23", "PUSH24", "PUSH25", "PUSH26", "PUSH27", "PUSH28",
	"PUSH29", "PUSH30", "PUSH31", "PUSH32",
];

const DUP_MNEMONICS: [&str; 16] = [
	"DUP1", "DUP2", "DUP3", "DUP4", "DUP5", "DUP6", "DUP7", "DUP8", "DUP9", "DUP10", "DUP11",
	"DUP12", "DUP13", "DUP14", "DUP15", "DUP16",
];

const SWAP_MNEMONICS: [&str; 16] = [
	"SWAP1", "SWAP2", "SWAP3", "SWAP4", "SWAP5", "SWAP6", "SWAP7", "SWAP8", "SWAP9", "SWAP10",
	"SWAP11", "SWAP12", "SWAP13", "SWAP14", "SWAP15", "SWAP16",
];

const LOG_MNEMONICS: [&str; 5] = ["LOG0", "LOG1", "LOG2", "LOG3", "LOG4"];

macro_rules! entry {
	( $table:ident, $opcode:expr, $eval:expr, $name:expr, $pops:expr, $pushes:expr, $gas:expr ) => {
		$table[$opcode.as_usize()] = Some(OpEntry {
			eval: $eval,
			meta: OpcodeMeta {
				mnemonic: $name,
				pops: $pops,
				pushes: $pushes,
				gas: $gas,
			},
		});
	};
}

/// The dispatch table.
pub struct OpTable<H>([Option<OpEntry<H>>; 256]);

impl<H: Handler> OpTable<H> {
	/// Entry for an opcode, or `None` for an invalid byte.
	#[inline]
	#[must_use]
	pub fn get(&self, opcode: Opcode) -> Option<&OpEntry<H>> {
		self.0[opcode.as_usize()].as_ref()
	}

	/// The full runtime table.
	#[must_use]
	pub const fn runtime() -> Self {
		let mut table: [Option<OpEntry<H>>; 256] = [None; 256];

		entry!(table, Opcode::STOP, eval_stop as _, "STOP", 0, 0, consts::G_ZERO);
		entry!(table, Opcode::ADD, eval_add as _, "ADD", 2, 1, consts::G_VERYLOW);
		entry!(table, Opcode::MUL, eval_mul as _, "MUL", 2, 1, consts::G_LOW);
		entry!(table, Opcode::SUB, eval_sub as _, "SUB", 2, 1, consts::G_VERYLOW);
		entry!(table, Opcode::DIV, eval_div as _, "DIV", 2, 1, consts::G_LOW);
		entry!(table, Opcode::SDIV, eval_sdiv as _, "SDIV", 2, 1, consts::G_LOW);
		entry!(table, Opcode::MOD, eval_mod as _, "MOD", 2, 1, consts::G_LOW);
		entry!(table, Opcode::SMOD, eval_smod as _, "SMOD", 2, 1, consts::G_LOW);
		entry!(table, Opcode::ADDMOD, eval_addmod as _, "ADDMOD", 3, 1, consts::G_MID);
		entry!(table, Opcode::MULMOD, eval_mulmod as _, "MULMOD", 3, 1, consts::G_MID);
		entry!(table, Opcode::EXP, eval_exp as _, "EXP", 2, 1, consts::G_EXP);
		entry!(table, Opcode::SIGNEXTEND, eval_signextend as _, "SIGNEXTEND", 2, 1, consts::G_LOW);

		entry!(table, Opcode::LT, eval_lt as _, "LT", 2, 1, consts::G_VERYLOW);
		entry!(table, Opcode::GT, eval_gt as _, "GT", 2, 1, consts::G_VERYLOW);
		entry!(table, Opcode::SLT, eval_slt as _, "SLT", 2, 1, consts::G_VERYLOW);
		entry!(table, Opcode::SGT, eval_sgt as _, "SGT", 2, 1, consts::G_VERYLOW);
		entry!(table, Opcode::EQ, eval_eq as _, "EQ", 2, 1, consts::G_VERYLOW);
		entry!(table, Opcode::ISZERO, eval_iszero as _, "ISZERO", 1, 1, consts::G_VERYLOW);
		entry!(table, Opcode::AND, eval_and as _, "AND", 2, 1, consts::G_VERYLOW);
		entry!(table, Opcode::OR, eval_or as _, "OR", 2, 1, consts::G_VERYLOW);
		entry!(table, Opcode::XOR, eval_xor as _, "XOR", 2, 1, consts::G_VERYLOW);
		entry!(table, Opcode::NOT, eval_not as _, "NOT", 1, 1, consts::G_VERYLOW);
		entry!(table, Opcode::BYTE, eval_byte as _, "BYTE", 2, 1, consts::G_VERYLOW);

		entry!(table, Opcode::SHA3, eval_sha3 as _, "SHA3", 2, 1, consts::G_SHA3);

		entry!(table, Opcode::ADDRESS, eval_address as _, "ADDRESS", 0, 1, consts::G_BASE);
		entry!(table, Opcode::BALANCE, eval_balance as _, "BALANCE", 1, 1, consts::G_BALANCE);
		entry!(table, Opcode::ORIGIN, eval_origin as _, "ORIGIN", 0, 1, consts::G_BASE);
		entry!(table, Opcode::CALLER, eval_caller as _, "CALLER", 0, 1, consts::G_BASE);
		entry!(table, Opcode::CALLVALUE, eval_callvalue as _, "CALLVALUE", 0, 1, consts::G_BASE);
		entry!(table, Opcode::CALLDATALOAD, eval_calldataload as _, "CALLDATALOAD", 1, 1, consts::G_VERYLOW);
		entry!(table, Opcode::CALLDATASIZE, eval_calldatasize as _, "CALLDATASIZE", 0, 1, consts::G_BASE);
		entry!(table, Opcode::CALLDATACOPY, eval_calldatacopy as _, "CALLDATACOPY", 3, 0, consts::G_VERYLOW);
		entry!(table, Opcode::CODESIZE, eval_codesize as _, "CODESIZE", 0, 1, consts::G_BASE);
		entry!(table, Opcode::CODECOPY, eval_codecopy as _, "CODECOPY", 3, 0, consts::G_VERYLOW);
		entry!(table, Opcode::GASPRICE, eval_gasprice as _, "GASPRICE", 0, 1, consts::G_BASE);
		entry!(table, Opcode::EXTCODESIZE, eval_extcodesize as _, "EXTCODESIZE", 1, 1, consts::G_EXTCODE);
		entry!(table, Opcode::EXTCODECOPY, eval_extcodecopy as _, "EXTCODECOPY", 4, 0, consts::G_EXTCODE);

		entry!(table, Opcode::BLOCKHASH, eval_blockhash as _, "BLOCKHASH", 1, 1, consts::G_BLOCKHASH);
		entry!(table, Opcode::COINBASE, eval_coinbase as _, "COINBASE", 0, 1, consts::G_BASE);
		entry!(table, Opcode::TIMESTAMP, eval_timestamp as _, "TIMESTAMP", 0, 1, consts::G_BASE);
		entry!(table, Opcode::NUMBER, eval_number as _, "NUMBER", 0, 1, consts::G_BASE);
		entry!(table, Opcode::DIFFICULTY, eval_difficulty as _, "DIFFICULTY", 0, 1, consts::G_BASE);
		entry!(table, Opcode::GASLIMIT, eval_gaslimit as _, "GASLIMIT", 0, 1, consts::G_BASE);

		entry!(table, Opcode::POP, eval_pop as _, "POP", 1, 0, consts::G_BASE);
		entry!(table, Opcode::MLOAD, eval_mload as _, "MLOAD", 1, 1, consts::G_VERYLOW);
		entry!(table, Opcode::MSTORE, eval_mstore as _, "MSTORE", 2, 0, consts::G_VERYLOW);
		entry!(table, Opcode::MSTORE8, eval_mstore8 as _, "MSTORE8", 2, 0, consts::G_VERYLOW);
		entry!(table, Opcode::SLOAD, eval_sload as _, "SLOAD", 1, 1, consts::G_SLOAD);
		entry!(table, Opcode::SSTORE, eval_sstore as _, "SSTORE", 2, 0, consts::G_ZERO);
		entry!(table, Opcode::JUMP, eval_jump as _, "JUMP", 1, 0, consts::G_MID);
		entry!(table, Opcode::JUMPI, eval_jumpi as _, "JUMPI", 2, 0, consts::G_HIGH);
		entry!(table, Opcode::PC, eval_pc as _, "PC", 0, 1, consts::G_BASE);
		entry!(table, Opcode::MSIZE, eval_msize as _, "MSIZE", 0, 1, consts::G_BASE);
		entry!(table, Opcode::GAS, eval_gas as _, "GAS", 0, 1, consts::G_BASE);
		entry!(table, Opcode::JUMPDEST, eval_jumpdest as _, "JUMPDEST", 0, 0, consts::G_JUMPDEST);

		let mut i = Opcode::PUSH1.as_usize();
		while i <= Opcode::PUSH32.as_usize() {
			let n = i - Opcode::PUSH1.as_usize();
			table[i] = Some(OpEntry {
				eval: eval_push as _,
				meta: OpcodeMeta {
					mnemonic: PUSH_MNEMONICS[n],
					pops: 0,
					pushes: 1,
					gas: consts::G_VERYLOW,
				},
			});
			i += 1;
		}

		let mut i = Opcode::DUP1.as_usize();
		while i <= Opcode::DUP16.as_usize() {
			let n = (i - Opcode::DUP1.as_usize() + 1) as u8;
			table[i] = Some(OpEntry {
				eval: eval_dup as _,
				meta: OpcodeMeta {
					mnemonic: DUP_MNEMONICS[(n - 1) as usize],
					pops: n,
					pushes: n + 1,
					gas: consts::G_VERYLOW,
				},
			});
			i += 1;
		}

		let mut i = Opcode::SWAP1.as_usize();
		while i <= Opcode::SWAP16.as_usize() {
			let n = (i - Opcode::SWAP1.as_usize() + 1) as u8;
			table[i] = Some(OpEntry {
				eval: eval_swap as _,
				meta: OpcodeMeta {
					mnemonic: SWAP_MNEMONICS[(n - 1) as usize],
					pops: n + 1,
					pushes: n + 1,
					gas: consts::G_VERYLOW,
				},
			});
			i += 1;
		}

		let mut i = Opcode::LOG0.as_usize();
		while i <= Opcode::LOG4.as_usize() {
			let n = (i - Opcode::LOG0.as_usize()) as u8;
			table[i] = Some(OpEntry {
				eval: eval_log as _,
				meta: OpcodeMeta {
					mnemonic: LOG_MNEMONICS[n as usize],
					pops: n + 2,
					pushes: 0,
					gas: consts::G_LOG,
				},
			});
			i += 1;
		}

		entry!(table, Opcode::CREATE, eval_create as _, "CREATE", 3, 1, consts::G_CREATE);
		entry!(table, Opcode::CALL, eval_call as _, "CALL", 7, 1, consts::G_CALL);
		entry!(table, Opcode::CALLCODE, eval_callcode as _, "CALLCODE", 7, 1, consts::G_CALL);
		entry!(table, Opcode::RETURN, eval_return as _, "RETURN", 2, 0, consts::G_ZERO);
		entry!(table, Opcode::DELEGATECALL, eval_delegatecall as _, "DELEGATECALL", 6, 1, consts::G_CALL);
		entry!(table, Opcode::SELFDESTRUCT, eval_suicide as _, "SELFDESTRUCT", 1, 0, consts::G_SUICIDE);

		Self(table)
	}
}
