//! Ember VM - a portable Ethereum Virtual Machine.
//!
//! The [interpreter] crate owns frames, the opcode table and gas
//! metering; this crate adds the pieces around it: the persistent
//! [backend], the checkpointed [executor::stack::StackExecutor]
//! driving the call/create protocol, the standard [precompile]
//! registry and the [tracing] observer surface.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use embervm_interpreter as interpreter;

pub mod backend;
pub mod executor;
pub mod precompile;
pub mod tracing;

pub use crate::interpreter::{
	CallScheme, Capture, Context, CreateScheme, ExitError, ExitException, ExitFatal, ExitReason,
	ExitSucceed, Frame, Gasometer, Handler, Log, Memory, OpTable, Opcode, Stack,
	TransactionContext, Transfer, Valids, CALL_STACK_LIMIT, STACK_LIMIT,
};

/// Runtime limits of the executor. Gas prices live with the gasometer;
/// this carries only the structural bounds.
#[derive(Clone, Debug)]
pub struct Config {
	/// Stack depth limit of a frame.
	pub stack_limit: usize,
	/// Hard byte limit on a frame's memory.
	pub memory_limit: usize,
	/// Nesting depth limit of the frame tree.
	pub call_stack_limit: usize,
	/// Byte limit on created contract code, if any.
	pub create_contract_limit: Option<usize>,
}

impl Config {
	/// The classic limits.
	#[must_use]
	pub const fn classic() -> Config {
		Config {
			stack_limit: STACK_LIMIT,
			memory_limit: usize::MAX,
			call_stack_limit: CALL_STACK_LIMIT,
			create_contract_limit: None,
		}
	}
}

impl Default for Config {
	fn default() -> Config {
		Config::classic()
	}
}
