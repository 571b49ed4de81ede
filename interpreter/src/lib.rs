//! Interpreter layer of the Ember VM.
//!
//! A [Frame] owns the stack, memory and gas counter of one execution
//! context; the [OpTable] maps each opcode byte to its handler,
//! mnemonic, stack arity and base fee; the [Handler] trait is what
//! handlers need from the state backend and block environment. Nested
//! calls and creates never recurse here: they surface as
//! [Capture::Trap] values for the outer driver to resolve.

#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod error;
mod etable;
pub mod eval;
mod frame;
pub mod gasometer;
mod memory;
mod opcode;
mod runtime;
mod stack;
pub mod utils;
mod valids;

pub use crate::error::{
	Capture, ExitError, ExitException, ExitFatal, ExitReason, ExitSucceed,
};
pub use crate::etable::{Control, Efn, OpEntry, OpTable, OpcodeMeta};
pub use crate::frame::Frame;
pub use crate::gasometer::Gasometer;
pub use crate::memory::Memory;
pub use crate::opcode::Opcode;
pub use crate::runtime::{
	CallCreateTrapData, CallScheme, CallTrapData, Context, CreateScheme, CreateTrapData, Handler,
	Log, TransactionContext, Transfer,
};
pub use crate::stack::Stack;
pub use crate::valids::Valids;

/// Stack depth limit of a frame.
pub const STACK_LIMIT: usize = 1024;
/// Nesting depth limit of the frame tree.
pub const CALL_STACK_LIMIT: usize = 1024;
