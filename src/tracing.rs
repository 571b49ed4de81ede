//! Step observers and protocol event listeners.
//!
//! A listener installed with [using] sees a [Event::Step] before every
//! dispatch, carrying the pre-step frame snapshot, plus call/create
//! protocol boundary events. Emission without an installed listener is
//! a no-op.

use primitive_types::{H160, U256};

use crate::interpreter::{
	Context, ExitReason, Memory, Opcode, Stack, Transfer,
};

environmental::environmental!(listener: dyn EventListener + 'static);

/// Observer of execution events.
pub trait EventListener {
	/// Called on every emitted event.
	fn event(&mut self, event: Event);
}

/// One execution event.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
	/// Fired before each dispatch, with the pre-step frame snapshot.
	Step {
		/// Context of the executing frame.
		context: &'a Context,
		/// Opcode about to execute.
		opcode: Opcode,
		/// Position of the opcode.
		position: usize,
		/// Gas left before the step.
		gas: u64,
		/// Frame nesting depth.
		depth: usize,
		/// Pre-step stack.
		stack: &'a Stack,
		/// Pre-step memory.
		memory: &'a Memory,
	},
	/// A `CALL`-family entry.
	Call {
		/// Address whose code runs.
		code_address: H160,
		/// Value movement, if any.
		transfer: &'a Option<Transfer>,
		/// Input bytes.
		input: &'a [u8],
		/// Gas forwarded to the callee.
		target_gas: u64,
		/// Context the callee runs under.
		context: &'a Context,
	},
	/// A `CREATE` entry.
	Create {
		/// Creating address.
		caller: H160,
		/// Nonce-derived address of the new account.
		address: H160,
		/// Endowment.
		value: U256,
		/// Init code.
		init_code: &'a [u8],
		/// Gas forwarded to the init frame.
		target_gas: u64,
	},
	/// A frame exited. A `SELFDESTRUCT` surfaces here with the
	/// `Suicided` reason.
	Exit {
		/// Why the frame stopped.
		reason: &'a ExitReason,
		/// Its return buffer.
		return_value: &'a [u8],
	},
}

impl<'a> Event<'a> {
	pub(crate) fn emit(self) {
		listener::with(|listener| listener.event(self));
	}
}

/// Run closure with provided listener.
pub fn using<R, F: FnOnce() -> R>(new: &mut (dyn EventListener + 'static), f: F) -> R {
	listener::using(new, f)
}
