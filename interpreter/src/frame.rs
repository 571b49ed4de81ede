use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::error::{Capture, ExitException, ExitReason, ExitSucceed};
use crate::etable::{Control, OpTable};
use crate::gasometer::{self, Gasometer};
use crate::memory::Memory;
use crate::opcode::Opcode;
use crate::runtime::{CallCreateTrapData, Context, Handler, TransactionContext};
use crate::stack::Stack;
use crate::valids::Valids;

/// One execution context: code, input data, stack, memory, gas and
/// environment. Frames are created by the outer driver for the initial
/// transaction and for every `CALL`-family or `CREATE` entry, and
/// destroyed when the loop exits.
pub struct Frame {
	/// Executing code.
	pub code: Rc<Vec<u8>>,
	/// Input data.
	pub data: Rc<Vec<u8>>,
	/// Program counter. Holding an exit reason means the frame can no
	/// longer be stepped.
	pub position: Result<usize, ExitReason>,
	/// Jump destination validity, precomputed from the code.
	pub valids: Valids,
	/// Frame-local stack.
	pub stack: Stack,
	/// Frame-local memory.
	pub memory: Memory,
	/// Return buffer captured by `RETURN`.
	pub retval: Vec<u8>,
	/// Context this frame executes under.
	pub context: Context,
	/// Transaction-wide environment, shared by the frame tree.
	pub transaction_context: Rc<TransactionContext>,
	/// Frame-local gas counter.
	pub gasometer: Gasometer,
	/// Nesting depth; the initial frame is at depth zero.
	pub depth: usize,
}

impl Frame {
	/// Create a new frame over the given code and input.
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		code: Rc<Vec<u8>>,
		data: Rc<Vec<u8>>,
		stack_limit: usize,
		memory_limit: usize,
		context: Context,
		transaction_context: Rc<TransactionContext>,
		gasometer: Gasometer,
		depth: usize,
	) -> Self {
		let valids = Valids::new(&code[..]);

		Self {
			code,
			data,
			position: Ok(0),
			valids,
			stack: Stack::new(stack_limit),
			memory: Memory::new(memory_limit),
			retval: Vec::new(),
			context,
			transaction_context,
			gasometer,
			depth,
		}
	}

	/// Explicit exit of the frame. Further steps return the reason.
	pub fn exit(&mut self, reason: ExitReason) {
		self.position = Err(reason);
	}

	/// The next opcode and its position, without stepping. Used by
	/// step observers for the pre-step snapshot.
	#[must_use]
	pub fn inspect(&self) -> Option<(Opcode, usize)> {
		let position = *self.position.as_ref().ok()?;
		self.code.get(position).map(|v| (Opcode(*v), position))
	}

	/// Loop stepping the frame until it exits or traps.
	pub fn run<H: Handler>(
		&mut self,
		handler: &mut H,
		table: &OpTable<H>,
	) -> Capture<ExitReason, CallCreateTrapData> {
		loop {
			match self.step(handler, table) {
				Ok(()) => (),
				Err(capture) => return capture,
			}
		}
	}

	/// Execute one opcode: fetch, validate stack arity, charge the
	/// base fee and the operand-dependent cost, dispatch, and apply the
	/// resulting control. A trap leaves the position after the opcode
	/// so the frame resumes correctly once the sub-frame resolves.
	pub fn step<H: Handler>(
		&mut self,
		handler: &mut H,
		table: &OpTable<H>,
	) -> Result<(), Capture<ExitReason, CallCreateTrapData>> {
		let position = *self
			.position
			.as_ref()
			.map_err(|reason| Capture::Exit(reason.clone()))?;

		let Some(opcode) = self.code.get(position).map(|v| Opcode(*v)) else {
			// Running off the end of the code is a normal halt.
			self.position = Err(ExitSucceed::Stopped.into());
			return Err(Capture::Exit(ExitSucceed::Stopped.into()));
		};

		let Some(entry) = table.get(opcode) else {
			return Err(self.exit_exception(ExitException::InvalidOpcode(opcode)));
		};

		if let Err(e) = self
			.stack
			.check_pop_push(entry.meta.pops as usize, entry.meta.pushes as usize)
		{
			return Err(self.exit_exception(e));
		}

		if let Err(e) = self.gasometer.record_cost(entry.meta.gas) {
			return Err(self.exit_exception(e));
		}

		if let Err(e) = gasometer::record_dynamic_cost(
			opcode,
			&self.stack,
			&self.context,
			handler,
			&mut self.gasometer,
		) {
			return Err(self.exit_exception(e));
		}

		match (entry.eval)(self, handler, opcode, position) {
			Control::Continue(advance) => {
				self.position = Ok(position + advance);
				Ok(())
			}
			Control::Jump(target) => {
				self.position = Ok(target);
				Ok(())
			}
			Control::Exit(reason) => {
				if reason.is_exception() {
					self.gasometer.fail();
				}
				self.position = Err(reason.clone());
				Err(Capture::Exit(reason))
			}
			Control::Trap(trap) => {
				self.position = Ok(position + 1);
				Err(Capture::Trap(trap))
			}
		}
	}

	/// A trap aborts the frame instantly and forfeits its gas.
	fn exit_exception(
		&mut self,
		exception: ExitException,
	) -> Capture<ExitReason, CallCreateTrapData> {
		self.gasometer.fail();
		let reason: ExitReason = exception.into();
		self.position = Err(reason.clone());
		Capture::Exit(reason)
	}
}
