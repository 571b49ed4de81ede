use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cmp::min;
use core::mem;

use primitive_types::{H160, H256, U256};
use sha3::{Digest, Keccak256};

use super::precompile::PrecompileSet;
use super::state::StackState;
use crate::interpreter::gasometer::{consts, l64};
use crate::interpreter::{
	CallCreateTrapData, CallTrapData, Capture, Context, CreateScheme, CreateTrapData, ExitError,
	ExitException, ExitFatal, ExitReason, Frame, Gasometer, OpTable, TransactionContext, Transfer,
};
use crate::tracing::Event;
use crate::Config;

/// How a finished child frame feeds back into its parent.
enum FrameInvoke {
	/// A `CALL`-family child: status push and bounded return-data copy.
	Call(CallTrapData),
	/// A `CREATE` child: code deposit, then address or zero push.
	Create {
		trap: CreateTrapData,
		address: H160,
	},
}

/// The call/create protocol driver.
///
/// Frames are held on an explicit stack managed here, never on the
/// Rust call stack: a trap from the running frame either enters a child
/// frame or resolves inline, and a child's exit feeds its parent
/// through the recorded invoke. State mutations of every frame run
/// against a checkpoint that commits on normal exit and reverts on
/// exceptional exit.
pub struct StackExecutor<'config, 'precompiles, S, P> {
	config: &'config Config,
	state: S,
	precompiles: &'precompiles P,
	table: OpTable<S>,
	used_gas: u64,
	refunded_gas: u64,
	gas_left: u64,
}

impl<'config, S: StackState> StackExecutor<'config, 'static, S, ()> {
	/// Create an executor without precompiles.
	pub fn new(state: S, config: &'config Config) -> Self {
		Self::new_with_precompiles(state, config, &())
	}
}

impl<'config, 'precompiles, S: StackState, P: PrecompileSet>
	StackExecutor<'config, 'precompiles, S, P>
{
	/// Create an executor over the given working state and precompile
	/// registry.
	pub fn new_with_precompiles(
		state: S,
		config: &'config Config,
		precompiles: &'precompiles P,
	) -> Self {
		Self {
			config,
			state,
			precompiles,
			table: OpTable::runtime(),
			used_gas: 0,
			refunded_gas: 0,
			gas_left: 0,
		}
	}

	/// The working state.
	pub fn state(&self) -> &S {
		&self.state
	}

	/// Mutable working state.
	pub fn state_mut(&mut self) -> &mut S {
		&mut self.state
	}

	/// Consume the executor, yielding the working state.
	pub fn into_state(self) -> S {
		self.state
	}

	/// Gas consumed by the last transaction, net of the applied
	/// refund. The refund is capped at half the gas used.
	pub fn used_gas(&self) -> u64 {
		self.used_gas
	}

	/// Refund applied at the end of the last transaction.
	pub fn refunded_gas(&self) -> u64 {
		self.refunded_gas
	}

	/// Gas left in the initial frame of the last transaction, before
	/// the refund.
	pub fn gas_left(&self) -> u64 {
		self.gas_left
	}

	/// Nonce-derived address of a contract created by `scheme`:
	/// the last 20 bytes of `keccak(rlp([sender, nonce]))`.
	pub fn create_address(&self, scheme: CreateScheme) -> H160 {
		match scheme {
			CreateScheme::Legacy { caller } => {
				let nonce = self.state.nonce(caller);
				let mut stream = rlp::RlpStream::new_list(2);
				stream.append(&caller);
				stream.append(&nonce);
				H256::from_slice(Keccak256::digest(&stream.out()).as_slice()).into()
			}
		}
	}

	/// Execute an external message call against the current state.
	pub fn transact_call(
		&mut self,
		caller: H160,
		address: H160,
		value: U256,
		data: Vec<u8>,
		gas_limit: u64,
	) -> (ExitReason, Vec<u8>) {
		log::debug!(
			target: "embervm",
			"transact call, caller: {:?}, address: {:?}, value: {}, gas_limit: {}",
			caller, address, value, gas_limit,
		);

		let transaction_context = Rc::new(TransactionContext {
			origin: caller,
			gas_price: self.state.gas_price(),
		});
		let context = Context {
			address,
			caller,
			apparent_value: value,
		};
		let transfer = Some(Transfer {
			source: caller,
			target: address,
			value,
		});
		let mut gasometer = Gasometer::new(gas_limit);

		Event::Call {
			code_address: address,
			transfer: &transfer,
			input: &data,
			target_gas: gas_limit,
			context: &context,
		}
		.emit();

		self.state.enter();
		self.state.inc_nonce(caller);
		self.state.touch(address);

		if let Some(transfer) = transfer {
			if let Err(e) = self.state.transfer(transfer) {
				let _ = self.state.exit_revert();
				gasometer.fail();
				self.finalize(&gasometer);
				return (e.into(), Vec::new());
			}
		}

		if let Some((reason, output)) = self.precompiles.execute(address, &data, &mut gasometer) {
			if reason.is_succeed() {
				let _ = self.state.exit_commit();
			} else {
				gasometer.fail();
				let _ = self.state.exit_revert();
			}
			self.finalize(&gasometer);
			return (reason, output);
		}

		let code = self.state.code(address);
		let frame = Frame::new(
			Rc::new(code),
			Rc::new(data),
			self.config.stack_limit,
			self.config.memory_limit,
			context,
			transaction_context,
			gasometer,
			0,
		);

		let (reason, frame) = self.execute(frame);
		if reason.is_succeed() {
			let _ = self.state.exit_commit();
		} else {
			let _ = self.state.exit_revert();
		}

		self.finalize(&frame.gasometer);
		(reason, frame.retval)
	}

	/// Execute an external contract creation against the current
	/// state.
	pub fn transact_create(
		&mut self,
		caller: H160,
		value: U256,
		init_code: Vec<u8>,
		gas_limit: u64,
	) -> (ExitReason, Option<H160>) {
		log::debug!(
			target: "embervm",
			"transact create, caller: {:?}, value: {}, code_len: {}, gas_limit: {}",
			caller, value, init_code.len(), gas_limit,
		);

		let transaction_context = Rc::new(TransactionContext {
			origin: caller,
			gas_price: self.state.gas_price(),
		});
		let scheme = CreateScheme::Legacy { caller };
		let address = self.create_address(scheme);
		let mut gasometer = Gasometer::new(gas_limit);

		Event::Create {
			caller,
			address,
			value,
			init_code: &init_code,
			target_gas: gas_limit,
		}
		.emit();

		self.state.inc_nonce(caller);
		self.state.enter();

		if self.state.code_size(address) != U256::zero()
			|| self.state.nonce(address) != U256::zero()
		{
			let _ = self.state.exit_revert();
			gasometer.fail();
			self.finalize(&gasometer);
			return (ExitException::CreateCollision.into(), None);
		}

		self.state.touch(address);
		if let Err(e) = self.state.transfer(Transfer {
			source: caller,
			target: address,
			value,
		}) {
			let _ = self.state.exit_revert();
			gasometer.fail();
			self.finalize(&gasometer);
			return (e.into(), None);
		}

		let frame = Frame::new(
			Rc::new(init_code),
			Rc::new(Vec::new()),
			self.config.stack_limit,
			self.config.memory_limit,
			Context {
				address,
				caller,
				apparent_value: value,
			},
			transaction_context,
			gasometer,
			0,
		);

		let (reason, mut frame) = self.execute(frame);
		let result = self.cleanup_for_create(address, reason, &mut frame);
		self.finalize(&frame.gasometer);
		result
	}

	/// Run raw code in a synthetic frame against the current state,
	/// without nonce or balance bookkeeping of its own.
	pub fn run_code(
		&mut self,
		context: Context,
		transaction_context: TransactionContext,
		code: Vec<u8>,
		data: Vec<u8>,
		gas_limit: u64,
	) -> (ExitReason, Vec<u8>) {
		let frame = Frame::new(
			Rc::new(code),
			Rc::new(data),
			self.config.stack_limit,
			self.config.memory_limit,
			context,
			Rc::new(transaction_context),
			Gasometer::new(gas_limit),
			0,
		);

		self.state.enter();
		let (reason, frame) = self.execute(frame);
		if reason.is_succeed() {
			let _ = self.state.exit_commit();
		} else {
			let _ = self.state.exit_revert();
		}

		self.finalize(&frame.gasometer);
		(reason, frame.retval)
	}

	fn finalize(&mut self, gasometer: &Gasometer) {
		let used = gasometer.total_used_gas();
		let refunded = min(gasometer.refunded_gas(), used / 2);
		self.used_gas = used - refunded;
		self.refunded_gas = refunded;
		self.gas_left = gasometer.gas();
	}

	/// Drive a frame tree to completion on an explicit stack.
	fn execute(&mut self, mut frame: Frame) -> (ExitReason, Frame) {
		let mut stack: Vec<(Frame, FrameInvoke)> = Vec::new();

		loop {
			match self.run_frame(&mut frame) {
				Capture::Exit(reason) => {
					Event::Exit {
						reason: &reason,
						return_value: &frame.retval,
					}
					.emit();

					match stack.pop() {
						None => return (reason, frame),
						Some((mut parent, invoke)) => {
							match self.exit_frame(reason, frame, invoke, &mut parent) {
								Ok(()) => frame = parent,
								Err(fatal) => return (ExitReason::Fatal(fatal), parent),
							}
						}
					}
				}
				Capture::Trap(trap) => match self.enter_frame(trap, &mut frame) {
					Ok(Some((child, invoke))) => {
						stack.push((frame, invoke));
						frame = child;
					}
					Ok(None) => (),
					Err(fatal) => return (ExitReason::Fatal(fatal), frame),
				},
			}
		}
	}

	/// Step one frame to its next exit or trap, firing the step
	/// observer before each dispatch.
	fn run_frame(&mut self, frame: &mut Frame) -> Capture<ExitReason, CallCreateTrapData> {
		loop {
			if let Some((opcode, position)) = frame.inspect() {
				Event::Step {
					context: &frame.context,
					opcode,
					position,
					gas: frame.gasometer.gas(),
					depth: frame.depth,
					stack: &frame.stack,
					memory: &frame.memory,
				}
				.emit();
			}

			match frame.step(&mut self.state, &self.table) {
				Ok(()) => (),
				Err(capture) => return capture,
			}
		}
	}

	/// Resolve a trap: enter a child frame, or feed an inline result
	/// (precondition failure, precompile) straight back to the parent.
	fn enter_frame(
		&mut self,
		trap: CallCreateTrapData,
		parent: &mut Frame,
	) -> Result<Option<(Frame, FrameInvoke)>, ExitFatal> {
		match trap {
			CallCreateTrapData::Call(data) => self.call_inner(data, parent),
			CallCreateTrapData::Create(data) => self.create_inner(data, parent),
		}
	}

	fn call_inner(
		&mut self,
		mut data: CallTrapData,
		parent: &mut Frame,
	) -> Result<Option<(Frame, FrameInvoke)>, ExitFatal> {
		// The 63/64 rule bounds what the parent may forward.
		let after_gas = l64(parent.gasometer.gas());
		let target_gas = min(data.gas, U256::from(after_gas)).as_u64();

		if let Err(e) = parent.gasometer.record_cost(target_gas) {
			parent.gasometer.fail();
			parent.exit(e.into());
			return Ok(None);
		}

		// The stipend is granted to the callee, not taken from the
		// caller.
		let mut gas_limit = target_gas;
		if let Some(transfer) = &data.transfer {
			if transfer.value != U256::zero() {
				gas_limit = gas_limit.saturating_add(consts::G_CALLSTIPEND);
			}
		}

		Event::Call {
			code_address: data.target,
			transfer: &data.transfer,
			input: &data.input,
			target_gas: gas_limit,
			context: &data.context,
		}
		.emit();
		log::trace!(
			target: "embervm",
			"call, scheme: {:?}, target: {:?}, gas_limit: {}",
			data.scheme, data.target, gas_limit,
		);

		// Precondition failures push 0 without entering a frame; the
		// forwarded gas never leaves the parent.
		if parent.depth + 1 > self.config.call_stack_limit {
			parent.gasometer.record_stipend(target_gas);
			return self
				.feed_call(&data, &ExitException::CallTooDeep.into(), &[], parent)
				.map(|()| None);
		}

		if let Some(transfer) = &data.transfer {
			if self.state.balance(transfer.source) < transfer.value {
				parent.gasometer.record_stipend(target_gas);
				return self
					.feed_call(&data, &ExitException::OutOfFund.into(), &[], parent)
					.map(|()| None);
			}
		}

		self.state.enter();
		self.state.touch(data.context.address);

		if let Some(transfer) = data.transfer.clone() {
			if let Err(e) = self.state.transfer(transfer) {
				let _ = self.state.exit_revert();
				parent.gasometer.record_stipend(target_gas);
				return match e {
					ExitError::Fatal(fatal) => Err(fatal),
					ExitError::Exception(e) => self
						.feed_call(&data, &e.into(), &[], parent)
						.map(|()| None),
				};
			}
		}

		// Precompiles run against the child allowance without a frame.
		let mut gasometer = Gasometer::new(gas_limit);
		if let Some((reason, output)) =
			self.precompiles.execute(data.target, &data.input, &mut gasometer)
		{
			if reason.is_succeed() {
				let _ = self.state.exit_commit();
				parent.gasometer.record_stipend(gasometer.gas());
			} else {
				let _ = self.state.exit_revert();
			}
			return self.feed_call(&data, &reason, &output, parent).map(|()| None);
		}

		let code = self.state.code(data.target);
		let input = mem::take(&mut data.input);
		let child = Frame::new(
			Rc::new(code),
			Rc::new(input),
			self.config.stack_limit,
			self.config.memory_limit,
			data.context.clone(),
			parent.transaction_context.clone(),
			Gasometer::new(gas_limit),
			parent.depth + 1,
		);

		Ok(Some((child, FrameInvoke::Call(data))))
	}

	fn create_inner(
		&mut self,
		mut data: CreateTrapData,
		parent: &mut Frame,
	) -> Result<Option<(Frame, FrameInvoke)>, ExitFatal> {
		let CreateScheme::Legacy { caller } = data.scheme;
		let address = self.create_address(data.scheme);

		// `CREATE` forwards everything the 63/64 rule allows.
		let gas_limit = l64(parent.gasometer.gas());
		if let Err(e) = parent.gasometer.record_cost(gas_limit) {
			parent.gasometer.fail();
			parent.exit(e.into());
			return Ok(None);
		}

		Event::Create {
			caller,
			address,
			value: data.value,
			init_code: &data.init_code,
			target_gas: gas_limit,
		}
		.emit();
		log::trace!(
			target: "embervm",
			"create, caller: {:?}, address: {:?}, gas_limit: {}",
			caller, address, gas_limit,
		);

		if parent.depth + 1 > self.config.call_stack_limit {
			parent.gasometer.record_stipend(gas_limit);
			return self.feed_create(&data, Err(()), parent).map(|()| None);
		}

		if self.state.balance(caller) < data.value {
			parent.gasometer.record_stipend(gas_limit);
			return self.feed_create(&data, Err(()), parent).map(|()| None);
		}

		// The creator's nonce rises even when the init frame later
		// fails.
		self.state.inc_nonce(caller);

		self.state.enter();

		if self.state.code_size(address) != U256::zero()
			|| self.state.nonce(address) != U256::zero()
		{
			// A collision consumes the forwarded gas.
			let _ = self.state.exit_revert();
			return self.feed_create(&data, Err(()), parent).map(|()| None);
		}

		self.state.touch(address);
		if let Err(e) = self.state.transfer(Transfer {
			source: caller,
			target: address,
			value: data.value,
		}) {
			let _ = self.state.exit_revert();
			parent.gasometer.record_stipend(gas_limit);
			return match e {
				ExitError::Fatal(fatal) => Err(fatal),
				ExitError::Exception(_) => {
					self.feed_create(&data, Err(()), parent).map(|()| None)
				}
			};
		}

		let init_code = mem::take(&mut data.init_code);
		let child = Frame::new(
			Rc::new(init_code),
			Rc::new(Vec::new()),
			self.config.stack_limit,
			self.config.memory_limit,
			Context {
				address,
				caller,
				apparent_value: data.value,
			},
			parent.transaction_context.clone(),
			Gasometer::new(gas_limit),
			parent.depth + 1,
		);

		Ok(Some((child, FrameInvoke::Create { trap: data, address })))
	}

	/// Feed a finished child back into its parent: checkpoint commit
	/// or revert, gas and refund merge, then the feedback push.
	fn exit_frame(
		&mut self,
		reason: ExitReason,
		mut child: Frame,
		invoke: FrameInvoke,
		parent: &mut Frame,
	) -> Result<(), ExitFatal> {
		match invoke {
			FrameInvoke::Call(data) => match reason {
				ExitReason::Succeed(_) => {
					let _ = self.state.exit_commit();
					parent.gasometer.record_stipend(child.gasometer.gas());
					parent
						.gasometer
						.record_refund(child.gasometer.refunded_gas());
					self.feed_call(&data, &reason, &child.retval, parent)
				}
				ExitReason::Exception(_) => {
					// The child's gas is forfeited and its refunds
					// are discarded with its state.
					let _ = self.state.exit_revert();
					self.feed_call(&data, &reason, &[], parent)
				}
				ExitReason::Fatal(fatal) => {
					let _ = self.state.exit_revert();
					Err(fatal)
				}
			},
			FrameInvoke::Create { trap, address } => {
				let (result, created) = self.cleanup_for_create(address, reason, &mut child);
				if let ExitReason::Fatal(fatal) = result {
					return Err(fatal);
				}

				if created.is_some() {
					parent.gasometer.record_stipend(child.gasometer.gas());
					parent
						.gasometer
						.record_refund(child.gasometer.refunded_gas());
				}

				match trap.feedback(created.ok_or(()), parent) {
					Ok(()) => Ok(()),
					Err(ExitError::Exception(e)) => {
						parent.gasometer.fail();
						parent.exit(e.into());
						Ok(())
					}
					Err(ExitError::Fatal(fatal)) => Err(fatal),
				}
			}
		}
	}

	/// Finish a create frame: on success the return buffer becomes the
	/// account code after the deposit charge; a failed deposit fails
	/// the whole create.
	fn cleanup_for_create(
		&mut self,
		address: H160,
		reason: ExitReason,
		frame: &mut Frame,
	) -> (ExitReason, Option<H160>) {
		match reason {
			ExitReason::Succeed(s) => {
				if let Some(limit) = self.config.create_contract_limit {
					if frame.retval.len() > limit {
						frame.gasometer.fail();
						let _ = self.state.exit_revert();
						return (ExitException::CreateContractLimit.into(), None);
					}
				}

				let deposit = (frame.retval.len() as u64)
					.checked_mul(consts::G_CODEDEPOSIT)
					.unwrap_or(u64::MAX);
				match frame.gasometer.record_cost(deposit) {
					Ok(()) => {
						log::debug!(
							target: "embervm",
							"create done, address: {:?}, code_len: {}",
							address,
							frame.retval.len(),
						);
						self.state.set_code(address, mem::take(&mut frame.retval));
						let _ = self.state.exit_commit();
						(ExitReason::Succeed(s), Some(address))
					}
					Err(e) => {
						frame.gasometer.fail();
						let _ = self.state.exit_revert();
						(e.into(), None)
					}
				}
			}
			ExitReason::Exception(e) => {
				let _ = self.state.exit_revert();
				(ExitReason::Exception(e), None)
			}
			ExitReason::Fatal(f) => {
				let _ = self.state.exit_revert();
				(ExitReason::Fatal(f), None)
			}
		}
	}

	fn feed_call(
		&mut self,
		data: &CallTrapData,
		reason: &ExitReason,
		retbuf: &[u8],
		parent: &mut Frame,
	) -> Result<(), ExitFatal> {
		match data.feedback(reason, retbuf, parent) {
			Ok(()) => Ok(()),
			Err(ExitError::Exception(e)) => {
				parent.gasometer.fail();
				parent.exit(e.into());
				Ok(())
			}
			Err(ExitError::Fatal(fatal)) => Err(fatal),
		}
	}

	fn feed_create(
		&mut self,
		data: &CreateTrapData,
		result: Result<H160, ()>,
		parent: &mut Frame,
	) -> Result<(), ExitFatal> {
		match data.feedback(result, parent) {
			Ok(()) => Ok(()),
			Err(ExitError::Exception(e)) => {
				parent.gasometer.fail();
				parent.exit(e.into());
				Ok(())
			}
			Err(ExitError::Fatal(fatal)) => Err(fatal),
		}
	}
}
