use alloc::borrow::Cow;

use crate::opcode::Opcode;

/// Result of running a frame: either the frame exited, or it trapped into
/// the call/create protocol and can be resumed once the sub-frame resolves.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Capture<E, T> {
	/// The frame has exited and cannot be stepped again.
	Exit(E),
	/// The frame requested a nested call or create.
	Trap(T),
}

/// Why a frame stopped executing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExitReason {
	/// The frame halted normally.
	Succeed(ExitSucceed),
	/// The frame trapped. All gas held by the frame is forfeited.
	Exception(ExitException),
	/// The backend failed in a way unrelated to EVM semantics. Fatal
	/// errors are not swallowed by parent frames; they surface to the
	/// transaction layer.
	Fatal(ExitFatal),
}

impl ExitReason {
	/// Whether the frame exited without a trap.
	#[must_use]
	pub fn is_succeed(&self) -> bool {
		matches!(self, Self::Succeed(_))
	}

	/// Whether the frame trapped.
	#[must_use]
	pub fn is_exception(&self) -> bool {
		matches!(self, Self::Exception(_))
	}

	/// Whether the failure must propagate to the transaction layer.
	#[must_use]
	pub fn is_fatal(&self) -> bool {
		matches!(self, Self::Fatal(_))
	}
}

/// Normal halt modes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExitSucceed {
	/// `STOP`, or execution ran off the end of the code.
	Stopped,
	/// `RETURN` with an explicit return buffer.
	Returned,
	/// `SELFDESTRUCT`.
	Suicided,
}

impl From<ExitSucceed> for ExitReason {
	fn from(s: ExitSucceed) -> Self {
		Self::Succeed(s)
	}
}

/// Frame traps. A trap aborts the current frame immediately; a nested
/// frame's trap does not propagate to its parent, which observes a `0`
/// push instead.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExitException {
	/// The gas counter would go negative.
	OutOfGas,
	/// Pop on an empty stack.
	StackUnderflow,
	/// Push past the stack limit.
	StackOverflow,
	/// Jump destination outside the validity cache.
	InvalidJump,
	/// Undefined or reserved opcode byte.
	InvalidOpcode(Opcode),
	/// Value transfer with insufficient balance.
	OutOfFund,
	/// Call or create at depth 1024.
	CallTooDeep,
	/// Create target already has code or a nonce.
	CreateCollision,
	/// Created contract code exceeds the configured limit.
	CreateContractLimit,
}

impl ExitException {
	/// Stable human-readable description, as reported at the
	/// transaction level.
	#[must_use]
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::OutOfGas => "out of gas",
			Self::StackUnderflow => "stack underflow",
			Self::StackOverflow => "stack overflow",
			Self::InvalidJump => "invalid JUMP destination",
			Self::InvalidOpcode(_) => "invalid opcode",
			Self::OutOfFund => "insufficient balance",
			Self::CallTooDeep => "call depth limit reached",
			Self::CreateCollision => "create address collision",
			Self::CreateContractLimit => "created code too large",
		}
	}
}

impl From<ExitException> for ExitReason {
	fn from(e: ExitException) -> Self {
		Self::Exception(e)
	}
}

/// Failures of the machinery itself, not of the executed code.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExitFatal {
	/// The operation is not supported by this interpreter.
	NotSupported,
	/// The state backend reported an error.
	Backend(Cow<'static, str>),
}

impl From<ExitFatal> for ExitReason {
	fn from(e: ExitFatal) -> Self {
		Self::Fatal(e)
	}
}

/// Error type returned by fallible runtime operations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExitError {
	/// An EVM trap.
	Exception(ExitException),
	/// A backend failure.
	Fatal(ExitFatal),
}

impl From<ExitException> for ExitError {
	fn from(e: ExitException) -> Self {
		Self::Exception(e)
	}
}

impl From<ExitFatal> for ExitError {
	fn from(e: ExitFatal) -> Self {
		Self::Fatal(e)
	}
}

impl From<ExitError> for ExitReason {
	fn from(e: ExitError) -> Self {
		match e {
			ExitError::Exception(e) => Self::Exception(e),
			ExitError::Fatal(e) => Self::Fatal(e),
		}
	}
}
