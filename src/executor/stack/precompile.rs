use alloc::vec::Vec;

use primitive_types::H160;

use crate::interpreter::{ExitReason, Gasometer};

/// A registry of precompiled contracts. Dispatch happens in the call
/// protocol before code lookup: a recognized address executes natively
/// against the child gas allowance and never enters the interpreter.
pub trait PrecompileSet {
	/// Execute the precompile at `address`, if there is one. The
	/// implementation charges its own gas against `gasometer`; running
	/// out of gas is an exceptional child exit.
	fn execute(
		&self,
		address: H160,
		input: &[u8],
		gasometer: &mut Gasometer,
	) -> Option<(ExitReason, Vec<u8>)>;

	/// Whether the address hosts a precompile.
	fn is_precompile(&self, address: H160) -> bool;
}

/// The empty registry.
impl PrecompileSet for () {
	fn execute(
		&self,
		_address: H160,
		_input: &[u8],
		_gasometer: &mut Gasometer,
	) -> Option<(ExitReason, Vec<u8>)> {
		None
	}

	fn is_precompile(&self, _address: H160) -> bool {
		false
	}
}
