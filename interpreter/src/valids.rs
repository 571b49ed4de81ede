use alloc::vec::Vec;

use crate::opcode::Opcode;

/// Jump destination validity, precomputed once per code buffer: the set
/// of positions holding a literal `JUMPDEST` that is not inside `PUSHn`
/// immediate data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Valids(Vec<bool>);

impl Valids {
	/// Create a new valid mapping from given code bytes.
	#[must_use]
	pub fn new(code: &[u8]) -> Self {
		let mut valids: Vec<bool> = Vec::with_capacity(code.len());
		valids.resize(code.len(), false);

		let mut i = 0;
		while i < code.len() {
			let opcode = Opcode(code[i]);
			if opcode == Opcode::JUMPDEST {
				valids[i] = true;
				i += 1;
			} else if let Some(v) = opcode.is_push() {
				i += v as usize + 1;
			} else {
				i += 1;
			}
		}

		Valids(valids)
	}

	/// Length of the mapping. Same as the code length.
	#[inline]
	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Whether the mapping (and hence the code) is empty.
	#[inline]
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns `true` if the position is a valid jump destination.
	#[must_use]
	pub fn is_valid(&self, position: usize) -> bool {
		if position >= self.0.len() {
			return false;
		}

		self.0[position]
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn jumpdest_positions() {
		// PUSH1 0x5b, JUMPDEST, STOP
		let code = [0x60, 0x5b, 0x5b, 0x00];
		let valids = Valids::new(&code);
		assert!(!valids.is_valid(0));
		// 0x5b inside PUSH immediate data is not a destination.
		assert!(!valids.is_valid(1));
		assert!(valids.is_valid(2));
		assert!(!valids.is_valid(3));
		assert!(!valids.is_valid(100));
	}

	#[test]
	fn push32_swallows_immediates() {
		let mut code = vec![0x7f];
		code.extend_from_slice(&[0x5b; 32]);
		code.push(0x5b);
		let valids = Valids::new(&code);
		for i in 1..=32 {
			assert!(!valids.is_valid(i));
		}
		assert!(valids.is_valid(33));
	}
}
