use alloc::vec::Vec;
use core::cmp::min;

use primitive_types::U256;

use crate::error::ExitException;

/// Frame memory: a byte-addressable buffer whose effective length is
/// always a multiple of 32. Expansion zeroes the new cells; expansion
/// *pricing* happens in the gasometer before a handler touches the
/// range, so re-reading an already-grown range is free.
#[derive(Clone, Debug)]
pub struct Memory {
	data: Vec<u8>,
	limit: usize,
}

impl Memory {
	/// Create a new memory with the given hard limit.
	#[must_use]
	pub const fn new(limit: usize) -> Self {
		Self {
			data: Vec::new(),
			limit,
		}
	}

	/// Memory limit.
	#[inline]
	#[must_use]
	pub const fn limit(&self) -> usize {
		self.limit
	}

	/// Effective length, in bytes. Always a multiple of 32, and
	/// monotone non-decreasing within a frame.
	#[inline]
	#[must_use]
	pub fn effective_len(&self) -> usize {
		self.data.len()
	}

	/// Whether the memory has never been touched.
	#[inline]
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	/// Grow the effective length to cover `offset..offset + len`,
	/// rounded up to the next 32-byte word. New cells read zero.
	pub fn resize_offset(&mut self, offset: U256, len: U256) -> Result<(), ExitException> {
		if len == U256::zero() {
			return Ok(());
		}

		let end = offset
			.checked_add(len)
			.ok_or(ExitException::OutOfGas)?;
		if end > U256::from(usize::MAX) {
			return Err(ExitException::OutOfGas);
		}

		self.resize_end(end.as_usize())
	}

	/// Grow the effective length to cover `..end`, word-aligned.
	pub fn resize_end(&mut self, end: usize) -> Result<(), ExitException> {
		if end <= self.data.len() {
			return Ok(());
		}

		let new_len = end
			.checked_add(31)
			.map(|e| e / 32 * 32)
			.ok_or(ExitException::OutOfGas)?;
		if new_len > self.limit {
			return Err(ExitException::OutOfGas);
		}

		self.data.resize(new_len, 0);
		Ok(())
	}

	/// Read `size` bytes at `offset`, zero-padded past the current
	/// effective length.
	#[must_use]
	pub fn get(&self, offset: usize, size: usize) -> Vec<u8> {
		let mut ret = Vec::new();
		ret.resize(size, 0);

		#[allow(clippy::needless_range_loop)]
		for index in 0..size {
			let position = offset + index;
			if position >= self.data.len() {
				break;
			}

			ret[index] = self.data[position];
		}

		ret
	}

	/// Write `value` at `offset`. When `target_size` is larger than the
	/// source, the remaining target cells keep their contents; the
	/// expansion itself already zeroed them.
	pub fn set(
		&mut self,
		offset: usize,
		value: &[u8],
		target_size: Option<usize>,
	) -> Result<(), ExitException> {
		let target_size = target_size.unwrap_or(value.len());
		if target_size == 0 {
			return Ok(());
		}

		let end = offset
			.checked_add(target_size)
			.ok_or(ExitException::OutOfGas)?;
		self.resize_end(end)?;

		let count = min(value.len(), target_size);
		self.data[offset..offset + count].copy_from_slice(&value[..count]);
		Ok(())
	}

	/// Copy for the `*COPY` family: untrusted `U256` offsets, a source
	/// offset past the end of `data` writes nothing beyond the
	/// pre-zeroed expansion.
	pub fn copy_large(
		&mut self,
		memory_offset: U256,
		data_offset: U256,
		len: U256,
		data: &[u8],
	) -> Result<(), ExitException> {
		if len == U256::zero() {
			return Ok(());
		}

		if memory_offset > U256::from(usize::MAX) || len > U256::from(usize::MAX) {
			return Err(ExitException::OutOfGas);
		}
		let memory_offset = memory_offset.as_usize();
		let ulen = len.as_usize();

		let data = if let Some(end) = data_offset.checked_add(len) {
			if end > U256::from(usize::MAX) {
				&[]
			} else {
				let data_offset = data_offset.as_usize();
				let end = end.as_usize();

				if data_offset > data.len() {
					&[]
				} else {
					&data[data_offset..min(end, data.len())]
				}
			}
		} else {
			&[]
		};

		self.set(memory_offset, data, Some(ulen))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reads_past_length_are_zero() {
		let memory = Memory::new(usize::MAX);
		assert_eq!(memory.get(100, 4), vec![0, 0, 0, 0]);
	}

	#[test]
	fn expansion_is_word_aligned_and_zeroed() {
		let mut memory = Memory::new(usize::MAX);
		memory
			.resize_offset(U256::from(33), U256::from(1))
			.unwrap();
		assert_eq!(memory.effective_len(), 64);
		assert_eq!(memory.get(0, 64), vec![0; 64]);

		// Growth is monotone: a smaller range never shrinks it.
		memory.resize_offset(U256::zero(), U256::one()).unwrap();
		assert_eq!(memory.effective_len(), 64);
	}

	#[test]
	fn set_with_larger_target_keeps_zero_fill() {
		let mut memory = Memory::new(usize::MAX);
		memory.set(0, &[1, 2, 3], Some(32)).unwrap();
		let mut expected = vec![0u8; 32];
		expected[..3].copy_from_slice(&[1, 2, 3]);
		assert_eq!(memory.get(0, 32), expected);
	}

	#[test]
	fn copy_large_source_offset_past_end() {
		let mut memory = Memory::new(usize::MAX);
		memory
			.copy_large(U256::zero(), U256::from(10), U256::from(4), &[1, 2, 3])
			.unwrap();
		assert_eq!(memory.get(0, 4), vec![0, 0, 0, 0]);
	}

	#[test]
	fn limit_is_enforced() {
		let mut memory = Memory::new(32);
		assert_eq!(
			memory.resize_offset(U256::from(32), U256::one()),
			Err(ExitException::OutOfGas)
		);
	}
}
