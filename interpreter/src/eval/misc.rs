use alloc::vec::Vec;
use core::cmp::min;

use primitive_types::{H256, U256};

use crate::error::{ExitException, ExitSucceed};
use crate::etable::Control;
use crate::frame::Frame;

#[inline]
pub fn codesize(machine: &mut Frame) -> Control {
	let size = U256::from(machine.code.len());
	push_u256!(machine, size);
	Control::Continue(1)
}

#[inline]
pub fn codecopy(machine: &mut Frame) -> Control {
	pop_u256!(machine, memory_offset, code_offset, len);

	try_or_fail!(machine.memory.resize_offset(memory_offset, len));
	let code = machine.code.clone();
	match machine
		.memory
		.copy_large(memory_offset, code_offset, len, &code)
	{
		Ok(()) => Control::Continue(1),
		Err(e) => Control::Exit(e.into()),
	}
}

#[inline]
pub fn calldataload(machine: &mut Frame) -> Control {
	pop_u256!(machine, index);

	let mut load = [0u8; 32];
	#[allow(clippy::needless_range_loop)]
	for i in 0..32 {
		if let Some(p) = index.checked_add(U256::from(i)) {
			if p <= U256::from(usize::MAX) {
				let p = p.as_usize();
				if p < machine.data.len() {
					load[i] = machine.data[p];
				}
			}
		}
	}

	push!(machine, H256::from(load));
	Control::Continue(1)
}

#[inline]
pub fn calldatasize(machine: &mut Frame) -> Control {
	let len = U256::from(machine.data.len());
	push_u256!(machine, len);
	Control::Continue(1)
}

#[inline]
pub fn calldatacopy(machine: &mut Frame) -> Control {
	pop_u256!(machine, memory_offset, data_offset, len);

	try_or_fail!(machine.memory.resize_offset(memory_offset, len));
	if len == U256::zero() {
		return Control::Continue(1);
	}

	let data = machine.data.clone();
	match machine
		.memory
		.copy_large(memory_offset, data_offset, len, &data)
	{
		Ok(()) => Control::Continue(1),
		Err(e) => Control::Exit(e.into()),
	}
}

#[inline]
pub fn pop(machine: &mut Frame) -> Control {
	pop!(machine, _val);
	Control::Continue(1)
}

#[inline]
pub fn mload(machine: &mut Frame) -> Control {
	pop_u256!(machine, index);
	try_or_fail!(machine.memory.resize_offset(index, U256::from(32)));
	let index = as_usize_or_fail!(index);
	let value = H256::from_slice(&machine.memory.get(index, 32)[..]);
	push!(machine, value);
	Control::Continue(1)
}

#[inline]
pub fn mstore(machine: &mut Frame) -> Control {
	pop_u256!(machine, index);
	pop!(machine, value);
	try_or_fail!(machine.memory.resize_offset(index, U256::from(32)));
	let index = as_usize_or_fail!(index);
	match machine.memory.set(index, &value[..], Some(32)) {
		Ok(()) => Control::Continue(1),
		Err(e) => Control::Exit(e.into()),
	}
}

#[inline]
pub fn mstore8(machine: &mut Frame) -> Control {
	pop_u256!(machine, index, value);
	try_or_fail!(machine.memory.resize_offset(index, U256::one()));
	let index = as_usize_or_fail!(index);
	let value = (value.low_u32() & 0xff) as u8;
	match machine.memory.set(index, &[value], Some(1)) {
		Ok(()) => Control::Continue(1),
		Err(e) => Control::Exit(e.into()),
	}
}

#[inline]
pub fn jump(machine: &mut Frame) -> Control {
	pop_u256!(machine, dest);
	let dest = as_usize_or_fail!(dest, ExitException::InvalidJump);

	if machine.valids.is_valid(dest) {
		Control::Jump(dest)
	} else {
		Control::Exit(ExitException::InvalidJump.into())
	}
}

#[inline]
pub fn jumpi(machine: &mut Frame) -> Control {
	pop_u256!(machine, dest);
	pop!(machine, value);

	if value == H256::default() {
		Control::Continue(1)
	} else {
		let dest = as_usize_or_fail!(dest, ExitException::InvalidJump);
		if machine.valids.is_valid(dest) {
			Control::Jump(dest)
		} else {
			Control::Exit(ExitException::InvalidJump.into())
		}
	}
}

/// `PC` pushes the position of the opcode itself, not of its
/// successor.
#[inline]
pub fn pc(machine: &mut Frame, position: usize) -> Control {
	push_u256!(machine, U256::from(position));
	Control::Continue(1)
}

#[inline]
pub fn msize(machine: &mut Frame) -> Control {
	push_u256!(machine, U256::from(machine.memory.effective_len()));
	Control::Continue(1)
}

/// `PUSHn`: immediates clipped by the end of code read as zero.
#[inline]
pub fn push(machine: &mut Frame, n: usize, position: usize) -> Control {
	let end = min(position + 1 + n, machine.code.len());
	let slice = &machine.code[(position + 1)..end];
	let mut val = [0u8; 32];
	val[(32 - n)..(32 - n + slice.len())].copy_from_slice(slice);

	push!(machine, H256(val));
	Control::Continue(1 + n)
}

#[inline]
pub fn dup(machine: &mut Frame, n: usize) -> Control {
	let value = match machine.stack.peek(n - 1) {
		Ok(value) => value,
		Err(e) => return Control::Exit(e.into()),
	};
	push!(machine, value);
	Control::Continue(1)
}

#[inline]
pub fn swap(machine: &mut Frame, n: usize) -> Control {
	let val1 = match machine.stack.peek(0) {
		Ok(value) => value,
		Err(e) => return Control::Exit(e.into()),
	};
	let val2 = match machine.stack.peek(n) {
		Ok(value) => value,
		Err(e) => return Control::Exit(e.into()),
	};
	try_or_fail!(machine.stack.set(0, val2));
	try_or_fail!(machine.stack.set(n, val1));
	Control::Continue(1)
}

#[inline]
pub fn ret(machine: &mut Frame) -> Control {
	pop_u256!(machine, start, len);
	try_or_fail!(machine.memory.resize_offset(start, len));

	machine.retval = if len == U256::zero() {
		Vec::new()
	} else {
		let start = as_usize_or_fail!(start);
		let len = as_usize_or_fail!(len);
		machine.memory.get(start, len)
	};

	Control::Exit(ExitSucceed::Returned.into())
}
