use alloc::vec::Vec;

use primitive_types::{H256, U256};
use sha3::{Digest, Keccak256};

use crate::error::ExitSucceed;
use crate::etable::Control;
use crate::frame::Frame;
use crate::gasometer::consts::R_SUICIDE;
use crate::runtime::{
	CallCreateTrapData, CallScheme, CallTrapData, Context, CreateScheme, CreateTrapData, Handler,
	Log, Transfer,
};
use crate::utils::h256_to_h160;

#[inline]
pub fn sha3(machine: &mut Frame) -> Control {
	pop_u256!(machine, from, len);

	try_or_fail!(machine.memory.resize_offset(from, len));
	let data = if len == U256::zero() {
		Vec::new()
	} else {
		let from = as_usize_or_fail!(from);
		let len = as_usize_or_fail!(len);

		machine.memory.get(from, len)
	};

	let ret = Keccak256::digest(data.as_slice());
	push!(machine, H256::from_slice(ret.as_slice()));

	Control::Continue(1)
}

#[inline]
pub fn address(machine: &mut Frame) -> Control {
	let ret = H256::from(machine.context.address);
	push!(machine, ret);
	Control::Continue(1)
}

#[inline]
pub fn balance<H: Handler>(machine: &mut Frame, handler: &H) -> Control {
	pop!(machine, address);
	push_u256!(machine, handler.balance(h256_to_h160(address)));
	Control::Continue(1)
}

#[inline]
pub fn origin(machine: &mut Frame) -> Control {
	let ret = H256::from(machine.transaction_context.origin);
	push!(machine, ret);
	Control::Continue(1)
}

#[inline]
pub fn caller(machine: &mut Frame) -> Control {
	let ret = H256::from(machine.context.caller);
	push!(machine, ret);
	Control::Continue(1)
}

#[inline]
pub fn callvalue(machine: &mut Frame) -> Control {
	push_u256!(machine, machine.context.apparent_value);
	Control::Continue(1)
}

#[inline]
pub fn gasprice(machine: &mut Frame) -> Control {
	push_u256!(machine, machine.transaction_context.gas_price);
	Control::Continue(1)
}

#[inline]
pub fn extcodesize<H: Handler>(machine: &mut Frame, handler: &H) -> Control {
	pop!(machine, address);
	push_u256!(machine, handler.code_size(h256_to_h160(address)));
	Control::Continue(1)
}

#[inline]
pub fn extcodecopy<H: Handler>(machine: &mut Frame, handler: &H) -> Control {
	pop!(machine, address);
	pop_u256!(machine, memory_offset, code_offset, len);

	try_or_fail!(machine.memory.resize_offset(memory_offset, len));
	let code = handler.code(h256_to_h160(address));
	match machine
		.memory
		.copy_large(memory_offset, code_offset, len, &code)
	{
		Ok(()) => Control::Continue(1),
		Err(e) => Control::Exit(e.into()),
	}
}

/// `BLOCKHASH` reads zero outside the `(0, 256]` window; backend
/// failures for ancient blocks also read zero, never an error.
#[inline]
pub fn blockhash<H: Handler>(machine: &mut Frame, handler: &H) -> Control {
	pop_u256!(machine, number);

	let current = handler.block_number();
	let ret = if number >= current || current - number > U256::from(256) {
		H256::default()
	} else {
		handler.block_hash(number)
	};
	push!(machine, ret);

	Control::Continue(1)
}

#[inline]
pub fn coinbase<H: Handler>(machine: &mut Frame, handler: &H) -> Control {
	push!(machine, H256::from(handler.block_coinbase()));
	Control::Continue(1)
}

#[inline]
pub fn timestamp<H: Handler>(machine: &mut Frame, handler: &H) -> Control {
	push_u256!(machine, handler.block_timestamp());
	Control::Continue(1)
}

#[inline]
pub fn number<H: Handler>(machine: &mut Frame, handler: &H) -> Control {
	push_u256!(machine, handler.block_number());
	Control::Continue(1)
}

#[inline]
pub fn difficulty<H: Handler>(machine: &mut Frame, handler: &H) -> Control {
	push_u256!(machine, handler.block_difficulty());
	Control::Continue(1)
}

#[inline]
pub fn gaslimit<H: Handler>(machine: &mut Frame, handler: &H) -> Control {
	push_u256!(machine, handler.block_gas_limit());
	Control::Continue(1)
}

#[inline]
pub fn sload<H: Handler>(machine: &mut Frame, handler: &H) -> Control {
	pop!(machine, key);
	let value = handler.storage(machine.context.address, key);
	push!(machine, value);
	Control::Continue(1)
}

#[inline]
pub fn sstore<H: Handler>(machine: &mut Frame, handler: &mut H) -> Control {
	pop!(machine, key, value);

	match handler.set_storage(machine.context.address, key, value) {
		Ok(()) => Control::Continue(1),
		Err(e) => Control::Exit(e.into()),
	}
}

/// `GAS` observes the counter after this opcode's own base fee.
#[inline]
pub fn gas(machine: &mut Frame) -> Control {
	push_u256!(machine, U256::from(machine.gasometer.gas()));
	Control::Continue(1)
}

#[inline]
pub fn log<H: Handler>(machine: &mut Frame, n: u8, handler: &mut H) -> Control {
	pop_u256!(machine, offset, len);

	try_or_fail!(machine.memory.resize_offset(offset, len));
	let data = if len == U256::zero() {
		Vec::new()
	} else {
		let offset = as_usize_or_fail!(offset);
		let len = as_usize_or_fail!(len);

		machine.memory.get(offset, len)
	};

	let mut topics = Vec::new();
	for _ in 0..(n as usize) {
		match machine.stack.pop() {
			Ok(value) => topics.push(value),
			Err(e) => return Control::Exit(e.into()),
		}
	}

	match handler.log(Log {
		address: machine.context.address,
		topics,
		data,
	}) {
		Ok(()) => Control::Continue(1),
		Err(e) => Control::Exit(e.into()),
	}
}

/// `SELFDESTRUCT`: the whole balance moves to the beneficiary, the
/// contract balance is zeroed, and the refund is credited only for the
/// first selfdestruct of this address in the transaction. Deletion
/// itself happens at transaction end.
#[inline]
pub fn suicide<H: Handler>(machine: &mut Frame, handler: &mut H) -> Control {
	pop!(machine, target);
	let target = h256_to_h160(target);
	let address = machine.context.address;

	let balance = handler.balance(address);
	if handler.mark_delete(address, target) {
		machine.gasometer.record_refund(R_SUICIDE);
	}

	match handler.transfer(Transfer {
		source: address,
		target,
		value: balance,
	}) {
		Ok(()) => (),
		Err(e) => return Control::Exit(e.into()),
	}
	handler.reset_balance(address);

	Control::Exit(ExitSucceed::Suicided.into())
}

#[inline]
pub fn create(machine: &mut Frame) -> Control {
	pop_u256!(machine, value, code_offset, len);

	try_or_fail!(machine.memory.resize_offset(code_offset, len));
	let init_code = if len == U256::zero() {
		Vec::new()
	} else {
		let code_offset = as_usize_or_fail!(code_offset);
		let len = as_usize_or_fail!(len);

		machine.memory.get(code_offset, len)
	};

	Control::Trap(CallCreateTrapData::Create(CreateTrapData {
		scheme: CreateScheme::Legacy {
			caller: machine.context.address,
		},
		value,
		init_code,
	}))
}

#[inline]
pub fn call<H: Handler>(machine: &mut Frame, scheme: CallScheme, _handler: &H) -> Control {
	pop_u256!(machine, gas);
	pop!(machine, to);
	let target = h256_to_h160(to);

	let value = match scheme {
		CallScheme::Call | CallScheme::CallCode => {
			pop_u256!(machine, value);
			value
		}
		CallScheme::DelegateCall => U256::zero(),
	};

	pop_u256!(machine, in_offset, in_len, out_offset, out_len);

	try_or_fail!(machine.memory.resize_offset(in_offset, in_len));
	try_or_fail!(machine.memory.resize_offset(out_offset, out_len));

	let input = if in_len == U256::zero() {
		Vec::new()
	} else {
		let in_offset = as_usize_or_fail!(in_offset);
		let in_len = as_usize_or_fail!(in_len);

		machine.memory.get(in_offset, in_len)
	};

	let context = match scheme {
		CallScheme::Call => Context {
			address: target,
			caller: machine.context.address,
			apparent_value: value,
		},
		CallScheme::CallCode => Context {
			address: machine.context.address,
			caller: machine.context.address,
			apparent_value: value,
		},
		CallScheme::DelegateCall => Context {
			address: machine.context.address,
			caller: machine.context.caller,
			apparent_value: machine.context.apparent_value,
		},
	};

	let transfer = match scheme {
		CallScheme::Call => Some(Transfer {
			source: machine.context.address,
			target,
			value,
		}),
		CallScheme::CallCode => Some(Transfer {
			source: machine.context.address,
			target: machine.context.address,
			value,
		}),
		CallScheme::DelegateCall => None,
	};

	Control::Trap(CallCreateTrapData::Call(CallTrapData {
		scheme,
		target,
		gas,
		transfer,
		input,
		out_offset,
		out_len,
		context,
	}))
}
