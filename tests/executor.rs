use std::collections::BTreeMap;

use embervm::backend::{ApplyBackend, MemoryAccount, MemoryBackend, MemoryVicinity};
use embervm::executor::stack::{MemoryStackState, StackExecutor, StackState};
use embervm::precompile::StandardPrecompiles;
use embervm::{
	tracing, Config, CreateScheme, ExitException, ExitReason, ExitSucceed, Handler,
};
use primitive_types::{H160, H256, U256};

const GAS_LIMIT: u64 = 1_000_000;

fn vicinity() -> MemoryVicinity {
	MemoryVicinity {
		gas_price: U256::one(),
		block_hashes: Vec::new(),
		block_number: U256::from(1000),
		block_coinbase: H160::default(),
		block_timestamp: U256::from(1_500_000_000u64),
		block_difficulty: U256::from(0x0200_0000u64),
		block_gas_limit: U256::from(8_000_000u64),
	}
}

fn contract(code: &str) -> MemoryAccount {
	MemoryAccount {
		nonce: U256::zero(),
		balance: U256::zero(),
		storage: BTreeMap::new(),
		code: hex::decode(code).unwrap(),
	}
}

fn funded(balance: u64) -> MemoryAccount {
	MemoryAccount {
		nonce: U256::zero(),
		balance: U256::from(balance),
		storage: BTreeMap::new(),
		code: Vec::new(),
	}
}

fn caller() -> H160 {
	H160::from_low_u64_be(0xc0ffee)
}

fn push1(v: u8) -> Vec<u8> {
	vec![0x60, v]
}

fn push20(a: H160) -> Vec<u8> {
	let mut v = vec![0x73];
	v.extend_from_slice(a.as_bytes());
	v
}

/// outLen, outOff, inLen, inOff, value, target, gas 0xffff, then the
/// call family opcode; the status word lands on the stack.
fn call_operands(target: H160, value: u8, opcode: u8) -> Vec<u8> {
	let mut code = Vec::new();
	code.extend(push1(32));
	code.extend(push1(0));
	code.extend(push1(0));
	code.extend(push1(0));
	if opcode != 0xf4 {
		code.extend(push1(value));
	}
	code.extend(push20(target));
	code.extend([0x61, 0xff, 0xff]);
	code.push(opcode);
	code
}

/// Store the status word at key 2 and the first returned word at key 1.
fn store_result() -> Vec<u8> {
	let mut code = Vec::new();
	code.extend(push1(2));
	code.push(0x55);
	code.extend(push1(0));
	code.push(0x51);
	code.extend(push1(1));
	code.push(0x55);
	code.push(0x00);
	code
}

fn key(k: u64) -> H256 {
	H256::from_low_u64_be(k)
}

fn word(v: u64) -> H256 {
	H256::from_low_u64_be(v)
}

#[test]
fn transact_call_minimal_add() {
	let vicinity = vicinity();
	let config = Config::classic();
	let target = H160::from_low_u64_be(0xaa);
	let mut state = BTreeMap::new();
	state.insert(target, contract("600160020100"));
	let backend = MemoryBackend::new(&vicinity, state);
	let mut executor = StackExecutor::new(MemoryStackState::new(&backend), &config);

	let (reason, output) =
		executor.transact_call(caller(), target, U256::zero(), Vec::new(), GAS_LIMIT);
	assert_eq!(reason, ExitReason::Succeed(ExitSucceed::Stopped));
	assert!(output.is_empty());
	assert_eq!(executor.used_gas(), 9);
	assert_eq!(executor.gas_left(), GAS_LIMIT - 9);
}

#[test]
fn transact_call_keccak_of_empty() {
	let vicinity = vicinity();
	let config = Config::classic();
	let target = H160::from_low_u64_be(0xaa);
	let mut state = BTreeMap::new();
	state.insert(target, contract("600060002060005260206000f3"));
	let backend = MemoryBackend::new(&vicinity, state);
	let mut executor = StackExecutor::new(MemoryStackState::new(&backend), &config);

	let (reason, output) =
		executor.transact_call(caller(), target, U256::zero(), Vec::new(), GAS_LIMIT);
	assert_eq!(reason, ExitReason::Succeed(ExitSucceed::Returned));
	assert_eq!(
		hex::encode(output),
		"c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
	);
}

#[test]
fn transact_call_invalid_jump_consumes_everything() {
	let vicinity = vicinity();
	let config = Config::classic();
	let target = H160::from_low_u64_be(0xaa);
	let mut state = BTreeMap::new();
	state.insert(target, contract("6005565b00"));
	let backend = MemoryBackend::new(&vicinity, state);
	let mut executor = StackExecutor::new(MemoryStackState::new(&backend), &config);

	let (reason, _) =
		executor.transact_call(caller(), target, U256::zero(), Vec::new(), GAS_LIMIT);
	assert_eq!(
		reason,
		ExitReason::Exception(ExitException::InvalidJump)
	);
	assert_eq!(executor.used_gas(), GAS_LIMIT);
	assert_eq!(executor.gas_left(), 0);
}

#[test]
fn sstore_clear_refund_is_capped() {
	let vicinity = vicinity();
	let config = Config::classic();
	let target = H160::from_low_u64_be(0xaa);
	let mut state = BTreeMap::new();
	// Set a fresh slot, then clear it again in the same transaction.
	state.insert(target, contract("6001600055600060005500"));
	let backend = MemoryBackend::new(&vicinity, state);
	let mut executor = StackExecutor::new(MemoryStackState::new(&backend), &config);

	let (reason, _) =
		executor.transact_call(caller(), target, U256::zero(), Vec::new(), GAS_LIMIT);
	assert!(reason.is_succeed());

	// 4 pushes + 20000 (set) + 5000 (reset); the 15000 clear refund is
	// capped at half the gas used.
	let raw_used = 4 * 3 + 20000 + 5000;
	assert_eq!(executor.refunded_gas(), raw_used / 2);
	assert_eq!(executor.used_gas(), raw_used - raw_used / 2);
}

#[test]
fn storage_writes_survive_apply_and_zero_erases() {
	let vicinity = vicinity();
	let config = Config::classic();
	let target = H160::from_low_u64_be(0xaa);
	let mut state = BTreeMap::new();
	let mut account = contract("602a600055600060015500");
	account
		.storage
		.insert(key(1), word(7));
	state.insert(target, account);
	let mut backend = MemoryBackend::new(&vicinity, state);

	let (applies, logs) = {
		let mut executor =
			StackExecutor::new(MemoryStackState::new(&backend), &config);
		// SSTORE(0, 42); SSTORE(1, 0).
		let (reason, _) =
			executor.transact_call(caller(), target, U256::zero(), Vec::new(), GAS_LIMIT);
		assert!(reason.is_succeed());
		executor.into_state().deconstruct()
	};
	backend.apply(applies, logs, true);

	let account = &backend.state()[&target];
	assert_eq!(account.storage.get(&key(0)), Some(&word(42)));
	// The cleared slot is stored as absent.
	assert_eq!(account.storage.get(&key(1)), None);
}

#[test]
fn call_writes_return_data_and_status() {
	let vicinity = vicinity();
	let config = Config::classic();
	let a = H160::from_low_u64_be(0xaa);
	let b = H160::from_low_u64_be(0xbb);

	let mut code = call_operands(b, 0, 0xf1);
	code.extend(store_result());

	let mut state = BTreeMap::new();
	state.insert(
		a,
		MemoryAccount {
			code,
			..Default::default()
		},
	);
	// B returns the word 42.
	state.insert(b, contract("602a60005260206000f3"));
	let mut backend = MemoryBackend::new(&vicinity, state);

	let (applies, logs) = {
		let mut executor =
			StackExecutor::new(MemoryStackState::new(&backend), &config);
		let (reason, _) =
			executor.transact_call(caller(), a, U256::zero(), Vec::new(), GAS_LIMIT);
		assert!(reason.is_succeed());
		executor.into_state().deconstruct()
	};
	backend.apply(applies, logs, true);

	let account = &backend.state()[&a];
	assert_eq!(account.storage.get(&key(2)), Some(&word(1)));
	assert_eq!(account.storage.get(&key(1)), Some(&word(42)));
}

#[test]
fn child_exception_pushes_zero_and_parent_continues() {
	let vicinity = vicinity();
	let config = Config::classic();
	let a = H160::from_low_u64_be(0xaa);
	let b = H160::from_low_u64_be(0xbb);

	let mut code = call_operands(b, 0, 0xf1);
	code.extend(store_result());

	let mut state = BTreeMap::new();
	state.insert(
		a,
		MemoryAccount {
			code,
			..Default::default()
		},
	);
	// B stores and logs, then dies on an undefined byte; everything it
	// did must unwind.
	state.insert(b, contract("602a60005560006000a0fe"));
	let mut backend = MemoryBackend::new(&vicinity, state);

	let (applies, logs) = {
		let mut executor =
			StackExecutor::new(MemoryStackState::new(&backend), &config);
		let (reason, _) =
			executor.transact_call(caller(), a, U256::zero(), Vec::new(), GAS_LIMIT);
		// The child's trap does not propagate.
		assert!(reason.is_succeed());
		executor.into_state().deconstruct()
	};
	backend.apply(applies, logs, true);

	// Status 0 and return word 0 are stored as absent.
	let account = &backend.state()[&a];
	assert!(account.storage.is_empty());
	// The reverted child's storage write and log are gone.
	assert!(backend.state()[&b].storage.is_empty());
	assert!(backend.logs().is_empty());
}

#[test]
fn delegatecall_inherits_context() {
	let vicinity = vicinity();
	let config = Config::classic();
	let a = H160::from_low_u64_be(0xaa);
	let b = H160::from_low_u64_be(0xbb);

	let mut code = call_operands(b, 0, 0xf4);
	code.push(0x00);

	let mut state = BTreeMap::new();
	state.insert(
		a,
		MemoryAccount {
			code,
			..Default::default()
		},
	);
	// B records CALLER, ADDRESS and CALLVALUE into storage.
	state.insert(b, contract("33600055306001553460025500"));
	state.insert(caller(), funded(100));
	let mut backend = MemoryBackend::new(&vicinity, state);

	let (applies, logs) = {
		let mut executor =
			StackExecutor::new(MemoryStackState::new(&backend), &config);
		let (reason, _) =
			executor.transact_call(caller(), a, U256::from(5), Vec::new(), GAS_LIMIT);
		assert!(reason.is_succeed());
		executor.into_state().deconstruct()
	};
	backend.apply(applies, logs, true);

	// The callee ran under A's identity, with A's caller and value.
	let account = &backend.state()[&a];
	assert_eq!(account.storage.get(&key(0)), Some(&H256::from(caller())));
	assert_eq!(account.storage.get(&key(1)), Some(&H256::from(a)));
	assert_eq!(account.storage.get(&key(2)), Some(&word(5)));
	assert_eq!(account.balance, U256::from(5));
	assert!(backend.state()[&b].storage.is_empty());
}

#[test]
fn callcode_runs_under_caller_address() {
	let vicinity = vicinity();
	let config = Config::classic();
	let a = H160::from_low_u64_be(0xaa);
	let b = H160::from_low_u64_be(0xbb);

	let mut code = call_operands(b, 0, 0xf2);
	code.push(0x00);

	let mut state = BTreeMap::new();
	state.insert(
		a,
		MemoryAccount {
			code,
			..Default::default()
		},
	);
	state.insert(b, contract("3060005500"));
	let mut backend = MemoryBackend::new(&vicinity, state);

	let (applies, logs) = {
		let mut executor =
			StackExecutor::new(MemoryStackState::new(&backend), &config);
		let (reason, _) =
			executor.transact_call(caller(), a, U256::zero(), Vec::new(), GAS_LIMIT);
		assert!(reason.is_succeed());
		executor.into_state().deconstruct()
	};
	backend.apply(applies, logs, true);

	assert_eq!(
		backend.state()[&a].storage.get(&key(0)),
		Some(&H256::from(a))
	);
	assert!(backend.state()[&b].storage.is_empty());
}

#[test]
fn create_from_contract() {
	let vicinity = vicinity();
	let config = Config::classic();
	let a = H160::from_low_u64_be(0xaa);

	// Init code that returns the single byte 0xfe.
	let init = "60fe60005360016000f3";
	// PUSH10 init; MSTORE at 0 (bytes 22..32); CREATE(0, 22, 10);
	// store the created address at key 0.
	let code = format!("69{init}600052600a60166000f060005500");

	let mut state = BTreeMap::new();
	state.insert(a, contract(&code));
	let mut backend = MemoryBackend::new(&vicinity, state);

	let (created, (applies, logs)) = {
		let mut executor =
			StackExecutor::new(MemoryStackState::new(&backend), &config);
		let created = executor.create_address(CreateScheme::Legacy { caller: a });
		let (reason, _) =
			executor.transact_call(caller(), a, U256::zero(), Vec::new(), GAS_LIMIT);
		assert!(reason.is_succeed());
		(created, executor.into_state().deconstruct())
	};
	backend.apply(applies, logs, true);

	assert_eq!(backend.state()[&created].code, vec![0xfe]);
	assert_eq!(
		backend.state()[&a].storage.get(&key(0)),
		Some(&H256::from(created))
	);
	// The creator's nonce rose.
	assert_eq!(backend.state()[&a].nonce, U256::one());
}

#[test]
fn transact_create_deploys_code() {
	let vicinity = vicinity();
	let config = Config::classic();
	let mut state = BTreeMap::new();
	state.insert(caller(), funded(0));
	let mut backend = MemoryBackend::new(&vicinity, state);

	let init = hex::decode("60fe60005360016000f3").unwrap();
	let (address, applies, logs) = {
		let mut executor =
			StackExecutor::new(MemoryStackState::new(&backend), &config);
		let expected = executor.create_address(CreateScheme::Legacy { caller: caller() });
		let (reason, address) =
			executor.transact_create(caller(), U256::zero(), init, GAS_LIMIT);
		assert_eq!(reason, ExitReason::Succeed(ExitSucceed::Returned));
		assert_eq!(address, Some(expected));
		let (applies, logs) = executor.into_state().deconstruct();
		(expected, applies, logs)
	};
	backend.apply(applies, logs, true);

	assert_eq!(backend.state()[&address].code, vec![0xfe]);
	assert_eq!(backend.state()[&caller()].nonce, U256::one());
}

#[test]
fn selfdestruct_moves_balance_and_refunds() {
	let vicinity = vicinity();
	let config = Config::classic();
	let s = H160::from_low_u64_be(0xaa);
	let beneficiary = H160::from_low_u64_be(0xbebe);

	let mut code = push20(beneficiary);
	code.push(0xff);

	let mut state = BTreeMap::new();
	state.insert(
		s,
		MemoryAccount {
			balance: U256::from(1000),
			code,
			..Default::default()
		},
	);
	let mut backend = MemoryBackend::new(&vicinity, state);

	let (applies, logs) = {
		let mut executor =
			StackExecutor::new(MemoryStackState::new(&backend), &config);
		let (reason, _) =
			executor.transact_call(caller(), s, U256::zero(), Vec::new(), GAS_LIMIT);
		assert_eq!(reason, ExitReason::Succeed(ExitSucceed::Suicided));

		// PUSH20 + SELFDESTRUCT base + new-account surcharge, half
		// refunded up to the suicide refund.
		let raw_used = 3 + 5000 + 25000;
		assert_eq!(executor.refunded_gas(), 24000.min(raw_used / 2));
		executor.into_state().deconstruct()
	};
	backend.apply(applies, logs, true);

	// The contract is gone; its balance moved.
	assert!(!backend.state().contains_key(&s));
	assert_eq!(backend.state()[&beneficiary].balance, U256::from(1000));
}

#[test]
fn selfdestruct_refund_credited_once_per_address() {
	let vicinity = vicinity();
	let backend = MemoryBackend::new(&vicinity, BTreeMap::new());
	let s = H160::from_low_u64_be(0x51);
	let b1 = H160::from_low_u64_be(0x01);
	let b2 = H160::from_low_u64_be(0x02);

	let mut state = MemoryStackState::new(&backend);
	assert!(state.mark_delete(s, b1));
	// Only the first insertion counts, whatever the beneficiary.
	assert!(!state.mark_delete(s, b2));
	assert!(state.deleted(s));

	// A nested frame sees the ancestor insertion.
	state.enter();
	assert!(!state.mark_delete(s, b1));
	state.exit_revert().unwrap();
	assert!(state.deleted(s));

	// A reverted insertion does not stick.
	let other = H160::from_low_u64_be(0x52);
	state.enter();
	assert!(state.mark_delete(other, b1));
	state.exit_revert().unwrap();
	assert!(!state.deleted(other));
	assert!(state.mark_delete(other, b1));
}

#[test]
fn value_call_grants_stipend_and_returns_leftover() {
	let vicinity = vicinity();
	let config = Config::classic();
	let a = H160::from_low_u64_be(0xaa);
	let b = H160::from_low_u64_be(0xbb);

	// CALL B with value 10 and a zero gas request; the callee lives on
	// the stipend alone.
	let mut code = Vec::new();
	code.extend(push1(0));
	code.extend(push1(0));
	code.extend(push1(0));
	code.extend(push1(0));
	code.extend(push1(10));
	code.extend(push20(b));
	code.extend(push1(0));
	code.push(0xf1);
	code.push(0x00);

	let mut state = BTreeMap::new();
	state.insert(
		a,
		MemoryAccount {
			balance: U256::from(10),
			code,
			..Default::default()
		},
	);
	let mut backend = MemoryBackend::new(&vicinity, state);

	let (applies, logs) = {
		let mut executor =
			StackExecutor::new(MemoryStackState::new(&backend), &config);
		let (reason, _) =
			executor.transact_call(caller(), a, U256::zero(), Vec::new(), GAS_LIMIT);
		assert!(reason.is_succeed());

		// 7 pushes + CALL + value surcharge + new account surcharge,
		// minus the unspent stipend the callee handed back.
		assert_eq!(executor.used_gas(), 7 * 3 + 700 + 9000 + 25000 - 2300);
		executor.into_state().deconstruct()
	};
	backend.apply(applies, logs, true);

	assert_eq!(backend.state()[&b].balance, U256::from(10));
	assert_eq!(backend.state()[&a].balance, U256::zero());
}

#[test]
fn call_depth_is_limited() {
	let vicinity = vicinity();
	let config = Config {
		call_stack_limit: 4,
		..Config::classic()
	};
	let a = H160::from_low_u64_be(0xaa);

	// A calls itself forever; the driver cuts the tree at the limit.
	let mut code = Vec::new();
	code.extend(push1(0));
	code.extend(push1(0));
	code.extend(push1(0));
	code.extend(push1(0));
	code.extend(push1(0));
	code.push(0x30);
	code.extend([0x61, 0xff, 0xff]);
	code.push(0xf1);
	code.push(0x00);

	let mut state = BTreeMap::new();
	state.insert(
		a,
		MemoryAccount {
			code,
			..Default::default()
		},
	);
	let backend = MemoryBackend::new(&vicinity, state);

	struct DepthRecorder {
		max_depth: usize,
	}
	impl tracing::EventListener for DepthRecorder {
		fn event(&mut self, event: tracing::Event) {
			if let tracing::Event::Step { depth, .. } = event {
				if depth > self.max_depth {
					self.max_depth = depth;
				}
			}
		}
	}

	let mut recorder = DepthRecorder { max_depth: 0 };
	let reason = tracing::using(&mut recorder, || {
		let mut executor =
			StackExecutor::new(MemoryStackState::new(&backend), &config);
		let (reason, _) =
			executor.transact_call(caller(), a, U256::zero(), Vec::new(), GAS_LIMIT);
		reason
	});

	assert!(reason.is_succeed());
	assert_eq!(recorder.max_depth, 4);
}

#[test]
fn step_observer_sees_every_dispatch_in_order() {
	let vicinity = vicinity();
	let config = Config::classic();
	let target = H160::from_low_u64_be(0xaa);
	let mut state = BTreeMap::new();
	state.insert(target, contract("600160020100"));
	let backend = MemoryBackend::new(&vicinity, state);

	struct OpcodeRecorder {
		opcodes: Vec<u8>,
	}
	impl tracing::EventListener for OpcodeRecorder {
		fn event(&mut self, event: tracing::Event) {
			if let tracing::Event::Step { opcode, .. } = event {
				self.opcodes.push(opcode.as_u8());
			}
		}
	}

	let mut recorder = OpcodeRecorder {
		opcodes: Vec::new(),
	};
	tracing::using(&mut recorder, || {
		let mut executor =
			StackExecutor::new(MemoryStackState::new(&backend), &config);
		executor.transact_call(caller(), target, U256::zero(), Vec::new(), GAS_LIMIT)
	});

	assert_eq!(recorder.opcodes, vec![0x60, 0x60, 0x01, 0x00]);
}

#[test]
fn identity_precompile_echoes() {
	let vicinity = vicinity();
	let config = Config::classic();
	let backend = MemoryBackend::new(&vicinity, BTreeMap::new());
	let precompiles = StandardPrecompiles;
	let mut executor = StackExecutor::new_with_precompiles(
		MemoryStackState::new(&backend),
		&config,
		&precompiles,
	);

	let (reason, output) = executor.transact_call(
		caller(),
		H160::from_low_u64_be(4),
		U256::zero(),
		b"hello".to_vec(),
		GAS_LIMIT,
	);
	assert_eq!(reason, ExitReason::Succeed(ExitSucceed::Returned));
	assert_eq!(output, b"hello".to_vec());
	assert_eq!(executor.used_gas(), 18);
}

#[test]
fn out_of_gas_consumes_the_limit() {
	let vicinity = vicinity();
	let config = Config::classic();
	let target = H160::from_low_u64_be(0xaa);
	let mut state = BTreeMap::new();
	state.insert(target, contract("600160005500"));
	let backend = MemoryBackend::new(&vicinity, state);
	let mut executor = StackExecutor::new(MemoryStackState::new(&backend), &config);

	let (reason, _) = executor.transact_call(caller(), target, U256::zero(), Vec::new(), 1000);
	assert_eq!(reason, ExitReason::Exception(ExitException::OutOfGas));
	assert_eq!(executor.used_gas(), 1000);
}

#[test]
fn run_code_is_side_effect_free_on_nonces() {
	let vicinity = vicinity();
	let config = Config::classic();
	let backend = MemoryBackend::new(&vicinity, BTreeMap::new());
	let mut executor = StackExecutor::new(MemoryStackState::new(&backend), &config);

	let (reason, output) = executor.run_code(
		embervm::Context {
			address: H160::from_low_u64_be(0xaa),
			caller: caller(),
			apparent_value: U256::zero(),
		},
		embervm::TransactionContext {
			origin: caller(),
			gas_price: U256::one(),
		},
		hex::decode("602a60005260206000f3").unwrap(),
		Vec::new(),
		GAS_LIMIT,
	);
	assert_eq!(reason, ExitReason::Succeed(ExitSucceed::Returned));
	assert_eq!(output, embervm::interpreter::utils::u256_to_h256(U256::from(42)).as_bytes());

	let state = executor.into_state();
	assert_eq!(state.nonce(caller()), U256::zero());
}
