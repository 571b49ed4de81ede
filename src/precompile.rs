//! Native implementations of the reserved precompile addresses
//! `0x01..0x04`. Higher reserved addresses behave as empty accounts
//! until a custom registry provides them.

use alloc::vec::Vec;
use core::cmp::min;

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use primitive_types::{H160, H256};
use sha3::{Digest, Keccak256};

use crate::executor::stack::PrecompileSet;
use crate::interpreter::{ExitReason, ExitSucceed, Gasometer};

/// The four classic precompiles: `ECRECOVER`, `SHA256`, `RIPEMD160`
/// and `IDENTITY`.
pub struct StandardPrecompiles;

fn linear_cost(len: usize, base: u64, word: u64) -> u64 {
	let words = (len as u64).div_ceil(32);
	base.saturating_add(word.saturating_mul(words))
}

impl PrecompileSet for StandardPrecompiles {
	fn execute(
		&self,
		address: H160,
		input: &[u8],
		gasometer: &mut Gasometer,
	) -> Option<(ExitReason, Vec<u8>)> {
		match precompile_index(address) {
			Some(1) => Some(ecrecover(input, gasometer)),
			Some(2) => Some(sha256(input, gasometer)),
			Some(3) => Some(ripemd160(input, gasometer)),
			Some(4) => Some(identity(input, gasometer)),
			_ => None,
		}
	}

	fn is_precompile(&self, address: H160) -> bool {
		matches!(precompile_index(address), Some(1..=4))
	}
}

fn precompile_index(address: H160) -> Option<u64> {
	let index = address.to_low_u64_be();
	if address == H160::from_low_u64_be(index) {
		Some(index)
	} else {
		None
	}
}

fn ecrecover(i: &[u8], gasometer: &mut Gasometer) -> (ExitReason, Vec<u8>) {
	const COST_BASE: u64 = 3000;
	if let Err(e) = gasometer.record_cost(COST_BASE) {
		return (e.into(), Vec::new());
	}

	let mut input = [0u8; 128];
	input[..min(i.len(), 128)].copy_from_slice(&i[..min(i.len(), 128)]);

	// v is 27 or 28 over the full 32-byte word; anything else recovers
	// nothing, successfully.
	if input[32..63] != [0u8; 31] || ![27, 28].contains(&input[63]) {
		return (ExitSucceed::Returned.into(), Vec::new());
	}

	let mut msg = [0u8; 32];
	let mut sig = [0u8; 64];
	msg.copy_from_slice(&input[0..32]);
	sig[0..32].copy_from_slice(&input[64..96]);
	sig[32..64].copy_from_slice(&input[96..128]);

	let recover = || -> Option<H256> {
		let mut raw_recid = input[63] - 27;
		let mut sig = Signature::from_bytes((&sig[..]).into()).ok()?;
		if let Some(normalized) = sig.normalize_s() {
			sig = normalized;
			raw_recid ^= 1;
		}

		let recid = RecoveryId::from_byte(raw_recid)?;
		let pubkey = VerifyingKey::recover_from_prehash(&msg[..], &sig, recid).ok()?;

		let mut address = H256::from_slice(
			Keccak256::digest(&pubkey.to_encoded_point(false).as_bytes()[1..]).as_slice(),
		);
		address.0[0..12].copy_from_slice(&[0u8; 12]);
		Some(address)
	};

	match recover() {
		Some(address) => (ExitSucceed::Returned.into(), address.0.to_vec()),
		None => (ExitSucceed::Returned.into(), Vec::new()),
	}
}

fn sha256(input: &[u8], gasometer: &mut Gasometer) -> (ExitReason, Vec<u8>) {
	const COST_BASE: u64 = 60;
	const COST_WORD: u64 = 12;
	if let Err(e) = gasometer.record_cost(linear_cost(input.len(), COST_BASE, COST_WORD)) {
		return (e.into(), Vec::new());
	}

	let hash = sha2::Sha256::digest(input);
	(ExitSucceed::Returned.into(), hash.to_vec())
}

fn ripemd160(input: &[u8], gasometer: &mut Gasometer) -> (ExitReason, Vec<u8>) {
	const COST_BASE: u64 = 600;
	const COST_WORD: u64 = 120;
	if let Err(e) = gasometer.record_cost(linear_cost(input.len(), COST_BASE, COST_WORD)) {
		return (e.into(), Vec::new());
	}

	let mut ret = [0u8; 32];
	let hash = ripemd::Ripemd160::digest(input);
	ret[12..32].copy_from_slice(&hash);
	(ExitSucceed::Returned.into(), ret.to_vec())
}

fn identity(input: &[u8], gasometer: &mut Gasometer) -> (ExitReason, Vec<u8>) {
	const COST_BASE: u64 = 15;
	const COST_WORD: u64 = 3;
	if let Err(e) = gasometer.record_cost(linear_cost(input.len(), COST_BASE, COST_WORD)) {
		return (e.into(), Vec::new());
	}

	(ExitSucceed::Returned.into(), input.to_vec())
}
