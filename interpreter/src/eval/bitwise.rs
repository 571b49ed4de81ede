use primitive_types::U256;

use crate::utils::I256;

#[inline]
pub fn slt(op1: U256, op2: U256) -> U256 {
	let op1: I256 = op1.into();
	let op2: I256 = op2.into();

	if op1.lt(&op2) {
		U256::one()
	} else {
		U256::zero()
	}
}

#[inline]
pub fn sgt(op1: U256, op2: U256) -> U256 {
	let op1: I256 = op1.into();
	let op2: I256 = op2.into();

	if op1.gt(&op2) {
		U256::one()
	} else {
		U256::zero()
	}
}

#[inline]
pub fn iszero(op1: U256) -> U256 {
	if op1 == U256::zero() {
		U256::one()
	} else {
		U256::zero()
	}
}

#[inline]
pub fn not(op1: U256) -> U256 {
	!op1
}

/// `BYTE(pos, x)`: big-endian byte `pos` of `x`, or zero when `pos` is
/// 32 or more.
#[inline]
pub fn byte(op1: U256, op2: U256) -> U256 {
	if op1 >= U256::from(32) {
		U256::zero()
	} else {
		U256::from(op2.byte(31 - op1.as_usize()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn neg(v: u64) -> U256 {
		!U256::from(v) + U256::one()
	}

	#[test]
	fn signed_comparisons() {
		assert_eq!(slt(neg(1), U256::one()), U256::one());
		assert_eq!(slt(U256::one(), neg(1)), U256::zero());
		assert_eq!(sgt(U256::one(), neg(1)), U256::one());
		assert_eq!(sgt(neg(1), neg(2)), U256::one());
		assert_eq!(slt(neg(2), neg(1)), U256::one());
	}

	#[test]
	fn not_is_involutive() {
		let v = U256::from(0x1234_5678u64);
		assert_eq!(not(not(v)), v);
	}

	#[test]
	fn byte_positions() {
		let x = U256::from_big_endian(&{
			let mut b = [0u8; 32];
			b[0] = 0xaa;
			b[31] = 0xbb;
			b
		});
		assert_eq!(byte(U256::zero(), x), U256::from(0xaa));
		assert_eq!(byte(U256::from(31), x), U256::from(0xbb));
		assert_eq!(byte(U256::from(32), x), U256::zero());
		assert_eq!(byte(U256::MAX, x), U256::zero());
	}
}
