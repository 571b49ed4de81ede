use primitive_types::{U256, U512};

use crate::utils::I256;

#[inline]
pub fn div(op1: U256, op2: U256) -> U256 {
	if op2 == U256::zero() {
		U256::zero()
	} else {
		op1 / op2
	}
}

#[inline]
pub fn sdiv(op1: U256, op2: U256) -> U256 {
	let op1: I256 = op1.into();
	let op2: I256 = op2.into();
	let ret = op1 / op2;
	ret.into()
}

#[inline]
pub fn rem(op1: U256, op2: U256) -> U256 {
	if op2 == U256::zero() {
		U256::zero()
	} else {
		op1 % op2
	}
}

#[inline]
pub fn srem(op1: U256, op2: U256) -> U256 {
	if op2 == U256::zero() {
		U256::zero()
	} else {
		let op1: I256 = op1.into();
		let op2: I256 = op2.into();
		let ret = op1 % op2;
		ret.into()
	}
}

#[inline]
pub fn addmod(op1: U256, op2: U256, op3: U256) -> U256 {
	if op3 == U256::zero() {
		U256::zero()
	} else {
		let op1: U512 = op1.into();
		let op2: U512 = op2.into();
		let op3: U512 = op3.into();
		let v = (op1 + op2) % op3;
		v.try_into()
			.expect("op3 is nonzero; the rem is always smaller than op3; qed")
	}
}

#[inline]
pub fn mulmod(op1: U256, op2: U256, op3: U256) -> U256 {
	if op3 == U256::zero() {
		U256::zero()
	} else {
		let op1: U512 = op1.into();
		let op2: U512 = op2.into();
		let op3: U512 = op3.into();
		let v = (op1 * op2) % op3;
		v.try_into()
			.expect("op3 is nonzero; the rem is always smaller than op3; qed")
	}
}

#[inline]
pub fn exp(op1: U256, op2: U256) -> U256 {
	let mut op1 = op1;
	let mut op2 = op2;
	let mut r: U256 = 1.into();

	while op2 != U256::zero() {
		if op2 & 1.into() != U256::zero() {
			r = r.overflowing_mul(op1).0;
		}
		op2 >>= 1;
		op1 = op1.overflowing_mul(op1).0;
	}

	r
}

/// If `op1` is at least 31, `op2` is returned unchanged; otherwise bit
/// 7 of the byte at position `31 - op1` is replicated across all more
/// significant bytes.
#[inline]
pub fn signextend(op1: U256, op2: U256) -> U256 {
	if op1 < U256::from(32) {
		let bit_index = (8 * op1.low_u32() + 7) as usize;
		let bit = op2.bit(bit_index);
		let mask = (U256::one() << bit_index) - U256::one();
		if bit {
			op2 | !mask
		} else {
			op2 & mask
		}
	} else {
		op2
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn neg(v: u64) -> U256 {
		!U256::from(v) + U256::one()
	}

	#[test]
	fn div_by_zero_is_zero() {
		assert_eq!(div(U256::from(5), U256::zero()), U256::zero());
		assert_eq!(rem(U256::from(5), U256::zero()), U256::zero());
		assert_eq!(sdiv(neg(5), U256::zero()), U256::zero());
		assert_eq!(srem(neg(5), U256::zero()), U256::zero());
	}

	#[test]
	fn addmod_mulmod_by_zero_is_zero() {
		assert_eq!(
			addmod(U256::MAX, U256::MAX, U256::zero()),
			U256::zero()
		);
		assert_eq!(
			mulmod(U256::MAX, U256::MAX, U256::zero()),
			U256::zero()
		);
	}

	#[test]
	fn addmod_mulmod_use_wide_intermediates() {
		// MAX + MAX would wrap in 256 bits.
		assert_eq!(
			addmod(U256::MAX, U256::MAX, U256::from(10)),
			(U256::MAX % U256::from(10)) * U256::from(2) % U256::from(10)
		);
		assert_eq!(
			mulmod(U256::MAX, U256::MAX, U256::from(7)),
			U256::from(1)
		);
	}

	#[test]
	fn sdiv_overflow_case() {
		// MIN / -1 == MIN.
		let min = U256::one() << 255;
		assert_eq!(sdiv(min, neg(1)), min);
		assert_eq!(sdiv(neg(100), neg(2)), U256::from(50));
		assert_eq!(sdiv(neg(100), U256::from(2)), neg(50));
	}

	#[test]
	fn srem_sign_follows_dividend() {
		assert_eq!(srem(neg(7), U256::from(3)), neg(1));
		assert_eq!(srem(U256::from(7), neg(3)), U256::from(1));
	}

	#[test]
	fn exp_wraps_mod_2_256() {
		assert_eq!(exp(U256::from(2), U256::from(10)), U256::from(1024));
		assert_eq!(exp(U256::from(3), U256::zero()), U256::one());
		assert_eq!(exp(U256::from(2), U256::from(256)), U256::zero());
	}

	#[test]
	fn signextend_replicates_sign_bit() {
		// 0xff at byte 0, extended from k = 0, becomes -1.
		assert_eq!(signextend(U256::zero(), U256::from(0xff)), U256::MAX);
		assert_eq!(
			signextend(U256::zero(), U256::from(0x7f)),
			U256::from(0x7f)
		);
		// k >= 31 returns the operand unchanged.
		assert_eq!(
			signextend(U256::from(31), U256::from(0xff)),
			U256::from(0xff)
		);
		assert_eq!(
			signextend(U256::MAX, U256::from(0xff)),
			U256::from(0xff)
		);
	}
}
