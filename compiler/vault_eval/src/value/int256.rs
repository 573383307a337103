//! Signed 256-bit integers.
//!
//! Backed by `num_bigint::BigInt`. Every constructor and arithmetic method
//! keeps the value inside [-2^255, 2^255 - 1] and reports overflow as `None`.

use std::fmt;

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

/// Number of value bits (excluding sign).
const VALUE_BITS: u64 = 255;

/// Signed 256-bit integer.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Int256(BigInt);

impl Int256 {
    /// Wrap `value` if it fits in 256 bits.
    pub fn new(value: BigInt) -> Option<Self> {
        fits(&value).then_some(Int256(value))
    }

    pub fn zero() -> Self {
        Int256(BigInt::zero())
    }

    pub fn max_value() -> Self {
        Int256((BigInt::from(1) << VALUE_BITS) - 1)
    }

    pub fn min_value() -> Self {
        Int256(-(BigInt::from(1) << VALUE_BITS))
    }

    pub fn as_bigint(&self) -> &BigInt {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.0.to_i64()
    }

    #[must_use]
    pub fn checked_add(&self, rhs: &Int256) -> Option<Int256> {
        Int256::new(&self.0 + &rhs.0)
    }

    #[must_use]
    pub fn checked_sub(&self, rhs: &Int256) -> Option<Int256> {
        Int256::new(&self.0 - &rhs.0)
    }

    #[must_use]
    pub fn checked_mul(&self, rhs: &Int256) -> Option<Int256> {
        Int256::new(&self.0 * &rhs.0)
    }

    /// Truncating division. `None` on a zero divisor or overflow (`MIN / -1`).
    #[must_use]
    pub fn checked_div(&self, rhs: &Int256) -> Option<Int256> {
        if rhs.is_zero() {
            return None;
        }
        Int256::new(&self.0 / &rhs.0)
    }

    /// Remainder with the sign of the dividend. `None` on a zero divisor.
    #[must_use]
    pub fn checked_rem(&self, rhs: &Int256) -> Option<Int256> {
        if rhs.is_zero() {
            return None;
        }
        Int256::new(&self.0 % &rhs.0)
    }

    #[must_use]
    pub fn checked_neg(&self) -> Option<Int256> {
        Int256::new(-&self.0)
    }
}

/// True if `value` lies in [-2^255, 2^255 - 1].
fn fits(value: &BigInt) -> bool {
    let bits = value.bits();
    if bits <= VALUE_BITS {
        return true;
    }
    // Only -2^255 needs 256 magnitude bits.
    bits == VALUE_BITS + 1 && *value == -(BigInt::from(1) << VALUE_BITS)
}

impl From<i64> for Int256 {
    fn from(value: i64) -> Self {
        Int256(BigInt::from(value))
    }
}

impl From<i128> for Int256 {
    fn from(value: i128) -> Self {
        Int256(BigInt::from(value))
    }
}

impl From<u64> for Int256 {
    fn from(value: u64) -> Self {
        Int256(BigInt::from(value))
    }
}

impl fmt::Display for Int256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Int256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Int256({})", self.0)
    }
}
