//! Conversions between [`U256`] and arbitrary precision integers.

use {
    alloy::primitives::U256,
    num::{BigInt, BigUint, bigint::Sign},
};

/// A value that does not fit the unsigned integer width it is converted to.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{value} is out of range for uint{bits}")]
pub struct RangeError {
    /// Decimal representation of the rejected value.
    pub value: String,
    pub bits: u16,
}

impl RangeError {
    pub fn new(value: impl ToString, bits: u16) -> Self {
        Self {
            value: value.to_string(),
            bits,
        }
    }
}

/// Extension trait for U256 to add conversions from and to big integers.
pub trait U256Ext: Sized {
    /// Convert to BigInt.
    fn to_big_int(&self) -> BigInt;

    /// Convert to BigUint.
    fn to_big_uint(&self) -> BigUint;

    /// Create from BigInt. Fails for negative values and values of 2^256 and
    /// above.
    fn from_big_int(input: &BigInt) -> Result<Self, RangeError>;

    /// Create from BigUint. Fails for values of 2^256 and above.
    fn from_big_uint(input: &BigUint) -> Result<Self, RangeError>;
}

impl U256Ext for U256 {
    fn to_big_int(&self) -> BigInt {
        BigInt::from_biguint(Sign::Plus, self.to_big_uint())
    }

    fn to_big_uint(&self) -> BigUint {
        BigUint::from_bytes_be(self.to_be_bytes::<32>().as_slice())
    }

    fn from_big_int(input: &BigInt) -> Result<Self, RangeError> {
        if input.sign() == Sign::Minus {
            return Err(RangeError::new(input, 256));
        }
        Self::from_big_uint(input.magnitude())
    }

    fn from_big_uint(input: &BigUint) -> Result<Self, RangeError> {
        let bytes = input.to_bytes_be();
        if bytes.len() > 32 {
            return Err(RangeError::new(input, 256));
        }
        Ok(U256::from_be_slice(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use {super::*, num::One};

    #[test]
    fn big_int_bounds() {
        assert_eq!(U256::from_big_int(&BigInt::from(0)).unwrap(), U256::ZERO);

        let max = (BigInt::one() << 256) - 1;
        assert_eq!(U256::from_big_int(&max).unwrap(), U256::MAX);

        let err = U256::from_big_int(&(BigInt::one() << 256)).unwrap_err();
        assert_eq!(err.bits, 256);
        assert_eq!(
            err.value,
            "115792089237316195423570985008687907853269984665640564039457584007913129639936"
        );

        let err = U256::from_big_int(&BigInt::from(-1)).unwrap_err();
        assert_eq!(err, RangeError::new(-1, 256));
    }

    #[test]
    fn big_int_conversion_preserves_value() {
        let value = U256::from(1_000_000_000_000_000_000_u128) * U256::from(7);
        assert_eq!(U256::from_big_int(&value.to_big_int()).unwrap(), value);
        assert_eq!(U256::from_big_uint(&U256::MAX.to_big_uint()).unwrap(), U256::MAX);
    }
}
