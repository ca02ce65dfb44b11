//! Permit2 nonces and their position in the on-chain nonce bitmap.

use {
    alloy::primitives::{U256, keccak256},
    num::BigInt,
    rand::RngCore,
};

/// Draws a uniformly random nonce from the thread local CSPRNG.
pub fn random_nonce() -> U256 {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    U256::from_be_bytes(bytes)
}

/// The textual form of a nonce seed.
///
/// Numbers are seeded through their decimal representation, so a number and
/// the string of its decimal digits produce the same nonce.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct NonceSeed(String);

impl NonceSeed {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NonceSeed {
    fn from(seed: &str) -> Self {
        Self(seed.to_owned())
    }
}

impl From<String> for NonceSeed {
    fn from(seed: String) -> Self {
        Self(seed)
    }
}

impl From<U256> for NonceSeed {
    fn from(seed: U256) -> Self {
        Self(seed.to_string())
    }
}

impl From<&BigInt> for NonceSeed {
    fn from(seed: &BigInt) -> Self {
        Self(seed.to_string())
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for NonceSeed {
                fn from(seed: $t) -> Self {
                    Self(seed.to_string())
                }
            }
        )*
    };
}

impl_from_integer!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

/// Derives a nonce deterministically as the keccak256 of the seed's UTF-8
/// bytes.
pub fn nonce_from_seed(seed: impl Into<NonceSeed>) -> U256 {
    U256::from_be_bytes(keccak256(seed.into().0.as_bytes()).0)
}

/// Location of a nonce in the Permit2 unordered nonce bitmap.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BitmapPosition {
    /// Index of the 256 bit bitmap word, `nonce >> 8`.
    pub word: U256,
    /// Bit within the word, `nonce & 0xff`.
    pub bit: u8,
}

impl BitmapPosition {
    pub fn of(nonce: U256) -> Self {
        Self {
            word: nonce >> 8,
            bit: nonce.byte(0),
        }
    }

    /// Whether the nonce at this position is consumed in `bitmap`.
    pub fn is_set(&self, bitmap: U256) -> bool {
        bitmap.bit(usize::from(self.bit))
    }
}
