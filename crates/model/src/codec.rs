//! Canonical fixed-width encodings of the primitive types that appear in
//! EIP-712 struct hashes.
//!
//! Every value occupies one 32 byte ABI head slot. Integers are big-endian
//! and right aligned, addresses are left padded with 12 zero bytes.

use {
    alloy::primitives::{Address, U256},
    num::BigInt,
    number::{RangeError, U256Ext as _},
};

/// Size of a single ABI head slot.
pub const WORD: usize = 32;

/// The ABI head slot of a `uint256`.
pub fn uint256_word(value: U256) -> [u8; WORD] {
    value.to_be_bytes()
}

/// The ABI head slot of a `uint32`.
pub fn uint32_word(value: u32) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[28..].copy_from_slice(&value.to_be_bytes());
    word
}

/// The ABI head slot of an `address`.
pub fn address_word(address: Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(address.as_slice());
    word
}

/// The 20 raw address bytes.
pub fn encode_address(address: Address) -> [u8; 20] {
    address.0.0
}

/// Encodes an arbitrary precision integer as a `uint256` slot, failing for
/// negative values and values of 2^256 and above.
pub fn encode_uint256(value: &BigInt) -> Result<[u8; WORD], RangeError> {
    Ok(uint256_word(U256::from_big_int(value)?))
}

/// Encodes a signed integer as a `uint32` slot, failing outside of
/// `[0, 2^32)`.
pub fn encode_uint32(value: i128) -> Result<[u8; WORD], RangeError> {
    Ok(uint32_word(checked_uint32(value)?))
}

/// Narrows an integer to the `uint32` range, e.g. a `u64` chain id to the
/// `chainId` field of an output.
pub fn checked_uint32(value: impl Into<i128>) -> Result<u32, RangeError> {
    let value = value.into();
    u32::try_from(value).map_err(|_| RangeError::new(value, 32))
}
