//! Numeric helpers shared by the wire format and the ABI codec.

pub mod serialization;
pub mod u256_ext;

pub use u256_ext::{RangeError, U256Ext};
