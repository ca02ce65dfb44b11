//! Bindings of the on-chain contracts read by the intent flow.

pub mod alloy;

pub use self::alloy::{IERC20, IPermit2};
