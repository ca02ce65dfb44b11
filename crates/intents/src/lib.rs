//! Signing, validation and feasibility checking of Permit2 witness transfers
//! for cross-chain orders and fills.

pub mod chain_state;
pub mod feasibility;
mod metrics;
pub mod nonce;
pub mod signer;
pub mod signing;

pub use {
    chain_state::{ChainReadError, ChainReader, OnchainReader},
    feasibility::{Feasibility, Issue, check_feasibility},
    nonce::is_nonce_used,
    signer::Permit2Signer,
    signing::{ChainTarget, SigningError, SigningRequest, UnsignedFill, UnsignedOrder},
};
