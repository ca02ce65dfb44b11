use {
    crate::signing::SigningRequest,
    alloy::{
        primitives::{Address, Bytes},
        signers::{Signer, local::PrivateKeySigner},
    },
};

/// An account able to sign Permit2 witness transfers, e.g. a local key or a
/// wallet.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait Permit2Signer: Send + Sync {
    /// The account that owns the permitted tokens.
    fn address(&self) -> Address;

    /// Signs the EIP-712 envelope of `request`, returning the raw 65 byte
    /// r ‖ s ‖ v signature. This may wait on user interaction.
    async fn sign_permit(&self, request: &SigningRequest) -> anyhow::Result<Bytes>;
}

#[async_trait::async_trait]
impl Permit2Signer for PrivateKeySigner {
    fn address(&self) -> Address {
        Signer::address(self)
    }

    async fn sign_permit(&self, request: &SigningRequest) -> anyhow::Result<Bytes> {
        let signature = self.sign_hash(&request.signing_hash).await?;
        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }
}
