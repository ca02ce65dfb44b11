//! Signed orders and fills, their identifying hashes and validation.

use {
    crate::{
        DomainSeparator,
        permit::{HashStruct, Output, Permit2Batch, PermitBatchWitnessTransferFrom},
        signature::{self, EcdsaSignature, SignatureError},
        signing_hash,
    },
    alloy::{
        primitives::{Address, B256, U256, keccak256},
        sol_types::SolValue,
    },
    serde::{Deserialize, Serialize},
    std::collections::BTreeMap,
};

/// ABI representations used for the order hash pre-image. These use the
/// standard ABI tuple encoding, not the EIP-712 struct hash scheme.
mod abi {
    alloy::sol! {
        struct TokenPermissions {
            address token;
            uint256 amount;
        }

        struct PermitBatchTransferFrom {
            TokenPermissions[] permitted;
            uint256 nonce;
            uint256 deadline;
        }

        struct Output {
            address token;
            uint256 amount;
            address recipient;
            uint32 chainId;
        }
    }
}

impl From<&crate::permit::PermitBatchTransferFrom> for abi::PermitBatchTransferFrom {
    fn from(permit: &crate::permit::PermitBatchTransferFrom) -> Self {
        Self {
            permitted: permit
                .permitted
                .iter()
                .map(|permission| abi::TokenPermissions {
                    token: permission.token,
                    amount: permission.amount,
                })
                .collect(),
            nonce: permit.nonce,
            deadline: permit.deadline,
        }
    }
}

impl From<&Output> for abi::Output {
    fn from(output: &Output) -> Self {
        Self {
            token: output.token,
            amount: output.amount,
            recipient: output.recipient,
            chainId: output.chain_id,
        }
    }
}

#[derive(Debug, thiserror::Error, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ValidationError {
    #[error("deadline {deadline} has passed at {now}")]
    Expired { deadline: U256, now: u64 },
    #[error("fill has {outputs} outputs but permits {permitted} transfers")]
    OutputCountMismatch { outputs: usize, permitted: usize },
    #[error("output {index} delivers token {output} but permit {index} transfers {permitted}")]
    TokenMismatch {
        index: usize,
        output: Address,
        permitted: Address,
    },
    #[error("output {index} delivers {output} but permit {index} transfers {permitted}")]
    AmountMismatch {
        index: usize,
        output: U256,
        permitted: U256,
    },
    #[error("signature was produced by {recovered} instead of the owner {expected}")]
    WrongOwner { expected: Address, recovered: Address },
    #[error(transparent)]
    Signature(#[from] SignatureError),
}

impl ValidationError {
    /// Stable snake_case code of the error kind.
    pub fn code(&self) -> &'static str {
        self.into()
    }
}

/// Fails if `deadline` lies before `now`. A deadline equal to `now` is still
/// valid.
pub fn validate_deadline(deadline: U256, now: u64) -> Result<(), ValidationError> {
    if deadline < U256::from(now) {
        return Err(ValidationError::Expired { deadline, now });
    }
    Ok(())
}

/// The maker side of a swap: the permitted tokens are offered in exchange for
/// the `outputs`.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedOrder {
    pub permit: Permit2Batch,
    pub outputs: Vec<Output>,
}

/// The filler side of a swap: the permitted transfers must deliver exactly
/// the `outputs`, index by index.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedFill {
    pub permit: Permit2Batch,
    pub outputs: Vec<Output>,
}

/// Shared hashing and recovery of orders and fills, which only differ in how
/// they are validated.
macro_rules! impl_signed_artifact {
    ($name:ident) => {
        impl $name {
            /// The 128 byte pre-image of [`Self::order_hash`].
            pub fn order_hash_pre_image(&self) -> Result<[u8; 128], SignatureError> {
                order_hash_pre_image(&self.permit, &self.outputs)
            }

            /// Hash identifying this exact signed authorization.
            pub fn order_hash(&self) -> Result<B256, SignatureError> {
                Ok(keccak256(self.order_hash_pre_image()?))
            }

            /// The outputs grouped by their destination chain.
            pub fn outputs_by_chain(&self) -> BTreeMap<u32, Vec<Output>> {
                outputs_by_chain(&self.outputs)
            }

            /// The EIP-712 message that was signed for `spender`.
            pub fn witness(&self, spender: Address) -> PermitBatchWitnessTransferFrom {
                PermitBatchWitnessTransferFrom::new(&self.permit.permit, spender, &self.outputs)
            }

            /// Recovers the account that signed this artifact for `spender`
            /// within `domain`.
            pub fn recover_owner(
                &self,
                domain: &DomainSeparator,
                spender: Address,
            ) -> Result<Address, SignatureError> {
                let hash = signing_hash(domain, &self.witness(spender).hash_struct());
                EcdsaSignature::from_slice(&self.permit.signature)?.recover(&hash)
            }

            /// Fails unless the signature was produced by the declared owner.
            pub fn verify_owner(
                &self,
                domain: &DomainSeparator,
                spender: Address,
            ) -> Result<(), ValidationError> {
                let recovered = self.recover_owner(domain, spender)?;
                if recovered != self.permit.owner {
                    return Err(ValidationError::WrongOwner {
                        expected: self.permit.owner,
                        recovered,
                    });
                }
                Ok(())
            }
        }
    };
}

impl_signed_artifact!(SignedOrder);
impl_signed_artifact!(SignedFill);

impl SignedOrder {
    /// Checks that the order has not expired at `now`.
    pub fn validate(&self, now: u64) -> Result<(), ValidationError> {
        validate_deadline(self.permit.permit.deadline, now)
    }
}

impl SignedFill {
    /// Checks that the fill has not expired at `now` and that its permitted
    /// transfers match its outputs.
    pub fn validate(&self, now: u64) -> Result<(), ValidationError> {
        validate_deadline(self.permit.permit.deadline, now)?;
        self.validate_outputs()
    }

    /// Checks that `outputs[i]` delivers exactly what `permitted[i]`
    /// authorizes.
    pub fn validate_outputs(&self) -> Result<(), ValidationError> {
        let permitted = &self.permit.permit.permitted;
        if self.outputs.len() != permitted.len() {
            return Err(ValidationError::OutputCountMismatch {
                outputs: self.outputs.len(),
                permitted: permitted.len(),
            });
        }
        for (index, (output, permission)) in self.outputs.iter().zip(permitted).enumerate() {
            if output.token != permission.token {
                return Err(ValidationError::TokenMismatch {
                    index,
                    output: output.token,
                    permitted: permission.token,
                });
            }
            if output.amount != permission.amount {
                return Err(ValidationError::AmountMismatch {
                    index,
                    output: output.amount,
                    permitted: permission.amount,
                });
            }
        }
        Ok(())
    }
}

fn order_hash_pre_image(
    permit: &Permit2Batch,
    outputs: &[Output],
) -> Result<[u8; 128], SignatureError> {
    let permit_hash =
        keccak256(abi::PermitBatchTransferFrom::from(&permit.permit).abi_encode());
    let owner_hash = keccak256(permit.owner.abi_encode());
    let outputs_hash = keccak256(
        outputs
            .iter()
            .map(abi::Output::from)
            .collect::<Vec<_>>()
            .abi_encode(),
    );
    let signature_hash = keccak256(signature::canonicalize(&permit.signature)?);

    let mut pre_image = [0u8; 128];
    pre_image[0..32].copy_from_slice(permit_hash.as_slice());
    pre_image[32..64].copy_from_slice(owner_hash.as_slice());
    pre_image[64..96].copy_from_slice(outputs_hash.as_slice());
    pre_image[96..128].copy_from_slice(signature_hash.as_slice());
    Ok(pre_image)
}

fn outputs_by_chain(outputs: &[Output]) -> BTreeMap<u32, Vec<Output>> {
    let mut by_chain = BTreeMap::<u32, Vec<Output>>::new();
    for output in outputs {
        by_chain.entry(output.chain_id).or_default().push(*output);
    }
    by_chain
}
