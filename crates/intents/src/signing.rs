//! Builders that assemble, sign and package orders and fills.
//!
//! A builder collects inputs, outputs, deadline, nonce and target chain in any
//! order and is consumed by `sign`, so every signature belongs to exactly one
//! artifact.

use {
    crate::{metrics::Metrics, signer::Permit2Signer},
    alloy::primitives::{Address, B256, Bytes, U256},
    model::{
        DomainSeparator,
        codec::checked_uint32,
        nonce::random_nonce,
        order::{SignedFill, SignedOrder},
        permit::{
            HashStruct,
            Output,
            Permit2Batch,
            PermitBatchTransferFrom,
            PermitBatchWitnessTransferFrom,
            TokenPermissions,
        },
        signature::{self, SignatureError},
        signing_hash,
        time::now_in_epoch_seconds,
    },
    number::RangeError,
    serde_json::json,
    std::time::Duration,
    tracing::instrument,
};

#[derive(Debug, thiserror::Error, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SigningError {
    #[error("chain not configured")]
    ChainNotConfigured,
    #[error("orders require an explicit deadline")]
    MissingDeadline,
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error("signer failed: {0:#}")]
    Signer(anyhow::Error),
    #[error(transparent)]
    Signature(#[from] SignatureError),
}

impl SigningError {
    /// Stable snake_case code of the error kind.
    pub fn code(&self) -> &'static str {
        self.into()
    }
}

/// The chain an artifact is signed for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChainTarget {
    pub chain_id: u64,
    /// Spender of the Permit2 transfer.
    pub order_contract: Address,
    /// Verifying contract of the signature.
    pub permit2: Address,
    pub slot_time: Duration,
}

impl ChainTarget {
    pub fn domain(&self) -> DomainSeparator {
        DomainSeparator::new(self.chain_id, self.permit2)
    }
}

impl From<&configs::Chain> for ChainTarget {
    fn from(chain: &configs::Chain) -> Self {
        Self {
            chain_id: chain.chain_id,
            order_contract: chain.order_contract,
            permit2: chain.permit2,
            slot_time: chain.slot_time,
        }
    }
}

/// Everything needed to obtain a Permit2 witness signature, either from a
/// [`Permit2Signer`] or from an external wallet via [`Self::typed_data`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SigningRequest {
    pub chain_id: u64,
    pub verifying_contract: Address,
    pub domain: DomainSeparator,
    pub message: PermitBatchWitnessTransferFrom,
    /// The EIP-712 digest the signature has to commit to.
    pub signing_hash: B256,
}

impl SigningRequest {
    fn new(chain: &ChainTarget, message: PermitBatchWitnessTransferFrom) -> Self {
        let domain = chain.domain();
        Self {
            chain_id: chain.chain_id,
            verifying_contract: chain.permit2,
            signing_hash: signing_hash(&domain, &message.hash_struct()),
            domain,
            message,
        }
    }

    /// The `eth_signTypedData_v4` payload of this request.
    pub fn typed_data(&self) -> serde_json::Value {
        let message = &self.message;
        json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                    { "name": "verifyingContract", "type": "address" },
                ],
                "PermitBatchWitnessTransferFrom": [
                    { "name": "permitted", "type": "TokenPermissions[]" },
                    { "name": "spender", "type": "address" },
                    { "name": "nonce", "type": "uint256" },
                    { "name": "deadline", "type": "uint256" },
                    { "name": "outputs", "type": "Output[]" },
                ],
                "Output": [
                    { "name": "token", "type": "address" },
                    { "name": "amount", "type": "uint256" },
                    { "name": "recipient", "type": "address" },
                    { "name": "chainId", "type": "uint32" },
                ],
                "TokenPermissions": [
                    { "name": "token", "type": "address" },
                    { "name": "amount", "type": "uint256" },
                ],
            },
            "primaryType": PermitBatchWitnessTransferFrom::PRIMARY_TYPE,
            "domain": {
                "name": "Permit2",
                "chainId": self.chain_id,
                "verifyingContract": self.verifying_contract,
            },
            "message": {
                "permitted": message.permitted.iter().map(|permission| json!({
                    "token": permission.token,
                    "amount": permission.amount.to_string(),
                })).collect::<Vec<_>>(),
                "spender": message.spender,
                "nonce": message.nonce.to_string(),
                "deadline": message.deadline.to_string(),
                "outputs": message.outputs.iter().map(|output| json!({
                    "token": output.token,
                    "amount": output.amount.to_string(),
                    "recipient": output.recipient,
                    "chainId": output.chain_id,
                })).collect::<Vec<_>>(),
            },
        })
    }

    fn into_permit(
        self,
        owner: Address,
        raw_signature: &[u8],
    ) -> Result<(Permit2Batch, Vec<Output>), SigningError> {
        let signature = signature::canonicalize(raw_signature)?;
        let permit = Permit2Batch {
            permit: PermitBatchTransferFrom {
                permitted: self.message.permitted,
                nonce: self.message.nonce,
                deadline: self.message.deadline,
            },
            owner,
            signature: Bytes::from(signature.to_vec()),
        };
        Ok((permit, self.message.outputs))
    }

    /// Packages a signature obtained for this request into an order. The
    /// signature is stored in canonical low-S form.
    pub fn into_order(
        self,
        owner: Address,
        raw_signature: &[u8],
    ) -> Result<SignedOrder, SigningError> {
        let (permit, outputs) = self.into_permit(owner, raw_signature)?;
        Ok(SignedOrder { permit, outputs })
    }

    /// Packages a signature obtained for this request into a fill. The
    /// signature is stored in canonical low-S form.
    pub fn into_fill(
        self,
        owner: Address,
        raw_signature: &[u8],
    ) -> Result<SignedFill, SigningError> {
        let (permit, outputs) = self.into_permit(owner, raw_signature)?;
        Ok(SignedFill { permit, outputs })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct PendingOutput {
    token: Address,
    amount: U256,
    recipient: Address,
    chain_id: u64,
}

impl PendingOutput {
    fn resolve(self) -> Result<Output, RangeError> {
        Ok(Output {
            token: self.token,
            amount: self.amount,
            recipient: self.recipient,
            chain_id: checked_uint32(self.chain_id)?,
        })
    }
}

/// State shared by the order and fill builders.
#[derive(Clone, Debug, Default)]
struct PermitSpec {
    permitted: Vec<TokenPermissions>,
    outputs: Vec<PendingOutput>,
    deadline: Option<U256>,
    nonce: Option<U256>,
    chain: Option<ChainTarget>,
}

impl PermitSpec {
    fn chain(&self) -> Result<&ChainTarget, SigningError> {
        self.chain.as_ref().ok_or(SigningError::ChainNotConfigured)
    }

    fn outputs(&self) -> Result<Vec<Output>, RangeError> {
        self.outputs.iter().map(|output| output.resolve()).collect()
    }

    fn request(
        &self,
        chain: &ChainTarget,
        permitted: Vec<TokenPermissions>,
        deadline: U256,
    ) -> Result<SigningRequest, SigningError> {
        let permit = PermitBatchTransferFrom {
            permitted,
            nonce: self.nonce.unwrap_or_else(random_nonce),
            deadline,
        };
        let message =
            PermitBatchWitnessTransferFrom::new(&permit, chain.order_contract, &self.outputs()?);
        Ok(SigningRequest::new(chain, message))
    }
}

macro_rules! impl_builder {
    ($name:ident) => {
        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            /// Adds a delivery of `amount` of `token` to `recipient` on chain
            /// `chain_id`. The chain id has to fit a `uint32`.
            pub fn with_output(
                mut self,
                token: Address,
                amount: U256,
                recipient: Address,
                chain_id: u64,
            ) -> Self {
                self.spec.outputs.push(PendingOutput {
                    token,
                    amount,
                    recipient,
                    chain_id,
                });
                self
            }

            pub fn with_outputs(mut self, outputs: impl IntoIterator<Item = Output>) -> Self {
                for output in outputs {
                    self = self.with_output(
                        output.token,
                        output.amount,
                        output.recipient,
                        u64::from(output.chain_id),
                    );
                }
                self
            }

            /// Unix timestamp in seconds after which the permit is invalid.
            pub fn with_deadline(mut self, deadline: U256) -> Self {
                self.spec.deadline = Some(deadline);
                self
            }

            /// Uses `nonce` instead of a random one.
            pub fn with_nonce(mut self, nonce: U256) -> Self {
                self.spec.nonce = Some(nonce);
                self
            }

            pub fn with_chain(mut self, chain: ChainTarget) -> Self {
                self.spec.chain = Some(chain);
                self
            }
        }
    };
}

/// Builds a [`SignedOrder`]: the signer offers the inputs in exchange for the
/// outputs.
#[derive(Clone, Debug, Default)]
pub struct UnsignedOrder {
    spec: PermitSpec,
}

impl_builder!(UnsignedOrder);

impl UnsignedOrder {
    /// Offers `amount` of `token`.
    pub fn with_input(mut self, token: Address, amount: U256) -> Self {
        self.spec.permitted.push(TokenPermissions { token, amount });
        self
    }

    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = TokenPermissions>) -> Self {
        self.spec.permitted.extend(inputs);
        self
    }

    /// The typed message to sign. Draws a random nonce unless one was set.
    pub fn signing_request(&self) -> Result<SigningRequest, SigningError> {
        let chain = self.spec.chain()?;
        let deadline = self.spec.deadline.ok_or(SigningError::MissingDeadline)?;
        self.spec
            .request(chain, self.spec.permitted.clone(), deadline)
    }

    #[instrument(skip_all, fields(chain_id = ?self.spec.chain.map(|chain| chain.chain_id)))]
    pub async fn sign(self, signer: &impl Permit2Signer) -> Result<SignedOrder, SigningError> {
        let request = self.signing_request()?;
        let raw_signature = signer
            .sign_permit(&request)
            .await
            .map_err(SigningError::Signer)?;
        let order = request.into_order(signer.address(), &raw_signature)?;
        tracing::debug!(
            owner = %order.permit.owner,
            nonce = %order.permit.permit.nonce,
            "signed order"
        );
        Metrics::get()
            .signed_artifacts
            .with_label_values(&["order"])
            .inc();
        Ok(order)
    }
}

/// Builds a [`SignedFill`]: the signer authorizes transferring exactly the
/// outputs it delivers, so the permitted transfers mirror the outputs.
#[derive(Clone, Debug, Default)]
pub struct UnsignedFill {
    spec: PermitSpec,
}

impl_builder!(UnsignedFill);

impl UnsignedFill {
    /// Adds every output of `order`.
    pub fn fill(self, order: &SignedOrder) -> Self {
        self.with_outputs(order.outputs.iter().copied())
    }

    /// The typed message to sign at `now`. Draws a random nonce unless one was
    /// set and expires one slot after `now` unless a deadline was set.
    pub fn signing_request(&self, now: u64) -> Result<SigningRequest, SigningError> {
        let chain = self.spec.chain()?;
        let deadline = self.spec.deadline.unwrap_or_else(|| {
            U256::from(now).saturating_add(U256::from(chain.slot_time.as_secs()))
        });
        let permitted = self
            .spec
            .outputs
            .iter()
            .map(|output| TokenPermissions {
                token: output.token,
                amount: output.amount,
            })
            .collect();
        self.spec.request(chain, permitted, deadline)
    }

    #[instrument(skip_all, fields(chain_id = ?self.spec.chain.map(|chain| chain.chain_id)))]
    pub async fn sign(self, signer: &impl Permit2Signer) -> Result<SignedFill, SigningError> {
        let request = self.signing_request(now_in_epoch_seconds())?;
        let raw_signature = signer
            .sign_permit(&request)
            .await
            .map_err(SigningError::Signer)?;
        let fill = request.into_fill(signer.address(), &raw_signature)?;
        tracing::debug!(
            owner = %fill.permit.owner,
            nonce = %fill.permit.permit.nonce,
            "signed fill"
        );
        Metrics::get()
            .signed_artifacts
            .with_label_values(&["fill"])
            .inc();
        Ok(fill)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::signer::MockPermit2Signer,
        alloy::{
            primitives::{address, b256},
            signers::local::PrivateKeySigner,
        },
        model::signature::{EcdsaSignature, SECP256K1_N},
    };

    const WETH: Address = address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");

    fn mainnet() -> ChainTarget {
        ChainTarget {
            chain_id: 1,
            order_contract: address!("0x96f44ddc3Bc8892371305531F1a6d8ca2331fE6C"),
            permit2: model::PERMIT2_ADDRESS,
            slot_time: Duration::from_secs(12),
        }
    }

    fn usdc_order() -> UnsignedOrder {
        UnsignedOrder::new()
            .with_input(
                address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
                U256::from(1_000_000),
            )
            .with_output(
                Address::ZERO,
                U256::from(500_000_000_000_000_000_u64),
                address!("0x1234567890123456789012345678901234567890"),
                1,
            )
            .with_nonce(U256::from(12345))
            .with_deadline(U256::from(1_700_000_000))
            .with_chain(mainnet())
    }

    #[test]
    fn order_signing_request() {
        let request = usdc_order().signing_request().unwrap();
        assert_eq!(request.domain, DomainSeparator::permit2(1));
        assert_eq!(
            request.signing_hash,
            b256!("0x235b6c8f35e1b8af82c4cce69812ae40aad4e0e7317bce5322b71cbe67102de2")
        );
        assert_eq!(request.message.spender, mainnet().order_contract);
    }

    #[test]
    fn builder_calls_commute() {
        let reordered = UnsignedOrder::new()
            .with_chain(mainnet())
            .with_deadline(U256::from(1_700_000_000))
            .with_nonce(U256::from(12345))
            .with_output(
                Address::ZERO,
                U256::from(500_000_000_000_000_000_u64),
                address!("0x1234567890123456789012345678901234567890"),
                1,
            )
            .with_input(
                address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
                U256::from(1_000_000),
            );
        assert_eq!(
            reordered.signing_request().unwrap(),
            usdc_order().signing_request().unwrap()
        );
    }

    #[test]
    fn typed_data_payload() {
        let request = usdc_order().signing_request().unwrap();
        let typed_data = request.typed_data();
        assert_eq!(typed_data["primaryType"], "PermitBatchWitnessTransferFrom");
        assert_eq!(typed_data["domain"]["name"], "Permit2");
        assert_eq!(typed_data["domain"]["chainId"], 1);
        assert!(typed_data["domain"].get("version").is_none());
        assert_eq!(typed_data["message"]["nonce"], "12345");
        assert_eq!(typed_data["message"]["deadline"], "1700000000");
        assert_eq!(
            typed_data["message"]["outputs"][0]["amount"],
            "500000000000000000"
        );
        assert_eq!(typed_data["message"]["outputs"][0]["chainId"], 1);
        assert_eq!(typed_data["message"]["permitted"][0]["amount"], "1000000");
        assert_eq!(typed_data["types"]["Output"][3]["type"], "uint32");
    }

    #[test]
    fn requires_chain() {
        let err = UnsignedOrder::new()
            .with_deadline(U256::from(1))
            .signing_request()
            .unwrap_err();
        assert!(matches!(err, SigningError::ChainNotConfigured));
        assert_eq!(err.code(), "chain_not_configured");

        let err = UnsignedFill::new().signing_request(0).unwrap_err();
        assert_eq!(err.code(), "chain_not_configured");
    }

    #[test]
    fn orders_require_deadline() {
        let err = UnsignedOrder::new()
            .with_chain(mainnet())
            .signing_request()
            .unwrap_err();
        assert!(matches!(err, SigningError::MissingDeadline));
        assert_eq!(err.code(), "missing_deadline");
    }

    #[test]
    fn output_chain_id_must_fit_uint32() {
        let err = usdc_order()
            .with_output(WETH, U256::from(1), Address::ZERO, u64::from(u32::MAX) + 1)
            .signing_request()
            .unwrap_err();
        assert_eq!(err.code(), "range");
    }

    #[test]
    fn draws_random_nonce_unless_set() {
        let order = UnsignedOrder::new()
            .with_chain(mainnet())
            .with_deadline(U256::from(1));
        let first = order.signing_request().unwrap();
        let second = order.signing_request().unwrap();
        assert_ne!(first.message.nonce, second.message.nonce);

        let order = order.with_nonce(U256::from(7));
        assert_eq!(order.signing_request().unwrap().message.nonce, U256::from(7));
    }

    #[test]
    fn fill_deadline_defaults_to_next_slot() {
        let fill = UnsignedFill::new()
            .with_chain(mainnet())
            .with_output(WETH, U256::from(1000), Address::repeat_byte(2), 1);
        let request = fill.signing_request(1_700_000_000).unwrap();
        assert_eq!(request.message.deadline, U256::from(1_700_000_012));

        let request = fill
            .with_deadline(U256::from(5))
            .signing_request(1_700_000_000)
            .unwrap();
        assert_eq!(request.message.deadline, U256::from(5));
    }

    #[test]
    fn fill_permits_mirror_outputs() {
        let request = UnsignedFill::new()
            .with_chain(mainnet())
            .with_output(WETH, U256::from(1000), Address::repeat_byte(2), 1)
            .with_output(Address::ZERO, U256::MAX, Address::repeat_byte(3), 519)
            .signing_request(0)
            .unwrap();
        assert_eq!(
            request.message.permitted,
            vec![
                TokenPermissions {
                    token: WETH,
                    amount: U256::from(1000),
                },
                TokenPermissions {
                    token: Address::ZERO,
                    amount: U256::MAX,
                },
            ]
        );
        let fill = request
            .into_fill(Address::repeat_byte(9), &[0u8; 65])
            .unwrap();
        assert!(fill.validate(0).is_ok());
    }

    #[tokio::test]
    async fn signs_order_with_local_key() {
        let signer = PrivateKeySigner::random();
        let order = usdc_order().sign(&signer).await.unwrap();

        assert_eq!(order.permit.owner, signer.address());
        assert_eq!(order.permit.permit.nonce, U256::from(12345));
        assert_eq!(order.permit.signature.len(), 65);
        assert!(EcdsaSignature::from_slice(&order.permit.signature).unwrap().is_low_s());
        order
            .verify_owner(&DomainSeparator::permit2(1), mainnet().order_contract)
            .unwrap();
        assert!(order.validate(1_700_000_000).is_ok());
    }

    #[tokio::test]
    async fn signs_fill_with_local_key() {
        let signer = PrivateKeySigner::random();
        let order = usdc_order().sign(&signer).await.unwrap();
        let fill = UnsignedFill::new()
            .fill(&order)
            .with_chain(mainnet())
            .sign(&signer)
            .await
            .unwrap();

        assert_eq!(fill.outputs, order.outputs);
        assert!(fill.validate_outputs().is_ok());
        assert!(fill.validate(now_in_epoch_seconds()).is_ok());
        fill.verify_owner(&DomainSeparator::permit2(1), mainnet().order_contract)
            .unwrap();
    }

    #[tokio::test]
    async fn canonicalizes_wallet_signature() {
        let high_s = EcdsaSignature {
            r: B256::repeat_byte(0x11),
            s: B256::from(SECP256K1_N - U256::from(1)),
            v: 27,
        };
        let owner = Address::repeat_byte(0xaa);
        let expected = usdc_order().signing_request().unwrap().signing_hash;

        let mut signer = MockPermit2Signer::new();
        signer.expect_address().return_const(owner);
        signer
            .expect_sign_permit()
            .withf(move |request| request.signing_hash == expected)
            .times(1)
            .returning(move |_| Ok(Bytes::from(high_s.to_bytes().to_vec())));

        let order = usdc_order().sign(&signer).await.unwrap();
        assert_eq!(order.permit.owner, owner);
        let stored = EcdsaSignature::from_slice(&order.permit.signature).unwrap();
        assert_eq!(stored.s, B256::from(U256::from(1)));
        assert_eq!(stored.v, 28);
    }

    #[tokio::test]
    async fn propagates_signer_failures() {
        let mut signer = MockPermit2Signer::new();
        signer.expect_address().return_const(Address::ZERO);
        signer
            .expect_sign_permit()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("user rejected the request")));

        let err = usdc_order().sign(&signer).await.unwrap_err();
        assert_eq!(err.code(), "signer");
        assert!(err.to_string().contains("user rejected"));

        let mut signer = MockPermit2Signer::new();
        signer.expect_address().return_const(Address::ZERO);
        signer
            .expect_sign_permit()
            .returning(|_| Ok(Bytes::from(vec![0u8; 64])));
        let err = usdc_order().sign(&signer).await.unwrap_err();
        assert_eq!(err.code(), "signature");
    }

    #[test]
    fn chain_target_from_config() {
        let chain = configs::Chain::test(519);
        let target = ChainTarget::from(&chain);
        assert_eq!(target.chain_id, 519);
        assert_eq!(target.order_contract, chain.order_contract);
        assert_eq!(target.domain(), DomainSeparator::permit2(519));
    }
}
