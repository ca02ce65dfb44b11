//! Permit2 batch transfer authorizations and their EIP-712 struct hashes.
//!
//! The struct hashes are laid out by hand so that every ABI head slot is
//! visible next to the type string it belongs to.

use {
    crate::codec::{WORD, address_word, uint32_word, uint256_word},
    alloy::primitives::{Address, Bytes, U256, keccak256},
    hex_literal::hex,
    number::serialization::HexQuantity,
    serde::{Deserialize, Serialize},
    serde_with::serde_as,
    std::collections::BTreeMap,
};

/// A type with an EIP-712 struct hash.
pub trait HashStruct {
    /// keccak256 of the type's encoded type string.
    const TYPE_HASH: [u8; 32];

    fn hash_struct(&self) -> [u8; 32];
}

/// EIP-712 hash of an array of structs: the keccak256 of the concatenated
/// struct hashes, without a length prefix.
pub fn hash_array<T: HashStruct>(items: &[T]) -> [u8; 32] {
    let encoded = items
        .iter()
        .flat_map(|item| item.hash_struct())
        .collect::<Vec<u8>>();
    keccak256(encoded).0
}

/// One leg of a Permit2 batch transfer.
#[serde_as]
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPermissions {
    pub token: Address,
    #[serde_as(as = "HexQuantity")]
    pub amount: U256,
}

impl HashStruct for TokenPermissions {
    // keccak256("TokenPermissions(address token,uint256 amount)")
    const TYPE_HASH: [u8; 32] =
        hex!("618358ac3db8dc274f0cd8829da7e234bd48cd73c4a740aede1adec9846d06a1");

    fn hash_struct(&self) -> [u8; 32] {
        let mut hash_data = [0u8; 3 * WORD];
        hash_data[0..32].copy_from_slice(&Self::TYPE_HASH);
        hash_data[32..64].copy_from_slice(&address_word(self.token));
        hash_data[64..96].copy_from_slice(&uint256_word(self.amount));
        keccak256(hash_data).0
    }
}

/// A delivery of `amount` of `token` to `recipient` on chain `chain_id`.
#[serde_as]
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Output {
    pub token: Address,
    #[serde_as(as = "HexQuantity")]
    pub amount: U256,
    pub recipient: Address,
    #[serde_as(as = "HexQuantity")]
    pub chain_id: u32,
}

impl HashStruct for Output {
    // keccak256("Output(address token,uint256 amount,address recipient,uint32 chainId)")
    const TYPE_HASH: [u8; 32] =
        hex!("988262d9186cf8a1cd1dd5e2cc7bfa353f55a542d86db1fcd06e076a6544250d");

    fn hash_struct(&self) -> [u8; 32] {
        let mut hash_data = [0u8; 5 * WORD];
        hash_data[0..32].copy_from_slice(&Self::TYPE_HASH);
        hash_data[32..64].copy_from_slice(&address_word(self.token));
        hash_data[64..96].copy_from_slice(&uint256_word(self.amount));
        hash_data[96..128].copy_from_slice(&address_word(self.recipient));
        hash_data[128..160].copy_from_slice(&uint32_word(self.chain_id));
        keccak256(hash_data).0
    }
}

/// The body of a Permit2 batch transfer authorization.
#[serde_as]
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitBatchTransferFrom {
    pub permitted: Vec<TokenPermissions>,
    #[serde_as(as = "HexQuantity")]
    pub nonce: U256,
    /// Unix timestamp in seconds.
    #[serde_as(as = "HexQuantity")]
    pub deadline: U256,
}

impl PermitBatchTransferFrom {
    /// Total permitted amount per distinct token. Sums saturate at
    /// `U256::MAX`.
    pub fn required_amounts(&self) -> BTreeMap<Address, U256> {
        let mut required = BTreeMap::<Address, U256>::new();
        for permission in &self.permitted {
            let amount = required.entry(permission.token).or_default();
            *amount = amount.saturating_add(permission.amount);
        }
        required
    }
}

/// A Permit2 authorization together with its owner and signature.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Permit2Batch {
    pub permit: PermitBatchTransferFrom,
    pub owner: Address,
    /// Raw r ‖ s ‖ v signature bytes.
    pub signature: Bytes,
}

/// The typed message that gets signed: a batch transfer bound to `spender`
/// with the `outputs` as witness.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PermitBatchWitnessTransferFrom {
    pub permitted: Vec<TokenPermissions>,
    pub spender: Address,
    pub nonce: U256,
    pub deadline: U256,
    pub outputs: Vec<Output>,
}

impl PermitBatchWitnessTransferFrom {
    /// The name of the EIP-712 primary type.
    pub const PRIMARY_TYPE: &'static str = "PermitBatchWitnessTransferFrom";

    pub fn new(permit: &PermitBatchTransferFrom, spender: Address, outputs: &[Output]) -> Self {
        Self {
            permitted: permit.permitted.clone(),
            spender,
            nonce: permit.nonce,
            deadline: permit.deadline,
            outputs: outputs.to_vec(),
        }
    }
}

impl HashStruct for PermitBatchWitnessTransferFrom {
    // keccak256("PermitBatchWitnessTransferFrom(TokenPermissions[] permitted,address spender,uint256 nonce,uint256 deadline,Output[] outputs)Output(address token,uint256 amount,address recipient,uint32 chainId)TokenPermissions(address token,uint256 amount)")
    const TYPE_HASH: [u8; 32] =
        hex!("ba5ada5236baa85fb853d9033a4ed118b739e628a053160f9fb91c0da0887500");

    fn hash_struct(&self) -> [u8; 32] {
        let mut hash_data = [0u8; 6 * WORD];
        hash_data[0..32].copy_from_slice(&Self::TYPE_HASH);
        hash_data[32..64].copy_from_slice(&hash_array(&self.permitted));
        hash_data[64..96].copy_from_slice(&address_word(self.spender));
        hash_data[96..128].copy_from_slice(&uint256_word(self.nonce));
        hash_data[128..160].copy_from_slice(&uint256_word(self.deadline));
        hash_data[160..192].copy_from_slice(&hash_array(&self.outputs));
        keccak256(hash_data).0
    }
}
