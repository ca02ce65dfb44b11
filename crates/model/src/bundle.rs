//! The bundle wire format submitted to block builders: rollup transactions
//! together with the host chain fills they depend on.

use {
    crate::order::SignedFill,
    alloy::primitives::{B256, Bytes},
    number::serialization::HexQuantity,
    serde::{Deserialize, Serialize},
    serde_with::serde_as,
};

/// Absent optional fields are omitted from the JSON instead of being
/// serialized as `null` or `[]`.
///
/// Optional arrays are plain `Vec`s where empty means absent. An
/// `Option<Vec<_>>` would not survive a round trip, since an empty array is
/// written as an omitted field and read back as `None`.
#[serde_as]
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    /// Signed, RLP encoded transactions.
    pub txs: Vec<Bytes>,
    #[serde_as(as = "HexQuantity")]
    pub block_number: u64,
    #[serde_as(as = "Option<HexQuantity>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_timestamp: Option<u64>,
    #[serde_as(as = "Option<HexQuantity>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_timestamp: Option<u64>,
    /// Transactions that are allowed to revert without invalidating the
    /// bundle.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reverting_tx_hashes: Vec<B256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement_uuid: Option<String>,
    /// Fill that has to land on the host chain for the bundle to be valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_fills: Option<SignedFill>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host_txs: Vec<Bytes>,
}
