//! Contains models that are shared between the signing, validation and
//! feasibility components of the Permit2 intent flow.

pub mod bundle;
pub mod codec;
pub mod nonce;
pub mod order;
pub mod permit;
pub mod signature;
pub mod time;

use {
    alloy::primitives::{Address, B256, address, hex::FromHexError, keccak256},
    hex_literal::hex,
    std::fmt,
};

/// The canonical Permit2 deployment, identical on every supported chain.
pub const PERMIT2_ADDRESS: Address = address!("0x000000000022D473030F116dDEE9F6B43aC78BA3");

/// The EIP-712 domain separator of a Permit2 deployment.
#[derive(Copy, Eq, PartialEq, Clone, Default, Hash)]
pub struct DomainSeparator(pub [u8; 32]);

impl std::str::FromStr for DomainSeparator {
    type Err = FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(alloy::primitives::hex::decode_to_array(s)?))
    }
}

impl fmt::Debug for DomainSeparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&const_hex::encode(self.0))
    }
}

impl DomainSeparator {
    // keccak256("EIP712Domain(string name,uint256 chainId,address verifyingContract)")
    const DOMAIN_TYPE_HASH: [u8; 32] =
        hex!("8cad95687ba82c2ce50e74f7b754645e5117c3a5bec8151c0726d5857980a866");
    // keccak256("Permit2")
    const DOMAIN_NAME: [u8; 32] =
        hex!("9ac997416e8ff9d2ff6bebeb7149f65cdae5e32e2b90440b566bb3044041d36a");

    /// Domain of the Permit2 contract at `verifying_contract`. Permit2 has no
    /// domain version.
    pub fn new(chain_id: u64, verifying_contract: Address) -> Self {
        let mut encoded = [0u8; 128];
        encoded[0..32].copy_from_slice(&Self::DOMAIN_TYPE_HASH);
        encoded[32..64].copy_from_slice(&Self::DOMAIN_NAME);
        encoded[88..96].copy_from_slice(&chain_id.to_be_bytes());
        encoded[108..128].copy_from_slice(verifying_contract.as_slice());
        Self(keccak256(encoded).0)
    }

    /// Domain of the canonical Permit2 deployment on `chain_id`.
    pub fn permit2(chain_id: u64) -> Self {
        Self::new(chain_id, PERMIT2_ADDRESS)
    }
}

/// The EIP-712 digest `keccak256(0x1901 ‖ domain ‖ struct_hash)` that gets
/// signed.
pub fn signing_hash(domain: &DomainSeparator, struct_hash: &[u8; 32]) -> B256 {
    let mut message = [0u8; 66];
    message[0..2].copy_from_slice(&[0x19, 0x01]);
    message[2..34].copy_from_slice(&domain.0);
    message[34..66].copy_from_slice(struct_hash);
    keccak256(message)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::{primitives::keccak256, sol_types::eip712_domain},
        std::str::FromStr,
    };

    #[test]
    fn domain_constants() {
        assert_eq!(
            DomainSeparator::DOMAIN_TYPE_HASH,
            keccak256("EIP712Domain(string name,uint256 chainId,address verifyingContract)").0
        );
        assert_eq!(DomainSeparator::DOMAIN_NAME, keccak256("Permit2").0);
    }

    #[test]
    fn domain_separator_from_str() {
        assert_eq!(
            DomainSeparator::from_str(
                "866a5aba21966af95d6c7ab78eb2b2fc913915c28be3b9aa07cc04ff903e3f28"
            )
            .unwrap(),
            DomainSeparator::permit2(1)
        );
        assert!(DomainSeparator::from_str("866a5aba").is_err());
    }

    #[test]
    fn domain_separator_mainnet() {
        // Taken from `DOMAIN_SEPARATOR()` of the mainnet Permit2 deployment.
        assert_eq!(
            DomainSeparator::permit2(1),
            DomainSeparator(hex!(
                "866a5aba21966af95d6c7ab78eb2b2fc913915c28be3b9aa07cc04ff903e3f28"
            ))
        );
        assert_eq!(
            DomainSeparator::permit2(519),
            DomainSeparator(hex!(
                "b9763ec6fa56d573bb57683efe8980ae88b28d02923686476e9f03012cf86930"
            ))
        );
    }

    #[test]
    fn domain_separator_matches_alloy() {
        for chain_id in [1, 10, 519, u64::MAX] {
            let domain = eip712_domain! {
                name: "Permit2",
                chain_id: chain_id,
                verifying_contract: PERMIT2_ADDRESS,
            };
            assert_eq!(
                DomainSeparator::permit2(chain_id).0,
                domain.separator().0,
                "chain {chain_id}"
            );
        }
    }

    #[test]
    fn domain_separator_depends_on_contract() {
        assert_ne!(
            DomainSeparator::new(1, Address::ZERO),
            DomainSeparator::permit2(1)
        );
        assert_ne!(DomainSeparator::permit2(1), DomainSeparator::permit2(2));
    }

    #[test]
    fn signing_hash_layout() {
        let domain = DomainSeparator([0x11; 32]);
        let struct_hash = [0x22; 32];
        let mut expected = vec![0x19, 0x01];
        expected.extend_from_slice(&[0x11; 32]);
        expected.extend_from_slice(&[0x22; 32]);
        assert_eq!(signing_hash(&domain, &struct_hash), keccak256(expected));
    }
}
