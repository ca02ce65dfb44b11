use {
    alloy::primitives::{self, Address, B256, U256, uint},
    std::fmt::{self, Debug, Formatter},
};

/// The order of the secp256k1 curve group.
pub const SECP256K1_N: U256 =
    uint!(0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141_U256);

/// Largest `s` value of a canonical (low-S) signature, `N / 2`.
pub const SECP256K1_HALF_N: U256 =
    uint!(0x7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0_U256);

#[derive(Debug, thiserror::Error, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SignatureError {
    #[error("ECDSA signature must be 65 bytes long, got {0}")]
    InvalidLength(usize),
    #[error("invalid recovery id {0}, expected one of 0, 1, 27 or 28")]
    InvalidRecoveryId(u8),
    #[error("s is not a valid secp256k1 scalar")]
    ScalarOutOfRange,
    #[error("unable to recover signer: {0}")]
    Recovery(#[from] primitives::SignatureError),
}

impl SignatureError {
    /// Stable snake_case code of the error kind.
    pub fn code(&self) -> &'static str {
        self.into()
    }
}

/// A raw ECDSA signature as produced by wallets, laid out r ‖ s ‖ v.
#[derive(Eq, PartialEq, Clone, Copy, Default, Hash)]
pub struct EcdsaSignature {
    pub r: B256,
    pub s: B256,
    pub v: u8,
}

impl Debug for EcdsaSignature {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "0x{}", const_hex::encode(self.to_bytes()))
    }
}

impl EcdsaSignature {
    /// r + s + v
    pub fn to_bytes(self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(self.r.as_slice());
        bytes[32..64].copy_from_slice(self.s.as_slice());
        bytes[64] = self.v;
        bytes
    }

    pub fn from_bytes(bytes: &[u8; 65]) -> Self {
        EcdsaSignature {
            r: B256::from_slice(&bytes[..32]),
            s: B256::from_slice(&bytes[32..64]),
            v: bytes[64],
        }
    }

    /// Parses a signature of unchecked length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SignatureError> {
        let bytes: &[u8; 65] = bytes
            .try_into()
            .map_err(|_| SignatureError::InvalidLength(bytes.len()))?;
        Ok(Self::from_bytes(bytes))
    }

    pub fn is_low_s(&self) -> bool {
        U256::from_be_bytes(self.s.0) <= SECP256K1_HALF_N
    }

    /// Returns the low-S form of this signature.
    ///
    /// A signature whose `s` exceeds `N / 2` is replaced by its twin
    /// `(r, N - s)` and the recovery id is flipped within its own convention
    /// (27 and 28, or 0 and 1). Low-S signatures are returned unchanged.
    pub fn normalized_s(self) -> Result<Self, SignatureError> {
        if self.is_low_s() {
            return Ok(self);
        }
        let s = U256::from_be_bytes(self.s.0);
        if s >= SECP256K1_N {
            return Err(SignatureError::ScalarOutOfRange);
        }
        let v = match self.v {
            27 => 28,
            28 => 27,
            0 => 1,
            1 => 0,
            v => return Err(SignatureError::InvalidRecoveryId(v)),
        };
        Ok(Self {
            r: self.r,
            s: B256::from(SECP256K1_N - s),
            v,
        })
    }

    /// The y-parity encoded in `v`.
    fn y_parity(&self) -> Result<bool, SignatureError> {
        match self.v {
            0 | 27 => Ok(false),
            1 | 28 => Ok(true),
            v => Err(SignatureError::InvalidRecoveryId(v)),
        }
    }

    /// Recovers the address that signed the 32 byte prehashed message, e.g.
    /// an EIP-712 signing hash.
    pub fn recover(&self, hash: &B256) -> Result<Address, SignatureError> {
        let canonical = self.normalized_s()?;
        let signature = primitives::Signature::new(
            U256::from_be_bytes(canonical.r.0),
            U256::from_be_bytes(canonical.s.0),
            canonical.y_parity()?,
        );
        Ok(signature.recover_address_from_prehash(hash)?)
    }

    /// Returns an arbitrary non-zero signature that can be used when you
    /// don't actually care about the signer.
    pub fn non_zero() -> Self {
        Self {
            r: B256::repeat_byte(1),
            s: B256::repeat_byte(2),
            v: 27,
        }
    }
}

/// Brings a raw 65 byte signature into canonical low-S form.
///
/// Idempotent: canonicalizing an already canonical signature returns it
/// byte-identical.
pub fn canonicalize(signature: &[u8]) -> Result<[u8; 65], SignatureError> {
    Ok(EcdsaSignature::from_slice(signature)?
        .normalized_s()?
        .to_bytes())
}
