use {
    crate::RangeError,
    alloy::primitives::U256,
    serde::{
        Deserializer,
        Serializer,
        de::{self, Visitor},
    },
    serde_with::{DeserializeAs, SerializeAs},
    std::fmt,
};

/// Serializes unsigned integers as `0x` prefixed hex quantities without
/// leading zeros (zero is `"0x0"`), and deserializes them from either a `0x`
/// prefixed hex string or a decimal string.
///
/// Use with `#[serde_as(as = "HexQuantity")]` on [`U256`], `u64` or `u32`
/// fields.
pub struct HexQuantity;

/// Parses a `0x` prefixed hex or decimal string into a [`U256`].
pub fn parse_quantity(s: &str) -> Result<U256, String> {
    match s.strip_prefix("0x") {
        Some("") => Err(format!("{s:?} has no hex digits")),
        Some(digits) => U256::from_str_radix(digits, 16)
            .map_err(|err| format!("failed to decode {s:?} as hex quantity: {err}")),
        None if s.is_empty() => Err("empty string is not a quantity".to_owned()),
        None => U256::from_str_radix(s, 10)
            .map_err(|err| format!("failed to decode {s:?} as decimal quantity: {err}")),
    }
}

struct QuantityVisitor;

impl Visitor<'_> for QuantityVisitor {
    type Value = U256;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(
            formatter,
            "an unsigned integer encoded either as 0x hex prefixed or decimal string"
        )
    }

    fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        parse_quantity(s).map_err(E::custom)
    }
}

fn deserialize_quantity<'de, D, T>(deserializer: D, bits: u16) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<U256>,
{
    let value = deserializer.deserialize_str(QuantityVisitor)?;
    T::try_from(value).map_err(|_| de::Error::custom(RangeError::new(value, bits)))
}

impl SerializeAs<U256> for HexQuantity {
    fn serialize_as<S: Serializer>(source: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{source:#x}"))
    }
}

impl<'de> DeserializeAs<'de, U256> for HexQuantity {
    fn deserialize_as<D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        deserialize_quantity(deserializer, 256)
    }
}

impl SerializeAs<u64> for HexQuantity {
    fn serialize_as<S: Serializer>(source: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{source:#x}"))
    }
}

impl<'de> DeserializeAs<'de, u64> for HexQuantity {
    fn deserialize_as<D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        deserialize_quantity(deserializer, 64)
    }
}

impl SerializeAs<u32> for HexQuantity {
    fn serialize_as<S: Serializer>(source: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{source:#x}"))
    }
}

impl<'de> DeserializeAs<'de, u32> for HexQuantity {
    fn deserialize_as<D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        deserialize_quantity(deserializer, 32)
    }
}
