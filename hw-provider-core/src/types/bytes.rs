use serde::de::{Error, Unexpected};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Wrapper type around Bytes to deserialize/serialize plain hex strings, as returned by
/// the device for signatures
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
pub struct Bytes(
    #[serde(serialize_with = "serialize_bytes", deserialize_with = "deserialize_bytes")]
    pub bytes::Bytes,
);

impl Bytes {
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_ref().to_vec()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decodes a hex string, with or without a `0x` prefix
    pub fn from_hex<S: AsRef<str>>(s: S) -> Result<Self, hex::FromHexError> {
        let s = s.as_ref();
        let s = s.strip_prefix("0x").unwrap_or(s);
        Ok(hex::decode(s)?.into())
    }

    /// Lowercase hex encoding without prefix
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_ref())
    }
}

impl fmt::Display for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl From<bytes::Bytes> for Bytes {
    fn from(src: bytes::Bytes) -> Self {
        Self(src)
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(src: Vec<u8>) -> Self {
        Self(src.into())
    }
}

impl From<&[u8]> for Bytes {
    fn from(src: &[u8]) -> Self {
        Self(bytes::Bytes::copy_from_slice(src))
    }
}

impl From<&str> for Bytes {
    fn from(src: &str) -> Self {
        Self(bytes::Bytes::copy_from_slice(src.as_bytes()))
    }
}

pub fn serialize_bytes<S, T>(x: T, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: AsRef<[u8]>,
{
    s.serialize_str(&hex::encode(x.as_ref()))
}

pub fn deserialize_bytes<'de, D>(d: D) -> Result<bytes::Bytes, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(d)?;
    let stripped = value.strip_prefix("0x").unwrap_or(&value);
    hex::decode(stripped)
        .map(Into::into)
        .map_err(|_| Error::invalid_value(Unexpected::Str(&value), &"a hex string"))
}
