use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Human readable part of MultiversX addresses
pub const DEFAULT_HRP: &str = "erd";

/// Error when parsing an [`Address`]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,
    #[error("address `{0}` is not a lowercase bech32 string")]
    InvalidFormat(String),
}

/// A bech32 account address, as reported by the device (e.g. `erd1...`).
///
/// Only the shape of the string is validated; checksum verification is left to the
/// network layer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The human readable part, i.e. everything before the last `1`
    pub fn hrp(&self) -> &str {
        // validated on construction
        self.0.rsplit_once('1').map(|(hrp, _)| hrp).unwrap_or_default()
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(AddressError::Empty)
        }
        let valid_chars =
            s.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase());
        match s.rsplit_once('1') {
            Some((hrp, data)) if valid_chars && !hrp.is_empty() && !data.is_empty() => {
                Ok(Self(s.to_owned()))
            }
            _ => Err(AddressError::InvalidFormat(s.to_owned())),
        }
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
