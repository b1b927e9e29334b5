//! The `version` and `options` fields of a transaction.
use serde::{Deserialize, Serialize};
use std::{fmt, ops::BitOr};

/// Protocol version tag of a transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionVersion(pub u32);

impl TransactionVersion {
    pub const INITIAL: Self = Self(1);
    /// First version whose `options` field is interpreted by the protocol
    pub const WITH_OPTIONS: Self = Self(2);

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl Default for TransactionVersion {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl From<u32> for TransactionVersion {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for TransactionVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bit field of transaction options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionOptions(pub u32);

impl TransactionOptions {
    pub const NONE: Self = Self(0);
    /// The device signs the hash of the serialized transaction
    pub const HASH_SIGN: Self = Self(0b0001);
    /// The transaction is co-signed by a guardian
    pub const GUARDED: Self = Self(0b0010);

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_hash_sign(&self) -> bool {
        self.contains(Self::HASH_SIGN)
    }

    pub fn is_guarded(&self) -> bool {
        self.contains(Self::GUARDED)
    }

    #[must_use]
    pub fn with(self, other: Self) -> Self {
        self | other
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for TransactionOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl From<u32> for TransactionOptions {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for TransactionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06b}", self.0)
    }
}
