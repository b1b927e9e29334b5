#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod ledger;

mod capabilities;
pub use capabilities::{
    CapabilityResolver, CapabilitySet, CapabilityTable, Feature, LEDGER_TX_GUARDIAN_MIN_VERSION,
    LEDGER_TX_HASH_SIGN_MIN_VERSION,
};

mod config;
pub use config::ProviderConfig;

mod error;
pub use error::HwProviderError;

pub mod signing;
pub use signing::{BatchError, BatchOutcome, IdentityProof};

mod provider;
pub use provider::{HwProvider, HwProviderBuilder, TokenLoginRequest};

use async_trait::async_trait;
use hw_provider_core::types::{Address, SignableMessage, Transaction};
use std::error::Error;

/// Trait for signing transactions and messages
///
/// Implement this trait to support different signing backends, e.g. other hardware
/// wallets or remote signers.
#[async_trait]
pub trait Signer: std::fmt::Debug + Send + Sync {
    type Error: Error + Send + Sync;

    /// Returns a signed copy of the message
    async fn sign_message(&self, message: &SignableMessage) -> Result<SignableMessage, Self::Error>;

    /// Returns a signed copy of the transaction
    async fn sign_transaction(&self, tx: &Transaction) -> Result<Transaction, Self::Error>;

    /// Returns the signer's address
    async fn address(&self) -> Result<Address, Self::Error>;
}
