//! Contracts between the signing layer and the objects it signs.
use super::{Bytes, TransactionOptions, TransactionVersion};
use thiserror::Error;

/// An error producing the signing payload of an envelope
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("could not serialize signing payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Anything the device can sign: a transaction or a message.
pub trait Signable {
    /// The exact bytes the device signs over
    fn serialize_for_signing(&self) -> Result<Vec<u8>, EnvelopeError>;

    /// Attaches a raw signature returned by the device
    fn apply_signature(&mut self, signature: Bytes);

    /// The signature attached so far, if any
    fn signature(&self) -> Option<&Bytes>;
}

/// A [`Signable`] whose `version` and `options` fields may be rewritten before signing,
/// depending on what the device firmware requires.
pub trait VersionedEnvelope: Signable + Clone {
    fn version(&self) -> TransactionVersion;

    fn set_version(&mut self, version: TransactionVersion);

    fn options(&self) -> TransactionOptions;

    fn set_options(&mut self, options: TransactionOptions);
}
