use thiserror::Error;

use hw_provider_core::{types::EnvelopeError, utils::VersionError};

use crate::ledger::{LedgerError, TransportError};

/// Errors surfaced by the [`HwProvider`](crate::HwProvider)
#[derive(Debug, Error)]
pub enum HwProviderError {
    /// An operation that needs the device ran before `init`, or after `close`
    #[error("hardware wallet provider is not initialized")]
    NotInitialized,
    /// No transport could be opened
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The device reported a version that is not dotted-numeric
    #[error(transparent)]
    InvalidVersionFormat(#[from] VersionError),
    /// A guarded transaction was submitted to firmware that cannot sign it
    #[error("MultiversX App v{0} does not support guarded transactions.")]
    UnsupportedGuardianFeature(String),
    /// The device or the link to it failed mid-operation
    #[error(transparent)]
    DeviceIo(#[from] LedgerError),
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    /// `page * page_size + i` does not fit an address index
    #[error("address index overflow for page {page} of size {page_size}")]
    AddressIndexOverflow { page: u32, page_size: u32 },
    #[error("invalid configuration: {0}")]
    Config(String),
}
