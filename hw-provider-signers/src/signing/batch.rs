use std::{error::Error, fmt};
use tracing::{debug, warn};

use hw_provider_core::types::VersionedEnvelope;

use super::SigningAdapter;
use crate::HwProviderError;

/// A batch stopped at `index`. Envelopes before it were signed and are returned in
/// `signed`; envelopes after it were never sent to the device.
#[derive(Debug)]
pub struct BatchError<T> {
    pub index: usize,
    pub source: HwProviderError,
    pub signed: Vec<T>,
}

impl<T> BatchError<T> {
    pub fn into_outcome(self) -> BatchOutcome<T> {
        if self.signed.is_empty() {
            BatchOutcome::Failed { error: self.source }
        } else {
            BatchOutcome::Partial { signed: self.signed, failed_at: self.index, error: self.source }
        }
    }
}

impl<T> fmt::Display for BatchError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "signing envelope {} of the batch failed: {}", self.index, self.source)
    }
}

impl<T: fmt::Debug> Error for BatchError<T> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// How a batch ended
#[derive(Debug)]
pub enum BatchOutcome<T> {
    Signed(Vec<T>),
    Partial { signed: Vec<T>, failed_at: usize, error: HwProviderError },
    /// Nothing was signed
    Failed { error: HwProviderError },
}

impl<T> BatchOutcome<T> {
    pub fn is_complete(&self) -> bool {
        matches!(self, BatchOutcome::Signed(_))
    }

    /// Everything that was signed, complete or not
    pub fn into_signed(self) -> Vec<T> {
        match self {
            BatchOutcome::Signed(signed) | BatchOutcome::Partial { signed, .. } => signed,
            BatchOutcome::Failed { .. } => Vec::new(),
        }
    }
}

impl<T> From<Result<Vec<T>, BatchError<T>>> for BatchOutcome<T> {
    fn from(result: Result<Vec<T>, BatchError<T>>) -> Self {
        match result {
            Ok(signed) => BatchOutcome::Signed(signed),
            Err(err) => err.into_outcome(),
        }
    }
}

/// Signs envelopes one after the other, stopping at the first failure.
#[derive(Debug)]
pub struct BatchSigner<'a> {
    adapter: SigningAdapter<'a>,
}

impl<'a> BatchSigner<'a> {
    pub fn new(adapter: SigningAdapter<'a>) -> Self {
        Self { adapter }
    }

    #[tracing::instrument(skip_all, fields(len = envelopes.len()))]
    pub async fn sign_all<T>(&self, envelopes: &[T]) -> Result<Vec<T>, BatchError<T>>
    where
        T: VersionedEnvelope + Send + Sync,
    {
        let mut signed = Vec::with_capacity(envelopes.len());
        for (index, envelope) in envelopes.iter().enumerate() {
            match self.adapter.sign_transaction(envelope).await {
                Ok(envelope) => {
                    debug!(index, "signed");
                    signed.push(envelope);
                }
                Err(source) => {
                    warn!(index, %source, "batch signing stopped");
                    return Err(BatchError { index, source, signed })
                }
            }
        }
        Ok(signed)
    }
}
