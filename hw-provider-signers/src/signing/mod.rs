//! Turning envelopes into signed envelopes.
mod adapter;
pub use adapter::{apply_capabilities, validate, SigningAdapter, SigningStage};

mod batch;
pub use batch::{BatchError, BatchOutcome, BatchSigner};

mod identity;
pub use identity::{IdentityProof, IdentityProofSigner};
