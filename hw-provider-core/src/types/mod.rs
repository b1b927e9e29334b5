mod address;
pub use address::{Address, AddressError, DEFAULT_HRP};

mod bytes;
pub use self::bytes::{deserialize_bytes, serialize_bytes, Bytes};

mod envelope;
pub use envelope::{EnvelopeError, Signable, VersionedEnvelope};

mod options;
pub use options::{TransactionOptions, TransactionVersion};

mod transaction;
pub use transaction::Transaction;

mod message;
pub use message::{SignableMessage, LEDGER_SIGNER};
