use super::{Address, Bytes, EnvelopeError, Signable};
use crate::utils::hash_message;
use serde::{Deserialize, Serialize};

/// Default tag identifying the signer of a message
pub const LEDGER_SIGNER: &str = "ledger";

/// An arbitrary message to be signed by the device
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignableMessage {
    pub message: Bytes,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,

    pub version: u32,

    pub signer: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Bytes>,
}

impl SignableMessage {
    pub const DEFAULT_VERSION: u32 = 1;

    pub fn new<T: Into<Bytes>>(message: T) -> Self {
        Self {
            message: message.into(),
            address: None,
            version: Self::DEFAULT_VERSION,
            signer: LEDGER_SIGNER.to_owned(),
            signature: None,
        }
    }

    #[must_use]
    pub fn address<T: Into<Address>>(mut self, address: T) -> Self {
        self.address = Some(address.into());
        self
    }

    #[must_use]
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn signer<T: Into<String>>(mut self, signer: T) -> Self {
        self.signer = signer.into();
        self
    }

    /// Prefixed keccak-256 digest of the message, see [`hash_message`]
    pub fn hash(&self) -> [u8; 32] {
        hash_message(&self.message)
    }
}

impl Signable for SignableMessage {
    /// The device applies the message prefix itself, so it receives the raw bytes
    fn serialize_for_signing(&self) -> Result<Vec<u8>, EnvelopeError> {
        Ok(self.message.to_vec())
    }

    fn apply_signature(&mut self, signature: Bytes) {
        self.signature = Some(signature);
    }

    fn signature(&self) -> Option<&Bytes> {
        self.signature.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let message = SignableMessage::new("Hello World");
        assert_eq!(message.version, 1);
        assert_eq!(message.signer, "ledger");
        assert_eq!(message.serialize_for_signing().unwrap(), b"Hello World".to_vec());
    }

    #[test]
    fn signing_keeps_hash() {
        let message = SignableMessage::new("Hello World").version(42);
        let mut signed = message.clone();
        signed.apply_signature(vec![0xab, 0xba].into());
        assert_eq!(message.hash(), signed.hash());
        assert_eq!(signed.version, 42);
    }
}
