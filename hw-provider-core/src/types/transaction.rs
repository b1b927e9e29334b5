//! Transaction types
use super::{
    Address, Bytes, EnvelopeError, Signable, TransactionOptions, TransactionVersion,
    VersionedEnvelope,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// A transaction to be signed by the device
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub nonce: u64,

    /// Transferred value, in the smallest denomination
    #[serde(with = "decimal_string")]
    pub value: u128,

    pub receiver: Option<Address>,

    pub sender: Option<Address>,

    pub gas_price: u64,

    pub gas_limit: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,

    #[serde(rename = "chainID")]
    pub chain_id: String,

    #[serde(default)]
    pub version: TransactionVersion,

    #[serde(default)]
    pub options: TransactionOptions,

    /// Co-signer of a guarded transaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian: Option<Address>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Bytes>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian_signature: Option<Bytes>,
}

/// The canonical JSON the device signs over. Field order is significant.
#[derive(Serialize)]
struct SigningPayload<'a> {
    nonce: u64,
    value: String,
    receiver: &'a str,
    sender: &'a str,
    #[serde(rename = "gasPrice")]
    gas_price: u64,
    #[serde(rename = "gasLimit")]
    gas_limit: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(rename = "chainID")]
    chain_id: &'a str,
    version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    guardian: Option<&'a str>,
}

impl Transaction {
    /// Creates an empty transaction with all fields left empty
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience function for a plain value transfer
    pub fn pay<T: Into<Address>>(to: T, value: u128) -> Self {
        Transaction { receiver: Some(to.into()), value, ..Default::default() }
    }

    // Builder pattern helpers

    /// Sets the `nonce` field in the transaction to the provided value
    #[must_use]
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// Sets the `value` field in the transaction to the provided value
    #[must_use]
    pub fn value(mut self, value: u128) -> Self {
        self.value = value;
        self
    }

    /// Sets the `sender` field in the transaction to the provided value
    #[must_use]
    pub fn from<T: Into<Address>>(mut self, sender: T) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Sets the `receiver` field in the transaction to the provided value
    #[must_use]
    pub fn to<T: Into<Address>>(mut self, receiver: T) -> Self {
        self.receiver = Some(receiver.into());
        self
    }

    /// Sets the `gas_price` field in the transaction to the provided value
    #[must_use]
    pub fn gas_price(mut self, gas_price: u64) -> Self {
        self.gas_price = gas_price;
        self
    }

    /// Sets the `gas_limit` field in the transaction to the provided value
    #[must_use]
    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Sets the `data` field in the transaction to the provided value
    #[must_use]
    pub fn data<T: Into<Bytes>>(mut self, data: T) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Sets the `chain_id` field in the transaction to the provided value
    #[must_use]
    pub fn chain_id<T: Into<String>>(mut self, chain_id: T) -> Self {
        self.chain_id = chain_id.into();
        self
    }

    /// Sets the `version` field in the transaction to the provided value
    #[must_use]
    pub fn version<T: Into<TransactionVersion>>(mut self, version: T) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the `options` field in the transaction to the provided value
    #[must_use]
    pub fn options<T: Into<TransactionOptions>>(mut self, options: T) -> Self {
        self.options = options.into();
        self
    }

    /// Sets the `guardian` field in the transaction to the provided value
    #[must_use]
    pub fn guardian<T: Into<Address>>(mut self, guardian: T) -> Self {
        self.guardian = Some(guardian.into());
        self
    }

    /// Attaches the guardian's co-signature
    pub fn apply_guardian_signature(&mut self, signature: Bytes) {
        self.guardian_signature = Some(signature);
    }

    fn signing_payload(&self) -> SigningPayload<'_> {
        SigningPayload {
            nonce: self.nonce,
            value: self.value.to_string(),
            receiver: self.receiver.as_ref().map(Address::as_str).unwrap_or_default(),
            sender: self.sender.as_ref().map(Address::as_str).unwrap_or_default(),
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            data: self.data.as_ref().filter(|data| !data.is_empty()).map(|data| STANDARD.encode(data)),
            chain_id: &self.chain_id,
            version: self.version.value(),
            options: (!self.options.is_empty()).then(|| self.options.value()),
            guardian: self.guardian.as_ref().map(Address::as_str),
        }
    }
}

impl Signable for Transaction {
    fn serialize_for_signing(&self) -> Result<Vec<u8>, EnvelopeError> {
        Ok(serde_json::to_vec(&self.signing_payload())?)
    }

    fn apply_signature(&mut self, signature: Bytes) {
        self.signature = Some(signature);
    }

    fn signature(&self) -> Option<&Bytes> {
        self.signature.as_ref()
    }
}

impl VersionedEnvelope for Transaction {
    fn version(&self) -> TransactionVersion {
        self.version
    }

    fn set_version(&mut self, version: TransactionVersion) {
        self.version = version;
    }

    fn options(&self) -> TransactionOptions {
        self.options
    }

    fn set_options(&mut self, options: TransactionOptions) {
        self.options = options;
    }
}

mod decimal_string {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        let value = String::deserialize(d)?;
        value.parse().map_err(|e| D::Error::custom(format!("invalid value `{value}`: {e}")))
    }
}
