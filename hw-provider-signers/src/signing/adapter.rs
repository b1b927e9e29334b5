use std::fmt;
use tracing::{debug, info};

use hw_provider_core::types::{
    Bytes, Signable, TransactionOptions, TransactionVersion, VersionedEnvelope,
};

use crate::{
    capabilities::{CapabilityResolver, CapabilitySet},
    ledger::{HwApp, LedgerError},
    HwProviderError,
};

/// Progress of a single signing call
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SigningStage {
    Idle,
    Cloned,
    CapabilitiesResolved,
    Validated,
    Mutated,
    Serialized,
    AwaitingDeviceSignature,
    SignatureApplied,
    /// Rejected before any signing request reached the device
    Aborted,
}

/// Rejects envelopes asking for features the firmware lacks.
pub fn validate<T: VersionedEnvelope>(
    envelope: &T,
    capabilities: &CapabilitySet,
) -> Result<(), HwProviderError> {
    if envelope.options().is_guarded() && !capabilities.supports_guardian_option {
        return Err(HwProviderError::UnsupportedGuardianFeature(
            capabilities.reported_version.to_string(),
        ))
    }
    Ok(())
}

/// Rewrites `version` and `options` to what the firmware expects.
///
/// Hash signing always comes with the options-capable version, even when the table
/// gates the two differently.
pub fn apply_capabilities<T: VersionedEnvelope>(envelope: &mut T, capabilities: &CapabilitySet) {
    if capabilities.must_use_versioned_options_field || capabilities.must_sign_using_hash {
        let version = TransactionVersion::WITH_OPTIONS;
        if envelope.version() != version {
            info!(from = %envelope.version(), to = %version, "setting transaction version");
        }
        envelope.set_version(version);
    }

    if capabilities.must_sign_using_hash {
        let options = envelope.options().with(TransactionOptions::HASH_SIGN);
        if envelope.options() != options {
            info!(from = %envelope.options(), to = %options, "setting transaction options");
        }
        envelope.set_options(options);
    }
}

/// Signs single envelopes with a device-command handle.
///
/// The caller's envelope is never touched: every call works on its own copy and
/// returns it signed.
pub struct SigningAdapter<'a> {
    app: &'a dyn HwApp,
    resolver: &'a CapabilityResolver,
}

impl<'a> fmt::Debug for SigningAdapter<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningAdapter").field("app", &self.app).finish()
    }
}

impl<'a> SigningAdapter<'a> {
    pub fn new(app: &'a dyn HwApp, resolver: &'a CapabilityResolver) -> Self {
        Self { app, resolver }
    }

    #[tracing::instrument(skip_all)]
    pub async fn sign_transaction<T>(&self, envelope: &T) -> Result<T, HwProviderError>
    where
        T: VersionedEnvelope + Send + Sync,
    {
        let mut stage = SigningStage::Idle;
        let mut envelope = envelope.clone();
        advance(&mut stage, SigningStage::Cloned);

        let capabilities = self.resolver.resolve(self.app).await?;
        advance(&mut stage, SigningStage::CapabilitiesResolved);

        if let Err(err) = validate(&envelope, &capabilities) {
            advance(&mut stage, SigningStage::Aborted);
            return Err(err)
        }
        advance(&mut stage, SigningStage::Validated);

        apply_capabilities(&mut envelope, &capabilities);
        advance(&mut stage, SigningStage::Mutated);

        let payload = envelope.serialize_for_signing()?;
        advance(&mut stage, SigningStage::Serialized);

        advance(&mut stage, SigningStage::AwaitingDeviceSignature);
        let signature =
            self.app.sign_transaction(&payload, capabilities.must_sign_using_hash).await?;

        envelope.apply_signature(decode_signature(&signature)?);
        advance(&mut stage, SigningStage::SignatureApplied);

        Ok(envelope)
    }

    /// Signs a message. Messages are not version gated, the device receives the
    /// signing payload as is.
    #[tracing::instrument(skip_all)]
    pub async fn sign_message<M>(&self, message: &M) -> Result<M, HwProviderError>
    where
        M: Signable + Clone + Send + Sync,
    {
        let mut message = message.clone();
        let payload = message.serialize_for_signing()?;
        let signature = self.app.sign_message(&payload).await?;
        message.apply_signature(decode_signature(&signature)?);
        Ok(message)
    }
}

fn advance(stage: &mut SigningStage, next: SigningStage) {
    debug!(from = %stage, to = %next, "signing");
    *stage = next;
}

pub(crate) fn decode_signature(signature: &str) -> Result<Bytes, HwProviderError> {
    Ok(Bytes::from_hex(signature).map_err(LedgerError::from)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{MockCall, MockHwApp};
    use hw_provider_core::types::{SignableMessage, Transaction};

    const SIGNATURE: &str = "ab";

    fn tx(version: u32, options: u32) -> Transaction {
        Transaction::new()
            .nonce(7)
            .chain_id("D")
            .version(TransactionVersion(version))
            .options(TransactionOptions(options))
    }

    async fn sign(device_version: &str, input: &Transaction) -> Result<Transaction, HwProviderError> {
        let app = MockHwApp::new(device_version);
        app.push_transaction_signature(SIGNATURE);
        let resolver = CapabilityResolver::default();
        SigningAdapter::new(&app, &resolver).sign_transaction(input).await
    }

    #[tokio::test]
    async fn old_firmware_keeps_fields() {
        let input = tx(1, 0);
        let signed = sign("1.0.10", &input).await.unwrap();
        assert_eq!(signed.version, TransactionVersion(1));
        assert_eq!(signed.options, TransactionOptions(0));
        assert_eq!(signed.signature.as_ref().unwrap().to_vec(), vec![0xab]);
    }

    #[tokio::test]
    async fn hash_signing_firmware_sets_both_fields() {
        let input = tx(1, 0);
        let signed = sign("1.0.11", &input).await.unwrap();
        assert_eq!(signed.version, TransactionVersion(2));
        assert_eq!(signed.options, TransactionOptions(0b0001));
        assert_eq!(input, tx(1, 0));
    }

    #[tokio::test]
    async fn guardian_firmware_check() {
        let input = tx(2, 0b1110);
        let err = sign("1.0.21", &input).await.unwrap_err();
        assert!(err.to_string().contains("v1.0.21"));
        match err {
            HwProviderError::UnsupportedGuardianFeature(version) => assert_eq!(version, "1.0.21"),
            other => panic!("unexpected error {other:?}"),
        }

        let signed = sign("1.0.22", &input).await.unwrap();
        assert_eq!(signed.version, TransactionVersion(2));
        assert_eq!(signed.options, TransactionOptions(0b1111));
    }

    #[tokio::test]
    async fn aborts_before_touching_the_device() {
        let app = MockHwApp::new("1.0.21");
        app.push_transaction_signature(SIGNATURE);
        let resolver = CapabilityResolver::default();

        let result = SigningAdapter::new(&app, &resolver).sign_transaction(&tx(2, 0b0010)).await;
        assert!(result.is_err());
        assert_eq!(app.calls(), vec![MockCall::GetAppConfiguration]);
    }

    #[tokio::test]
    async fn hash_flag_is_idempotent() {
        let signed = sign("1.0.11", &tx(2, 0b0001)).await.unwrap();
        assert_eq!(signed.options, TransactionOptions(0b0001));
    }

    #[tokio::test]
    async fn device_receives_mutated_payload() {
        let app = MockHwApp::new("1.0.11");
        app.push_transaction_signature(SIGNATURE);
        let resolver = CapabilityResolver::default();
        let signed = SigningAdapter::new(&app, &resolver).sign_transaction(&tx(1, 0)).await.unwrap();

        let payloads = app.signed_payloads();
        assert_eq!(payloads.len(), 1);
        assert!(payloads[0].1);
        assert_eq!(payloads[0].0, signed.serialize_for_signing().unwrap());
    }

    #[tokio::test]
    async fn device_errors_pass_through() {
        let app = MockHwApp::new("1.0.22");
        let resolver = CapabilityResolver::default();
        let input = tx(1, 0);

        let err = SigningAdapter::new(&app, &resolver).sign_transaction(&input).await.unwrap_err();
        assert!(matches!(err, HwProviderError::DeviceIo(LedgerError::DeviceStatus(_))));
        assert_eq!(input, tx(1, 0));
    }

    #[tokio::test]
    async fn signs_message_copy() {
        let app = MockHwApp::new("1.0.22").with_message_signature("cafe");
        let resolver = CapabilityResolver::default();
        let message = SignableMessage::new("hello");

        let signed = SigningAdapter::new(&app, &resolver).sign_message(&message).await.unwrap();
        assert!(message.signature.is_none());
        assert_eq!(signed.signature.as_ref().unwrap().to_hex(), "cafe");
        assert_eq!(signed.serialize_for_signing().unwrap(), message.serialize_for_signing().unwrap());
        assert_eq!(signed.hash(), message.hash());
        assert_eq!(app.calls(), vec![MockCall::SignMessage { payload: b"hello".to_vec() }]);
    }

    #[test]
    fn custom_table_keeps_hash_and_version_together() {
        let capabilities = CapabilitySet {
            reported_version: "1.0.0".parse().unwrap(),
            must_sign_using_hash: true,
            must_use_versioned_options_field: false,
            supports_guardian_option: false,
        };
        let mut envelope = tx(1, 0);
        apply_capabilities(&mut envelope, &capabilities);
        assert_eq!(envelope.version, TransactionVersion::WITH_OPTIONS);
        assert!(envelope.options.is_hash_sign());
    }
}
