use async_trait::async_trait;
use hw_provider_core::types::{
    Address, Signable, SignableMessage, Transaction, TransactionOptions, TransactionVersion,
};
use hw_provider_signers::{
    ledger::{
        Exchange, MockExchange, MockHwApp, StatusWord, TransportError, TransportFactory,
        TransportType,
    },
    BatchOutcome, HwProvider, HwProviderError, ProviderConfig, TokenLoginRequest,
};
use std::sync::Arc;

const ALICE: &str = "erd1qyu5wthldzr8wx5c9ucg8kjagg0jfs53s8nr3zpz3hypefsdd8ssycr6th";
const BOB: &str = "erd1spyavw0956vq68xj8y4tenjpq2wd5a9p2c6j8gsz7ztyrnpxrruqzu66jx";

fn address(s: &str) -> Address {
    s.parse().unwrap()
}

fn tx(version: u32, options: u32) -> Transaction {
    Transaction::pay(address(BOB), 1_000_000_000_000_000_000)
        .nonce(42)
        .from(address(ALICE))
        .gas_price(1_000_000_000)
        .gas_limit(50_000)
        .chain_id("D")
        .version(TransactionVersion(version))
        .options(TransactionOptions(options))
}

fn provider(device_version: &str) -> (HwProvider, MockHwApp) {
    let device = MockHwApp::new(device_version)
        .with_addresses(vec![address(ALICE), address(BOB)])
        .with_message_signature("cd".repeat(64));
    (HwProvider::builder().app(device.clone()).build(), device)
}

#[tokio::test]
async fn below_hash_threshold_fields_are_kept() {
    let (provider, device) = provider("1.0.10");
    device.push_transaction_signature("ab".repeat(64));

    let input = tx(1, 0);
    let signed = provider.sign_transaction(&input).await.unwrap();

    assert_eq!(signed.version, TransactionVersion(1));
    assert_eq!(signed.options, TransactionOptions(0));
    assert_eq!(signed.signature.unwrap().to_vec(), vec![0xab; 64]);
    assert_eq!(device.signed_payloads()[0], (input.serialize_for_signing().unwrap(), false));
}

#[tokio::test]
async fn at_hash_threshold_version_and_options_are_set() {
    let (provider, device) = provider("1.0.11");
    device.push_transaction_signature("ab".repeat(64));

    let input = tx(1, 0);
    let signed = provider.sign_transaction(&input).await.unwrap();

    assert_eq!(signed.version, TransactionVersion(2));
    assert_eq!(signed.options, TransactionOptions(0b0001));
    assert!(device.signed_payloads()[0].1);
    assert_eq!(input, tx(1, 0));
}

#[tokio::test]
async fn guardian_needs_recent_firmware() {
    let (provider, device) = provider("1.0.21");
    device.push_transaction_signature("ab".repeat(64));

    let input = tx(2, 0b1110);
    let err = provider.sign_transaction(&input).await.unwrap_err();
    match err {
        HwProviderError::UnsupportedGuardianFeature(ref version) => assert_eq!(version, "1.0.21"),
        ref other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(err.to_string(), "MultiversX App v1.0.21 does not support guarded transactions.");
    assert!(device.signed_payloads().is_empty());
    assert_eq!(input, tx(2, 0b1110));

    device.set_version("1.0.22");
    let signed = provider.sign_transaction(&input).await.unwrap();
    assert_eq!(signed.version, TransactionVersion(2));
    assert_eq!(signed.options, TransactionOptions(0b1111));
}

#[tokio::test]
async fn batch_keeps_order() {
    let (provider, device) = provider("1.0.22");
    device.push_transaction_signature("aaaa");
    device.push_transaction_signature("bbbb");

    let input = vec![tx(1, 0).nonce(1), tx(1, 0).nonce(2)];
    let signed = provider.sign_transactions(&input).await.unwrap();

    let signatures: Vec<_> =
        signed.iter().map(|tx| tx.signature.as_ref().unwrap().to_hex()).collect();
    assert_eq!(signatures, vec!["aaaa", "bbbb"]);
    assert_eq!(signed[0].nonce, 1);
    assert_eq!(signed[1].nonce, 2);
    assert!(input.iter().all(|tx| tx.signature.is_none()));
}

#[tokio::test]
async fn batch_reports_signed_prefix() {
    let (provider, device) = provider("1.0.22");
    device.push_transaction_signature("aaaa");
    device.push_transaction_failure(StatusWord::UserDenied);

    let input = vec![tx(1, 0).nonce(1), tx(1, 0).nonce(2), tx(1, 0).nonce(3)];
    let outcome = BatchOutcome::from(provider.sign_transactions(&input).await);

    match outcome {
        BatchOutcome::Partial { signed, failed_at, error } => {
            assert_eq!(failed_at, 1);
            assert_eq!(signed.len(), 1);
            assert_eq!(signed[0].signature.as_ref().unwrap().to_hex(), "aaaa");
            assert!(matches!(error, HwProviderError::DeviceIo(_)));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    // the third transaction never reached the device
    assert_eq!(device.signed_payloads().len(), 2);
}

#[tokio::test]
async fn message_copy_keeps_signing_payload() {
    let (provider, _) = provider("1.0.22");

    let message = SignableMessage::new("hello").address(address(ALICE));
    let signed = provider.sign_message(&message).await.unwrap();

    assert!(message.signature.is_none());
    assert_eq!(signed.signature.as_ref().unwrap().to_vec(), vec![0xcd; 64]);
    assert_eq!(signed.serialize_for_signing().unwrap(), message.serialize_for_signing().unwrap());
    assert_eq!(signed.hash(), message.hash());
}

#[tokio::test]
async fn token_login_and_accounts() {
    let device = MockHwApp::new("1.0.22")
        .with_addresses(vec![address(ALICE), address(BOB)])
        .with_auth_token_signature("ef".repeat(64));
    let mut provider = HwProvider::builder().app(device).build();

    let proof =
        provider.token_login(TokenLoginRequest::new("token").address_index(1)).await.unwrap();
    assert_eq!(proof.address, address(BOB));
    assert_eq!(provider.get_address().await.unwrap(), address(BOB));

    let accounts = provider.get_accounts(0, Some(2)).await.unwrap();
    assert_eq!(accounts, vec![address(ALICE), address(BOB)]);
}

#[tokio::test]
async fn partial_capability_config_keeps_hash_signing() {
    let config =
        ProviderConfig::from_json_str(r#"{"capabilities": {"guardian": "1.0.30"}}"#).unwrap();
    let device = MockHwApp::new("1.0.22");
    device.push_transaction_signature("ab".repeat(64));
    let provider = HwProvider::builder().config(config).app(device.clone()).build();

    let signed = provider.sign_transaction(&Transaction::new()).await.unwrap();
    assert_eq!(signed.version, TransactionVersion::WITH_OPTIONS);
    assert_eq!(signed.options, TransactionOptions::HASH_SIGN);
    assert!(device.signed_payloads()[0].1);

    let err = provider.sign_transaction(&tx(2, 0b0010)).await.unwrap_err();
    assert!(matches!(err, HwProviderError::UnsupportedGuardianFeature(_)));
}

#[derive(Debug)]
struct ScriptedUsb(MockExchange);

#[async_trait]
impl TransportFactory for ScriptedUsb {
    fn transport_type(&self) -> TransportType {
        TransportType::Usb
    }

    async fn is_supported(&self) -> bool {
        true
    }

    async fn create(&self) -> Result<Arc<dyn Exchange>, TransportError> {
        Ok(Arc::new(self.0.clone()))
    }
}

fn length_prefixed(bytes: &[u8]) -> Vec<u8> {
    [&[bytes.len() as u8][..], bytes].concat()
}

#[tokio::test]
async fn signs_over_apdu_transport() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let link = MockExchange::new();
    let config = ProviderConfig::from_json_str(r#"{"account": 0, "blePairing": false}"#).unwrap();
    let mut provider =
        HwProvider::builder().config(config).transport(ScriptedUsb(link.clone())).build();

    provider.init(None).await.unwrap();
    assert!(provider.is_connected());

    // login: set address, then get address with display
    link.push_ok(vec![]);
    link.push_ok(length_prefixed(ALICE.as_bytes()));
    assert_eq!(provider.login(Some(0)).await.unwrap(), address(ALICE));

    // signing: app configuration, then two payload chunks
    link.push_ok(vec![1, 0, 0, 1, 0, 22]);
    link.push_ok(vec![]);
    link.push_ok(length_prefixed(&[0x5a; 64]));
    let signed = provider.sign_transaction(&tx(1, 0)).await.unwrap();
    assert_eq!(signed.options, TransactionOptions::HASH_SIGN);
    assert_eq!(signed.signature.unwrap().to_vec(), vec![0x5a; 64]);

    let requests = link.requests();
    assert_eq!(requests.len(), 5);
    assert!(requests.iter().all(|request| request.cla == 0xed));
    assert_eq!(
        requests.iter().map(|r| (r.ins, r.p1)).collect::<Vec<_>>(),
        vec![(0x05, 0x00), (0x03, 0x01), (0x02, 0x00), (0x07, 0x00), (0x07, 0x80)]
    );

    link.set_open(false);
    assert!(!provider.is_connected());
    assert!(matches!(provider.get_address().await, Err(HwProviderError::DeviceIo(_))));

    provider.close().await;
    assert!(matches!(provider.get_address().await, Err(HwProviderError::NotInitialized)));
}
