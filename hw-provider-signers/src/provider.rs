use async_trait::async_trait;
use futures_util::lock::Mutex;
use std::{fmt, sync::Arc};
use tracing::{debug, info};

use hw_provider_core::types::{
    Address, Signable, SignableMessage, Transaction, VersionedEnvelope,
};

use crate::{
    capabilities::{CapabilityResolver, CapabilitySet},
    config::ProviderConfig,
    ledger::{
        AppConfiguration, Exchange, HwApp, LedgerApp, TransportFactory, TransportSelector,
        TransportType,
    },
    signing::{BatchError, BatchSigner, IdentityProof, IdentityProofSigner, SigningAdapter},
    HwProviderError, Signer,
};

/// Parameters of [`HwProvider::token_login`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenLoginRequest {
    pub token: Vec<u8>,
    /// Defaults to the current address index
    pub address_index: Option<u32>,
}

impl TokenLoginRequest {
    pub fn new<T: Into<Vec<u8>>>(token: T) -> Self {
        Self { token: token.into(), address_index: None }
    }

    #[must_use]
    pub fn address_index(mut self, index: u32) -> Self {
        self.address_index = Some(index);
        self
    }
}

/// A hardware wallet session.
///
/// Owns the selected transport and the device-command handle built on it. The
/// handle sits behind a single-slot lock held for the whole of every device
/// operation, so two signing prompts can never interleave on the device.
///
/// ```no_run
/// # #[cfg(feature = "hid")]
/// # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
/// use hw_provider_signers::{HwProvider, ledger::HidTransportFactory};
/// use hw_provider_core::types::Transaction;
///
/// let mut provider = HwProvider::builder().transport(HidTransportFactory).build();
/// provider.init(None).await?;
/// let address = provider.login(Some(0)).await?;
///
/// let tx = Transaction::new().nonce(1).from(address).chain_id("1");
/// let signed = provider.sign_transaction(&tx).await?;
/// # Ok(())
/// # }
/// ```
pub struct HwProvider {
    config: ProviderConfig,
    selector: TransportSelector,
    resolver: CapabilityResolver,
    transport: Option<Arc<dyn Exchange>>,
    app: Option<Mutex<Box<dyn HwApp>>>,
    address_index: u32,
}

impl fmt::Debug for HwProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HwProvider")
            .field("config", &self.config)
            .field("transport", &self.selector.selected_type())
            .field("initialized", &self.is_initialized())
            .field("address_index", &self.address_index)
            .finish()
    }
}

impl HwProvider {
    pub fn new(config: ProviderConfig) -> Self {
        HwProviderBuilder::default().config(config).build()
    }

    pub fn builder() -> HwProviderBuilder {
        HwProviderBuilder::default()
    }

    /// Selects a transport and opens the device app on it. Does nothing when the
    /// provider is already initialized.
    #[tracing::instrument(skip(self))]
    pub async fn init(&mut self, transport: Option<TransportType>) -> Result<(), HwProviderError> {
        if self.app.is_some() {
            debug!("already initialized");
            return Ok(())
        }

        let exchange = self.selector.select(transport).await?;
        self.app = Some(Mutex::new(Box::new(LedgerApp::new(exchange.clone()))));
        self.transport = Some(exchange);
        info!(transport = ?self.selector.selected_type(), "hardware wallet initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.app.is_some()
    }

    /// Live link state when the transport reports one, otherwise whether the
    /// provider is initialized
    pub fn is_connected(&self) -> bool {
        self.is_initialized() &&
            self.transport.as_ref().and_then(|transport| transport.is_open()).unwrap_or(true)
    }

    /// Releases the transport and drops the device handle
    pub async fn close(&mut self) {
        self.app = None;
        self.selector.reset();
        if let Some(transport) = self.transport.take() {
            transport.close().await;
        }
        debug!("closed");
    }

    pub fn address_index(&self) -> u32 {
        self.address_index
    }

    pub fn account(&self) -> u32 {
        self.config.account
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn app(&self) -> Result<&Mutex<Box<dyn HwApp>>, HwProviderError> {
        self.app.as_ref().ok_or(HwProviderError::NotInitialized)
    }

    /// Selects `address_index` (the current index when `None`) and returns its
    /// address, displaying it on the device.
    pub async fn login(&mut self, address_index: Option<u32>) -> Result<Address, HwProviderError> {
        let index = address_index.unwrap_or(self.address_index);
        self.set_address_index(index).await?;

        let app = self.app()?.lock().await;
        let address = app.get_address(self.config.account, index, true).await?;
        info!(%address, index, "logged in");
        Ok(address)
    }

    pub async fn logout(&self) -> Result<(), HwProviderError> {
        self.app()?;
        Ok(())
    }

    /// Makes `index` the address the device signs with. The stored index only
    /// changes once the device accepted it.
    pub async fn set_address_index(&mut self, index: u32) -> Result<(), HwProviderError> {
        {
            let app = self.app()?.lock().await;
            app.set_address(self.config.account, index, false).await?;
        }
        self.address_index = index;
        debug!(index, "address index selected");
        Ok(())
    }

    /// Addresses `page * page_size` up to `(page + 1) * page_size`, exclusive. The
    /// configured page size is used when `page_size` is `None`.
    pub async fn get_accounts(
        &self,
        page: u32,
        page_size: Option<u32>,
    ) -> Result<Vec<Address>, HwProviderError> {
        let page_size = page_size.unwrap_or(self.config.accounts_page_size);
        let overflow = || HwProviderError::AddressIndexOverflow { page, page_size };
        let start = page.checked_mul(page_size).ok_or_else(overflow)?;
        start.checked_add(page_size.saturating_sub(1)).ok_or_else(overflow)?;

        let app = self.app()?.lock().await;
        let mut addresses = Vec::new();
        for offset in 0..page_size {
            addresses.push(app.get_address(self.config.account, start + offset, false).await?);
        }
        Ok(addresses)
    }

    /// Address at the current index
    pub async fn get_address(&self) -> Result<Address, HwProviderError> {
        let app = self.app()?.lock().await;
        Ok(app.get_address(self.config.account, self.address_index, false).await?)
    }

    pub async fn app_configuration(&self) -> Result<AppConfiguration, HwProviderError> {
        let app = self.app()?.lock().await;
        Ok(app.get_app_configuration().await?)
    }

    /// Capabilities of the attached firmware, freshly queried
    pub async fn capabilities(&self) -> Result<CapabilitySet, HwProviderError> {
        let app = self.app()?.lock().await;
        self.resolver.resolve(&**app).await
    }

    /// Signs a copy of `envelope`, adapting its version and options to the firmware
    pub async fn sign_transaction<T>(&self, envelope: &T) -> Result<T, HwProviderError>
    where
        T: VersionedEnvelope + Send + Sync,
    {
        let app = self.app()?.lock().await;
        SigningAdapter::new(&**app, &self.resolver).sign_transaction(envelope).await
    }

    /// Signs copies of `envelopes` in order. The device stays locked for the whole
    /// batch.
    pub async fn sign_transactions<T>(&self, envelopes: &[T]) -> Result<Vec<T>, BatchError<T>>
    where
        T: VersionedEnvelope + Send + Sync,
    {
        let app = match self.app() {
            Ok(app) => app.lock().await,
            Err(source) => return Err(BatchError { index: 0, source, signed: Vec::new() }),
        };
        BatchSigner::new(SigningAdapter::new(&**app, &self.resolver))
            .sign_all(envelopes)
            .await
    }

    pub async fn sign_message<M>(&self, message: &M) -> Result<M, HwProviderError>
    where
        M: Signable + Clone + Send + Sync,
    {
        let app = self.app()?.lock().await;
        SigningAdapter::new(&**app, &self.resolver).sign_message(message).await
    }

    /// Selects the requested address index, then signs the login token with it
    pub async fn token_login(
        &mut self,
        request: TokenLoginRequest,
    ) -> Result<IdentityProof, HwProviderError> {
        let index = request.address_index.unwrap_or(self.address_index);
        self.set_address_index(index).await?;

        let app = self.app()?.lock().await;
        IdentityProofSigner::new(&**app, self.config.account)
            .prove_identity(&request.token, index)
            .await
    }
}

#[async_trait]
impl Signer for HwProvider {
    type Error = HwProviderError;

    async fn sign_message(&self, message: &SignableMessage) -> Result<SignableMessage, Self::Error> {
        HwProvider::sign_message(self, message).await
    }

    async fn sign_transaction(&self, tx: &Transaction) -> Result<Transaction, Self::Error> {
        HwProvider::sign_transaction(self, tx).await
    }

    async fn address(&self) -> Result<Address, Self::Error> {
        self.get_address().await
    }
}

/// Builds a [`HwProvider`]
#[derive(Debug, Default)]
pub struct HwProviderBuilder {
    config: ProviderConfig,
    factories: Vec<Box<dyn TransportFactory>>,
    app: Option<Box<dyn HwApp>>,
}

impl HwProviderBuilder {
    #[must_use]
    pub fn config(mut self, config: ProviderConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a transport to probe during `init`
    #[must_use]
    pub fn transport<F: TransportFactory + 'static>(mut self, factory: F) -> Self {
        self.factories.push(Box::new(factory));
        self
    }

    /// Uses `app` as the device-command handle. The provider starts out initialized
    /// and `init` will not probe any transport.
    #[must_use]
    pub fn app<A: HwApp + 'static>(mut self, app: A) -> Self {
        self.app = Some(Box::new(app));
        self
    }

    pub fn build(self) -> HwProvider {
        let mut selector = TransportSelector::new();
        if let Some(enabled) = self.config.ble_pairing {
            selector = selector.ble_pairing(enabled);
        }
        for factory in self.factories {
            selector.register(factory);
        }

        HwProvider {
            resolver: CapabilityResolver::new(self.config.capabilities.clone()),
            address_index: self.config.address_index,
            config: self.config,
            selector,
            transport: None,
            app: self.app.map(Mutex::new),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{MockCall, MockExchange, MockHwApp, TransportError};

    fn addresses() -> Vec<Address> {
        [
            "erd1qyu5wthldzr8wx5c9ucg8kjagg0jfs53s8nr3zpz3hypefsdd8ssycr6th",
            "erd1spyavw0956vq68xj8y4tenjpq2wd5a9p2c6j8gsz7ztyrnpxrruqzu66jx",
            "erd1k2s324ww2g0yj38qn2ch2jwctdy8mnfxep94q9arncc6xecg3xaq6mjse8",
        ]
        .iter()
        .map(|a| a.parse().unwrap())
        .collect()
    }

    #[derive(Debug)]
    struct MockFactory(MockExchange);

    #[async_trait]
    impl TransportFactory for MockFactory {
        fn transport_type(&self) -> TransportType {
            TransportType::Hid
        }

        async fn is_supported(&self) -> bool {
            true
        }

        async fn create(&self) -> Result<Arc<dyn Exchange>, TransportError> {
            Ok(Arc::new(self.0.clone()))
        }
    }

    #[tokio::test]
    async fn uninitialized_fails_fast() {
        let mut provider = HwProvider::new(ProviderConfig::default());
        assert!(!provider.is_initialized());
        assert!(!provider.is_connected());

        assert!(matches!(provider.get_address().await, Err(HwProviderError::NotInitialized)));
        assert!(matches!(provider.logout().await, Err(HwProviderError::NotInitialized)));
        assert!(matches!(provider.login(None).await, Err(HwProviderError::NotInitialized)));
        assert!(matches!(
            provider.sign_transaction(&Transaction::new()).await,
            Err(HwProviderError::NotInitialized)
        ));
        assert!(matches!(
            provider.token_login(TokenLoginRequest::new("t")).await,
            Err(HwProviderError::NotInitialized)
        ));
        let err = provider.sign_transactions(&[Transaction::new()]).await.unwrap_err();
        assert!(matches!(err.source, HwProviderError::NotInitialized));
    }

    #[tokio::test]
    async fn init_without_transports() {
        let mut provider = HwProvider::new(ProviderConfig::default());
        let err = provider.init(None).await.unwrap_err();
        assert!(matches!(err, HwProviderError::Transport(TransportError::NoSupportedTransport)));
        assert!(!provider.is_initialized());
    }

    #[tokio::test]
    async fn init_is_idempotent_and_tracks_link() {
        let exchange = MockExchange::new();
        let mut provider = HwProvider::builder().transport(MockFactory(exchange.clone())).build();

        provider.init(None).await.unwrap();
        provider.init(Some(TransportType::Usb)).await.unwrap();
        assert!(provider.is_connected());

        exchange.set_open(false);
        assert!(provider.is_initialized());
        assert!(!provider.is_connected());

        provider.close().await;
        assert!(!provider.is_initialized());
    }

    #[tokio::test]
    async fn close_releases_transport() {
        let exchange = MockExchange::new();
        let mut provider = HwProvider::builder().transport(MockFactory(exchange.clone())).build();

        provider.init(None).await.unwrap();
        assert_eq!(exchange.is_open(), Some(true));

        provider.close().await;
        assert_eq!(exchange.is_open(), Some(false));
        assert!(!provider.is_connected());
        assert!(matches!(provider.get_address().await, Err(HwProviderError::NotInitialized)));
    }

    #[tokio::test]
    async fn login_selects_index() {
        let app = MockHwApp::new("1.0.22").with_addresses(addresses());
        let mut provider = HwProvider::builder().app(app.clone()).build();

        let address = provider.login(Some(2)).await.unwrap();
        assert_eq!(address, addresses()[2]);
        assert_eq!(provider.address_index(), 2);
        assert_eq!(
            app.calls(),
            vec![
                MockCall::SetAddress { account: 0, index: 2, display: false },
                MockCall::GetAddress { account: 0, index: 2, display: true },
            ]
        );
        assert_eq!(provider.get_address().await.unwrap(), addresses()[2]);
        provider.logout().await.unwrap();
    }

    #[tokio::test]
    async fn pages_accounts() {
        let app = MockHwApp::new("1.0.22").with_addresses(addresses());
        let config = ProviderConfig { accounts_page_size: 3, ..Default::default() };
        let provider = HwProvider::builder().config(config).app(app).build();

        assert_eq!(provider.get_accounts(0, Some(2)).await.unwrap(), addresses()[..2].to_vec());
        assert_eq!(provider.get_accounts(1, Some(1)).await.unwrap(), addresses()[1..2].to_vec());
        assert_eq!(provider.get_accounts(0, None).await.unwrap(), addresses());
        assert!(provider.get_accounts(5, Some(0)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn account_index_overflow() {
        let app = MockHwApp::new("1.0.22").with_addresses(addresses());
        let provider = HwProvider::builder().app(app.clone()).build();

        assert!(matches!(
            provider.get_accounts(u32::MAX, Some(2)).await,
            Err(HwProviderError::AddressIndexOverflow { page: u32::MAX, page_size: 2 })
        ));
        assert!(matches!(
            provider.get_accounts(1, Some(u32::MAX)).await,
            Err(HwProviderError::AddressIndexOverflow { .. })
        ));
        assert!(app.calls().is_empty());
    }

    #[tokio::test]
    async fn huge_page_stops_at_first_device_error() {
        let app = MockHwApp::new("1.0.22").with_addresses(addresses());
        let provider = HwProvider::builder().app(app.clone()).build();

        let err = provider.get_accounts(0, Some(u32::MAX)).await.unwrap_err();
        assert!(matches!(err, HwProviderError::DeviceIo(_)));
        assert_eq!(app.calls().len(), addresses().len() + 1);
    }

    #[tokio::test]
    async fn token_login_uses_current_index() {
        let app = MockHwApp::new("1.0.0").with_addresses(addresses()).with_auth_token_signature("aa");
        let config = ProviderConfig { address_index: 1, ..Default::default() };
        let mut provider = HwProvider::builder().config(config).app(app.clone()).build();

        let proof = provider.token_login(TokenLoginRequest::new("token")).await.unwrap();
        assert_eq!(proof.address, addresses()[1]);

        let proof =
            provider.token_login(TokenLoginRequest::new("token").address_index(2)).await.unwrap();
        assert_eq!(proof.address, addresses()[2]);
        assert_eq!(provider.address_index(), 2);
        assert_eq!(proof.signature.to_hex(), "aa");
    }

    #[tokio::test]
    async fn signer_trait() {
        let app = MockHwApp::new("1.0.11").with_addresses(addresses()).with_message_signature("01");
        app.push_transaction_signature("02");
        let provider = HwProvider::builder().app(app).build();
        let signer: &dyn Signer<Error = HwProviderError> = &provider;

        assert_eq!(signer.address().await.unwrap(), addresses()[0]);
        let tx = signer.sign_transaction(&Transaction::new().chain_id("1")).await.unwrap();
        assert!(tx.options.is_hash_sign());
        let message = signer.sign_message(&SignableMessage::new("hi")).await.unwrap();
        assert_eq!(message.signature.unwrap().to_hex(), "01");
    }
}
