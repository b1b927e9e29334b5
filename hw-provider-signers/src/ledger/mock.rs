//! Scripted stand-ins for the device, used in test environments.
use async_trait::async_trait;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use hw_provider_core::types::Address;

use super::{
    apdu::{ApduAnswer, ApduCommand},
    app::HwApp,
    transport::{Exchange, TransportError},
    types::{AppConfiguration, AuthTokenSignature, LedgerError, StatusWord},
};

/// Scripted answer of a [`MockExchange`]
#[derive(Clone, Debug)]
pub enum MockAnswer {
    Answer(ApduAnswer),
    /// The link fails with [`TransportError::Io`]
    IoError(String),
}

/// Mock link which records every command and replays queued answers in order.
#[derive(Clone, Debug)]
pub struct MockExchange {
    requests: Arc<Mutex<Vec<ApduCommand>>>,
    answers: Arc<Mutex<VecDeque<MockAnswer>>>,
    open: Arc<AtomicBool>,
}

impl Default for MockExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExchange {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            answers: Arc::new(Mutex::new(VecDeque::new())),
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn push(&self, answer: MockAnswer) {
        self.answers.lock().unwrap().push_back(answer);
    }

    pub fn push_answer(&self, data: Vec<u8>, retcode: u16) {
        self.push(MockAnswer::Answer(ApduAnswer::new(data, retcode)));
    }

    /// Queues a successful answer carrying `data`
    pub fn push_ok(&self, data: Vec<u8>) {
        self.push_answer(data, StatusWord::OK);
    }

    /// Commands received so far, oldest first
    pub fn requests(&self) -> Vec<ApduCommand> {
        self.requests.lock().unwrap().clone()
    }

    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }
}

#[async_trait]
impl Exchange for MockExchange {
    async fn exchange(&self, command: &ApduCommand) -> Result<ApduAnswer, TransportError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(TransportError::Closed)
        }
        self.requests.lock().unwrap().push(command.clone());
        match self.answers.lock().unwrap().pop_front() {
            Some(MockAnswer::Answer(answer)) => Ok(answer),
            Some(MockAnswer::IoError(reason)) => Err(TransportError::Io(reason)),
            None => Err(TransportError::Io("no answer queued".to_owned())),
        }
    }

    fn is_open(&self) -> Option<bool> {
        Some(self.open.load(Ordering::SeqCst))
    }

    async fn close(&self) {
        self.set_open(false);
    }
}

/// A call received by a [`MockHwApp`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockCall {
    GetAddress { account: u32, index: u32, display: bool },
    SetAddress { account: u32, index: u32, display: bool },
    GetAppConfiguration,
    SignTransaction { payload: Vec<u8>, using_hash: bool },
    SignMessage { payload: Vec<u8> },
    GetAddressAndSignAuthToken { account: u32, index: u32, token: Vec<u8> },
}

#[derive(Debug)]
struct MockState {
    version: String,
    addresses: Vec<Address>,
    transaction_signatures: VecDeque<Result<String, StatusWord>>,
    message_signature: String,
    auth_token_signature: String,
    calls: Vec<MockCall>,
}

/// Mock device app with a configurable firmware version.
///
/// Transaction signatures are handed out from a queue, one per signing call; an
/// empty queue answers as if the user rejected the request. Addresses are looked up
/// by index in the configured list.
#[derive(Clone, Debug)]
pub struct MockHwApp {
    state: Arc<Mutex<MockState>>,
}

impl MockHwApp {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                version: version.into(),
                addresses: Vec::new(),
                transaction_signatures: VecDeque::new(),
                message_signature: String::new(),
                auth_token_signature: String::new(),
                calls: Vec::new(),
            })),
        }
    }

    #[must_use]
    pub fn with_addresses(self, addresses: Vec<Address>) -> Self {
        self.state.lock().unwrap().addresses = addresses;
        self
    }

    #[must_use]
    pub fn with_message_signature(self, signature: impl Into<String>) -> Self {
        self.state.lock().unwrap().message_signature = signature.into();
        self
    }

    #[must_use]
    pub fn with_auth_token_signature(self, signature: impl Into<String>) -> Self {
        self.state.lock().unwrap().auth_token_signature = signature.into();
        self
    }

    pub fn set_version(&self, version: impl Into<String>) {
        self.state.lock().unwrap().version = version.into();
    }

    pub fn push_transaction_signature(&self, signature: impl Into<String>) {
        self.state.lock().unwrap().transaction_signatures.push_back(Ok(signature.into()));
    }

    /// Makes the next transaction signing call fail with `status`
    pub fn push_transaction_failure(&self, status: StatusWord) {
        self.state.lock().unwrap().transaction_signatures.push_back(Err(status));
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Payloads handed to the transaction signing command, in order
    pub fn signed_payloads(&self) -> Vec<(Vec<u8>, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MockCall::SignTransaction { payload, using_hash } => Some((payload, using_hash)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: MockCall) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn address(&self, index: u32) -> Result<Address, LedgerError> {
        let state = self.state.lock().unwrap();
        state
            .addresses
            .get(index as usize)
            .cloned()
            .ok_or(LedgerError::DeviceStatus(StatusWord::InvalidData))
    }
}

#[async_trait]
impl HwApp for MockHwApp {
    async fn get_address(
        &self,
        account: u32,
        index: u32,
        display: bool,
    ) -> Result<Address, LedgerError> {
        self.record(MockCall::GetAddress { account, index, display });
        self.address(index)
    }

    async fn set_address(
        &self,
        account: u32,
        index: u32,
        display: bool,
    ) -> Result<(), LedgerError> {
        self.record(MockCall::SetAddress { account, index, display });
        Ok(())
    }

    async fn get_app_configuration(&self) -> Result<AppConfiguration, LedgerError> {
        self.record(MockCall::GetAppConfiguration);
        let version = self.state.lock().unwrap().version.clone();
        Ok(AppConfiguration { version, contract_data: 1, account_index: 0, address_index: 0 })
    }

    async fn sign_transaction(
        &self,
        payload: &[u8],
        using_hash: bool,
    ) -> Result<String, LedgerError> {
        self.record(MockCall::SignTransaction { payload: payload.to_vec(), using_hash });
        let next = self.state.lock().unwrap().transaction_signatures.pop_front();
        match next {
            Some(Ok(signature)) => Ok(signature),
            Some(Err(status)) => Err(LedgerError::DeviceStatus(status)),
            None => Err(LedgerError::DeviceStatus(StatusWord::UserDenied)),
        }
    }

    async fn sign_message(&self, payload: &[u8]) -> Result<String, LedgerError> {
        self.record(MockCall::SignMessage { payload: payload.to_vec() });
        Ok(self.state.lock().unwrap().message_signature.clone())
    }

    async fn get_address_and_sign_auth_token(
        &self,
        account: u32,
        index: u32,
        token: &[u8],
    ) -> Result<AuthTokenSignature, LedgerError> {
        self.record(MockCall::GetAddressAndSignAuthToken {
            account,
            index,
            token: token.to_vec(),
        });
        let address = self.address(index)?;
        let signature = self.state.lock().unwrap().auth_token_signature.clone();
        Ok(AuthTokenSignature { address, signature })
    }
}
