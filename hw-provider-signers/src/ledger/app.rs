use async_trait::async_trait;
use std::{fmt, sync::Arc};
use tracing::trace;

use hw_provider_core::types::{Address, AddressError};

use super::{
    apdu::ApduCommand,
    transport::Exchange,
    types::*,
};

/// Commands of the MultiversX app running on the device.
///
/// Signatures come back hex encoded, exactly as the app reports them.
#[async_trait]
pub trait HwApp: fmt::Debug + Send + Sync {
    async fn get_address(
        &self,
        account: u32,
        index: u32,
        display: bool,
    ) -> Result<Address, LedgerError>;

    /// Makes `index` the address the device signs with
    async fn set_address(&self, account: u32, index: u32, display: bool)
        -> Result<(), LedgerError>;

    async fn get_app_configuration(&self) -> Result<AppConfiguration, LedgerError>;

    /// Signs a serialized transaction. With `using_hash` the device signs the hash of
    /// the payload instead of the payload itself.
    async fn sign_transaction(&self, payload: &[u8], using_hash: bool)
        -> Result<String, LedgerError>;

    async fn sign_message(&self, payload: &[u8]) -> Result<String, LedgerError>;

    /// Returns the address at `index` together with a signature over `token`
    async fn get_address_and_sign_auth_token(
        &self,
        account: u32,
        index: u32,
        token: &[u8],
    ) -> Result<AuthTokenSignature, LedgerError>;
}

/// The MultiversX Ledger app, spoken to over any [`Exchange`].
///
/// ```no_run
/// # #[cfg(feature = "hid")]
/// # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
/// use hw_provider_signers::ledger::{HidTransportFactory, HwApp, LedgerApp, TransportFactory};
///
/// let transport = HidTransportFactory.create().await?;
/// let app = LedgerApp::new(transport);
/// let address = app.get_address(0, 0, false).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LedgerApp {
    transport: Arc<dyn Exchange>,
}

impl LedgerApp {
    pub fn new(transport: Arc<dyn Exchange>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn Exchange> {
        &self.transport
    }

    async fn send(&self, ins: INS, p1: u8, data: Vec<u8>) -> Result<Vec<u8>, LedgerError> {
        let command = ApduCommand::new(CLA, ins as u8, p1, P2::DEFAULT as u8, data);
        trace!(%ins, p1, len = command.data.len(), "exchange");
        self.transport.exchange(&command).await?.into_result()
    }

    /// Sends `header` followed by `payload` split in chunks of at most
    /// [`MAX_CHUNK_SIZE`] bytes. Returns the answer to the last chunk.
    #[tracing::instrument(skip(self, header, payload), fields(len = payload.len()))]
    async fn send_chunked(
        &self,
        ins: INS,
        header: &[u8],
        payload: &[u8],
    ) -> Result<Vec<u8>, LedgerError> {
        let mut chunks = payload.chunks(MAX_CHUNK_SIZE);

        let first = [header, chunks.next().unwrap_or_default()].concat();
        let mut response = self.send(ins, P1_FIRST, first).await?;

        for chunk in chunks {
            response = self.send(ins, P1::MORE as u8, chunk.to_vec()).await?;
        }

        Ok(response)
    }

    async fn sign(&self, ins: INS, payload: &[u8]) -> Result<String, LedgerError> {
        if payload.is_empty() {
            return Err(LedgerError::EmptyPayload)
        }
        let len =
            u32::try_from(payload.len()).map_err(|_| LedgerError::PayloadTooLarge(payload.len()))?;

        let response = self.send_chunked(ins, &len.to_be_bytes(), payload).await?;
        parse_signature(&response)
    }
}

fn address_payload(account: u32, index: u32) -> Vec<u8> {
    [account.to_be_bytes(), index.to_be_bytes()].concat()
}

/// Reads a one byte length followed by that many bytes, starting at `offset`
fn read_field(data: &[u8], offset: usize) -> Result<(&[u8], usize), LedgerError> {
    let len = *data
        .get(offset)
        .ok_or(LedgerError::ShortResponse { got: data.len(), at_least: offset + 1 })?
        as usize;
    let end = offset + 1 + len;
    let field =
        data.get(offset + 1..end).ok_or(LedgerError::ShortResponse { got: data.len(), at_least: end })?;
    Ok((field, end))
}

fn parse_address(field: &[u8]) -> Result<Address, LedgerError> {
    let address = std::str::from_utf8(field)
        .map_err(|_| AddressError::InvalidFormat(String::from_utf8_lossy(field).into_owned()))?;
    Ok(address.parse()?)
}

// | len (0x40) | signature (64) |
fn parse_signature(response: &[u8]) -> Result<String, LedgerError> {
    if response.is_empty() {
        return Err(LedgerError::UnexpectedNullResponse)
    }
    let (signature, _) = read_field(response, 0)?;
    if signature.len() != SIGNATURE_LENGTH {
        return Err(LedgerError::InvalidSignature(signature.len()))
    }
    Ok(hex::encode(signature))
}

#[async_trait]
impl HwApp for LedgerApp {
    async fn get_address(
        &self,
        account: u32,
        index: u32,
        display: bool,
    ) -> Result<Address, LedgerError> {
        let p1 = if display { P1::CONFIRM } else { P1::NON_CONFIRM };
        let response = self.send(INS::GET_ADDRESS, p1 as u8, address_payload(account, index)).await?;
        if response.is_empty() {
            return Err(LedgerError::UnexpectedNullResponse)
        }
        let (address, _) = read_field(&response, 0)?;
        parse_address(address)
    }

    async fn set_address(
        &self,
        account: u32,
        index: u32,
        display: bool,
    ) -> Result<(), LedgerError> {
        let p1 = if display { P1::CONFIRM } else { P1::NON_CONFIRM };
        self.send(INS::SET_ADDRESS, p1 as u8, address_payload(account, index)).await?;
        Ok(())
    }

    async fn get_app_configuration(&self) -> Result<AppConfiguration, LedgerError> {
        let response =
            self.send(INS::GET_APP_CONFIGURATION, P1::NON_CONFIRM as u8, Vec::new()).await?;
        if response.is_empty() {
            return Err(LedgerError::UnexpectedNullResponse)
        }
        if response.len() < 6 {
            return Err(LedgerError::ShortResponse { got: response.len(), at_least: 6 })
        }

        Ok(AppConfiguration {
            contract_data: response[0],
            account_index: response[1],
            address_index: response[2],
            version: format!("{}.{}.{}", response[3], response[4], response[5]),
        })
    }

    async fn sign_transaction(
        &self,
        payload: &[u8],
        using_hash: bool,
    ) -> Result<String, LedgerError> {
        let ins = if using_hash { INS::SIGN_TX_HASH } else { INS::SIGN_TX };
        self.sign(ins, payload).await
    }

    async fn sign_message(&self, payload: &[u8]) -> Result<String, LedgerError> {
        self.sign(INS::SIGN_MESSAGE, payload).await
    }

    async fn get_address_and_sign_auth_token(
        &self,
        account: u32,
        index: u32,
        token: &[u8],
    ) -> Result<AuthTokenSignature, LedgerError> {
        let len =
            u32::try_from(token.len()).map_err(|_| LedgerError::PayloadTooLarge(token.len()))?;
        let mut header = address_payload(account, index);
        header.extend_from_slice(&len.to_be_bytes());

        let response = self.send_chunked(INS::GET_ADDRESS_AUTH_TOKEN, &header, token).await?;
        if response.is_empty() {
            return Err(LedgerError::UnexpectedNullResponse)
        }

        let (address, offset) = read_field(&response, 0)?;
        let address = parse_address(address)?;
        let signature = parse_signature(&response[offset..])?;

        Ok(AuthTokenSignature { address, signature })
    }
}
