#![allow(clippy::upper_case_acronyms)]
//! Helpers for interacting with the MultiversX Ledger App
use std::fmt;
use thiserror::Error;

use hw_provider_core::types::{Address, AddressError};

use super::transport::TransportError;

/// Class byte of every MultiversX app command
pub const CLA: u8 = 0xed;

/// Maximum payload bytes carried by one signing APDU, excluding the length header
pub const MAX_CHUNK_SIZE: usize = 150;

/// Length of an Ed25519 signature returned by the device
pub const SIGNATURE_LENGTH: usize = 64;

#[derive(Error, Debug)]
/// Error when using the Ledger transport
pub enum LedgerError {
    /// Underlying transport error
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The device answered with a non-success status word
    #[error("device returned status {0}")]
    DeviceStatus(StatusWord),
    /// Device response was unexpectedly empty
    #[error("Received unexpected response from device. Expected data in response, found none.")]
    UnexpectedNullResponse,
    /// Got a response, but it didn't contain as much data as expected
    #[error("Cannot deserialize ledger response, insufficient bytes. Got {got} expected at least {at_least}")]
    ShortResponse { got: usize, at_least: usize },
    /// The device returned a signature of the wrong size
    #[error("invalid signature received from device: expected 64 bytes, got {0}")]
    InvalidSignature(usize),
    #[error(transparent)]
    /// Error when converting from a hex string
    HexError(#[from] hex::FromHexError),
    /// The device reported an address that is not a valid bech32 string
    #[error(transparent)]
    InvalidAddress(#[from] AddressError),
    /// Payload is empty
    #[error("Payload must not be empty")]
    EmptyPayload,
    /// Payload length does not fit the 4 byte length header
    #[error("Payload of {0} bytes is too large")]
    PayloadTooLarge(usize),
}

/// Status words the MultiversX app and the device OS are known to return
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StatusWord {
    UserDenied,
    DeviceLocked,
    AppNotOpen,
    InsNotSupported,
    WrongLength,
    InvalidData,
    WrongP1P2,
    Other(u16),
}

impl StatusWord {
    pub const OK: u16 = 0x9000;

    pub fn code(&self) -> u16 {
        match self {
            StatusWord::UserDenied => 0x6985,
            StatusWord::DeviceLocked => 0x5515,
            StatusWord::AppNotOpen => 0x6e00,
            StatusWord::InsNotSupported => 0x6d00,
            StatusWord::WrongLength => 0x6700,
            StatusWord::InvalidData => 0x6a80,
            StatusWord::WrongP1P2 => 0x6b00,
            StatusWord::Other(code) => *code,
        }
    }
}

impl From<u16> for StatusWord {
    fn from(code: u16) -> Self {
        match code {
            0x6985 => StatusWord::UserDenied,
            0x5515 => StatusWord::DeviceLocked,
            0x6e00 | 0x6e01 => StatusWord::AppNotOpen,
            0x6d00 => StatusWord::InsNotSupported,
            0x6700 => StatusWord::WrongLength,
            0x6a80 => StatusWord::InvalidData,
            0x6b00 => StatusWord::WrongP1P2,
            code => StatusWord::Other(code),
        }
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            StatusWord::UserDenied => "rejected by user",
            StatusWord::DeviceLocked => "device locked",
            StatusWord::AppNotOpen => "app not open",
            StatusWord::InsNotSupported => "instruction not supported",
            StatusWord::WrongLength => "wrong length",
            StatusWord::InvalidData => "invalid data",
            StatusWord::WrongP1P2 => "wrong parameters",
            StatusWord::Other(_) => "unknown",
        };
        write!(f, "{:#06x} ({reason})", self.code())
    }
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[allow(non_camel_case_types)]
pub enum INS {
    GET_APP_CONFIGURATION = 0x02,
    GET_ADDRESS = 0x03,
    SIGN_TX = 0x04,
    SET_ADDRESS = 0x05,
    SIGN_MESSAGE = 0x06,
    SIGN_TX_HASH = 0x07,
    GET_ADDRESS_AUTH_TOKEN = 0x09,
}

impl std::fmt::Display for INS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            INS::GET_APP_CONFIGURATION => write!(f, "GET_APP_CONFIGURATION"),
            INS::GET_ADDRESS => write!(f, "GET_ADDRESS"),
            INS::SIGN_TX => write!(f, "SIGN_TX"),
            INS::SET_ADDRESS => write!(f, "SET_ADDRESS"),
            INS::SIGN_MESSAGE => write!(f, "SIGN_MESSAGE"),
            INS::SIGN_TX_HASH => write!(f, "SIGN_TX_HASH"),
            INS::GET_ADDRESS_AUTH_TOKEN => write!(f, "GET_ADDRESS_AUTH_TOKEN"),
        }
    }
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[allow(non_camel_case_types)]
pub enum P1 {
    NON_CONFIRM = 0x00,
    /// Show the address on the device screen
    CONFIRM = 0x01,
    MORE = 0x80,
}

pub const P1_FIRST: u8 = 0x00;

#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[allow(non_camel_case_types)]
pub enum P2 {
    DEFAULT = 0x00,
}

/// Configuration reported by the MultiversX app
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfiguration {
    /// Firmware version of the app, `major.minor.patch`
    pub version: String,
    /// Whether contract data is allowed in transactions
    pub contract_data: u8,
    pub account_index: u8,
    pub address_index: u8,
}

/// Address plus signature over an auth token, obtained in a single round trip
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthTokenSignature {
    pub address: Address,
    /// Hex encoded signature, as returned by the device
    pub signature: String,
}
