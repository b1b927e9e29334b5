//! Talking to the MultiversX app on a Ledger device.
pub mod apdu;
pub mod app;
pub mod mock;
pub mod transport;
pub mod types;

#[cfg(all(feature = "hid", not(target_arch = "wasm32")))]
pub mod hid;

pub use apdu::{ApduAnswer, ApduCommand};
pub use app::{HwApp, LedgerApp};
pub use mock::{MockAnswer, MockCall, MockExchange, MockHwApp};
pub use transport::{
    host_supports_ble_pairing, Exchange, TransportError, TransportFactory, TransportSelector,
    TransportType,
};
pub use types::{AppConfiguration, AuthTokenSignature, LedgerError, StatusWord};

#[cfg(all(feature = "hid", not(target_arch = "wasm32")))]
pub use hid::{HidTransport, HidTransportFactory};
