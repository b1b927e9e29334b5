#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # hw-provider
//!
//! Signs MultiversX transactions and messages with a Ledger device.
//!
//! # Quickstart
//!
//! A prelude is provided which imports all the important things for you. The
//! provider is initialized once, then used for every signing call; each call asks
//! the device for its firmware version and adapts the transaction to it.
//!
//! ```no_run
//! use hw_provider::prelude::*;
//!
//! # async fn foo(factory: impl TransportFactory + 'static) -> Result<(), HwProviderError> {
//! let mut provider = HwProvider::builder().transport(factory).build();
//! provider.init(None).await?;
//!
//! let sender = provider.login(Some(0)).await?;
//! let receiver: Address = "erd1spyavw0956vq68xj8y4tenjpq2wd5a9p2c6j8gsz7ztyrnpxrruqzu66jx"
//!     .parse()
//!     .unwrap();
//! let tx = Transaction::pay(receiver, 1_000).from(sender).chain_id("1");
//!
//! let signed = provider.sign_transaction(&tx).await?;
//! # Ok(())
//! # }
//! ```
//!
//! With the `hid` feature, [`signers::ledger::HidTransportFactory`] reaches a device
//! over USB HID.

/// # hw-provider-core
///
/// The envelope object model: transactions, messages, addresses and the contracts
/// the signing layer relies on. Also version comparison and message hashing.
pub mod core {
    pub use hw_provider_core::*;
}

/// # hw-provider-signers
///
/// Transport discovery, firmware capability negotiation and signing.
pub mod signers {
    pub use hw_provider_signers::*;
}

/// Easy imports of frequently used type definitions and traits
pub mod prelude {
    pub use hw_provider_core::{
        types::*,
        utils::{compare_versions, hash_message, DeviceVersion},
    };
    pub use hw_provider_signers::{
        ledger::{HwApp, LedgerApp, TransportFactory, TransportType},
        BatchOutcome, CapabilityTable, HwProvider, HwProviderError, IdentityProof,
        ProviderConfig, Signer, TokenLoginRequest,
    };
}
