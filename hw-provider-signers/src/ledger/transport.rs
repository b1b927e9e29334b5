//! Physical channels to the device and the discovery policy across them.
//!
//! Each channel is a [`TransportFactory`] that can tell whether it is usable on this
//! host and open an [`Exchange`]. The [`TransportSelector`] probes the registered
//! factories in the fixed priority order of [`TransportType::PRIORITY`] and keeps the
//! first link that opens.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use super::apdu::{ApduAnswer, ApduCommand};

/// A physical channel to the device
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TransportType {
    Usb,
    BluetoothLe,
    Hid,
    /// Legacy U2F tunnel
    U2f,
}

impl TransportType {
    /// Discovery order
    pub const PRIORITY: [TransportType; 4] =
        [TransportType::Usb, TransportType::BluetoothLe, TransportType::Hid, TransportType::U2f];
}

#[derive(Debug, Error)]
pub enum TransportError {
    /// Every candidate was unsupported or failed to open
    #[error("no supported transport found")]
    NoSupportedTransport,
    /// An explicitly requested transport could not be opened
    #[error("transport `{transport}` is unavailable: {reason}")]
    TransportTypeUnavailable { transport: TransportType, reason: String },
    #[error("transport I/O error: {0}")]
    Io(String),
    #[error("transport is closed")]
    Closed,
}

/// An open link able to exchange APDUs with the device
#[async_trait]
pub trait Exchange: fmt::Debug + Send + Sync {
    async fn exchange(&self, command: &ApduCommand) -> Result<ApduAnswer, TransportError>;

    /// Whether the link is still open, for links that track it
    fn is_open(&self) -> Option<bool> {
        None
    }

    /// Releases the device. Exchanges after this fail with [`TransportError::Closed`].
    async fn close(&self) {}
}

/// Discovery and creation primitives of one physical channel
#[async_trait]
pub trait TransportFactory: fmt::Debug + Send + Sync {
    fn transport_type(&self) -> TransportType;

    async fn is_supported(&self) -> bool;

    async fn create(&self) -> Result<Arc<dyn Exchange>, TransportError>;
}

/// Whether the host OS handles Bluetooth LE pairing with the device itself
pub fn host_supports_ble_pairing() -> bool {
    cfg!(any(target_os = "macos", target_os = "windows", target_os = "linux"))
}

/// Picks the channel to talk to the device over, and remembers it.
#[derive(Debug)]
pub struct TransportSelector {
    factories: Vec<Box<dyn TransportFactory>>,
    ble_pairing: bool,
    selected: Option<(TransportType, Arc<dyn Exchange>)>,
}

impl Default for TransportSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportSelector {
    pub fn new() -> Self {
        Self { factories: Vec::new(), ble_pairing: host_supports_ble_pairing(), selected: None }
    }

    /// Registers a channel. Registration order does not affect discovery order; for two
    /// factories of the same type the first registered wins.
    #[must_use]
    pub fn with_factory<F: TransportFactory + 'static>(mut self, factory: F) -> Self {
        self.register(Box::new(factory));
        self
    }

    pub fn register(&mut self, factory: Box<dyn TransportFactory>) {
        self.factories.push(factory);
    }

    /// Overrides the host platform check gating Bluetooth LE
    #[must_use]
    pub fn ble_pairing(mut self, enabled: bool) -> Self {
        self.ble_pairing = enabled;
        self
    }

    pub fn selected(&self) -> Option<&Arc<dyn Exchange>> {
        self.selected.as_ref().map(|(_, exchange)| exchange)
    }

    pub fn selected_type(&self) -> Option<TransportType> {
        self.selected.as_ref().map(|(transport, _)| *transport)
    }

    /// Forgets the selected link, returning it
    pub fn reset(&mut self) -> Option<Arc<dyn Exchange>> {
        self.selected.take().map(|(_, exchange)| exchange)
    }

    fn factory(&self, transport: TransportType) -> Option<&dyn TransportFactory> {
        self.factories.iter().find(|f| f.transport_type() == transport).map(|f| f.as_ref())
    }

    fn in_scope(&self, transport: TransportType) -> bool {
        transport != TransportType::BluetoothLe || self.ble_pairing
    }

    /// Returns the cached link if one was selected before, otherwise opens either the
    /// requested channel or the first working one in priority order.
    #[tracing::instrument(skip(self))]
    pub async fn select(
        &mut self,
        explicit: Option<TransportType>,
    ) -> Result<Arc<dyn Exchange>, TransportError> {
        if let Some((transport, exchange)) = &self.selected {
            debug!(%transport, "reusing selected transport");
            return Ok(exchange.clone())
        }

        let (transport, exchange) = match explicit {
            Some(transport) => (transport, self.open_explicit(transport).await?),
            None => self.scan().await?,
        };

        info!(%transport, "transport selected");
        self.selected = Some((transport, exchange.clone()));
        Ok(exchange)
    }

    async fn open_explicit(
        &self,
        transport: TransportType,
    ) -> Result<Arc<dyn Exchange>, TransportError> {
        let unavailable = |reason: &str| TransportError::TransportTypeUnavailable {
            transport,
            reason: reason.to_owned(),
        };

        let factory = self.factory(transport).ok_or_else(|| unavailable("not registered"))?;
        if !self.in_scope(transport) {
            return Err(unavailable("host platform does not support pairing"))
        }
        if !factory.is_supported().await {
            return Err(unavailable("not supported on this host"))
        }
        factory.create().await.map_err(|err| unavailable(&err.to_string()))
    }

    async fn scan(&self) -> Result<(TransportType, Arc<dyn Exchange>), TransportError> {
        for transport in TransportType::PRIORITY {
            if !self.in_scope(transport) {
                trace!(%transport, "skipped, host platform does not support pairing");
                continue
            }
            let factory = match self.factory(transport) {
                Some(factory) => factory,
                None => {
                    trace!(%transport, "not registered");
                    continue
                }
            };
            if !factory.is_supported().await {
                debug!(%transport, "not supported");
                continue
            }
            match factory.create().await {
                Ok(exchange) => return Ok((transport, exchange)),
                Err(err) => warn!(%transport, %err, "could not create transport, trying next"),
            }
        }

        Err(TransportError::NoSupportedTransport)
    }
}
