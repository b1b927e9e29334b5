//! USB HID transport backed by `coins-ledger`.
use async_trait::async_trait;
use coins_ledger::{
    common::{APDUCommand, APDUData},
    transports::{Ledger, LedgerAsync},
};
use futures_util::lock::Mutex;
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use super::{
    apdu::{ApduAnswer, ApduCommand},
    transport::{Exchange, TransportError, TransportFactory, TransportType},
};

/// Opens [`HidTransport`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct HidTransportFactory;

#[async_trait]
impl TransportFactory for HidTransportFactory {
    fn transport_type(&self) -> TransportType {
        TransportType::Hid
    }

    async fn is_supported(&self) -> bool {
        true
    }

    async fn create(&self) -> Result<Arc<dyn Exchange>, TransportError> {
        let ledger = Ledger::init().await.map_err(|err| TransportError::Io(err.to_string()))?;
        Ok(Arc::new(HidTransport::new(ledger)))
    }
}

/// A device connected over USB HID
pub struct HidTransport {
    ledger: Mutex<Option<Ledger>>,
    open: AtomicBool,
}

impl fmt::Debug for HidTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HidTransport").field("open", &self.open.load(Ordering::SeqCst)).finish()
    }
}

impl HidTransport {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger: Mutex::new(Some(ledger)), open: AtomicBool::new(true) }
    }
}

#[async_trait]
impl Exchange for HidTransport {
    async fn exchange(&self, command: &ApduCommand) -> Result<ApduAnswer, TransportError> {
        let ledger = self.ledger.lock().await;
        let ledger = ledger.as_ref().ok_or(TransportError::Closed)?;

        let command = APDUCommand {
            cla: command.cla,
            ins: command.ins,
            p1: command.p1,
            p2: command.p2,
            data: APDUData::new(&command.data),
            response_len: None,
        };
        let answer =
            ledger.exchange(&command).await.map_err(|err| TransportError::Io(err.to_string()))?;

        Ok(ApduAnswer::new(answer.data().unwrap_or_default().to_vec(), answer.retcode()))
    }

    fn is_open(&self) -> Option<bool> {
        Some(self.open.load(Ordering::SeqCst))
    }

    async fn close(&self) {
        self.ledger.lock().await.take();
        self.open.store(false, Ordering::SeqCst);
    }
}
