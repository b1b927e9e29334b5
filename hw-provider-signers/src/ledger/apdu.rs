//! APDU commands and answers exchanged over every transport.
//!
//! ```text
//! command:  | CLA | INS | P1 | P2 | Lc | Data |
//! answer:   | Data | SW1 | SW2 |
//! ```

use super::types::{LedgerError, StatusWord};

/// A command sent to the device
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApduCommand {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

impl ApduCommand {
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8, data: Vec<u8>) -> Self {
        Self { cla, ins, p1, p2, data }
    }
}

/// A raw answer from the device: response data followed by a two byte status word
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApduAnswer {
    data: Vec<u8>,
    retcode: u16,
}

impl ApduAnswer {
    pub fn new(data: Vec<u8>, retcode: u16) -> Self {
        Self { data, retcode }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn retcode(&self) -> u16 {
        self.retcode
    }

    pub fn is_success(&self) -> bool {
        self.retcode == StatusWord::OK
    }

    /// Returns the response data, or the device status as an error
    pub fn into_result(self) -> Result<Vec<u8>, LedgerError> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(LedgerError::DeviceStatus(StatusWord::from(self.retcode)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_word_decides_result() {
        let answer = ApduAnswer::new(vec![0x01, 0x02], 0x9000);
        assert!(answer.is_success());
        assert_eq!(answer.into_result().unwrap(), vec![0x01, 0x02]);

        let answer = ApduAnswer::new(vec![], 0x6985);
        assert!(!answer.is_success());
        assert!(matches!(
            answer.into_result(),
            Err(LedgerError::DeviceStatus(StatusWord::UserDenied))
        ));
    }
}
