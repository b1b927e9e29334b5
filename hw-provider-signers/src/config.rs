use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::{capabilities::CapabilityTable, HwProviderError};

/// Settings of a [`HwProvider`](crate::HwProvider). Every field has a default, so
/// `{}` is a valid configuration.
///
/// ```
/// use hw_provider_signers::ProviderConfig;
///
/// let config = ProviderConfig::from_json_str(r#"{"addressIndex": 3, "blePairing": false}"#).unwrap();
/// assert_eq!(config.address_index, 3);
/// assert_eq!(config.accounts_page_size, 10);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// Account slot used in every address request
    pub account: u32,
    /// Address index selected before `login` is called
    pub address_index: u32,
    /// Page size used by `get_accounts` when none is given
    pub accounts_page_size: u32,
    /// Overrides the host platform check for Bluetooth LE pairing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ble_pairing: Option<bool>,
    pub capabilities: CapabilityTable,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            account: 0,
            address_index: 0,
            accounts_page_size: 10,
            ble_pairing: None,
            capabilities: CapabilityTable::default(),
        }
    }
}

impl ProviderConfig {
    pub fn from_json_str(json: &str) -> Result<Self, HwProviderError> {
        serde_json::from_str(json).map_err(|err| HwProviderError::Config(err.to_string()))
    }

    /// Reads a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HwProviderError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|err| HwProviderError::Config(format!("{}: {err}", path.display())))?;
        Self::from_json_str(&json)
    }
}
