//! Firmware capability negotiation.
//!
//! The device firmware version decides which transaction features may be used. The
//! version is queried on every signing call; a firmware update between two calls is
//! picked up by the next one.
use serde::{ser::SerializeMap, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::debug;

use hw_provider_core::utils::DeviceVersion;

use crate::{ledger::HwApp, HwProviderError};

/// Firmware features gated by a minimum app version
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Feature {
    /// The device signs the payload hash instead of the payload
    HashSigning,
    /// Transactions carry the options field
    VersionedOptions,
    Guardian,
}

impl Feature {
    pub const ALL: [Feature; 3] = [Feature::HashSigning, Feature::VersionedOptions, Feature::Guardian];
}

/// Minimum app version for hash signing and the options field
pub const LEDGER_TX_HASH_SIGN_MIN_VERSION: (u64, u64, u64) = (1, 0, 11);
/// Minimum app version for guarded transactions
pub const LEDGER_TX_GUARDIAN_MIN_VERSION: (u64, u64, u64) = (1, 0, 22);

fn version_of((major, minor, patch): (u64, u64, u64)) -> DeviceVersion {
    DeviceVersion::new(major, minor, patch)
}

/// Minimum firmware version per feature. A feature without a threshold is disabled.
///
/// Deserializing overrides single features of the default table; `null` disables one.
///
/// ```
/// use hw_provider_signers::{CapabilityTable, Feature};
/// use hw_provider_core::utils::DeviceVersion;
///
/// let table = CapabilityTable::default();
/// let version: DeviceVersion = "1.0.21".parse().unwrap();
/// assert!(table.is_enabled(Feature::HashSigning, &version));
/// assert!(!table.is_enabled(Feature::Guardian, &version));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapabilityTable {
    thresholds: BTreeMap<Feature, DeviceVersion>,
}

impl Serialize for CapabilityTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Feature::ALL.len()))?;
        for feature in Feature::ALL {
            map.serialize_entry(&feature, &self.threshold(feature))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CapabilityTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let overrides = BTreeMap::<Feature, Option<DeviceVersion>>::deserialize(deserializer)?;
        let mut table = Self::default();
        for (feature, threshold) in overrides {
            match threshold {
                Some(version) => table.set_threshold(feature, version),
                None => {
                    table.remove(feature);
                }
            }
        }
        Ok(table)
    }
}

impl Default for CapabilityTable {
    fn default() -> Self {
        Self::empty()
            .with_threshold(Feature::HashSigning, version_of(LEDGER_TX_HASH_SIGN_MIN_VERSION))
            .with_threshold(Feature::VersionedOptions, version_of(LEDGER_TX_HASH_SIGN_MIN_VERSION))
            .with_threshold(Feature::Guardian, version_of(LEDGER_TX_GUARDIAN_MIN_VERSION))
    }
}

impl CapabilityTable {
    /// A table with every feature disabled
    pub fn empty() -> Self {
        Self { thresholds: BTreeMap::new() }
    }

    #[must_use]
    pub fn with_threshold(mut self, feature: Feature, version: DeviceVersion) -> Self {
        self.set_threshold(feature, version);
        self
    }

    pub fn set_threshold(&mut self, feature: Feature, version: DeviceVersion) {
        self.thresholds.insert(feature, version);
    }

    pub fn remove(&mut self, feature: Feature) -> Option<DeviceVersion> {
        self.thresholds.remove(&feature)
    }

    pub fn threshold(&self, feature: Feature) -> Option<&DeviceVersion> {
        self.thresholds.get(&feature)
    }

    pub fn is_enabled(&self, feature: Feature, version: &DeviceVersion) -> bool {
        self.threshold(feature).map_or(false, |min| version >= min)
    }

    pub fn evaluate(&self, version: DeviceVersion) -> CapabilitySet {
        CapabilitySet {
            must_sign_using_hash: self.is_enabled(Feature::HashSigning, &version),
            must_use_versioned_options_field: self.is_enabled(Feature::VersionedOptions, &version),
            supports_guardian_option: self.is_enabled(Feature::Guardian, &version),
            reported_version: version,
        }
    }
}

/// What the connected firmware can do, derived from its version
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapabilitySet {
    pub reported_version: DeviceVersion,
    pub must_sign_using_hash: bool,
    pub must_use_versioned_options_field: bool,
    pub supports_guardian_option: bool,
}

/// Queries the device and derives its [`CapabilitySet`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapabilityResolver {
    table: CapabilityTable,
}

impl CapabilityResolver {
    pub fn new(table: CapabilityTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &CapabilityTable {
        &self.table
    }

    #[tracing::instrument(skip_all)]
    pub async fn resolve(&self, app: &dyn HwApp) -> Result<CapabilitySet, HwProviderError> {
        let config = app.get_app_configuration().await?;
        let version = DeviceVersion::parse(&config.version)?;
        let capabilities = self.table.evaluate(version);
        debug!(
            version = %capabilities.reported_version,
            hash_signing = capabilities.must_sign_using_hash,
            versioned_options = capabilities.must_use_versioned_options_field,
            guardian = capabilities.supports_guardian_option,
            "resolved device capabilities"
        );
        Ok(capabilities)
    }
}
