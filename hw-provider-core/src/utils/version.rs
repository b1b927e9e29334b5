//! Dotted-numeric firmware versions.
use std::{cmp::Ordering, fmt, str::FromStr};
use thiserror::Error;

const DELIMITER: char = '.';

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("invalid version format `{version}`: component `{component}` is not a non-negative integer")]
    InvalidVersionFormat { version: String, component: String },
}

/// A firmware version as reported by the device, e.g. `1.0.11`.
///
/// Components compare positionally as integers; missing trailing components count
/// as `0`, so `1.0` equals `1.0.0`.
#[derive(Clone, Debug)]
pub struct DeviceVersion {
    raw: String,
    components: Vec<u64>,
}

impl DeviceVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self { raw: format!("{major}.{minor}.{patch}"), components: vec![major, minor, patch] }
    }

    pub fn parse(version: &str) -> Result<Self, VersionError> {
        let components = version
            .split(DELIMITER)
            .map(|component| {
                // `u64::from_str` accepts a leading `+`
                if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid(version, component))
                }
                component.parse::<u64>().map_err(|_| invalid(version, component))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { raw: version.to_owned(), components })
    }

    /// The string exactly as the device reported it
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn components(&self) -> &[u64] {
        &self.components
    }

    fn component(&self, position: usize) -> u64 {
        self.components.get(position).copied().unwrap_or(0)
    }
}

fn invalid(version: &str, component: &str) -> VersionError {
    VersionError::InvalidVersionFormat {
        version: version.to_owned(),
        component: component.to_owned(),
    }
}

impl FromStr for DeviceVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DeviceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for DeviceVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for DeviceVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for DeviceVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for DeviceVersion {}

impl serde::Serialize for DeviceVersion {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.raw)
    }
}

impl<'de> serde::Deserialize<'de> for DeviceVersion {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Compares two dotted-numeric version strings.
///
/// ```
/// use hw_provider_core::utils::compare_versions;
/// use std::cmp::Ordering;
///
/// assert_eq!(compare_versions("1.0.22", "1.0.22").unwrap(), Ordering::Equal);
/// assert_eq!(compare_versions("1.1", "1.0.22").unwrap(), Ordering::Greater);
/// assert!(compare_versions("1.x", "1.0").is_err());
/// ```
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering, VersionError> {
    Ok(DeviceVersion::parse(a)?.cmp(&DeviceVersion::parse(b)?))
}
