mod hash;
pub use hash::{hash_message, keccak256, MESSAGE_PREFIX};

mod version;
pub use version::{compare_versions, DeviceVersion, VersionError};
