#![cfg_attr(docsrs, feature(doc_cfg))]
//! Envelope types and utilities shared by the hardware wallet provider.
//!
//! This crate holds the object model that gets signed on the device: the
//! [`Transaction`](types::Transaction) and the
//! [`SignableMessage`](types::SignableMessage), together with the two contracts
//! the signing layer relies on:
//!
//! - [`Signable`](types::Signable): produce the bytes to sign and accept a signature
//! - [`VersionedEnvelope`](types::VersionedEnvelope): read and write the `version`
//!   and `options` fields that firmware capabilities may force
//!
//! ## Signing a prefixed message
//!
//! Messages are signed by the device over the raw bytes; off-device the same
//! payload is represented by the keccak-256 digest of
//! `"\x17Elrond Signed Message:\n" + message.length + message`.
//!
//! ```rust
//! use hw_provider_core::{types::SignableMessage, utils::hash_message};
//!
//! let message = SignableMessage::new("Hello World");
//! assert_eq!(message.hash(), hash_message("Hello World"));
//! ```
//!
//! ## Firmware versions
//!
//! Device firmware versions are compared component-wise, never lexicographically:
//!
//! ```rust
//! use hw_provider_core::utils::compare_versions;
//! use std::cmp::Ordering;
//!
//! assert_eq!(compare_versions("1.0.9", "1.0.11").unwrap(), Ordering::Less);
//! ```
pub mod types;

/// Various utilities
pub mod utils;
