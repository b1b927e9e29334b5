//! Hashing helpers for signable payloads.

use tiny_keccak::{Hasher, Keccak};

/// Prefix the device prepends to messages before hashing them
pub const MESSAGE_PREFIX: &str = "\x17Elrond Signed Message:\n";

/// Hash a message the same way the device does before signing it.
///
/// The final message is encoded as follows:
/// `"\x17Elrond Signed Message:\n" + message.length + message`
///
/// This message is then hashed using [Keccak-256](keccak256).
pub fn hash_message<T: AsRef<[u8]>>(message: T) -> [u8; 32] {
    let message = message.as_ref();
    let len_string = message.len().to_string();

    let mut prefixed = Vec::with_capacity(MESSAGE_PREFIX.len() + len_string.len() + message.len());
    prefixed.extend_from_slice(MESSAGE_PREFIX.as_bytes());
    prefixed.extend_from_slice(len_string.as_bytes());
    prefixed.extend_from_slice(message);

    keccak256(&prefixed)
}

/// Compute the Keccak-256 hash of input bytes.
pub fn keccak256<T: AsRef<[u8]>>(bytes: T) -> [u8; 32] {
    let mut output = [0u8; 32];

    let mut hasher = Keccak::v256();
    hasher.update(bytes.as_ref());
    hasher.finalize(&mut output);

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // from https://emn178.github.io/online-tools/keccak_256.html
    fn test_keccak256() {
        assert_eq!(
            hex::encode(keccak256(b"hello")),
            "1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
    }

    #[test]
    fn hash_message_applies_prefix() {
        let mut expected = b"\x17Elrond Signed Message:\n11".to_vec();
        expected.extend_from_slice(b"Hello World");
        assert_eq!(hash_message("Hello World"), keccak256(expected));
        assert_ne!(hash_message("Hello World"), keccak256("Hello World"));
    }
}
