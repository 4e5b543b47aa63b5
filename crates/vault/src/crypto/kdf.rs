//! Per-subject key derivation.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use pbkdf2::pbkdf2_hmac;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::crypto::token::KEY_LEN;

/// PBKDF2 round count. Fixed: the same (secret, salt) pair must derive the
/// same key on every call, on every host.
pub const PBKDF2_ROUNDS: u32 = 100_000;

/// Errors produced by the key derivation layer.
#[derive(Debug, Error)]
pub enum KdfError {
    /// The caller-supplied salt string is not valid URL-safe base64.
    /// Raised for every underlying decode failure mode.
    #[error("salt is not valid URL-safe base64")]
    InvalidSalt,
}

/// Fixed-size derived key buffer holding exactly [`KEY_LEN`] bytes.
///
/// Lives only for the duration of one encrypt/decrypt call. When dropped,
/// the memory is overwritten with zeroes to minimise the window during
/// which derived key material sits in RAM.
pub struct KeyMaterial(Box<[u8; KEY_LEN]>);

impl KeyMaterial {
    /// Raw key bytes: first half signs, second half encrypts.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Encode to the URL-safe base64 key format the token codec consumes.
    ///
    /// An encoding convenience for the codec's ASCII-safe key contract,
    /// not a security property.
    pub fn to_base64(&self) -> String {
        URL_SAFE.encode(&self.0[..])
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        // Zero the key material on drop.
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material — not even in debug builds.
        f.write_str("KeyMaterial([REDACTED])")
    }
}

/// Decode a caller-supplied salt from its URL-safe base64 transport form.
///
/// # Errors
///
/// Returns [`KdfError::InvalidSalt`] when the string does not decode.
pub fn decode_salt(salt_b64: &str) -> Result<Vec<u8>, KdfError> {
    URL_SAFE.decode(salt_b64).map_err(|_| KdfError::InvalidSalt)
}

/// Stretch `secret` into a [`KEY_LEN`]-byte key scoped to `salt`.
///
/// Pure and deterministic: the same inputs always yield the same key, and
/// different salts yield computationally unrelated keys. PBKDF2-HMAC-SHA256
/// at [`PBKDF2_ROUNDS`] rounds raises the cost of brute-forcing the secret
/// out of a compromised token.
///
/// Nothing is cached: every call recomputes the full derivation. Callers
/// with high per-subject call volume cache derived keys themselves.
pub fn derive(secret: &[u8], salt: &[u8]) -> KeyMaterial {
    let mut out = Box::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(secret, salt, PBKDF2_ROUNDS, &mut out[..]);
    KeyMaterial(out)
}

/// Derive the fixed-mode key directly from the long-term secret.
///
/// A single SHA-256 digest, no salt and no stretching: the fixed-mode key
/// is only as guessable as the secret itself, which the deployment already
/// has to keep strong.
pub fn fixed_key(secret: &[u8]) -> KeyMaterial {
    let digest = Sha256::digest(secret);
    let mut out = Box::new([0u8; KEY_LEN]);
    out[..].copy_from_slice(digest.as_slice());
    KeyMaterial(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_same_key() {
        let k1 = derive(b"long-term-secret", b"salt-bytes");
        let k2 = derive(b"long-term-secret", b"salt-bytes");
        assert_eq!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn different_salts_different_keys() {
        let k1 = derive(b"long-term-secret", b"salt-one");
        let k2 = derive(b"long-term-secret", b"salt-two");
        assert_ne!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn different_secrets_different_keys() {
        let k1 = derive(b"secret-one", b"shared-salt");
        let k2 = derive(b"secret-two", b"shared-salt");
        assert_ne!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn base64_form_is_codec_key_length() {
        let key = derive(b"secret", b"salt");
        let encoded = key.to_base64();
        // 32 bytes → 44 chars of padded URL-safe base64.
        assert_eq!(encoded.len(), 44);
        assert_eq!(URL_SAFE.decode(&encoded).unwrap().len(), KEY_LEN);
    }

    #[test]
    fn decode_salt_accepts_url_safe_base64() {
        let salt = decode_salt("c29tZS1zYWx0LWJ5dGVzISE=").unwrap();
        assert_eq!(salt, b"some-salt-bytes!!");
    }

    #[test]
    fn decode_salt_rejects_garbage() {
        assert!(matches!(
            decode_salt("not-a-base64!!"),
            Err(KdfError::InvalidSalt)
        ));
    }

    #[test]
    fn fixed_key_is_deterministic_and_distinct_from_derived() {
        let f1 = fixed_key(b"secret");
        let f2 = fixed_key(b"secret");
        assert_eq!(f1.as_bytes(), f2.as_bytes());

        let salted = derive(b"secret", b"any-salt");
        assert_ne!(f1.as_bytes(), salted.as_bytes());
    }

    #[test]
    fn debug_is_redacted() {
        let key = derive(b"secret", b"salt");
        assert!(format!("{key:?}").contains("REDACTED"));
    }
}
