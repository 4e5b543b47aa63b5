//! Production encryption backend.
//!
//! Strings cross this boundary as UTF-8 bytes; the codec below it only ever
//! sees bytes. Fixed-mode calls use a key hashed directly from the long-term
//! secret; subject-mode calls derive a fresh key from (secret, salt) on
//! every call and zero it when the call completes.

use std::fmt;
use std::time::Duration;

use common::{EncryptionError, Encryptor};
use tracing::debug;

use crate::crypto::kdf;
use crate::crypto::token::{TokenCipher, TokenError};

/// Long-term secret bytes. Owned exclusively by the service instance for
/// its lifetime; zeroed on drop, redacted in `Debug`, never serialized.
struct SecretBytes(Vec<u8>);

impl Drop for SecretBytes {
    fn drop(&mut self) {
        // Zero the secret on drop.
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret material — not even in debug builds.
        f.write_str("SecretBytes([REDACTED])")
    }
}

/// [`Encryptor`] backed by the real cryptographic codec.
#[derive(Debug)]
pub struct FernetEncryptor {
    secret: SecretBytes,
    token_ttl: Option<Duration>,
}

impl FernetEncryptor {
    /// Build a backend owning `secret` for its lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptionError::MissingKey`] when `secret` is empty.
    /// Checked here, once, so a misconfigured deployment fails at startup
    /// rather than on its first encrypt call.
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, EncryptionError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(EncryptionError::MissingKey);
        }
        Ok(Self {
            secret: SecretBytes(secret),
            token_ttl: None,
        })
    }

    /// Reject tokens older than `ttl` on both decrypt paths.
    ///
    /// No TTL is enforced unless this is set; tokens never expire by
    /// default.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = Some(ttl);
        self
    }

    fn fixed_cipher(&self) -> Result<TokenCipher, EncryptionError> {
        let key = kdf::fixed_key(&self.secret.0);
        TokenCipher::new(&key.to_base64()).map_err(opaque)
    }

    fn subject_cipher(&self, salt_b64: &str) -> Result<TokenCipher, EncryptionError> {
        let salt = kdf::decode_salt(salt_b64).map_err(|_| EncryptionError::InvalidSalt)?;
        let key = kdf::derive(&self.secret.0, &salt);
        TokenCipher::new(&key.to_base64()).map_err(opaque)
    }

    fn decode(&self, cipher: &TokenCipher, token: &str) -> Result<String, EncryptionError> {
        let plaintext = match self.token_ttl {
            Some(ttl) => cipher.decode_with_ttl(token, ttl),
            None => cipher.decode(token),
        }
        .map_err(opaque)?;
        String::from_utf8(plaintext).map_err(|_| EncryptionError::InvalidToken)
    }
}

impl Encryptor for FernetEncryptor {
    fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        let cipher = self.fixed_cipher()?;
        Ok(cipher.encode(plaintext.as_bytes()))
    }

    fn decrypt(&self, token: &str) -> Result<String, EncryptionError> {
        let cipher = self.fixed_cipher()?;
        self.decode(&cipher, token)
    }

    fn encrypt_for_subject(
        &self,
        plaintext: &str,
        salt_b64: &str,
    ) -> Result<String, EncryptionError> {
        let cipher = self.subject_cipher(salt_b64)?;
        Ok(cipher.encode(plaintext.as_bytes()))
    }

    fn decrypt_for_subject(
        &self,
        token: &str,
        salt_b64: &str,
    ) -> Result<String, EncryptionError> {
        let cipher = self.subject_cipher(salt_b64)?;
        self.decode(&cipher, token)
    }
}

/// Collapse an internal codec failure into the opaque public error.
///
/// The failed check is logged for diagnostics; outside this boundary a
/// padding failure and a signature failure are indistinguishable.
fn opaque(err: TokenError) -> EncryptionError {
    debug!(reason = %err, "token rejected");
    EncryptionError::InvalidToken
}
