//! Capability interface implemented by every encryption backend.

use crate::error::EncryptionError;

/// String encryption capability consumed by application code.
///
/// Two interchangeable implementations exist: the production cryptographic
/// backend and an in-memory recording fake for interaction tests. Which one
/// a process gets is decided once, at construction time, by the wiring
/// layer — callers only ever see an `Arc<dyn Encryptor>`.
///
/// All operations are synchronous and safe to call concurrently; every
/// failure is deterministic in the call's inputs.
pub trait Encryptor: Send + Sync {
    /// Encrypt `plaintext` under the service-wide fixed key.
    fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError>;

    /// Decrypt a token produced by [`Encryptor::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns [`EncryptionError::InvalidToken`] on any verification or
    /// format failure.
    fn decrypt(&self, token: &str) -> Result<String, EncryptionError>;

    /// Encrypt `plaintext` under a key derived for one subject from its
    /// URL-safe base64 `salt_b64`.
    fn encrypt_for_subject(
        &self,
        plaintext: &str,
        salt_b64: &str,
    ) -> Result<String, EncryptionError>;

    /// Decrypt a subject-scoped token. The salt must match the one the
    /// token was encrypted with.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptionError::InvalidSalt`] when `salt_b64` does not
    /// decode, and [`EncryptionError::InvalidToken`] on any verification or
    /// format failure — including a well-formed salt that is simply the
    /// wrong one.
    fn decrypt_for_subject(
        &self,
        token: &str,
        salt_b64: &str,
    ) -> Result<String, EncryptionError>;
}
