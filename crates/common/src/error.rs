//! Public error types shared across crates.

use thiserror::Error;

/// Top-level encryption service error type.
///
/// Integrity and authenticity failures are collapsed into the single
/// [`EncryptionError::InvalidToken`] variant before they reach a caller:
/// which internal check rejected a token (signature, version, padding) is
/// not observable from the outside.
///
/// Every variant is deterministic in the call's inputs, so no failure is
/// worth retrying with the same arguments.
#[derive(Debug, Error)]
pub enum EncryptionError {
    /// The service was constructed with an empty or absent secret.
    /// Fatal misconfiguration, raised at construction time.
    #[error("encryption secret is missing or empty")]
    MissingKey,

    /// The caller-supplied salt is not valid URL-safe base64.
    #[error("salt is not valid URL-safe base64")]
    InvalidSalt,

    /// The token failed decoding or verification. Deliberately opaque.
    #[error("token is invalid or corrupted")]
    InvalidToken,
}

impl EncryptionError {
    /// Short machine-readable code for structured logs and error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            EncryptionError::MissingKey => "missing_key",
            EncryptionError::InvalidSalt => "invalid_salt",
            EncryptionError::InvalidToken => "invalid_token",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        assert_eq!(EncryptionError::MissingKey.code(), "missing_key");
        assert_eq!(EncryptionError::InvalidSalt.code(), "invalid_salt");
        assert_eq!(EncryptionError::InvalidToken.code(), "invalid_token");
    }

    #[test]
    fn invalid_token_display_names_no_internal_check() {
        let msg = EncryptionError::InvalidToken.to_string().to_lowercase();
        for leak in ["signature", "padding", "version", "mac"] {
            assert!(!msg.contains(leak));
        }
    }

    #[test]
    fn display_includes_salt_hint() {
        let e = EncryptionError::InvalidSalt;
        assert!(e.to_string().contains("base64"));
    }
}
