//! Encryption backends and construction-time backend selection.

pub mod fake;
pub mod fernet;

pub use fake::FakeEncryptor;
pub use fernet::FernetEncryptor;

use std::sync::Arc;
use std::time::Duration;

use common::{EncryptionError, Encryptor};
use tracing::warn;

use crate::config::{Backend, Config};

/// Build the configured [`Encryptor`] backend.
///
/// Selection happens here, once, at startup; nothing downstream can switch
/// a running process from the real backend to the fake.
///
/// # Errors
///
/// Returns [`EncryptionError::MissingKey`] when the configured secret is
/// empty.
pub fn build(cfg: &Config) -> Result<Arc<dyn Encryptor>, EncryptionError> {
    match cfg.backend {
        Backend::Fernet => {
            let mut svc = FernetEncryptor::new(cfg.encryption_secret.as_bytes())?;
            if let Some(secs) = cfg.token_ttl_secs {
                svc = svc.with_ttl(Duration::from_secs(secs));
            }
            Ok(Arc::new(svc))
        }
        Backend::Fake => {
            warn!("fake encryption backend selected; tokens are NOT encrypted");
            Ok(Arc::new(FakeEncryptor::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fake::UNKNOWN_PLAINTEXT;

    fn config(backend: Backend) -> Config {
        Config {
            encryption_secret: "factory-secret".into(),
            backend,
            token_ttl_secs: None,
            log_level: "info".into(),
        }
    }

    #[test]
    fn fernet_backend_round_trips() {
        let svc = build(&config(Backend::Fernet)).unwrap();
        let token = svc.encrypt("wired").unwrap();
        assert_eq!(svc.decrypt(&token).unwrap(), "wired");
    }

    #[test]
    fn fernet_backend_rejects_empty_secret() {
        let mut cfg = config(Backend::Fernet);
        cfg.encryption_secret.clear();
        assert!(matches!(build(&cfg), Err(EncryptionError::MissingKey)));
    }

    #[test]
    fn fernet_backend_honours_configured_ttl() {
        let mut cfg = config(Backend::Fernet);
        cfg.token_ttl_secs = Some(3600);
        let svc = build(&cfg).unwrap();
        let token = svc.encrypt("fresh").unwrap();
        assert_eq!(svc.decrypt(&token).unwrap(), "fresh");
    }

    #[test]
    fn fake_backend_is_the_recording_double() {
        let svc = build(&config(Backend::Fake)).unwrap();
        assert_eq!(svc.decrypt("never-issued").unwrap(), UNKNOWN_PLAINTEXT);
    }

    #[test]
    fn fernet_backend_never_returns_placeholders() {
        let svc = build(&config(Backend::Fernet)).unwrap();
        assert!(svc.decrypt("never-issued").is_err());
    }
}
