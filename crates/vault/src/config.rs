//! Configuration loading and validation for the encryption service.
//!
//! All values are read from environment variables at startup. Construction
//! fails with a clear error message if the secret is missing, so
//! misconfiguration surfaces immediately rather than on first use.

use std::fmt;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Which [`Encryptor`](common::Encryptor) implementation the factory builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Real cryptographic backend.
    Fernet,
    /// Recording in-memory fake. Test environments only.
    Fake,
}

/// Validated service configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Long-term encryption secret. **Required.** Never logged.
    pub encryption_secret: String,

    /// Backend selection: `fernet` or `fake`.
    #[serde(default = "default_backend")]
    pub backend: Backend,

    /// Maximum accepted token age in seconds. Absent means tokens never
    /// expire.
    #[serde(default)]
    pub token_ttl_secs: Option<u64>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_backend() -> Backend {
    Backend::Fernet
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is absent or cannot be
    /// parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first
    /// failure.
    fn validate(&self) -> Result<()> {
        if self.encryption_secret.is_empty() {
            anyhow::bail!("ENCRYPTION_SECRET is required and must not be empty");
        }
        if self.token_ttl_secs == Some(0) {
            anyhow::bail!("TOKEN_TTL_SECS must be > 0 when set");
        }
        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The secret never appears in logs, even via {:?}.
        f.debug_struct("Config")
            .field("encryption_secret", &"[REDACTED]")
            .field("backend", &self.backend)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("log_level", &self.log_level)
            .finish()
    }
}
