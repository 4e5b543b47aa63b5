//! Subject-scoped string encryption service.
//!
//! Two modes over one long-term secret:
//!
//! - **fixed-key** — every call uses a key derived directly from the
//!   service-wide secret;
//! - **per-subject** — each call derives a unique key from the secret plus a
//!   caller-supplied salt, so tokens for one subject are useless for any
//!   other.
//!
//! Tokens are versioned, authenticated, and self-contained:
//!
//! ```text
//! base64url( version ‖ timestamp ‖ IV ‖ ciphertext ‖ MAC )
//! ```
//!
//! Callers depend on the [`common::Encryptor`] trait and obtain a backend
//! through [`service::build`], which selects the production implementation
//! or the recording test fake from [`config::Config`] — once, at startup.
//!
//! ```no_run
//! use common::Encryptor;
//!
//! # fn main() -> anyhow::Result<()> {
//! let cfg = vault::config::Config::from_env()?;
//! vault::telemetry::init_logging(&cfg.log_level)?;
//! let encryptor = vault::service::build(&cfg)?;
//!
//! let token = encryptor.encrypt("super-secret")?;
//! assert_eq!(encryptor.decrypt(&token)?, "super-secret");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crypto;
pub mod service;
pub mod telemetry;

pub use config::Config;
pub use service::{build, FakeEncryptor, FernetEncryptor};
