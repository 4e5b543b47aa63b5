//! Capability interface and error types shared across `vault` crates.

pub mod error;
pub mod interface;

pub use error::EncryptionError;
pub use interface::Encryptor;
