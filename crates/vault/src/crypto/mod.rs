//! Cryptographic core: key derivation and the authenticated token codec.
//!
//! This module is intentionally free of configuration and backend-selection
//! dependencies. It provides the two low-level operations the service layer
//! composes: stretching a secret into a per-subject key, and encoding /
//! decoding authenticated tokens under such a key.
//!
//! # Token format
//!
//! ```text
//! base64url( version(1B, 0x80) ‖ timestamp(8B, big-endian Unix seconds)
//!            ‖ IV(16B) ‖ ciphertext(AES-128-CBC, PKCS#7) ‖ HMAC-SHA256(32B) )
//! ```
//!
//! The 32-byte key splits into a 16-byte signing subkey (first half) and a
//! 16-byte cipher subkey (second half). The version byte enables future
//! format migration without breaking existing tokens.

pub mod kdf;
pub mod token;

pub use kdf::KeyMaterial;
pub use token::{TokenCipher, KEY_LEN};
