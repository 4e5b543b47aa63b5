//! Versioned, authenticated token encoding and decoding.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use thiserror::Error;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type HmacSha256 = Hmac<Sha256>;

/// Byte length of a full codec key (signing subkey + cipher subkey).
pub const KEY_LEN: usize = 32;

/// Byte length of each subkey split out of the full key.
const SUBKEY_LEN: usize = 16;

/// Byte length of the per-token initialization vector.
pub const IV_LEN: usize = 16;

/// AES block length; ciphertext is always a multiple of this.
const BLOCK_LEN: usize = 16;

/// Byte length of the big-endian Unix timestamp field.
const TIMESTAMP_LEN: usize = 8;

/// Byte length of the trailing HMAC-SHA256 field.
const MAC_LEN: usize = 32;

/// Version byte at the start of every token.
pub const VERSION: u8 = 0x80;

/// Smallest well-formed token body: header (version + timestamp + IV)
/// plus the trailing MAC. Anything shorter is rejected before any
/// cryptographic work.
const MIN_TOKEN_LEN: usize = 1 + TIMESTAMP_LEN + IV_LEN + MAC_LEN;

/// Errors produced by the token codec.
///
/// These stay internal to the crate: the service layer collapses every
/// variant into the opaque public error before a caller can see which
/// check failed.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The key string does not decode to exactly [`KEY_LEN`] bytes.
    #[error("key must be URL-safe base64 of exactly {KEY_LEN} bytes")]
    InvalidKey,

    /// The token is not valid base64, is truncated, or its ciphertext is
    /// empty or not block-aligned.
    #[error("token is not valid base64 or is truncated")]
    Malformed,

    /// The recomputed MAC does not match the received one. Covers both
    /// tampering and wrong-key use.
    #[error("token MAC does not verify")]
    InvalidSignature,

    /// The version byte is not [`VERSION`].
    #[error("unsupported token version")]
    UnsupportedVersion,

    /// The decrypted payload has malformed padding.
    #[error("decrypted payload has malformed padding")]
    InvalidPadding,

    /// The token is older than the accepted window.
    #[error("token is older than the accepted window")]
    Expired,
}

/// Authenticated token codec over a 32-byte key.
///
/// The key splits into two halves: the first 16 bytes authenticate
/// (HMAC-SHA256), the last 16 bytes encrypt (AES-128-CBC). A token is
/// valid under exactly one key; decoding under any other key fails with
/// [`TokenError::InvalidSignature`].
///
/// # Token format
///
/// ```text
/// base64url( version(1B) ‖ timestamp(8B BE) ‖ IV(16B) ‖ ciphertext ‖ MAC(32B) )
/// ```
///
/// The MAC covers every byte that precedes it. Tokens are self-contained:
/// decoding needs the key and nothing else.
pub struct TokenCipher {
    signing_key: [u8; SUBKEY_LEN],
    cipher_key: [u8; SUBKEY_LEN],
}

impl Drop for TokenCipher {
    fn drop(&mut self) {
        // Zero both subkeys on drop.
        self.signing_key.iter_mut().for_each(|b| *b = 0);
        self.cipher_key.iter_mut().for_each(|b| *b = 0);
    }
}

impl fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material — not even in debug builds.
        f.write_str("TokenCipher([REDACTED])")
    }
}

impl TokenCipher {
    /// Build a codec from the URL-safe base64 encoding of [`KEY_LEN`] raw
    /// key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidKey`] if the string does not decode or
    /// decodes to the wrong length.
    pub fn new(key_b64: &str) -> Result<Self, TokenError> {
        let mut raw = URL_SAFE.decode(key_b64).map_err(|_| TokenError::InvalidKey)?;
        if raw.len() != KEY_LEN {
            raw.iter_mut().for_each(|b| *b = 0);
            return Err(TokenError::InvalidKey);
        }
        let mut signing_key = [0u8; SUBKEY_LEN];
        let mut cipher_key = [0u8; SUBKEY_LEN];
        signing_key.copy_from_slice(&raw[..SUBKEY_LEN]);
        cipher_key.copy_from_slice(&raw[SUBKEY_LEN..]);
        raw.iter_mut().for_each(|b| *b = 0);
        Ok(Self {
            signing_key,
            cipher_key,
        })
    }

    /// Encrypt `plaintext` into a token.
    ///
    /// A fresh 16-byte IV is drawn from the OS CSPRNG on every call, so
    /// encrypting the same plaintext twice yields two distinct tokens that
    /// decode to the same bytes. Empty plaintext is valid and pads to one
    /// full block.
    pub fn encode(&self, plaintext: &[u8]) -> String {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);
        self.encode_at(plaintext, unix_now(), iv)
    }

    fn encode_at(&self, plaintext: &[u8], timestamp: u64, iv: [u8; IV_LEN]) -> String {
        let ciphertext = Aes128CbcEnc::new(&self.cipher_key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut payload = Vec::with_capacity(MIN_TOKEN_LEN + ciphertext.len());
        payload.push(VERSION);
        payload.extend_from_slice(&timestamp.to_be_bytes());
        payload.extend_from_slice(&iv);
        payload.extend_from_slice(&ciphertext);

        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .expect("HMAC accepts keys of any length");
        mac.update(&payload);
        payload.extend_from_slice(&mac.finalize().into_bytes());

        URL_SAFE.encode(payload)
    }

    /// Decode and verify a token, returning the plaintext bytes.
    ///
    /// # Errors
    ///
    /// Fails closed on the first check that rejects: base64/length
    /// ([`TokenError::Malformed`]), MAC ([`TokenError::InvalidSignature`]),
    /// version ([`TokenError::UnsupportedVersion`]), padding
    /// ([`TokenError::InvalidPadding`]).
    pub fn decode(&self, token: &str) -> Result<Vec<u8>, TokenError> {
        self.decode_at(token, None, unix_now())
    }

    /// Like [`TokenCipher::decode`], additionally rejecting tokens whose
    /// embedded timestamp is more than `ttl` in the past.
    pub fn decode_with_ttl(&self, token: &str, ttl: Duration) -> Result<Vec<u8>, TokenError> {
        self.decode_at(token, Some(ttl), unix_now())
    }

    fn decode_at(
        &self,
        token: &str,
        ttl: Option<Duration>,
        now: u64,
    ) -> Result<Vec<u8>, TokenError> {
        let data = URL_SAFE.decode(token).map_err(|_| TokenError::Malformed)?;
        if data.len() < MIN_TOKEN_LEN {
            return Err(TokenError::Malformed);
        }

        let (signed, received_mac) = data.split_at(data.len() - MAC_LEN);

        // MAC first, in constant time. Nothing below this point runs on
        // unauthenticated input.
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .expect("HMAC accepts keys of any length");
        mac.update(signed);
        mac.verify_slice(received_mac)
            .map_err(|_| TokenError::InvalidSignature)?;

        if signed[0] != VERSION {
            return Err(TokenError::UnsupportedVersion);
        }

        if let Some(ttl) = ttl {
            let mut ts_bytes = [0u8; TIMESTAMP_LEN];
            ts_bytes.copy_from_slice(&signed[1..1 + TIMESTAMP_LEN]);
            let timestamp = u64::from_be_bytes(ts_bytes);
            if now.saturating_sub(timestamp) > ttl.as_secs() {
                return Err(TokenError::Expired);
            }
        }

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&signed[1 + TIMESTAMP_LEN..1 + TIMESTAMP_LEN + IV_LEN]);
        let ciphertext = &signed[1 + TIMESTAMP_LEN + IV_LEN..];
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
            return Err(TokenError::Malformed);
        }

        Aes128CbcDec::new(&self.cipher_key.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| TokenError::InvalidPadding)
    }
}

/// Generate a fresh random key in the codec's base64 key format.
///
/// Intended for provisioning fixed-mode secrets and for tests.
pub fn generate_key() -> String {
    let mut key = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut key);
    URL_SAFE.encode(key)
}

fn unix_now() -> u64 {
    // A clock before the epoch degrades to timestamp 0 rather than panicking;
    // the timestamp only gates the optional TTL check.
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> TokenCipher {
        TokenCipher::new(&generate_key()).unwrap()
    }

    #[test]
    fn encode_decode_round_trip() {
        let c = cipher();
        let token = c.encode(b"super-secret");
        assert_eq!(c.decode(&token).unwrap(), b"super-secret");
    }

    #[test]
    fn empty_plaintext_round_trips() {
        let c = cipher();
        let token = c.encode(b"");
        assert_eq!(c.decode(&token).unwrap(), b"");
    }

    #[test]
    fn multi_block_plaintext_round_trips() {
        let c = cipher();
        let plaintext = vec![0xABu8; 10_000];
        let token = c.encode(&plaintext);
        assert_eq!(c.decode(&token).unwrap(), plaintext);
    }

    #[test]
    fn same_plaintext_yields_distinct_tokens() {
        let c = cipher();
        let t1 = c.encode(b"repeat");
        let t2 = c.encode(b"repeat");
        assert_ne!(t1, t2);
        assert_eq!(c.decode(&t1).unwrap(), b"repeat");
        assert_eq!(c.decode(&t2).unwrap(), b"repeat");
    }

    #[test]
    fn encode_is_deterministic_given_iv_and_timestamp() {
        let c = cipher();
        let iv = [7u8; IV_LEN];
        let t1 = c.encode_at(b"fixed", 1_700_000_000, iv);
        let t2 = c.encode_at(b"fixed", 1_700_000_000, iv);
        assert_eq!(t1, t2);
        let t3 = c.encode_at(b"fixed", 1_700_000_000, [8u8; IV_LEN]);
        assert_ne!(t1, t3);
    }

    #[test]
    fn wrong_key_fails_with_signature_error() {
        let c1 = cipher();
        let c2 = cipher();
        let token = c1.encode(b"secret");
        assert!(matches!(
            c2.decode(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn any_flipped_byte_is_rejected() {
        let c = cipher();
        let token = c.encode(b"tamper target");
        let raw = URL_SAFE.decode(&token).unwrap();
        // One offset inside each field: version, timestamp, IV, ciphertext, MAC.
        let ct_start = 1 + TIMESTAMP_LEN + IV_LEN;
        for idx in [0, 4, 10, ct_start, raw.len() - 1] {
            let mut bent = raw.clone();
            bent[idx] ^= 0x01;
            let bent_token = URL_SAFE.encode(&bent);
            assert!(
                c.decode(&bent_token).is_err(),
                "flipping byte {idx} was silently accepted"
            );
        }
    }

    #[test]
    fn garbage_input_is_malformed() {
        let c = cipher();
        assert!(matches!(c.decode("invalid-data"), Err(TokenError::Malformed)));
        assert!(matches!(c.decode(""), Err(TokenError::Malformed)));
    }

    #[test]
    fn truncated_token_is_malformed() {
        let c = cipher();
        let short = URL_SAFE.encode([0u8; MIN_TOKEN_LEN - 1]);
        assert!(matches!(c.decode(&short), Err(TokenError::Malformed)));
    }

    #[test]
    fn misaligned_ciphertext_is_malformed() {
        let c = cipher();
        // Valid MAC over a payload whose ciphertext section is 5 bytes.
        let mut payload = vec![VERSION];
        payload.extend_from_slice(&0u64.to_be_bytes());
        payload.extend_from_slice(&[0u8; IV_LEN]);
        payload.extend_from_slice(&[1, 2, 3, 4, 5]);
        let mut mac = HmacSha256::new_from_slice(&c.signing_key).unwrap();
        mac.update(&payload);
        payload.extend_from_slice(&mac.finalize().into_bytes());
        let token = URL_SAFE.encode(payload);
        assert!(matches!(c.decode(&token), Err(TokenError::Malformed)));
    }

    #[test]
    fn unknown_version_is_rejected_after_mac() {
        let c = cipher();
        // Re-sign a payload carrying a bad version byte so the MAC passes
        // and the version check is what rejects it.
        let token = c.encode(b"versioned");
        let mut raw = URL_SAFE.decode(&token).unwrap();
        raw.truncate(raw.len() - MAC_LEN);
        raw[0] = 0x81;
        let mut mac = HmacSha256::new_from_slice(&c.signing_key).unwrap();
        mac.update(&raw);
        raw.extend_from_slice(&mac.finalize().into_bytes());
        let bent_token = URL_SAFE.encode(raw);
        assert!(matches!(
            c.decode(&bent_token),
            Err(TokenError::UnsupportedVersion)
        ));
    }

    #[test]
    fn stale_token_is_rejected_only_when_ttl_is_set() {
        let c = cipher();
        let iv = [3u8; IV_LEN];
        let minted_at = 1_000;
        let token = c.encode_at(b"ages", minted_at, iv);

        // 100 seconds later with a 60 second window.
        let result = c.decode_at(&token, Some(Duration::from_secs(60)), minted_at + 100);
        assert!(matches!(result, Err(TokenError::Expired)));

        // Same moment, but inside the window.
        let ok = c.decode_at(&token, Some(Duration::from_secs(600)), minted_at + 100);
        assert_eq!(ok.unwrap(), b"ages");

        // No TTL: age never matters.
        let ok = c.decode_at(&token, None, minted_at + 1_000_000);
        assert_eq!(ok.unwrap(), b"ages");
    }

    #[test]
    fn token_is_url_safe_base64() {
        let c = cipher();
        let token = c.encode(&[0xFFu8; 64]);
        assert!(token
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '=')));
    }

    #[test]
    fn rejects_wrong_length_key() {
        let short = URL_SAFE.encode([0u8; 16]);
        assert!(matches!(
            TokenCipher::new(&short),
            Err(TokenError::InvalidKey)
        ));
        assert!(matches!(
            TokenCipher::new("not base64 at all!"),
            Err(TokenError::InvalidKey)
        ));
    }

    #[test]
    fn generated_keys_are_distinct_and_well_formed() {
        let k1 = generate_key();
        let k2 = generate_key();
        assert_ne!(k1, k2);
        assert!(TokenCipher::new(&k1).is_ok());
    }

    #[test]
    fn debug_is_redacted() {
        let c = cipher();
        assert!(format!("{c:?}").contains("REDACTED"));
    }
}
