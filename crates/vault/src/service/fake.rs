//! In-memory recording fake for interaction tests.
//!
//! No cryptography happens here: issued tokens are sequence-numbered
//! placeholders, and every call is recorded for later inspection. The fake
//! satisfies the same [`Encryptor`] contract as the production backend so
//! application code under test cannot tell them apart, but it has no
//! security properties and the factory never builds it from a production
//! configuration.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use common::{EncryptionError, Encryptor};

/// Placeholder returned when asked to decrypt a token the fake never issued.
pub const UNKNOWN_PLAINTEXT: &str = "<unknown>";

/// One recorded call: method name plus its string arguments, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub args: Vec<String>,
}

#[derive(Default)]
struct FakeState {
    issued: HashMap<String, String>,
    calls: Vec<RecordedCall>,
    counter: u64,
}

/// [`Encryptor`] test double with spy behaviour.
///
/// Interior mutability sits behind a `Mutex` so the `&self` trait contract
/// holds and the fake can be shared across threads in tests.
#[derive(Default)]
pub struct FakeEncryptor {
    state: Mutex<FakeState>,
}

impl FakeEncryptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if `method` was called with exactly `args`.
    pub fn called_with(&self, method: &str, args: &[&str]) -> bool {
        self.lock()
            .calls
            .iter()
            .any(|call| call.method == method && call.args == args)
    }

    /// Snapshot of all recorded calls, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Clear the recorded call history. Issued tokens are kept.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        // A panic mid-call cannot corrupt a HashMap of strings; recover
        // rather than poisoning every later assertion in the test.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn issue(&self, state: &mut FakeState, token: String, plaintext: &str) -> String {
        state.counter += 1;
        state.issued.insert(token.clone(), plaintext.to_owned());
        token
    }
}

impl Encryptor for FakeEncryptor {
    fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        let mut state = self.lock();
        state.calls.push(RecordedCall {
            method: "encrypt",
            args: vec![plaintext.to_owned()],
        });
        let token = format!("enc-{}", state.counter);
        Ok(self.issue(&mut state, token, plaintext))
    }

    fn decrypt(&self, token: &str) -> Result<String, EncryptionError> {
        let mut state = self.lock();
        state.calls.push(RecordedCall {
            method: "decrypt",
            args: vec![token.to_owned()],
        });
        Ok(state
            .issued
            .get(token)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_PLAINTEXT.to_owned()))
    }

    fn encrypt_for_subject(
        &self,
        plaintext: &str,
        salt_b64: &str,
    ) -> Result<String, EncryptionError> {
        let mut state = self.lock();
        state.calls.push(RecordedCall {
            method: "encrypt_for_subject",
            args: vec![plaintext.to_owned(), salt_b64.to_owned()],
        });
        let token = format!("subjectenc-{}-{}", salt_b64, state.counter);
        Ok(self.issue(&mut state, token, plaintext))
    }

    fn decrypt_for_subject(
        &self,
        token: &str,
        salt_b64: &str,
    ) -> Result<String, EncryptionError> {
        let mut state = self.lock();
        state.calls.push(RecordedCall {
            method: "decrypt_for_subject",
            args: vec![token.to_owned(), salt_b64.to_owned()],
        });
        Ok(state
            .issued
            .get(token)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_PLAINTEXT.to_owned()))
    }
}
