//! Shared test utilities for authentication testing.
//!
//! Provides checked-in RSA key fixtures, a scripted [`PasswordPrompt`], and
//! a helper for crafting raw JWT strings. Feature-gated behind `testutil`
//! so nothing here leaks into production builds.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! pure1-authn = { path = "../authn", features = ["testutil"] }
//! ```
//!
//! The fixtures are one 2048-bit RSA key in several encodings. The
//! encrypted variants use [`ENCRYPTED_KEY_PASSWORD`].

use std::{collections::VecDeque, path::PathBuf};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use parking_lot::Mutex;
use zeroize::Zeroizing;

use crate::{
    error::{AuthError, Result},
    key::PasswordPrompt,
};

/// Password protecting the encrypted fixtures.
pub const ENCRYPTED_KEY_PASSWORD: &str = "correct-horse";

/// Fixture key as PKCS#1 (`RSA PRIVATE KEY`).
pub const RSA_PKCS1_PEM: &str = include_str!("../testdata/rsa_pkcs1.pem");

/// Fixture key as PKCS#8 (`PRIVATE KEY`).
pub const RSA_PKCS8_PEM: &str = include_str!("../testdata/rsa_pkcs8.pem");

/// Fixture key as PBES2-encrypted PKCS#8 (`ENCRYPTED PRIVATE KEY`).
pub const RSA_ENCRYPTED_PKCS8_PEM: &str = include_str!("../testdata/rsa_encrypted.pem");

/// Fixture key as legacy OpenSSL-encrypted PKCS#1.
pub const RSA_LEGACY_ENCRYPTED_PEM: &str = include_str!("../testdata/rsa_legacy_encrypted.pem");

/// Fixture key in OpenSSH format (`OPENSSH PRIVATE KEY`).
pub const RSA_OPENSSH_KEY: &str = include_str!("../testdata/rsa_openssh.key");

/// Fixture key in OpenSSH format, bcrypt-encrypted.
pub const RSA_OPENSSH_ENCRYPTED_KEY: &str = include_str!("../testdata/rsa_openssh_encrypted.key");

/// Public half of the fixture key (`PUBLIC KEY`, SPKI).
pub const RSA_PUBLIC_PEM: &str = include_str!("../testdata/rsa_public.pem");

/// Absolute path of a file under this crate's `testdata/` directory.
#[must_use]
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name)
}

/// [`PasswordPrompt`] that replays canned answers and counts calls.
///
/// When the answers run out, further prompts fail with
/// [`AuthError::PasswordPrompt`], like a closed terminal.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<String>>,
    messages: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    /// Creates a prompt answering with `answers` in order.
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Number of times a password was requested.
    pub fn calls(&self) -> usize {
        self.messages.lock().len()
    }

    /// Prompt messages shown, in order.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl PasswordPrompt for ScriptedPrompt {
    fn prompt_password(&self, message: &str) -> Result<Zeroizing<String>> {
        self.messages.lock().push(message.to_owned());
        self.answers
            .lock()
            .pop_front()
            .map(Zeroizing::new)
            .ok_or_else(|| AuthError::PasswordPrompt("no terminal input available".into()))
    }
}

/// Creates a raw JWT string from arbitrary header and payload JSON.
///
/// The resulting JWT has the structure `{header_b64}.{payload_b64}.`
/// with an empty signature, for testing rejection of forged assertions.
///
/// # Panics
///
/// Panics if JSON serialization fails.
#[allow(clippy::expect_used)]
pub fn craft_raw_jwt(header_json: &serde_json::Value, payload_json: &serde_json::Value) -> String {
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header_json).expect("header json"));
    let payload_b64 =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload_json).expect("payload json"));
    format!("{header_b64}.{payload_b64}.")
}

/// Asserts that a [`Result<T, AuthError>`] is an `Err` matching the given [`AuthError`] variant.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use pure1_authn::assert_auth_error;
/// use pure1_authn::error::AuthError;
///
/// let result: Result<(), AuthError> = Err(AuthError::InvalidPassword);
/// assert_auth_error!(result, InvalidPassword);
/// ```
#[macro_export]
macro_rules! assert_auth_error {
    ($result:expr, $variant:ident) => {
        assert!(
            matches!($result, Err($crate::error::AuthError::$variant { .. })),
            "expected AuthError::{}, got: {:?}",
            stringify!($variant),
            $result,
        );
    };
    ($result:expr, $variant:ident, $msg:expr) => {
        assert!(
            matches!($result, Err($crate::error::AuthError::$variant { .. })),
            "{}: expected AuthError::{}, got: {:?}",
            $msg,
            stringify!($variant),
            $result,
        );
    };
}
