//! Authentication error types.
//!
//! This module defines the errors that can occur while loading a private key,
//! signing an identity assertion, and exchanging it for an access token.
//!
//! Every variant is terminal for the current run: the token acquisition flow
//! has no retry policy beyond the single password prompt in
//! [`KeyLoader`](crate::key::KeyLoader).

use std::{io, path::PathBuf};

use thiserror::Error;

/// Authentication errors.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`; new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    // ========== Key loading ==========
    /// The private key path does not resolve to a readable file.
    #[error("Could not find private key file: {}", path.display())]
    KeyNotFound {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// Decryption failed with the supplied (or prompted) password.
    #[error("Invalid private key password")]
    InvalidPassword,

    /// The key file is readable but does not hold a supported RSA private key.
    #[error("Unsupported private key format: {0}")]
    KeyFormat(String),

    /// Reading the password from the terminal failed.
    #[error("Failed to read private key password: {0}")]
    PasswordPrompt(String),

    // ========== Assertion signing ==========
    /// Signing the identity assertion failed.
    #[error("Failed to sign identity assertion: {0}")]
    Signing(String),

    /// A signed assertion could not be decoded.
    #[error("Invalid assertion: {0}")]
    InvalidAssertion(String),

    /// Assertion signature did not verify against the public key.
    #[error("Invalid assertion signature")]
    InvalidSignature,

    /// Assertion `exp` claim is in the past.
    #[error("Assertion expired")]
    AssertionExpired,

    /// Algorithm not in the accepted list.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    // ========== Token exchange ==========
    /// The token exchange did not yield an access token.
    ///
    /// The raw response body is kept whenever one was received.
    #[error("Failed to get proper access token: {reason}{}", body_suffix(.body))]
    ExchangeFailed {
        /// What went wrong.
        reason: String,
        /// Raw response body, if the endpoint answered.
        body: Option<String>,
    },

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),
}

fn body_suffix(body: &Option<String>) -> String {
    match body {
        Some(body) => format!("; response body: {}", body.trim()),
        None => String::new(),
    }
}

impl AuthError {
    /// Creates a [`AuthError::KeyNotFound`] error.
    pub fn key_not_found(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::KeyNotFound { path: path.into(), source }
    }

    /// Creates a [`AuthError::KeyFormat`] error.
    pub fn key_format(message: impl Into<String>) -> Self {
        Self::KeyFormat(message.into())
    }

    /// Creates a [`AuthError::Signing`] error.
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing(message.into())
    }

    /// Creates a [`AuthError::InvalidAssertion`] error.
    pub fn invalid_assertion(message: impl Into<String>) -> Self {
        Self::InvalidAssertion(message.into())
    }

    /// Creates a [`AuthError::ExchangeFailed`] error.
    pub fn exchange_failed(reason: impl Into<String>, body: Option<String>) -> Self {
        Self::ExchangeFailed { reason: reason.into(), body }
    }

    /// Creates a [`AuthError::Config`] error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns the raw exchange response body carried by this error, if any.
    #[must_use]
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::ExchangeFailed { body, .. } => body.as_deref(),
            _ => None,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidToken => AuthError::invalid_assertion("Invalid JWT structure"),
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::ExpiredSignature => AuthError::AssertionExpired,
            ErrorKind::InvalidAlgorithm => {
                AuthError::UnsupportedAlgorithm("Algorithm not supported".into())
            },
            ErrorKind::InvalidRsaKey(msg) => {
                AuthError::key_format(format!("Invalid RSA key: {msg}"))
            },
            _ => AuthError::invalid_assertion(format!("JWT error: {}", err)),
        }
    }
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;
