//! # Pure1 Authentication
//!
//! Turns a long-lived API client private key into a short-lived bearer
//! access token for the Pure1 REST API.
//!
//! This crate provides:
//! - **Key loading**: PKCS#1 (plain or OpenSSL-encrypted), PKCS#8, encrypted
//!   PKCS#8 and OpenSSH keys, with a single interactive password prompt for
//!   encrypted keys
//! - **Assertion signing**: RS256 identity assertions in minimal or full shape
//! - **Token exchange**: RFC 8693 exchange of the assertion for an access token
//!
//! ## Flow
//!
//! ```text
//! private key file ──KeyLoader──▶ SigningKey
//!                                    │
//!                         AssertionSigner (RS256, iat/exp)
//!                                    │
//!                                    ▼
//!                      TokenExchangeClient ──POST──▶ token endpoint
//!                                    │
//!                                    ▼
//!                               AccessToken
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use pure1_authn::{ExchangeConfig, KeyLoader, acquire_access_token};
//!
//! # async fn example() -> Result<(), pure1_authn::AuthError> {
//! let key = KeyLoader::terminal().load("/home/me/.ssh/pure1_rsa.pem", None)?;
//! let config = ExchangeConfig::builder().api_id("pure1:apikey:dssf2331sd").build()?;
//! let token = acquire_access_token(&config, &key).await?;
//! println!("{}", token.as_str());
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **`testutil`**: RSA key fixtures and a scripted password prompt for tests.

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Token exchange configuration.
pub mod config;
/// Authentication error types.
pub mod error;
/// Token exchange client.
pub mod exchange;
/// Identity assertion signing.
pub mod jwt;
/// Private key loading.
pub mod key;
mod legacy_pem;
/// Shared test utilities.
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
/// Algorithm validation.
pub mod validation;

// Re-export key types for convenience
pub use config::{AssertionShape, DEFAULT_TOKEN_ENDPOINT, ExchangeConfig};
pub use error::{AuthError, Result};
pub use exchange::{AccessToken, TokenExchangeClient, acquire_access_token};
pub use jwt::{AssertionClaims, AssertionSigner, ClaimSet};
pub use key::{KeyLoader, PasswordPrompt, SigningKey, TerminalPrompt};
pub use zeroize::Zeroizing;
