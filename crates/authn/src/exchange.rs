//! OAuth2 token exchange.
//!
//! Trades a signed identity assertion for a bearer access token using the
//! RFC 8693 token-exchange grant:
//!
//! ```text
//! POST /oauth2/1.0/token
//! Content-Type: application/x-www-form-urlencoded
//!
//! grant_type=urn:ietf:params:oauth:grant-type:token-exchange
//! &subject_token=<assertion>
//! &subject_token_type=urn:ietf:params:oauth:token-type:jwt
//! ```
//!
//! A successful response is JSON with an `access_token` string. Anything
//! else is an [`AuthError::ExchangeFailed`] carrying the raw body.
//!
//! There is exactly one request per exchange. Transport failures are not
//! retried.

use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::{
    config::{AssertionShape, ExchangeConfig},
    error::{AuthError, Result},
    jwt::{AssertionSigner, ClaimSet},
    key::SigningKey,
};

/// `grant_type` for RFC 8693 token exchange.
pub const TOKEN_EXCHANGE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:token-exchange";

/// `subject_token_type` for a JWT assertion.
pub const JWT_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:jwt";

/// Opaque bearer access token.
///
/// Never parsed, never cached beyond the current run. `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token value, for `Authorization: Bearer` headers or output.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the raw token.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&"<redacted>").finish()
    }
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<u64>,
}

/// Interprets a token endpoint response.
///
/// # Errors
///
/// Returns [`AuthError::ExchangeFailed`] with `body` attached if the status
/// is not a success, the body is not JSON, or `access_token` is missing or
/// empty.
pub fn parse_token_response(status: StatusCode, body: &str) -> Result<AccessToken> {
    if !status.is_success() {
        return Err(AuthError::exchange_failed(
            format!("token endpoint returned {status}"),
            Some(body.to_owned()),
        ));
    }

    let response: TokenResponse = serde_json::from_str(body).map_err(|e| {
        AuthError::exchange_failed(
            format!("response is not valid JSON: {e}"),
            Some(body.to_owned()),
        )
    })?;

    match response.access_token {
        Some(token) if !token.is_empty() => {
            tracing::debug!(
                token_type = response.token_type.as_deref().unwrap_or("unspecified"),
                expires_in = response.expires_in,
                "access token issued"
            );
            Ok(AccessToken(token))
        },
        _ => Err(AuthError::exchange_failed(
            "response has no access_token",
            Some(body.to_owned()),
        )),
    }
}

/// HTTP client for the token exchange endpoint.
#[derive(Debug, Clone)]
pub struct TokenExchangeClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl TokenExchangeClient {
    /// Builds a client with the configured timeouts.
    ///
    /// Certificate verification stays on unless
    /// `danger_accept_invalid_certs` is set, which is logged as a warning.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &ExchangeConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout());

        if config.danger_accept_invalid_certs() {
            tracing::warn!(
                endpoint = %config.token_endpoint(),
                "TLS certificate verification is disabled for the token exchange"
            );
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder
            .build()
            .map_err(|e| AuthError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, endpoint: config.token_endpoint().clone() })
    }

    /// Endpoint this client posts to.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Exchanges a signed assertion for an access token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ExchangeFailed`] on transport failure, non-success
    /// status, unparseable body, or missing `access_token`.
    #[tracing::instrument(skip(self, assertion), fields(endpoint = %self.endpoint))]
    pub async fn exchange(&self, assertion: &str) -> Result<AccessToken> {
        let form = [
            ("grant_type", TOKEN_EXCHANGE_GRANT_TYPE),
            ("subject_token", assertion),
            ("subject_token_type", JWT_TOKEN_TYPE),
        ];

        let response =
            self.http.post(self.endpoint.clone()).form(&form).send().await.map_err(|e| {
                tracing::warn!(error = %e, "token exchange request failed");
                AuthError::exchange_failed(format!("request failed: {e}"), None)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AuthError::exchange_failed(format!("failed to read response body: {e}"), None)
        })?;

        parse_token_response(status, &body).inspect_err(|e| {
            tracing::warn!(status = %status, error = %e, "token exchange rejected");
        })
    }
}

/// Signs a fresh assertion with `key` and exchanges it for an access token.
///
/// The assertion is single-use: it is created immediately before the request
/// and dropped afterwards.
///
/// # Errors
///
/// Returns [`AuthError::Config`], [`AuthError::Signing`] or
/// [`AuthError::ExchangeFailed`].
#[tracing::instrument(
    skip_all,
    fields(api_id = %config.api_id(), shape = ?config.assertion_shape())
)]
pub async fn acquire_access_token(
    config: &ExchangeConfig,
    key: &SigningKey,
) -> Result<AccessToken> {
    let client = TokenExchangeClient::new(config)?;
    let signer = AssertionSigner::new(key, config.api_id(), config.assertion_ttl())?;

    let audience = config.token_endpoint().as_str();
    let claims = match config.assertion_shape() {
        AssertionShape::Minimal => ClaimSet::Minimal,
        AssertionShape::Full => ClaimSet::Full { subject: config.api_id(), audience },
    };

    let assertion = signer.sign(claims)?;
    client.exchange(&assertion).await
}
