//! Token exchange configuration.
//!
//! [`ExchangeConfig`] carries everything needed to turn a loaded key into an
//! access token: the API client identifier, the token endpoint, the
//! assertion shape and lifetime, and HTTP timeouts.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    error::{AuthError, Result},
    jwt::{DEFAULT_FULL_TTL, DEFAULT_MINIMAL_TTL, validate_ttl},
};

/// Pure1 OAuth2 token exchange endpoint.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://api.pure1.purestorage.com/oauth2/1.0/token";

/// Default request timeout (15 seconds), applied to every network call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default connection timeout (5 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Claim-set shape of the assertion sent to the exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssertionShape {
    /// `{iss, iat, exp}`.
    #[default]
    Minimal,
    /// `{iss, sub, aud, iat, exp}` with `sub = api_id` and `aud = token_endpoint`.
    Full,
}

impl AssertionShape {
    /// Lifetime used when no explicit TTL is configured.
    #[must_use]
    pub fn default_ttl(self) -> Duration {
        match self {
            Self::Minimal => DEFAULT_MINIMAL_TTL,
            Self::Full => DEFAULT_FULL_TTL,
        }
    }
}

/// Configuration for [`TokenExchangeClient`](crate::exchange::TokenExchangeClient)
/// and [`acquire_access_token`](crate::exchange::acquire_access_token).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use pure1_authn::config::{AssertionShape, ExchangeConfig};
///
/// let config = ExchangeConfig::builder()
///     .api_id("pure1:apikey:dssf2331sd")
///     .assertion_shape(AssertionShape::Full)
///     .timeout(Duration::from_secs(10))
///     .build()?;
///
/// assert_eq!(config.assertion_ttl(), Duration::from_secs(300));
/// # Ok::<(), pure1_authn::AuthError>(())
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExchangeConfig {
    /// API client application identifier (e.g. `pure1:apikey:dssf2331sd`).
    pub(crate) api_id: String,

    /// Token exchange endpoint.
    #[serde(default = "default_token_endpoint")]
    pub(crate) token_endpoint: Url,

    /// Assertion claim-set shape.
    #[serde(default)]
    pub(crate) assertion_shape: AssertionShape,

    /// Assertion lifetime; `None` uses the shape's default.
    #[serde(default, with = "humantime_serde")]
    pub(crate) assertion_ttl: Option<Duration>,

    /// Request timeout.
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub(crate) timeout: Duration,

    /// Connection timeout.
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub(crate) connect_timeout: Duration,

    /// Skip TLS certificate verification. Off by default; only for endpoints
    /// behind intercepting proxies with private CAs.
    #[serde(default)]
    pub(crate) danger_accept_invalid_certs: bool,
}

/// Parsed form of [`DEFAULT_TOKEN_ENDPOINT`].
#[must_use]
#[allow(clippy::expect_used)]
pub fn default_token_endpoint() -> Url {
    Url::parse(DEFAULT_TOKEN_ENDPOINT).expect("DEFAULT_TOKEN_ENDPOINT is a valid URL")
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

#[bon::bon]
impl ExchangeConfig {
    /// Creates a new configuration, validating all fields.
    ///
    /// # Arguments
    ///
    /// * `api_id` - API client identifier. Used as `iss` (and `sub` for the full shape).
    ///
    /// # Optional Fields
    ///
    /// * `token_endpoint` - Exchange endpoint (default: [`DEFAULT_TOKEN_ENDPOINT`]).
    /// * `assertion_shape` - Claim set (default: minimal).
    /// * `assertion_ttl` - Assertion lifetime (default: 10s minimal, 300s full).
    /// * `timeout` - Request timeout (default: 15 seconds).
    /// * `connect_timeout` - Connection timeout (default: 5 seconds).
    /// * `danger_accept_invalid_certs` - Disable certificate checks (default: false).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if:
    /// - `api_id` is empty
    /// - The endpoint is not `http` or `https`
    /// - The assertion TTL is outside 5–300 seconds
    /// - Either timeout is zero
    #[builder]
    pub fn new(
        #[builder(into)] api_id: String,
        token_endpoint: Option<Url>,
        #[builder(default)] assertion_shape: AssertionShape,
        assertion_ttl: Option<Duration>,
        #[builder(default = DEFAULT_TIMEOUT)] timeout: Duration,
        #[builder(default = DEFAULT_CONNECT_TIMEOUT)] connect_timeout: Duration,
        #[builder(default)] danger_accept_invalid_certs: bool,
    ) -> Result<Self> {
        let config = Self {
            api_id,
            token_endpoint: token_endpoint.unwrap_or_else(default_token_endpoint),
            assertion_shape,
            assertion_ttl,
            timeout,
            connect_timeout,
            danger_accept_invalid_certs,
        };
        config.validate()?;
        Ok(config)
    }

    /// Re-checks invariants, e.g. after deserialization.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.api_id.trim().is_empty() {
            return Err(AuthError::config("api_id must not be empty"));
        }
        if !matches!(self.token_endpoint.scheme(), "https" | "http") {
            return Err(AuthError::config(format!(
                "token_endpoint must be an http(s) URL, got '{}'",
                self.token_endpoint
            )));
        }
        validate_ttl(self.assertion_ttl())?;
        if self.timeout.is_zero() {
            return Err(AuthError::config("timeout must be greater than zero"));
        }
        if self.connect_timeout.is_zero() {
            return Err(AuthError::config("connect_timeout must be greater than zero"));
        }
        Ok(())
    }

    /// API client identifier.
    #[must_use]
    pub fn api_id(&self) -> &str {
        &self.api_id
    }

    /// Token exchange endpoint.
    #[must_use]
    pub fn token_endpoint(&self) -> &Url {
        &self.token_endpoint
    }

    /// Assertion claim-set shape.
    #[must_use]
    pub fn assertion_shape(&self) -> AssertionShape {
        self.assertion_shape
    }

    /// Effective assertion lifetime.
    #[must_use]
    pub fn assertion_ttl(&self) -> Duration {
        self.assertion_ttl.unwrap_or_else(|| self.assertion_shape.default_ttl())
    }

    /// Request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Connection timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Whether certificate verification is disabled.
    #[must_use]
    pub fn danger_accept_invalid_certs(&self) -> bool {
        self.danger_accept_invalid_certs
    }
}
