//! Pure1 REST API client.
//!
//! [`Pure1Client`] implements [`MetricsSource`] over HTTPS, authenticating
//! every request with the bearer [`AccessToken`] obtained from the token
//! exchange.
//!
//! ```text
//! GET {base}/arrays?limit=N[&continuation_token=...]
//! GET {base}/metrics/history?aggregation=avg&names='a','b'&resource_ids='id'
//!     &resolution=<ms>&start_time=<ms>&end_time=<ms>
//! ```
//!
//! List-valued parameters are sent as comma-joined single-quoted strings.

use std::time::Duration;

use async_trait::async_trait;
use pure1_authn::AccessToken;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use url::Url;

use crate::{
    error::{MetricsError, Result},
    source::MetricsSource,
    types::{ArrayPage, ArraySummary, MetricsHistory, MetricsHistoryQuery},
};

/// Pure1 REST API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.pure1.purestorage.com/api/1.latest";

/// Default request timeout (15 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default connection timeout (5 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of arrays requested per inventory page.
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Configuration for [`Pure1Client`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Pure1ClientConfig {
    /// API base URL.
    #[serde(default = "default_api_base_url")]
    pub(crate) base_url: Url,

    /// Request timeout.
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub(crate) timeout: Duration,

    /// Connection timeout.
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub(crate) connect_timeout: Duration,

    /// Arrays per inventory page.
    #[serde(default = "default_page_limit")]
    pub(crate) page_limit: u32,
}

/// Parsed form of [`DEFAULT_API_BASE_URL`].
#[must_use]
#[allow(clippy::expect_used)]
pub fn default_api_base_url() -> Url {
    Url::parse(DEFAULT_API_BASE_URL).expect("DEFAULT_API_BASE_URL is a valid URL")
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_page_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

impl Default for Pure1ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

#[bon::bon]
impl Pure1ClientConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Config`] if the base URL is not http(s), a
    /// timeout is zero, or `page_limit` is zero.
    #[builder]
    pub fn new(
        base_url: Option<Url>,
        #[builder(default = DEFAULT_TIMEOUT)] timeout: Duration,
        #[builder(default = DEFAULT_CONNECT_TIMEOUT)] connect_timeout: Duration,
        #[builder(default = DEFAULT_PAGE_LIMIT)] page_limit: u32,
    ) -> Result<Self> {
        let config = Self {
            base_url: base_url.unwrap_or_else(default_api_base_url),
            timeout,
            connect_timeout,
            page_limit,
        };
        config.validate()?;
        Ok(config)
    }

    /// Re-checks invariants, e.g. after deserialization.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.base_url.scheme(), "https" | "http") {
            return Err(MetricsError::config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.base_url.cannot_be_a_base() {
            return Err(MetricsError::config("base_url cannot have path segments"));
        }
        if self.timeout.is_zero() {
            return Err(MetricsError::config("timeout must be greater than zero"));
        }
        if self.connect_timeout.is_zero() {
            return Err(MetricsError::config("connect_timeout must be greater than zero"));
        }
        if self.page_limit == 0 {
            return Err(MetricsError::config("page_limit must be greater than zero"));
        }
        Ok(())
    }

    /// API base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
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

    /// Arrays per inventory page.
    #[must_use]
    pub fn page_limit(&self) -> u32 {
        self.page_limit
    }
}

/// Formats a list parameter the way the Pure1 API expects: `'a','b'`.
fn quoted_list(values: &[String]) -> String {
    values.iter().map(|v| format!("'{v}'")).collect::<Vec<_>>().join(",")
}

/// Authenticated Pure1 REST API client.
#[derive(Debug, Clone)]
pub struct Pure1Client {
    http: reqwest::Client,
    config: Pure1ClientConfig,
    token: AccessToken,
}

impl Pure1Client {
    /// Creates a client that sends `token` with every request.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Config`] if the configuration is invalid or
    /// the HTTP client cannot be built.
    pub fn new(config: Pure1ClientConfig, token: AccessToken) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()
            .map_err(|e| MetricsError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config, token })
    }

    /// Client configuration.
    #[must_use]
    pub fn config(&self) -> &Pure1ClientConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| MetricsError::config("base_url cannot have path segments"))?
            .pop_if_empty()
            .extend(path.split('/'));
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        let response = self
            .http
            .get(url)
            .bearer_auth(self.token.as_str())
            .query(query)
            .send()
            .await
            .map_err(|e| MetricsError::transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MetricsError::transport(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            tracing::warn!(path, status = status.as_u16(), "Pure1 API request rejected");
            return Err(MetricsError::http(status.as_u16(), body));
        }

        serde_json::from_str(&body).map_err(|e| MetricsError::decode(format!("{path}: {e}")))
    }
}

#[async_trait]
impl MetricsSource for Pure1Client {
    #[tracing::instrument(skip(self), fields(base_url = %self.config.base_url))]
    async fn list_arrays(&self) -> Result<Vec<ArraySummary>> {
        let mut arrays = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut query = vec![("limit", self.config.page_limit.to_string())];
            if let Some(token) = &continuation {
                query.push(("continuation_token", token.clone()));
            }

            let page: ArrayPage = self.get_json("arrays", &query).await?;
            tracing::debug!(
                page_items = page.items.len(),
                total = page.total_item_count,
                "fetched inventory page"
            );
            arrays.extend(page.items);

            match page.continuation_token {
                Some(next) if !next.is_empty() => {
                    if continuation.as_deref() == Some(next.as_str()) {
                        return Err(MetricsError::decode(
                            "arrays: continuation_token did not advance",
                        ));
                    }
                    continuation = Some(next);
                },
                _ => break,
            }
        }

        Ok(arrays)
    }

    #[tracing::instrument(skip(self, query), fields(resources = ?query.resource_ids))]
    async fn metrics_history(&self, query: &MetricsHistoryQuery) -> Result<MetricsHistory> {
        let params = [
            ("aggregation", query.aggregation.as_str().to_owned()),
            ("names", quoted_list(&query.names)),
            ("resource_ids", quoted_list(&query.resource_ids)),
            ("resolution", query.window.resolution_ms().to_string()),
            ("start_time", query.window.start_millis().to_string()),
            ("end_time", query.window.end_millis().to_string()),
        ];

        self.get_json("metrics/history", &params).await
    }
}
