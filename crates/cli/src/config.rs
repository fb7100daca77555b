//! TOML configuration file and flag overrides.
//!
//! ```toml
//! [exchange]
//! token_endpoint = "https://api.pure1.purestorage.com/oauth2/1.0/token"
//! assertion_shape = "full"
//! assertion_ttl = "60s"
//! timeout = "15s"
//!
//! [api]
//! base_url = "https://api.pure1.purestorage.com/api/1.latest"
//! page_limit = 100
//!
//! [report]
//! interval_days = 7
//! failure_policy = "isolate"
//! max_concurrency = 4
//! ```
//!
//! Every key is optional. Command-line flags override file values, which
//! override built-in defaults.

use std::{path::Path, time::Duration};

use anyhow::Context;
use pure1_authn::{AssertionShape, ExchangeConfig};
use pure1_metrics::{MetricsFailurePolicy, Pure1ClientConfig, ReportConfig, UnitDivisors};
use serde::Deserialize;
use url::Url;

use crate::args::{CommonArgs, FleetArgs};

/// Contents of a `--config` file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Token exchange settings.
    #[serde(default)]
    pub exchange: ExchangeSection,
    /// REST API client settings.
    #[serde(default)]
    pub api: ApiSection,
    /// Fleet report settings.
    #[serde(default)]
    pub report: ReportSection,
}

/// `[exchange]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExchangeSection {
    pub token_endpoint: Option<Url>,
    pub assertion_shape: Option<AssertionShape>,
    #[serde(default, with = "humantime_serde")]
    pub assertion_ttl: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub connect_timeout: Option<Duration>,
    pub danger_accept_invalid_certs: Option<bool>,
}

/// `[api]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiSection {
    pub base_url: Option<Url>,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub connect_timeout: Option<Duration>,
    pub page_limit: Option<u32>,
}

/// `[report]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportSection {
    pub interval_days: Option<u32>,
    pub units: Option<UnitDivisors>,
    pub failure_policy: Option<MetricsFailurePolicy>,
    pub max_concurrency: Option<usize>,
}

impl FileConfig {
    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Fails on malformed TOML, unknown keys or invalid values.
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid configuration file")
    }

    /// Reads `path`, or returns the empty configuration when `path` is `None`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Token exchange configuration for `args`.
    ///
    /// `--full-assertion` forces the full shape; otherwise the file decides.
    ///
    /// # Errors
    ///
    /// Fails if the merged values do not validate.
    pub fn exchange_config(
        &self,
        args: &CommonArgs,
        full_assertion: bool,
    ) -> anyhow::Result<ExchangeConfig> {
        let section = &self.exchange;
        let shape =
            if full_assertion { Some(AssertionShape::Full) } else { section.assertion_shape };

        let config = ExchangeConfig::builder()
            .api_id(args.api_id.as_str())
            .maybe_token_endpoint(args.token_url.clone().or_else(|| section.token_endpoint.clone()))
            .maybe_assertion_shape(shape)
            .maybe_assertion_ttl(section.assertion_ttl)
            .maybe_timeout(args.timeout.or(section.timeout))
            .maybe_connect_timeout(section.connect_timeout)
            .maybe_danger_accept_invalid_certs(section.danger_accept_invalid_certs)
            .build()?;
        Ok(config)
    }

    /// REST API client configuration for `args`.
    ///
    /// # Errors
    ///
    /// Fails if the merged values do not validate.
    pub fn client_config(&self, args: &FleetArgs) -> anyhow::Result<Pure1ClientConfig> {
        let section = &self.api;
        let config = Pure1ClientConfig::builder()
            .maybe_base_url(args.api_url.clone().or_else(|| section.base_url.clone()))
            .maybe_timeout(args.common.timeout.or(section.timeout))
            .maybe_connect_timeout(section.connect_timeout)
            .maybe_page_limit(section.page_limit)
            .build()?;
        Ok(config)
    }

    /// Fleet report configuration for `args`.
    ///
    /// `--fail-fast` forces [`MetricsFailurePolicy::Abort`].
    ///
    /// # Errors
    ///
    /// Fails if the merged values do not validate.
    pub fn report_config(&self, args: &FleetArgs) -> anyhow::Result<ReportConfig> {
        let section = &self.report;
        let policy =
            if args.fail_fast { Some(MetricsFailurePolicy::Abort) } else { section.failure_policy };

        let config = ReportConfig::builder()
            .maybe_interval_days(args.interval_days.or(section.interval_days))
            .maybe_units(section.units)
            .maybe_failure_policy(policy)
            .maybe_max_concurrency(args.concurrency.or(section.max_concurrency))
            .build()?;
        Ok(config)
    }
}
