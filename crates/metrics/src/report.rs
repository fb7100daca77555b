//! Fleet reporting.
//!
//! [`FleetReporter`] lists the inventory, queries each array's metrics over
//! one shared window, reduces them, and assembles one [`ReportRow`] per
//! array in inventory order.
//!
//! ```text
//! list_arrays ──▶ [array₁, array₂, …]
//!                     │ buffered(max_concurrency)
//!                     ▼
//!         metrics_history ──▶ reduce_metrics ──▶ ReportRow
//! ```

use chrono::Utc;
use futures::{StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};

use crate::{
    error::{MetricsError, Result},
    reduce::{ArrayMetrics, UnitDivisors, expected_metric_names, reduce_metrics},
    source::MetricsSource,
    types::{ArraySummary, MetricsHistoryQuery},
    window::{DEFAULT_INTERVAL_DAYS, MetricsWindow},
};

/// Default number of concurrent metrics queries.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// What a failed per-array metrics query does to the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsFailurePolicy {
    /// Log the failure, zero-fill the row and record the error on it.
    #[default]
    Isolate,
    /// Abort the whole report with [`MetricsError::MetricsQueryFailed`].
    Abort,
}

/// Fleet report settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// Window length in days.
    #[serde(default = "default_interval_days")]
    pub(crate) interval_days: u32,

    /// Byte divisors for TB/GB fields.
    #[serde(default)]
    pub(crate) units: UnitDivisors,

    /// Handling of per-array query failures.
    #[serde(default)]
    pub(crate) failure_policy: MetricsFailurePolicy,

    /// Upper bound on in-flight metrics queries.
    #[serde(default = "default_max_concurrency")]
    pub(crate) max_concurrency: usize,
}

fn default_interval_days() -> u32 {
    DEFAULT_INTERVAL_DAYS
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            interval_days: DEFAULT_INTERVAL_DAYS,
            units: UnitDivisors::default(),
            failure_policy: MetricsFailurePolicy::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

#[bon::bon]
impl ReportConfig {
    /// Creates a validated report configuration.
    ///
    /// # Optional Fields
    ///
    /// * `interval_days` - Window length (default: 7).
    /// * `units` - Byte divisors (default: binary TB/GB).
    /// * `failure_policy` - Per-array failure handling (default: isolate).
    /// * `max_concurrency` - In-flight queries (default: 4).
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Config`] if `interval_days` or
    /// `max_concurrency` is zero, or a divisor is not positive.
    #[builder]
    pub fn new(
        #[builder(default = DEFAULT_INTERVAL_DAYS)] interval_days: u32,
        #[builder(default)] units: UnitDivisors,
        #[builder(default)] failure_policy: MetricsFailurePolicy,
        #[builder(default = DEFAULT_MAX_CONCURRENCY)] max_concurrency: usize,
    ) -> Result<Self> {
        let config = Self { interval_days, units, failure_policy, max_concurrency };
        config.validate()?;
        Ok(config)
    }

    /// Re-checks invariants, e.g. after deserialization.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.interval_days == 0 {
            return Err(MetricsError::config("interval_days must be at least 1"));
        }
        if self.max_concurrency == 0 {
            return Err(MetricsError::config("max_concurrency must be at least 1"));
        }
        self.units.validate()
    }

    /// Window length in days.
    #[must_use]
    pub fn interval_days(&self) -> u32 {
        self.interval_days
    }

    /// Byte divisors.
    #[must_use]
    pub fn units(&self) -> &UnitDivisors {
        &self.units
    }

    /// Per-array failure handling.
    #[must_use]
    pub fn failure_policy(&self) -> MetricsFailurePolicy {
        self.failure_policy
    }

    /// Upper bound on in-flight metrics queries.
    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }
}

/// One array's line in a fleet report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    /// Resource identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Hardware model.
    pub model: String,
    /// OS/firmware version.
    pub version: String,
    /// Reduced metrics; all zero when the query failed.
    #[serde(flatten)]
    pub metrics: ArrayMetrics,
    /// Query failure recorded under [`MetricsFailurePolicy::Isolate`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReportRow {
    fn new(array: ArraySummary, metrics: ArrayMetrics, error: Option<String>) -> Self {
        Self {
            id: array.id,
            name: array.name,
            model: array.model,
            version: array.version,
            metrics,
            error,
        }
    }
}

/// Result of one reporting run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetReport {
    /// Window every row covers.
    pub window: MetricsWindow,
    /// One row per array, in inventory order.
    pub rows: Vec<ReportRow>,
}

impl FleetReport {
    /// Rows whose metrics query failed.
    pub fn failed_rows(&self) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().filter(|row| row.error.is_some())
    }
}

/// Builds fleet reports from a [`MetricsSource`].
#[derive(Debug, Clone)]
pub struct FleetReporter<S> {
    source: S,
    config: ReportConfig,
}

impl<S: MetricsSource> FleetReporter<S> {
    /// Creates a reporter.
    pub fn new(source: S, config: ReportConfig) -> Self {
        Self { source, config }
    }

    /// Underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Report settings.
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Builds a report for the window ending now.
    ///
    /// # Errors
    ///
    /// See [`FleetReporter::run_at`].
    pub async fn run(&self) -> Result<FleetReport> {
        self.run_at(Utc::now().timestamp()).await
    }

    /// Builds a report for the window ending at `end_time` (epoch seconds).
    ///
    /// # Errors
    ///
    /// - [`MetricsError::Config`] for an invalid configuration.
    /// - [`MetricsError::InventoryFailed`] if the array listing fails.
    /// - [`MetricsError::MetricsQueryFailed`] for the first failed query
    ///   under [`MetricsFailurePolicy::Abort`].
    #[tracing::instrument(skip(self), fields(
        interval_days = self.config.interval_days,
        policy = ?self.config.failure_policy,
    ))]
    pub async fn run_at(&self, end_time: i64) -> Result<FleetReport> {
        self.config.validate()?;
        let window = MetricsWindow::ending_at(end_time, self.config.interval_days)?;

        let arrays = self.source.list_arrays().await.map_err(MetricsError::inventory_failed)?;
        tracing::debug!(arrays = arrays.len(), "listed fleet inventory");

        let rows: Vec<ReportRow> = stream::iter(arrays)
            .map(|array| self.report_row(array, window))
            .buffered(self.config.max_concurrency)
            .try_collect()
            .await?;

        Ok(FleetReport { window, rows })
    }

    async fn report_row(&self, array: ArraySummary, window: MetricsWindow) -> Result<ReportRow> {
        let query =
            MetricsHistoryQuery::for_array(array.id.clone(), expected_metric_names(), window);

        match self.source.metrics_history(&query).await {
            Ok(history) => {
                let metrics = reduce_metrics(&history, &self.config.units);
                Ok(ReportRow::new(array, metrics, None))
            },
            Err(err) => match self.config.failure_policy {
                MetricsFailurePolicy::Isolate => {
                    tracing::warn!(
                        array = %array.name,
                        error = %err,
                        "metrics query failed, reporting zeros"
                    );
                    Ok(ReportRow::new(array, ArrayMetrics::default(), Some(err.to_string())))
                },
                MetricsFailurePolicy::Abort => {
                    Err(MetricsError::metrics_query_failed(array.name, err))
                },
            },
        }
    }
}
