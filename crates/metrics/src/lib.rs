//! # Pure1 Metrics
//!
//! Fleet reporting over the Pure1 REST API.
//!
//! This crate provides:
//! - **Window selection**: [`MetricsWindow`], the `interval_days` days ending at an instant
//! - **Reduction**: [`reduce_metrics`], latest sample per metric in TB/GB/ratio
//! - **Sources**: the [`MetricsSource`] trait with an HTTP [`Pure1Client`] and an in-memory
//!   [`MemoryMetricsSource`]
//! - **Reporting**: [`FleetReporter`], one [`ReportRow`] per array in inventory order
//!
//! ## Example
//!
//! ```no_run
//! use pure1_authn::AccessToken;
//! use pure1_metrics::{FleetReporter, Pure1Client, Pure1ClientConfig, ReportConfig};
//!
//! # async fn example(token: AccessToken) -> Result<(), pure1_metrics::MetricsError> {
//! let client = Pure1Client::new(Pure1ClientConfig::default(), token)?;
//! let reporter = FleetReporter::new(client, ReportConfig::default());
//! for row in reporter.run().await?.rows {
//!     println!("{}: {:.2} TB", row.name, row.metrics.total_capacity_tb);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Pure1 REST API client.
pub mod client;
/// Metrics error types.
pub mod error;
/// In-memory metrics source.
pub mod memory;
/// Metrics reduction.
pub mod reduce;
/// Fleet reporting.
pub mod report;
/// Metrics source trait.
pub mod source;
/// API data types.
pub mod types;
/// Reporting window selection.
pub mod window;

pub use client::{DEFAULT_API_BASE_URL, Pure1Client, Pure1ClientConfig};
pub use error::{MetricsError, Result};
pub use memory::MemoryMetricsSource;
pub use reduce::{
    ArrayMetrics, ReportedMetric, Unit, UnitDivisors, expected_metric_names, reduce_metrics,
};
pub use report::{FleetReport, FleetReporter, MetricsFailurePolicy, ReportConfig, ReportRow};
pub use source::MetricsSource;
pub use types::{
    Aggregation, ArrayPage, ArraySummary, MetricSeries, MetricsHistory, MetricsHistoryQuery,
};
pub use window::{DEFAULT_INTERVAL_DAYS, MetricsWindow};
