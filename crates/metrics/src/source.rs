//! Metrics source abstraction.
//!
//! [`MetricsSource`] is the seam between the fleet reporter and the Pure1
//! REST API. [`Pure1Client`](crate::client::Pure1Client) talks HTTP;
//! [`MemoryMetricsSource`](crate::memory::MemoryMetricsSource) serves canned
//! data for tests and demos.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::Result,
    types::{ArraySummary, MetricsHistory, MetricsHistoryQuery},
};

/// Read access to array inventory and metrics history.
///
/// Implementations must be thread-safe: the reporter issues several
/// history queries concurrently.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Lists every array visible to the caller, across all pages.
    #[must_use = "inventory listing may fail and errors must be handled"]
    async fn list_arrays(&self) -> Result<Vec<ArraySummary>>;

    /// Fetches metrics history for the query's resources and window.
    #[must_use = "metrics queries may fail and errors must be handled"]
    async fn metrics_history(&self, query: &MetricsHistoryQuery) -> Result<MetricsHistory>;
}

#[async_trait]
impl<S: MetricsSource + ?Sized> MetricsSource for Arc<S> {
    async fn list_arrays(&self) -> Result<Vec<ArraySummary>> {
        (**self).list_arrays().await
    }

    async fn metrics_history(&self, query: &MetricsHistoryQuery) -> Result<MetricsHistory> {
        (**self).metrics_history(query).await
    }
}
