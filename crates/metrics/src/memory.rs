//! In-memory metrics source.
//!
//! [`MemoryMetricsSource`] holds a fixed inventory and per-array metrics
//! history, and can be told to fail the inventory or individual arrays.
//! Every history query it receives is recorded for later inspection.
//!
//! # Example
//!
//! ```
//! use pure1_metrics::{ArraySummary, MemoryMetricsSource, MetricSeries, MetricsHistory};
//!
//! let source = MemoryMetricsSource::new();
//! source.insert_array(
//!     ArraySummary {
//!         id: "a1".into(),
//!         name: "prod-fa-01".into(),
//!         model: "FA-X70R3".into(),
//!         version: "6.5.2".into(),
//!         os: None,
//!     },
//!     MetricsHistory::new(vec![MetricSeries::new("array_total_load", vec![(0, 0.4)])]),
//! );
//! assert_eq!(source.array_count(), 1);
//! ```

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{
    error::{MetricsError, Result},
    source::MetricsSource,
    types::{ArraySummary, MetricsHistory, MetricsHistoryQuery},
};

#[derive(Debug, Default)]
struct State {
    arrays: Vec<ArraySummary>,
    history: HashMap<String, MetricsHistory>,
    metrics_failures: HashMap<String, String>,
    inventory_failure: Option<String>,
    queries: Vec<MetricsHistoryQuery>,
}

/// [`MetricsSource`] backed by in-memory data.
///
/// Cheaply cloneable; clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryMetricsSource {
    state: Arc<RwLock<State>>,
}

impl MemoryMetricsSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an array to the inventory with its metrics history.
    ///
    /// Arrays are listed in insertion order.
    pub fn insert_array(&self, array: ArraySummary, history: MetricsHistory) {
        let mut state = self.state.write();
        state.history.insert(array.id.clone(), history);
        state.arrays.push(array);
    }

    /// Makes history queries for `array_id` fail with a transport error.
    pub fn fail_metrics_for(&self, array_id: impl Into<String>, message: impl Into<String>) {
        self.state.write().metrics_failures.insert(array_id.into(), message.into());
    }

    /// Makes the inventory listing fail with an HTTP 503.
    pub fn fail_inventory(&self, message: impl Into<String>) {
        self.state.write().inventory_failure = Some(message.into());
    }

    /// Number of arrays in the inventory.
    #[must_use]
    pub fn array_count(&self) -> usize {
        self.state.read().arrays.len()
    }

    /// History queries received so far, in arrival order.
    #[must_use]
    pub fn queries(&self) -> Vec<MetricsHistoryQuery> {
        self.state.read().queries.clone()
    }
}

#[async_trait]
impl MetricsSource for MemoryMetricsSource {
    async fn list_arrays(&self) -> Result<Vec<ArraySummary>> {
        let state = self.state.read();
        if let Some(message) = &state.inventory_failure {
            return Err(MetricsError::http(503, message.clone()));
        }
        Ok(state.arrays.clone())
    }

    async fn metrics_history(&self, query: &MetricsHistoryQuery) -> Result<MetricsHistory> {
        let mut state = self.state.write();
        state.queries.push(query.clone());

        let mut items = Vec::new();
        for id in &query.resource_ids {
            if let Some(message) = state.metrics_failures.get(id) {
                return Err(MetricsError::transport(message.clone()));
            }
            if let Some(history) = state.history.get(id) {
                items.extend(history.items.iter().cloned());
            }
        }
        Ok(MetricsHistory::new(items))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::{types::MetricSeries, window::MetricsWindow};

    fn array(id: &str) -> ArraySummary {
        ArraySummary {
            id: id.into(),
            name: format!("array-{id}"),
            model: "FA-C60".into(),
            version: "6.4.10".into(),
            os: Some("Purity//FA".into()),
        }
    }

    fn query(id: &str) -> MetricsHistoryQuery {
        let window = MetricsWindow::ending_at(1_700_000_000, 7).unwrap();
        MetricsHistoryQuery::for_array(id, ["array_total_load"], window)
    }

    #[tokio::test]
    async fn test_lists_in_insertion_order() {
        let source = MemoryMetricsSource::new();
        source.insert_array(array("b"), MetricsHistory::default());
        source.insert_array(array("a"), MetricsHistory::default());

        let ids: Vec<_> = source.list_arrays().await.unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[tokio::test]
    async fn test_returns_history_and_records_query() {
        let source = MemoryMetricsSource::new();
        let history =
            MetricsHistory::new(vec![MetricSeries::new("array_total_load", vec![(1, 0.5)])]);
        source.insert_array(array("a"), history.clone());

        assert_eq!(source.metrics_history(&query("a")).await.unwrap(), history);
        assert_eq!(
            source.metrics_history(&query("unknown")).await.unwrap(),
            MetricsHistory::default()
        );
        assert_eq!(source.queries().len(), 2);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let source = MemoryMetricsSource::new();
        source.insert_array(array("a"), MetricsHistory::default());
        source.fail_metrics_for("a", "connection reset");

        let err = source.metrics_history(&query("a")).await.unwrap_err();
        assert!(matches!(err, MetricsError::Transport(_)));

        source.fail_inventory("maintenance");
        let err = source.list_arrays().await.unwrap_err();
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let source = MemoryMetricsSource::new();
        let clone = source.clone();
        clone.insert_array(array("a"), MetricsHistory::default());
        assert_eq!(source.array_count(), 1);
    }
}
