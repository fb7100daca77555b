//! Pure1 REST API data types.
//!
//! These mirror the JSON the API returns. Unknown fields are ignored so new
//! server-side attributes do not break decoding, and `null` collections or
//! strings decode as empty.

use serde::{Deserialize, Deserializer, Serialize};

use crate::window::MetricsWindow;

/// One managed array from the inventory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArraySummary {
    /// Resource identifier used in metrics queries.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Hardware model, e.g. `FA-X70R3`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub model: String,
    /// OS/firmware version, e.g. `6.5.2`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: String,
    /// OS family, e.g. `Purity//FA`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One page of `GET /arrays`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArrayPage {
    /// Arrays on this page.
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<ArraySummary>,
    /// Opaque token for the next page; absent on the last page.
    #[serde(default)]
    pub continuation_token: Option<String>,
    /// Total number of arrays across all pages.
    #[serde(default)]
    pub total_item_count: Option<u64>,
}

/// A named metric and its samples, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    /// Metric identifier, e.g. `array_total_capacity`.
    pub name: String,
    /// `(timestamp_ms, value)` samples in chronological order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<(i64, f64)>,
    /// Unit reported by the API, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl MetricSeries {
    /// Creates a series from samples.
    pub fn new(name: impl Into<String>, data: Vec<(i64, f64)>) -> Self {
        Self { name: name.into(), data, unit: None }
    }

    /// Most recent sample.
    #[must_use]
    pub fn latest(&self) -> Option<(i64, f64)> {
        self.data.last().copied()
    }
}

/// Response of `GET /metrics/history`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsHistory {
    /// One entry per returned metric.
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<MetricSeries>,
}

impl MetricsHistory {
    /// Creates a history from series.
    pub fn new(items: Vec<MetricSeries>) -> Self {
        Self { items }
    }
}

/// How samples inside one resolution bucket are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Mean of the bucket.
    #[default]
    Avg,
    /// Maximum of the bucket.
    Max,
}

impl Aggregation {
    /// Wire value of the `aggregation` parameter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Avg => "avg",
            Self::Max => "max",
        }
    }
}

/// Parameters of one metrics history query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsHistoryQuery {
    /// Bucket aggregation.
    pub aggregation: Aggregation,
    /// Metric names to fetch.
    pub names: Vec<String>,
    /// Resources to fetch them for.
    pub resource_ids: Vec<String>,
    /// Time range and resolution.
    pub window: MetricsWindow,
}

impl MetricsHistoryQuery {
    /// Averaged query for `names` on a single array.
    pub fn for_array<I, S>(array_id: impl Into<String>, names: I, window: MetricsWindow) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            aggregation: Aggregation::Avg,
            names: names.into_iter().map(Into::into).collect(),
            resource_ids: vec![array_id.into()],
            window,
        }
    }
}
