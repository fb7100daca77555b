//! Metrics and reporting error types.
//!
//! Transport-level failures (`Http`, `Transport`, `Decode`) come from a
//! [`MetricsSource`](crate::source::MetricsSource). The reporter wraps them
//! in [`MetricsError::InventoryFailed`] or [`MetricsError::MetricsQueryFailed`]
//! to say which step of the run failed.

use thiserror::Error;

/// Result type alias for metrics operations.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Errors raised while querying Pure1 or building a fleet report.
///
/// # Non-exhaustive
///
/// New variants may be added in minor releases. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MetricsError {
    /// The metrics history query for one array failed.
    #[error("Metrics query failed for array '{array}'")]
    MetricsQueryFailed {
        /// Display name of the array.
        array: String,
        /// Underlying failure.
        #[source]
        source: Box<MetricsError>,
    },

    /// The array inventory could not be listed. Always fatal to a run.
    #[error("Failed to list arrays")]
    InventoryFailed {
        /// Underlying failure.
        #[source]
        source: Box<MetricsError>,
    },

    /// The API answered with a non-success status.
    #[error("Pure1 API returned HTTP {status}: {}", body.trim())]
    Http {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The request never produced a response (connect, TLS, timeout).
    #[error("Request to Pure1 API failed: {0}")]
    Transport(String),

    /// The response body did not match the expected shape.
    #[error("Failed to decode Pure1 API response: {0}")]
    Decode(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MetricsError {
    /// Creates a [`MetricsError::MetricsQueryFailed`] error.
    pub fn metrics_query_failed(array: impl Into<String>, source: MetricsError) -> Self {
        Self::MetricsQueryFailed { array: array.into(), source: Box::new(source) }
    }

    /// Creates a [`MetricsError::InventoryFailed`] error.
    pub fn inventory_failed(source: MetricsError) -> Self {
        Self::InventoryFailed { source: Box::new(source) }
    }

    /// Creates a [`MetricsError::Http`] error.
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http { status, body: body.into() }
    }

    /// Creates a [`MetricsError::Transport`] error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a [`MetricsError::Decode`] error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Creates a [`MetricsError::Config`] error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// HTTP status carried by this error or the error it wraps.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::MetricsQueryFailed { source, .. } | Self::InventoryFailed { source } => {
                source.status()
            },
            _ => None,
        }
    }
}
