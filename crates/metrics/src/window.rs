//! Reporting window selection.
//!
//! A window covers the `interval_days` days ending at an evaluation instant
//! and is queried as a single averaged bucket spanning the whole window.

use chrono::Utc;
use serde::Serialize;

use crate::error::{MetricsError, Result};

/// Seconds in one day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Milliseconds in one day, the unit of the metrics `resolution` parameter.
pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Default reporting interval.
pub const DEFAULT_INTERVAL_DAYS: u32 = 7;

/// Time range and resolution for one metrics history query.
///
/// Times are epoch seconds; the resolution is in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsWindow {
    start_time: i64,
    end_time: i64,
    resolution_ms: i64,
    interval_days: u32,
}

impl MetricsWindow {
    /// Window of `interval_days` days ending at `end_time` (epoch seconds).
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Config`] if `interval_days` is zero or the
    /// start of the window falls outside the representable range.
    pub fn ending_at(end_time: i64, interval_days: u32) -> Result<Self> {
        if interval_days == 0 {
            return Err(MetricsError::config("interval_days must be at least 1"));
        }

        let days = i64::from(interval_days);
        let start_time = end_time
            .checked_sub(days * SECONDS_PER_DAY)
            .ok_or_else(|| MetricsError::config("reporting window starts before the epoch range"))?;

        Ok(Self { start_time, end_time, resolution_ms: days * MILLIS_PER_DAY, interval_days })
    }

    /// Window of `interval_days` days ending now.
    ///
    /// # Errors
    ///
    /// See [`MetricsWindow::ending_at`].
    pub fn ending_now(interval_days: u32) -> Result<Self> {
        Self::ending_at(Utc::now().timestamp(), interval_days)
    }

    /// Window start, epoch seconds.
    #[must_use]
    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    /// Window end, epoch seconds.
    #[must_use]
    pub fn end_time(&self) -> i64 {
        self.end_time
    }

    /// Bucket width in milliseconds: the whole window.
    #[must_use]
    pub fn resolution_ms(&self) -> i64 {
        self.resolution_ms
    }

    /// Interval length in days.
    #[must_use]
    pub fn interval_days(&self) -> u32 {
        self.interval_days
    }

    /// Window start in epoch milliseconds, as the REST API expects.
    #[must_use]
    pub fn start_millis(&self) -> i64 {
        self.start_time.saturating_mul(1000)
    }

    /// Window end in epoch milliseconds, as the REST API expects.
    #[must_use]
    pub fn end_millis(&self) -> i64 {
        self.end_time.saturating_mul(1000)
    }
}
