//! Reduction of metrics history into report fields.
//!
//! Six metrics are reported per array. For each, the latest sample of its
//! series is taken and converted to the reporting unit. A metric that is
//! absent or has no samples reports `0`.

use serde::{Deserialize, Serialize};

use crate::{
    error::{MetricsError, Result},
    types::MetricsHistory,
};

/// Bytes in one binary terabyte (TiB).
pub const BYTES_PER_TERABYTE: f64 = 1_099_511_627_776.0;

/// Bytes in one binary gigabyte (GiB).
pub const BYTES_PER_GIGABYTE: f64 = 1_073_741_824.0;

/// Reporting unit of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// Raw bytes shown as terabytes.
    Terabytes,
    /// Raw bytes shown as gigabytes.
    Gigabytes,
    /// Dimensionless value shown as-is.
    Ratio,
}

/// Byte divisors applied at reduction time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitDivisors {
    /// Bytes per terabyte.
    #[serde(default = "default_terabyte")]
    pub terabyte: f64,
    /// Bytes per gigabyte.
    #[serde(default = "default_gigabyte")]
    pub gigabyte: f64,
}

fn default_terabyte() -> f64 {
    BYTES_PER_TERABYTE
}

fn default_gigabyte() -> f64 {
    BYTES_PER_GIGABYTE
}

impl Default for UnitDivisors {
    fn default() -> Self {
        Self { terabyte: BYTES_PER_TERABYTE, gigabyte: BYTES_PER_GIGABYTE }
    }
}

impl UnitDivisors {
    /// Divisor for `unit`.
    #[must_use]
    pub fn divisor(&self, unit: Unit) -> f64 {
        match unit {
            Unit::Terabytes => self.terabyte,
            Unit::Gigabytes => self.gigabyte,
            Unit::Ratio => 1.0,
        }
    }

    /// Converts a raw value into `unit`.
    #[must_use]
    pub fn convert(&self, raw: f64, unit: Unit) -> f64 {
        raw / self.divisor(unit)
    }

    /// Checks that both divisors are finite and positive.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Config`] naming the bad divisor.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("terabyte", self.terabyte), ("gigabyte", self.gigabyte)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(MetricsError::config(format!(
                    "unit divisor '{name}' must be a positive number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// The metrics a fleet report shows for each array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportedMetric {
    /// `array_total_capacity`, TB.
    TotalCapacity,
    /// `array_effective_used_space`, GB.
    EffectiveUsedSpace,
    /// `array_data_reduction`, ratio.
    DataReduction,
    /// `array_shared_space`, GB.
    SharedSpace,
    /// `array_system_space`, GB.
    SystemSpace,
    /// `array_total_load`, ratio.
    TotalLoad,
}

impl ReportedMetric {
    /// Every reported metric, in query order.
    pub const ALL: [Self; 6] = [
        Self::TotalCapacity,
        Self::EffectiveUsedSpace,
        Self::DataReduction,
        Self::SharedSpace,
        Self::SystemSpace,
        Self::TotalLoad,
    ];

    /// Pure1 metric name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::TotalCapacity => "array_total_capacity",
            Self::EffectiveUsedSpace => "array_effective_used_space",
            Self::DataReduction => "array_data_reduction",
            Self::SharedSpace => "array_shared_space",
            Self::SystemSpace => "array_system_space",
            Self::TotalLoad => "array_total_load",
        }
    }

    /// Reporting unit.
    #[must_use]
    pub fn unit(self) -> Unit {
        match self {
            Self::TotalCapacity => Unit::Terabytes,
            Self::EffectiveUsedSpace | Self::SharedSpace | Self::SystemSpace => Unit::Gigabytes,
            Self::DataReduction | Self::TotalLoad => Unit::Ratio,
        }
    }

    /// Looks up a metric by its Pure1 name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|metric| metric.name() == name)
    }
}

/// Names of every reported metric, for the history query.
#[must_use]
pub fn expected_metric_names() -> [&'static str; 6] {
    ReportedMetric::ALL.map(ReportedMetric::name)
}

/// Reduced metrics of one array, in reporting units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayMetrics {
    /// Total capacity, TB.
    pub total_capacity_tb: f64,
    /// Effective used space, GB.
    pub effective_used_space_gb: f64,
    /// Data reduction ratio.
    pub data_reduction: f64,
    /// Shared space, GB.
    pub shared_space_gb: f64,
    /// System space, GB.
    pub system_space_gb: f64,
    /// Average load.
    pub total_load: f64,
}

impl ArrayMetrics {
    /// Value of one metric.
    #[must_use]
    pub fn get(&self, metric: ReportedMetric) -> f64 {
        match metric {
            ReportedMetric::TotalCapacity => self.total_capacity_tb,
            ReportedMetric::EffectiveUsedSpace => self.effective_used_space_gb,
            ReportedMetric::DataReduction => self.data_reduction,
            ReportedMetric::SharedSpace => self.shared_space_gb,
            ReportedMetric::SystemSpace => self.system_space_gb,
            ReportedMetric::TotalLoad => self.total_load,
        }
    }

    fn set(&mut self, metric: ReportedMetric, value: f64) {
        let slot = match metric {
            ReportedMetric::TotalCapacity => &mut self.total_capacity_tb,
            ReportedMetric::EffectiveUsedSpace => &mut self.effective_used_space_gb,
            ReportedMetric::DataReduction => &mut self.data_reduction,
            ReportedMetric::SharedSpace => &mut self.shared_space_gb,
            ReportedMetric::SystemSpace => &mut self.system_space_gb,
            ReportedMetric::TotalLoad => &mut self.total_load,
        };
        *slot = value;
    }
}

/// Reduces one array's metrics history to its report fields.
///
/// Takes the last sample of each expected series and converts it with
/// `divisors`. Missing or empty series leave the field at `0`. If a name
/// appears more than once, the last non-empty series wins. Unknown names
/// are ignored.
#[must_use]
pub fn reduce_metrics(history: &MetricsHistory, divisors: &UnitDivisors) -> ArrayMetrics {
    let mut metrics = ArrayMetrics::default();

    for series in &history.items {
        let Some(metric) = ReportedMetric::from_name(&series.name) else {
            tracing::trace!(name = %series.name, "ignoring unreported metric");
            continue;
        };
        if let Some((_, raw)) = series.latest() {
            metrics.set(metric, divisors.convert(raw, metric.unit()));
        }
    }

    metrics
}
