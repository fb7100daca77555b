//! Report rendering.

use std::fmt;

use pure1_metrics::FleetReport;

/// Console listing of a [`FleetReport`], two decimals per figure.
#[derive(Debug, Clone, Copy)]
pub struct TextReport<'a>(pub &'a FleetReport);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "List of Pure1 fleet arrays")?;
        writeln!(f, "==========================")?;
        for row in &self.0.rows {
            let m = &row.metrics;
            writeln!(f, "Array Name: {}", row.name)?;
            writeln!(f, "\tModel: {}", row.model)?;
            writeln!(f, "\tPurity Version: {}", row.version)?;
            writeln!(f, "\tTotal Capacity (TB): {:.2}", m.total_capacity_tb)?;
            writeln!(f, "\tEffective Used Space (GB): {:.2}", m.effective_used_space_gb)?;
            writeln!(f, "\tData Reduction: {:.2}", m.data_reduction)?;
            writeln!(f, "\tShared Space (GB): {:.2}", m.shared_space_gb)?;
            writeln!(f, "\tSystem Space (GB): {:.2}", m.system_space_gb)?;
            writeln!(f, "\tArray Load (avg): {:.2}", m.total_load)?;
            if let Some(error) = &row.error {
                writeln!(f, "\tError: {error}")?;
            }
        }
        Ok(())
    }
}

/// Renders the console listing.
#[must_use]
pub fn render_text(report: &FleetReport) -> String {
    TextReport(report).to_string()
}

/// Renders the report as pretty-printed JSON.
///
/// # Errors
///
/// Fails only if a value cannot be represented in JSON.
pub fn render_json(report: &FleetReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use pure1_metrics::{ArrayMetrics, MetricsWindow, ReportRow};

    use super::*;

    fn report() -> FleetReport {
        FleetReport {
            window: MetricsWindow::ending_at(1_700_000_000, 7).unwrap(),
            rows: vec![
                ReportRow {
                    id: "a1".into(),
                    name: "prod-01".into(),
                    model: "FA-X70R3".into(),
                    version: "6.5.2".into(),
                    metrics: ArrayMetrics {
                        total_capacity_tb: 2.0,
                        effective_used_space_gb: 750.456,
                        data_reduction: 3.5,
                        shared_space_gb: 12.0,
                        system_space_gb: 4.0,
                        total_load: 0.254,
                    },
                    error: None,
                },
                ReportRow {
                    id: "a2".into(),
                    name: "lab-02".into(),
                    model: "FB-S200".into(),
                    version: "4.1.0".into(),
                    metrics: ArrayMetrics::default(),
                    error: Some("Request to Pure1 API failed: timed out".into()),
                },
            ],
        }
    }

    #[test]
    fn test_text_layout() {
        let text = render_text(&report());
        let expected = "\
List of Pure1 fleet arrays
==========================
Array Name: prod-01
\tModel: FA-X70R3
\tPurity Version: 6.5.2
\tTotal Capacity (TB): 2.00
\tEffective Used Space (GB): 750.46
\tData Reduction: 3.50
\tShared Space (GB): 12.00
\tSystem Space (GB): 4.00
\tArray Load (avg): 0.25
Array Name: lab-02
\tModel: FB-S200
\tPurity Version: 4.1.0
\tTotal Capacity (TB): 0.00
\tEffective Used Space (GB): 0.00
\tData Reduction: 0.00
\tShared Space (GB): 0.00
\tSystem Space (GB): 0.00
\tArray Load (avg): 0.00
\tError: Request to Pure1 API failed: timed out
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_json_shape() {
        let rendered = render_json(&report()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(json["window"]["interval_days"], 7);
        assert_eq!(json["rows"][0]["name"], "prod-01");
        assert_eq!(json["rows"][0]["total_capacity_tb"], 2.0);
        assert!(json["rows"][0].get("error").is_none());
        assert_eq!(json["rows"][1]["error"], "Request to Pure1 API failed: timed out");
    }

    #[test]
    fn test_empty_report_has_header_only() {
        let empty = FleetReport { window: report().window, rows: vec![] };
        assert_eq!(render_text(&empty).lines().count(), 2);
    }
}
