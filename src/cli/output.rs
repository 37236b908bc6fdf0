//! CLI output: report rendering and exit codes.

use crate::cli::parse::ReportFormat;
use crate::error::BisectError;
use crate::report::RunReport;

/// Exit code for a finished run
pub fn exit_code_for(report: &RunReport) -> i32 {
    if report.status.is_success() {
        0
    } else {
        1
    }
}

/// Render the final report in the requested format
pub fn render_report(report: &RunReport, format: ReportFormat) -> Result<String, BisectError> {
    match format {
        ReportFormat::Text => Ok(report.to_text()),
        ReportFormat::Json => report
            .to_json()
            .map_err(|e| BisectError::Config(format!("Failed to serialize report: {}", e))),
    }
}

/// Map errors to a string for CLI output.
pub fn map_error(e: &BisectError) -> String {
    if e.is_precondition() {
        format!("{}\nThe inputs must behave as claimed before the search can start.", e)
    } else {
        e.to_string()
    }
}
