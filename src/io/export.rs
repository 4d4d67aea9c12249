//! Export the search trace (CSV) and the run report (JSON).

use std::fs::File;
use std::path::Path;

use crate::domain::SearchTrace;
use crate::error::AppError;
use crate::report::FitReport;

/// Write the `(dt, loss)` trace, one row per candidate in search order.
pub fn write_trace_csv(path: &Path, trace: &SearchTrace) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::config(format!("Failed to create trace CSV '{}': {e}", path.display())))?;

    writer
        .write_record(["dt", "loss"])
        .map_err(|e| AppError::config(format!("Failed to write trace CSV header: {e}")))?;
    for entry in trace.iter() {
        writer
            .write_record([entry.dt.to_string(), entry.loss.to_string()])
            .map_err(|e| AppError::config(format!("Failed to write trace CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::config(format!("Failed to flush trace CSV: {e}")))?;
    Ok(())
}

/// Write the JSON report.
pub fn write_report_json(path: &Path, report: &FitReport) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::config(format!("Failed to create report JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::config(format!("Failed to write report JSON: {e}")))?;
    Ok(())
}

/// Read a JSON report back.
pub fn read_report_json(path: &Path) -> Result<FitReport, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::config(format!("Failed to open report JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::config(format!("Invalid report JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_csv_has_header_and_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.csv");
        let mut trace = SearchTrace::default();
        trace.push(10.0, 0.25);
        trace.push(12.5, f64::NAN);
        trace.push(11.0, 3.0);

        write_trace_csv(&path, &trace).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, ["dt,loss", "10,0.25", "12.5,NaN", "11,3"]);
    }
}
