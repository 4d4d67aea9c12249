//! Observation CSV loading.
//!
//! Expected layout: one header row, then `time,value` in the first two
//! columns. Extra columns are ignored. Bad rows are skipped and reported
//! rather than failing the whole load.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::warn;

use crate::domain::{Sample, Series};
use crate::error::AppError;

/// A row that was skipped during loading.
#[derive(Debug, Clone)]
pub struct RowError {
    /// 1-based line number in the file.
    pub line: usize,
    pub message: String,
}

/// Loaded series plus row-level diagnostics.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub series: Series,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load a series from a CSV file.
pub fn load_series(path: &Path) -> Result<LoadedSeries, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::config(format!("Failed to open data CSV '{}': {e}", path.display())))?;
    read_series(file)
}

/// Load a series from any CSV reader.
pub fn read_series<R: Read>(input: R) -> Result<LoadedSeries, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let mut samples = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header, and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record) {
            Ok(sample) => samples.push(sample),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    for err in &row_errors {
        warn!(line = err.line, "skipped row: {}", err.message);
    }

    if samples.is_empty() {
        return Err(AppError::data("No usable rows in data CSV."));
    }

    Ok(LoadedSeries {
        series: Series::new(samples),
        row_errors,
        rows_read,
    })
}

fn parse_row(record: &csv::StringRecord) -> Result<Sample, String> {
    let field = |i: usize, name: &str| -> Result<f64, String> {
        let raw = record.get(i).ok_or_else(|| format!("missing {name} column"))?;
        let v: f64 = raw.parse().map_err(|_| format!("invalid {name} `{raw}`"))?;
        if v.is_finite() {
            Ok(v)
        } else {
            Err(format!("non-finite {name} `{raw}`"))
        }
    };
    Ok(Sample::new(field(0, "time")?, field(1, "value")?))
}
