// src/data_input/capture_parser.rs

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::ReaderBuilder;
use tracing::{debug, info, warn};

use crate::data_input::sample_data::{Sample, SampleSeries};
use crate::error::AnalysisError;

/// Column names expected in an accelerometer capture, in `Sample` order.
const TARGET_HEADERS: [&str; 4] = ["time", "x", "y", "z"];

/// Parses an accelerometer capture CSV (`time,x,y,z`) from disk.
///
/// Header matching ignores case and surrounding whitespace; extra columns are
/// ignored. Rows with an unparsable value are skipped. A missing column,
/// an unreadable file, or out-of-order timestamps abort with
/// [`AnalysisError::AcquisitionFailure`].
pub fn parse_capture_file(input_file_path: &Path) -> Result<SampleSeries, AnalysisError> {
    let file = File::open(input_file_path).map_err(|e| {
        AnalysisError::AcquisitionFailure(format!(
            "cannot open capture file {}: {e}",
            input_file_path.display()
        ))
    })?;
    info!(path = %input_file_path.display(), "Reading accelerometer capture");
    parse_capture_reader(BufReader::new(file))
}

/// Same as [`parse_capture_file`], for any reader.
pub fn parse_capture_reader<R: Read>(reader: R) -> Result<SampleSeries, AnalysisError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let header_record = reader.headers()?.clone();
    debug!(headers = ?header_record, "Headers found in capture");

    let mut header_indices = [0usize; 4];
    for (slot, target) in header_indices.iter_mut().zip(TARGET_HEADERS.iter()) {
        *slot = header_record
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(target))
            .ok_or_else(|| {
                AnalysisError::AcquisitionFailure(format!("column '{target}' not found in capture"))
            })?;
    }

    let mut samples = Vec::new();
    let mut skipped_rows = 0usize;
    for (row_index, result) in reader.records().enumerate() {
        let record = result?;
        let parse_column = |col: usize| -> Option<f64> {
            record
                .get(header_indices[col])
                .and_then(|val| val.parse::<f64>().ok())
                .filter(|v| v.is_finite())
        };
        match (parse_column(0), parse_column(1), parse_column(2), parse_column(3)) {
            (Some(t), Some(x), Some(y), Some(z)) => samples.push(Sample::new(t, x, y, z)),
            _ => {
                skipped_rows += 1;
                debug!(row = row_index + 2, "Skipping unparsable capture row");
            }
        }
    }

    if skipped_rows > 0 {
        warn!(skipped_rows, "Skipped capture rows with unparsable values");
    }
    info!(samples = samples.len(), "Capture parsed");

    SampleSeries::new(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_header_case_insensitively() {
        let data = "Time , X,Y,z,temp\n0.0,1,2,3,20\n0.001,4,5,6,20\n";
        let series = parse_capture_reader(data.as_bytes()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.samples()[1], Sample::new(0.001, 4.0, 5.0, 6.0));
    }

    #[test]
    fn test_skips_bad_rows() {
        let data = "time,x,y,z\n0.0,1,2,3\n0.001,oops,2,3\n0.002,1,2,3\n";
        let series = parse_capture_reader(data.as_bytes()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.samples()[1].time_s, 0.002);
    }

    #[test]
    fn test_missing_column_is_acquisition_failure() {
        let data = "time,x,y\n0.0,1,2\n";
        let err = parse_capture_reader(data.as_bytes()).unwrap_err();
        assert!(matches!(err, AnalysisError::AcquisitionFailure(_)));
    }

    #[test]
    fn test_descending_timestamps_rejected() {
        let data = "time,x,y,z\n0.002,1,2,3\n0.001,1,2,3\n";
        let err = parse_capture_reader(data.as_bytes()).unwrap_err();
        assert!(matches!(err, AnalysisError::AcquisitionFailure(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = parse_capture_file(Path::new("/nonexistent/capture.csv")).unwrap_err();
        assert_eq!(err.kind(), "acquisition_failure");
    }
}

// src/data_input/capture_parser.rs
