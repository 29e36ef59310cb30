//! Export per-sample fit results to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or plotting scripts.

use std::fs::File;
use std::path::Path;

use crate::error::FitError;
use crate::report::SampleResidual;

/// Write `t,y_obs,y_fit,residual` rows (with a header) to a CSV file.
pub fn write_residuals_csv(path: &Path, rows: &[SampleResidual]) -> Result<(), FitError> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);

    writer
        .write_record(["t", "y_obs", "y_fit", "residual"])
        .map_err(|e| FitError::Io(e.into()))?;
    for r in rows {
        writer
            .write_record([
                r.sample.t.to_string(),
                r.sample.y.to_string(),
                format!("{:.10}", r.y_fit),
                format!("{:.10e}", r.residual),
            ])
            .map_err(|e| FitError::Io(e.into()))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Sample;

    #[test]
    fn export_writes_header_and_rows() {
        let path = std::env::temp_dir().join(format!("growthfit-export-{}.csv", std::process::id()));
        let rows = vec![SampleResidual {
            sample: Sample::new(0.0, 10.0),
            y_fit: 9.5,
            residual: 0.5,
        }];
        write_residuals_csv(&path, &rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "t,y_obs,y_fit,residual");
        assert!(lines[1].starts_with("0,10,9.5000000000,"));
    }
}
