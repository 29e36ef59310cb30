//! Sample files: two delimited columns `t, y`, no header row.
//!
//! - blank lines are skipped
//! - any other row must hold exactly two finite numbers, otherwise the whole
//!   read fails with `MalformedSample` naming the 1-based line

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::domain::Sample;
use crate::error::FitError;

/// Read samples from a file.
pub fn read_samples(path: &Path, delimiter: u8) -> Result<Vec<Sample>, FitError> {
    let file = File::open(path)?;
    parse_samples(file, delimiter)
}

/// Parse samples from any reader.
pub fn parse_samples<R: Read>(reader: R, delimiter: u8) -> Result<Vec<Sample>, FitError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut out = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| FitError::MalformedSample {
            line: e.position().map(|p| p.line() as usize).unwrap_or(idx + 1),
            message: e.to_string(),
        })?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(idx + 1);

        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        if record.len() != 2 {
            return Err(FitError::MalformedSample {
                line,
                message: format!("expected 2 fields, found {}", record.len()),
            });
        }

        let t = parse_field(&record[0], "t", line)?;
        let y = parse_field(&record[1], "y", line)?;
        out.push(Sample { t, y });
    }

    Ok(out)
}

/// Parse `t,y` pairs given on the command line (`--point 0,10`).
pub fn parse_point(raw: &str) -> Result<Sample, FitError> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(FitError::MalformedSample {
            line: 0,
            message: format!("point '{raw}' must look like T,Y"),
        });
    }
    Ok(Sample {
        t: parse_field(parts[0], "t", 0)?,
        y: parse_field(parts[1], "y", 0)?,
    })
}

/// Write samples in the same headerless format `read_samples` accepts.
pub fn write_samples(path: &Path, samples: &[Sample], delimiter: u8) -> Result<(), FitError> {
    let file = File::create(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .from_writer(file);
    for s in samples {
        writer
            .write_record([s.t.to_string(), s.y.to_string()])
            .map_err(|e| FitError::Io(e.into()))?;
    }
    writer.flush()?;
    Ok(())
}

fn parse_field(raw: &str, name: &str, line: usize) -> Result<f64, FitError> {
    let value: f64 = raw.parse().map_err(|_| FitError::MalformedSample {
        line,
        message: format!("{name} value '{raw}' is not a number"),
    })?;
    if !value.is_finite() {
        return Err(FitError::MalformedSample {
            line,
            message: format!("{name} value '{raw}' is not finite"),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_column_rows() {
        let samples = parse_samples(" 0 , 10 \n\n20,20\n".as_bytes(), b',').unwrap();
        assert_eq!(samples, vec![Sample::new(0.0, 10.0), Sample::new(20.0, 20.0)]);
    }

    #[test]
    fn tab_delimited_files_are_supported() {
        let samples = parse_samples("1\t2.5\n2\t5e0\n".as_bytes(), b'\t').unwrap();
        assert_eq!(samples, vec![Sample::new(1.0, 2.5), Sample::new(2.0, 5.0)]);
    }

    #[test]
    fn unparsable_value_names_its_line() {
        let err = parse_samples("0,10\n1,abc\n2,3\n".as_bytes(), b',').unwrap_err();
        match err {
            FitError::MalformedSample { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("abc"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn wrong_field_count_is_malformed() {
        let err = parse_samples("0,10,3\n".as_bytes(), b',').unwrap_err();
        assert!(matches!(err, FitError::MalformedSample { line: 1, .. }));

        let err = parse_samples("0,10\n7\n".as_bytes(), b',').unwrap_err();
        assert!(matches!(err, FitError::MalformedSample { line: 2, .. }));
    }

    #[test]
    fn non_finite_values_are_malformed() {
        let err = parse_samples("0,NaN\n".as_bytes(), b',').unwrap_err();
        assert!(matches!(err, FitError::MalformedSample { line: 1, .. }));
    }

    #[test]
    fn header_row_is_not_silently_skipped() {
        let err = parse_samples("t,y\n0,1\n".as_bytes(), b',').unwrap_err();
        assert!(matches!(err, FitError::MalformedSample { line: 1, .. }));
    }

    #[test]
    fn cli_points_parse() {
        assert_eq!(parse_point("20, 20").unwrap(), Sample::new(20.0, 20.0));
        assert!(parse_point("20").is_err());
        assert!(parse_point("a,b").is_err());
    }

    #[test]
    fn written_samples_read_back() {
        let path = std::env::temp_dir().join(format!("growthfit-samples-{}.csv", std::process::id()));
        let samples = vec![Sample::new(0.0, 10.0), Sample::new(0.5, 10.253)];
        write_samples(&path, &samples, b',').unwrap();
        let back = read_samples(&path, b',').unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(back, samples);
    }
}
