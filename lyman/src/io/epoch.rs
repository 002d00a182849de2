//! Reader for per-epoch exposure files.
//!
//! Epoch files are whitespace-delimited text with purely positional
//! columns: wavelength, RV, one (flux, error) pair per slit position, the
//! airglow pair, and optionally a precomputed weighted-average flux (with
//! or without its error). Which positions are present, and whether the
//! trailing average exists, differs per epoch; an [`EpochLayout`] describes
//! the shape and the reader enforces it row by row.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::io::IoError;
use crate::segment::{Aperture, EpochObservation, Segment, SegmentId};

/// Optional trailing columns after the airglow pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrailingColumns {
    None,
    MeanFlux,
    MeanFluxAndError,
}

impl TrailingColumns {
    fn count(self) -> usize {
        match self {
            TrailingColumns::None => 0,
            TrailingColumns::MeanFlux => 1,
            TrailingColumns::MeanFluxAndError => 2,
        }
    }
}

/// Column layout of one epoch file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochLayout {
    pub epoch: String,
    pub positions: Vec<Aperture>,
    pub trailing: TrailingColumns,
}

impl EpochLayout {
    pub fn new(
        epoch: impl Into<String>,
        positions: Vec<Aperture>,
        trailing: TrailingColumns,
    ) -> Self {
        Self {
            epoch: epoch.into(),
            positions,
            trailing,
        }
    }

    /// Total columns a row must carry: wavelength, RV, the position pairs,
    /// the airglow pair, and the trailing average if any.
    pub fn column_count(&self) -> usize {
        2 + 2 * self.positions.len() + 2 + self.trailing.count()
    }
}

/// Read one epoch file into an [`EpochObservation`].
///
/// Blank lines and `#` comments are skipped. Any row whose column count or
/// numeric content disagrees with the layout fails the whole read with the
/// file and line named; a half-parsed epoch is worse than none.
pub fn read_epoch(path: &Path, layout: &EpochLayout) -> Result<EpochObservation, IoError> {
    let file = File::open(path).map_err(|source| IoError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    let expected = layout.column_count();
    let n_positions = layout.positions.len();

    let mut wavelength = Vec::new();
    let mut rv = Vec::new();
    let mut flux = vec![Vec::new(); n_positions];
    let mut error = vec![Vec::new(); n_positions];
    let mut airglow_flux = Vec::new();
    let mut airglow_error = Vec::new();
    let mut mean_flux = Vec::new();
    let mut mean_error = Vec::new();

    for (line_index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let row = parse_row(trimmed, expected, path, line_index + 1)?;

        wavelength.push(row[0]);
        rv.push(row[1]);
        for p in 0..n_positions {
            flux[p].push(row[2 + 2 * p]);
            error[p].push(row[3 + 2 * p]);
        }
        let ag = 2 + 2 * n_positions;
        airglow_flux.push(row[ag]);
        airglow_error.push(row[ag + 1]);
        match layout.trailing {
            TrailingColumns::None => {}
            TrailingColumns::MeanFlux => mean_flux.push(row[ag + 2]),
            TrailingColumns::MeanFluxAndError => {
                mean_flux.push(row[ag + 2]);
                mean_error.push(row[ag + 3]);
            }
        }
    }

    if wavelength.is_empty() {
        return Err(IoError::Malformed {
            path: path.to_path_buf(),
            line: 0,
            detail: format!("no data rows for epoch {}", layout.epoch),
        });
    }

    let exposures = layout
        .positions
        .iter()
        .zip(flux.into_iter().zip(error))
        .map(|(&aperture, (flux, error))| Segment {
            id: SegmentId::new(layout.epoch.clone(), aperture),
            flux,
            error,
        })
        .collect();

    info!(
        "read epoch {}: {} samples, {} positions from {}",
        layout.epoch,
        wavelength.len(),
        n_positions,
        path.display()
    );

    Ok(EpochObservation {
        epoch: layout.epoch.clone(),
        wavelength,
        rv,
        exposures,
        airglow_flux,
        airglow_error,
        mean_flux: (!mean_flux.is_empty()).then_some(mean_flux),
        mean_error: (!mean_error.is_empty()).then_some(mean_error),
    })
}

fn parse_row(
    line: &str,
    expected: usize,
    path: &Path,
    line_number: usize,
) -> Result<Vec<f64>, IoError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != expected {
        return Err(IoError::Malformed {
            path: path.to_path_buf(),
            line: line_number,
            detail: format!("expected {} columns, found {}", expected, tokens.len()),
        });
    }
    tokens
        .iter()
        .enumerate()
        .map(|(column, token)| {
            let value = token.parse::<f64>().map_err(|_| IoError::Malformed {
                path: path.to_path_buf(),
                line: line_number,
                detail: format!("column {}: invalid number {:?}", column + 1, token),
            })?;
            // "nan" and "inf" parse as f64 but have no place in a spectrum.
            if !value.is_finite() {
                return Err(IoError::Malformed {
                    path: path.to_path_buf(),
                    line: line_number,
                    detail: format!("column {}: non-finite value {:?}", column + 1, token),
                });
            }
            Ok(value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn baseline_layout() -> EpochLayout {
        EpochLayout::new("2014", vec![Aperture::OnAxis], TrailingColumns::None)
    }

    fn write_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn reads_baseline_epoch() {
        let file = write_file(
            " 1.2140000000e+03 -4.1200000000e+02  1.0000000000e-14  1.0000000000e-15  2.0000000000e-15  4.0000000000e-16\n\
              1.2140100000e+03 -4.0950000000e+02  1.1000000000e-14  1.1000000000e-15  2.1000000000e-15  4.1000000000e-16\n",
        );
        let obs = read_epoch(file.path(), &baseline_layout()).unwrap();
        assert_eq!(obs.wavelength, vec![1214.0, 1214.01]);
        assert_eq!(obs.rv.len(), 2);
        assert_eq!(obs.exposures.len(), 1);
        assert_eq!(obs.exposures[0].id.aperture, Aperture::OnAxis);
        assert_eq!(obs.exposures[0].flux, vec![1.0e-14, 1.1e-14]);
        assert_eq!(obs.airglow_error, vec![4.0e-16, 4.1e-16]);
        assert!(obs.mean_flux.is_none());
        assert!(obs.validate().is_ok());
    }

    #[test]
    fn reads_four_position_epoch_with_trailing_mean() {
        let layout = EpochLayout::new(
            "2015-12-24",
            vec![
                Aperture::OnAxis,
                Aperture::Minus08,
                Aperture::Plus08,
                Aperture::Plus11,
            ],
            TrailingColumns::MeanFlux,
        );
        assert_eq!(layout.column_count(), 13);
        let row: Vec<String> = (0..13).map(|i| format!("{}.0", i + 1)).collect();
        let file = write_file(&format!("{}\n", row.join(" ")));
        let obs = read_epoch(file.path(), &layout).unwrap();
        assert_eq!(obs.wavelength, vec![1.0]);
        assert_eq!(obs.exposures.len(), 4);
        assert_eq!(obs.exposures[3].flux, vec![9.0]);
        assert_eq!(obs.exposures[3].error, vec![10.0]);
        assert_eq!(obs.airglow_flux, vec![11.0]);
        assert_eq!(obs.mean_flux, Some(vec![13.0]));
        assert!(obs.mean_error.is_none());
    }

    #[test]
    fn comments_and_blank_lines_skipped() {
        let file = write_file(
            "# header comment\n\
             \n\
             1214.0 -400.0 1.0e-14 1.0e-15 0.0 1.0e-16\n",
        );
        let obs = read_epoch(file.path(), &baseline_layout()).unwrap();
        assert_eq!(obs.wavelength.len(), 1);
    }

    #[test]
    fn wrong_column_count_names_the_line() {
        let file = write_file(
            "1214.0 -400.0 1.0e-14 1.0e-15 0.0 1.0e-16\n\
             1214.01 -399.0 1.0e-14 1.0e-15 0.0\n",
        );
        let result = read_epoch(file.path(), &baseline_layout());
        assert!(matches!(
            result,
            Err(IoError::Malformed { line: 2, .. })
        ));
    }

    #[test]
    fn bad_number_names_the_column() {
        let file = write_file("1214.0 -400.0 bogus 1.0e-15 0.0 1.0e-16\n");
        let result = read_epoch(file.path(), &baseline_layout());
        match result {
            Err(IoError::Malformed { line, detail, .. }) => {
                assert_eq!(line, 1);
                assert!(detail.contains("column 3"));
            }
            other => panic!("expected malformed row, got {:?}", other),
        }
    }

    #[test]
    fn nan_sample_rejected() {
        let file = write_file(
            "1214.0 -400.0 1.0e-14 1.0e-15 0.0 1.0e-16\n\
             1214.01 -399.0 nan 1.0e-15 0.0 1.0e-16\n",
        );
        let result = read_epoch(file.path(), &baseline_layout());
        match result {
            Err(IoError::Malformed { line, detail, .. }) => {
                assert_eq!(line, 2);
                assert!(detail.contains("column 3"));
                assert!(detail.contains("non-finite"));
            }
            other => panic!("expected malformed row, got {:?}", other),
        }
    }

    #[test]
    fn infinite_sample_rejected() {
        let file = write_file("1214.0 -400.0 1.0e-14 inf 0.0 1.0e-16\n");
        let result = read_epoch(file.path(), &baseline_layout());
        assert!(matches!(result, Err(IoError::Malformed { line: 1, .. })));
    }

    #[test]
    fn missing_file_reports_open_error() {
        let result = read_epoch(Path::new("/nonexistent/B_2014.dat"), &baseline_layout());
        assert!(matches!(result, Err(IoError::Open { .. })));
    }

    #[test]
    fn empty_file_rejected() {
        let file = write_file("# only a comment\n");
        let result = read_epoch(file.path(), &baseline_layout());
        assert!(matches!(result, Err(IoError::Malformed { line: 0, .. })));
    }
}
