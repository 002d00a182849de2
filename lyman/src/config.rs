//! Explicit analysis configuration.
//!
//! Every tunable of the pipeline and forward model lives here: nothing in
//! the numerical core reads globals, environment variables, or hardcoded
//! paths. Configurations serialize to JSON so a fit can be reproduced from
//! the file that drove it; deserialized values go through [`AnalysisConfig::validate`]
//! because serde bypasses the validating constructors.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::airglow::{AirglowShift, AirglowShiftTable};
use crate::io::{EpochLayout, TrailingColumns};
use crate::model::absorption::{AbsorptionError, GasColumn};
use crate::model::emission::{EmissionError, EmissionParams};
use crate::model::forward::InstrumentConfig;
use crate::segment::Aperture;
use crate::stitch::{RvBreakpoints, StitchError};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot open config {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("reference band {start}..{end} is empty")]
    EmptyReferenceBand { start: usize, end: usize },
    #[error("airglow peak fraction must lie in (0, 1], got {0}")]
    InvalidPeakFraction(f64),
    #[error("kernel sigma must be positive and finite, got {0}")]
    InvalidKernelSigma(f64),
    #[error("rest wavelength must be positive and finite, got {0}")]
    InvalidRestWavelength(f64),
    #[error(transparent)]
    Stitch(#[from] StitchError),
    #[error(transparent)]
    Absorption(#[from] AbsorptionError),
    #[error(transparent)]
    Emission(#[from] EmissionError),
}

/// Line geometry shared by the pipeline and the forward model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineConfig {
    /// Rest wavelength for RV conversion and stitching [Angstrom].
    pub rest_wavelength: f64,
    /// Rest wavelength the forward model centers its grid on [Angstrom].
    /// Kept separate: the two differ by a few milliangstrom of doublet
    /// weighting and must not be silently unified.
    pub fit_rest_wavelength: f64,
    /// Systemic radial velocity of the target [km/s].
    pub system_rv_km_s: f64,
}

/// Immutable configuration for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub line: LineConfig,
    /// Epoch whose on-axis exposure anchors the flux calibration.
    pub baseline_epoch: String,
    /// Sample index range [start, end) of the correction-factor band.
    pub reference_band: (usize, usize),
    pub breakpoints: RvBreakpoints,
    pub airglow_shifts: AirglowShiftTable,
    /// Fraction of the airglow template peak defining a contaminated sample.
    pub airglow_peak_fraction: f64,
    pub instrument: InstrumentConfig,
    pub emission: EmissionParams,
    pub ism: GasColumn,
    pub disk: GasColumn,
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AnalysisConfig = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let file = File::create(path).map_err(|source| ConfigError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::to_writer_pretty(BufWriter::new(file), self).map_err(|source| {
            ConfigError::Write {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for value in [
            self.line.rest_wavelength,
            self.line.fit_rest_wavelength,
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidRestWavelength(value));
            }
        }
        let (start, end) = self.reference_band;
        if start >= end {
            return Err(ConfigError::EmptyReferenceBand { start, end });
        }
        if !(self.airglow_peak_fraction > 0.0 && self.airglow_peak_fraction <= 1.0) {
            return Err(ConfigError::InvalidPeakFraction(self.airglow_peak_fraction));
        }
        if !(self.instrument.kernel_sigma_px.is_finite() && self.instrument.kernel_sigma_px > 0.0)
        {
            return Err(ConfigError::InvalidKernelSigma(
                self.instrument.kernel_sigma_px,
            ));
        }
        self.breakpoints.validate()?;
        self.emission.validate()?;
        self.ism.validate()?;
        self.disk.validate()?;
        Ok(())
    }
}

/// Published parameter sets.
pub mod presets {
    use super::*;

    /// The beta Pictoris campaign configuration: 2014 baseline plus three
    /// offset-aperture visits, with the absorber and emission parameters of
    /// the adopted best fit.
    pub static BETA_PIC: Lazy<AnalysisConfig> = Lazy::new(|| AnalysisConfig {
        line: LineConfig {
            rest_wavelength: 1215.6702,
            fit_rest_wavelength: 1215.6737,
            system_rv_km_s: 20.5,
        },
        baseline_epoch: "2014".to_string(),
        reference_band: (800, 950),
        breakpoints: RvBreakpoints {
            on_axis_blue_end: -350.0,
            minus08_end: -165.0,
            plus11_start: 108.0,
            plus11_end: 140.0,
            on_axis_red_start: 295.0,
        },
        airglow_shifts: AirglowShiftTable {
            // Empirical geocoronal line positions per visit, measured as
            // whole-pixel offsets against the on-axis template.
            shifts: vec![
                shift("2015-12-10", Aperture::Minus08, 54),
                shift("2015-12-10", Aperture::Plus08, -46),
                shift("2015-12-24", Aperture::Minus08, 53),
                shift("2015-12-24", Aperture::Plus08, -47),
                shift("2015-12-24", Aperture::Plus11, -64),
                shift("2016-01-30", Aperture::Minus08, 52),
                shift("2016-01-30", Aperture::Plus08, -45),
                shift("2016-01-30", Aperture::Plus11, -63),
            ],
        },
        airglow_peak_fraction: 0.05,
        instrument: InstrumentConfig {
            kernel_sigma_px: 7.0,
        },
        emission: EmissionParams {
            amplitude: 4.395e-13,
            peak_offset: 0.0,
            scale: 11.0,
            damping: 8.0,
        },
        ism: GasColumn::hydrogen_deuterium("ism", 18.0, 7.0, 7000.0, 10.0)
            .unwrap_or_else(|e| panic!("beta Pic ISM preset invalid: {}", e)),
        disk: GasColumn::hydrogen_deuterium("disk", 18.45, 2.0, 1000.0, 20.5)
            .unwrap_or_else(|e| panic!("beta Pic disk preset invalid: {}", e)),
    });

    /// Epoch file layouts of the campaign, in chronological order.
    pub static BETA_PIC_LAYOUTS: Lazy<Vec<EpochLayout>> = Lazy::new(|| {
        vec![
            EpochLayout::new("2014", vec![Aperture::OnAxis], TrailingColumns::None),
            EpochLayout::new(
                "2015-12-10",
                vec![Aperture::OnAxis, Aperture::Minus08, Aperture::Plus08],
                TrailingColumns::MeanFlux,
            ),
            EpochLayout::new(
                "2015-12-24",
                vec![
                    Aperture::OnAxis,
                    Aperture::Minus08,
                    Aperture::Plus08,
                    Aperture::Plus11,
                ],
                TrailingColumns::MeanFlux,
            ),
            EpochLayout::new(
                "2016-01-30",
                vec![
                    Aperture::OnAxis,
                    Aperture::Minus08,
                    Aperture::Plus08,
                    Aperture::Plus11,
                ],
                TrailingColumns::MeanFlux,
            ),
        ]
    });

    fn shift(epoch: &str, aperture: Aperture, pixels: i64) -> AirglowShift {
        AirglowShift {
            epoch: epoch.to_string(),
            aperture,
            pixels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn beta_pic_preset_is_valid() {
        presets::BETA_PIC.validate().unwrap();
    }

    #[test]
    fn beta_pic_layout_columns_match_the_campaign_files() {
        let layouts = &*presets::BETA_PIC_LAYOUTS;
        let counts: Vec<usize> = layouts.iter().map(|l| l.column_count()).collect();
        assert_eq!(counts, vec![6, 11, 13, 13]);
    }

    #[test]
    fn json_round_trip_preserves_the_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("analysis.json");
        let config = presets::BETA_PIC.clone();
        config.save(&path).unwrap();
        let loaded = AnalysisConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn unordered_breakpoints_fail_validation() {
        let mut config = presets::BETA_PIC.clone();
        config.breakpoints.plus11_start = 200.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Stitch(StitchError::UnorderedBreakpoints(_)))
        ));
    }

    #[test]
    fn empty_reference_band_rejected() {
        let mut config = presets::BETA_PIC.clone();
        config.reference_band = (950, 950);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyReferenceBand { .. })
        ));
    }

    #[test]
    fn bad_peak_fraction_rejected() {
        let mut config = presets::BETA_PIC.clone();
        config.airglow_peak_fraction = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPeakFraction(_))
        ));
    }

    #[test]
    fn preset_shift_table_covers_offset_apertures() {
        let shifts = &presets::BETA_PIC.airglow_shifts;
        assert!(shifts.offset_for("2015-12-24", Aperture::Plus11).is_some());
        assert!(shifts.offset_for("2014", Aperture::OnAxis).is_none());
        // Offset directions: -0.8" pushes airglow redward, +0.8"/+1.1"
        // blueward.
        assert!(shifts.offset_for("2015-12-10", Aperture::Minus08).unwrap() > 0);
        assert!(shifts.offset_for("2015-12-10", Aperture::Plus08).unwrap() < 0);
    }
}
