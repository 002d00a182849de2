//! End-to-end calibration and stitching pipeline.
//!
//! Load epochs, cross-check co-registration, calibrate every offset
//! exposure against the baseline on-axis segment, combine per aperture,
//! and stitch by RV region. The on-axis candidate is the baseline segment
//! alone: the later visits' on-axis exposures carry differently-placed
//! airglow and never enter the composite. Running them through the
//! single-series combiner keeps one code path for all four candidates.

use std::path::Path;

use log::{debug, info};
use thiserror::Error;

use crate::airglow::{AirglowError, AirglowTemplate};
use crate::calibrate::{self, CalibrateError};
use crate::combine::{self, Combined, CombineError};
use crate::config::AnalysisConfig;
use crate::io::{self, EpochLayout, IoError};
use crate::segment::{
    check_coregistered, wave_to_rv, Aperture, EpochObservation, Segment, SegmentError,
};
use crate::stitch::{self, CandidateSet, CompositeSpectrum, StitchError};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no epochs supplied")]
    NoEpochs,
    #[error("baseline epoch {0} with an on-axis exposure not found")]
    MissingBaseline(String),
    #[error("no calibrated exposures for the {0} candidate")]
    MissingAperture(Aperture),
    #[error(transparent)]
    Segment(#[from] SegmentError),
    #[error(transparent)]
    Combine(#[from] CombineError),
    #[error(transparent)]
    Calibrate(#[from] CalibrateError),
    #[error(transparent)]
    Airglow(#[from] AirglowError),
    #[error(transparent)]
    Stitch(#[from] StitchError),
    #[error(transparent)]
    Io(#[from] IoError),
}

/// Calibrated exposures grouped by aperture, plus the grids and the
/// airglow template they share.
#[derive(Debug, Clone)]
pub struct CalibratedGroups {
    pub wavelength: Vec<f64>,
    pub rv: Vec<f64>,
    pub on_axis: Vec<Segment>,
    pub minus08: Vec<Segment>,
    pub plus08: Vec<Segment>,
    pub plus11: Vec<Segment>,
    pub airglow: AirglowTemplate,
}

/// Read epoch files in layout order.
pub fn load_epochs(
    files: &[(&Path, &EpochLayout)],
) -> Result<Vec<EpochObservation>, PipelineError> {
    files
        .iter()
        .map(|(path, layout)| Ok(io::read_epoch(path, layout)?))
        .collect()
}

/// Validate, calibrate and group all exposures.
pub fn calibrate_groups(
    epochs: &[EpochObservation],
    config: &AnalysisConfig,
) -> Result<CalibratedGroups, PipelineError> {
    if epochs.is_empty() {
        return Err(PipelineError::NoEpochs);
    }
    for epoch in epochs {
        epoch.validate()?;
    }
    check_coregistered(epochs)?;

    let baseline_epoch = &config.baseline_epoch;
    let baseline = epochs
        .iter()
        .find(|e| &e.epoch == baseline_epoch)
        .and_then(|e| e.exposure(Aperture::OnAxis))
        .ok_or_else(|| PipelineError::MissingBaseline(baseline_epoch.clone()))?;

    let wavelength = epochs[0].wavelength.clone();
    let rv = wave_to_rv(
        &wavelength,
        config.line.rest_wavelength,
        config.line.system_rv_km_s,
    );

    let airglow_columns: Vec<(&[f64], &[f64])> = epochs
        .iter()
        .map(|e| (e.airglow_flux.as_slice(), e.airglow_error.as_slice()))
        .collect();
    let airglow = AirglowTemplate::from_epochs(&rv, &airglow_columns)?;

    let band = config.reference_band.0..config.reference_band.1;
    let mut groups = CalibratedGroups {
        wavelength,
        rv,
        on_axis: vec![baseline.clone()],
        minus08: Vec::new(),
        plus08: Vec::new(),
        plus11: Vec::new(),
        airglow,
    };

    for epoch in epochs {
        for exposure in &epoch.exposures {
            if exposure.id.aperture == Aperture::OnAxis {
                if &epoch.epoch != baseline_epoch {
                    debug!(
                        "skipping {}: only the baseline on-axis exposure enters the composite",
                        exposure.id
                    );
                }
                continue;
            }
            let factor = calibrate::correction_factor(
                &exposure.flux,
                &exposure.error,
                &baseline.flux,
                &baseline.error,
                band.clone(),
            )?;
            info!("correction factor for {}: {:.6}", exposure.id, factor);
            let mut calibrated = exposure.clone();
            calibrated.scale(factor);
            match calibrated.id.aperture {
                Aperture::OnAxis => unreachable!("on-axis handled above"),
                Aperture::Minus08 => groups.minus08.push(calibrated),
                Aperture::Plus08 => groups.plus08.push(calibrated),
                Aperture::Plus11 => groups.plus11.push(calibrated),
            }

            if let Some(pixels) = config
                .airglow_shifts
                .offset_for(&epoch.epoch, exposure.id.aperture)
            {
                if let Some((lo, hi)) = groups
                    .airglow
                    .contamination_span(pixels, config.airglow_peak_fraction)
                {
                    info!(
                        "airglow in {} expected over rv [{:.1}, {:.1}] km/s (shift {} px)",
                        exposure.id, lo, hi, pixels
                    );
                }
            }
        }
    }

    info!(
        "calibrated groups: {} on-axis, {} at -0.8\", {} at +0.8\", {} at +1.1\"",
        groups.on_axis.len(),
        groups.minus08.len(),
        groups.plus08.len(),
        groups.plus11.len()
    );
    Ok(groups)
}

/// Full pipeline: calibrate, combine per aperture, stitch by RV region.
pub fn build_composite(
    epochs: &[EpochObservation],
    config: &AnalysisConfig,
) -> Result<CompositeSpectrum, PipelineError> {
    let groups = calibrate_groups(epochs, config)?;
    let candidates = CandidateSet {
        on_axis: combine_group(&groups.on_axis, Aperture::OnAxis)?,
        minus08: combine_group(&groups.minus08, Aperture::Minus08)?,
        plus08: combine_group(&groups.plus08, Aperture::Plus08)?,
        plus11: combine_group(&groups.plus11, Aperture::Plus11)?,
    };
    let composite = stitch::stitch(
        &groups.wavelength,
        &groups.rv,
        &candidates,
        &config.breakpoints,
    )?;
    info!("stitched composite: {} samples", composite.len());
    Ok(composite)
}

/// Sky-subtracted variant: the -0.8" exposures cover the blue wing, the
/// +0.8" and +1.1" exposures the red wing, split at rv = 0.
pub fn build_wing_composite(
    epochs: &[EpochObservation],
    config: &AnalysisConfig,
) -> Result<CompositeSpectrum, PipelineError> {
    let groups = calibrate_groups(epochs, config)?;
    let blue = combine_group(&groups.minus08, Aperture::Minus08)?;

    let mut red_segments = groups.plus08.clone();
    red_segments.extend(groups.plus11.iter().cloned());
    let red = combine_group(&red_segments, Aperture::Plus08)?;

    let composite = stitch::wing_composite(&groups.wavelength, &groups.rv, &blue, &red)?;
    info!("stitched wing composite: {} samples", composite.len());
    Ok(composite)
}

fn combine_group(group: &[Segment], aperture: Aperture) -> Result<Combined, PipelineError> {
    if group.is_empty() {
        return Err(PipelineError::MissingAperture(aperture));
    }
    let series: Vec<(&[f64], &[f64])> = group
        .iter()
        .map(|s| (s.flux.as_slice(), s.error.as_slice()))
        .collect();
    Ok(combine::inverse_variance_combine(&series)?)
}
