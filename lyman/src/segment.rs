//! Spectral segments and their provenance.
//!
//! A segment is one exposure's (flux, error) pair on the wavelength grid it
//! shares with every other exposure of the campaign. Segments never carry
//! their own copy of the grid; the owning [`EpochObservation`] does, and
//! cross-epoch co-registration is checked before anything is combined.

use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::Physical;

#[derive(Error, Debug)]
pub enum SegmentError {
    #[error("{id}: flux has {flux} samples but error has {error}")]
    LengthMismatch { id: String, flux: usize, error: usize },
    #[error("{id}: expected {expected} samples, found {len}")]
    GridMismatch {
        id: String,
        len: usize,
        expected: usize,
    },
    #[error("wavelength grid not strictly increasing at sample {index}")]
    NonMonotonicGrid { index: usize },
    #[error("{id}: non-finite value {value} at sample {index}")]
    NonFiniteSample {
        id: String,
        index: usize,
        value: f64,
    },
    #[error("epochs {a} and {b} are not co-registered: {detail}")]
    NotCoregistered { a: String, b: String, detail: String },
    #[error("empty observation {0}")]
    Empty(String),
    #[error("cannot rebin {len} samples into bins of {bin_points}")]
    BinTooWide { len: usize, bin_points: usize },
}

/// Slit position of an exposure relative to the star, in arcseconds along
/// the cross-dispersion axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aperture {
    OnAxis,
    Minus08,
    Plus08,
    Plus11,
}

impl Aperture {
    pub fn offset_arcsec(&self) -> f64 {
        match self {
            Aperture::OnAxis => 0.0,
            Aperture::Minus08 => -0.8,
            Aperture::Plus08 => 0.8,
            Aperture::Plus11 => 1.1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Aperture::OnAxis => "0.0\"",
            Aperture::Minus08 => "-0.8\"",
            Aperture::Plus08 => "+0.8\"",
            Aperture::Plus11 => "+1.1\"",
        }
    }
}

impl fmt::Display for Aperture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Provenance tag: which epoch and slit position a segment came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId {
    pub epoch: String,
    pub aperture: Aperture,
}

impl SegmentId {
    pub fn new(epoch: impl Into<String>, aperture: Aperture) -> Self {
        Self {
            epoch: epoch.into(),
            aperture,
        }
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.epoch, self.aperture)
    }
}

/// One exposure's flux and error series.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub id: SegmentId,
    pub flux: Vec<f64>,
    pub error: Vec<f64>,
}

impl Segment {
    pub fn new(id: SegmentId, flux: Vec<f64>, error: Vec<f64>) -> Result<Self, SegmentError> {
        if flux.len() != error.len() {
            return Err(SegmentError::LengthMismatch {
                id: id.to_string(),
                flux: flux.len(),
                error: error.len(),
            });
        }
        Ok(Self { id, flux, error })
    }

    pub fn len(&self) -> usize {
        self.flux.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flux.is_empty()
    }

    /// Multiply flux and error by a correction factor, in place.
    pub fn scale(&mut self, factor: f64) {
        for f in &mut self.flux {
            *f *= factor;
        }
        for e in &mut self.error {
            *e *= factor;
        }
    }
}

/// Everything one epoch file yields: the shared grids, the per-aperture
/// exposures, the airglow columns, and the optional precomputed mean.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochObservation {
    pub epoch: String,
    pub wavelength: Vec<f64>,
    pub rv: Vec<f64>,
    pub exposures: Vec<Segment>,
    pub airglow_flux: Vec<f64>,
    pub airglow_error: Vec<f64>,
    pub mean_flux: Option<Vec<f64>>,
    pub mean_error: Option<Vec<f64>>,
}

impl EpochObservation {
    /// Check internal consistency: every series the same length as the
    /// wavelength grid, the grid strictly increasing, and every sample
    /// finite (NaN compares false against both neighbours, so the ordering
    /// check alone would let a NaN wavelength through).
    pub fn validate(&self) -> Result<(), SegmentError> {
        let n = self.wavelength.len();
        if n == 0 {
            return Err(SegmentError::Empty(self.epoch.clone()));
        }
        check_finite(&format!("{} wavelength", self.epoch), &self.wavelength)?;
        check_monotonic(&self.wavelength)?;
        check_series(&format!("{} rv", self.epoch), &self.rv, n)?;
        check_series(&format!("{} airglow", self.epoch), &self.airglow_flux, n)?;
        check_series(
            &format!("{} airglow error", self.epoch),
            &self.airglow_error,
            n,
        )?;
        for exposure in &self.exposures {
            check_series(&exposure.id.to_string(), &exposure.flux, n)?;
            check_series(&format!("{} error", exposure.id), &exposure.error, n)?;
        }
        if let Some(mean) = &self.mean_flux {
            check_series(&format!("{} mean flux", self.epoch), mean, n)?;
        }
        if let Some(mean) = &self.mean_error {
            check_series(&format!("{} mean error", self.epoch), mean, n)?;
        }
        Ok(())
    }

    pub fn exposure(&self, aperture: Aperture) -> Option<&Segment> {
        self.exposures.iter().find(|s| s.id.aperture == aperture)
    }
}

fn check_len(id: &str, len: usize, expected: usize) -> Result<(), SegmentError> {
    if len != expected {
        return Err(SegmentError::GridMismatch {
            id: id.to_string(),
            len,
            expected,
        });
    }
    Ok(())
}

fn check_finite(id: &str, series: &[f64]) -> Result<(), SegmentError> {
    for (index, value) in series.iter().enumerate() {
        if !value.is_finite() {
            return Err(SegmentError::NonFiniteSample {
                id: id.to_string(),
                index,
                value: *value,
            });
        }
    }
    Ok(())
}

fn check_series(id: &str, series: &[f64], expected: usize) -> Result<(), SegmentError> {
    check_len(id, series.len(), expected)?;
    check_finite(id, series)
}

fn check_monotonic(wavelength: &[f64]) -> Result<(), SegmentError> {
    for (index, pair) in wavelength.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(SegmentError::NonMonotonicGrid { index: index + 1 });
        }
    }
    Ok(())
}

/// Verify that every epoch shares the first epoch's wavelength grid, sample
/// for sample. Exposures can only be calibrated against each other and
/// stitched when this holds.
pub fn check_coregistered(epochs: &[EpochObservation]) -> Result<(), SegmentError> {
    let Some((first, rest)) = epochs.split_first() else {
        return Ok(());
    };
    for other in rest {
        if other.wavelength.len() != first.wavelength.len() {
            return Err(SegmentError::NotCoregistered {
                a: first.epoch.clone(),
                b: other.epoch.clone(),
                detail: format!(
                    "{} vs {} samples",
                    first.wavelength.len(),
                    other.wavelength.len()
                ),
            });
        }
        for (index, (a, b)) in first.wavelength.iter().zip(&other.wavelength).enumerate() {
            if a != b {
                return Err(SegmentError::NotCoregistered {
                    a: first.epoch.clone(),
                    b: other.epoch.clone(),
                    detail: format!("wavelength {} vs {} at sample {}", a, b, index),
                });
            }
        }
    }
    Ok(())
}

/// Convert a wavelength grid [Angstrom] to radial velocities [km/s] about a
/// rest wavelength shifted by the system's own bulk velocity.
pub fn wave_to_rv(wavelength: &[f64], rest_wavelength: f64, system_rv_km_s: f64) -> Vec<f64> {
    let c = Physical::SPEED_OF_LIGHT_M_S;
    let shifted = rest_wavelength * (1.0 + system_rv_km_s * 1.0e3 / c);
    wavelength
        .iter()
        .map(|w| ((w - shifted) / shifted) * c / 1.0e3)
        .collect()
}

/// Rebinned (x, y, error) series produced by [`rebin`].
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedSeries {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub error: Vec<f64>,
}

/// Average a series into equal-width bins of roughly `bin_points` samples.
///
/// Bin edges span `[x[0], x[last]]` with `len / bin_points` intervals; each
/// sample joins the interval containing it (the last interval is closed on
/// the right). Reported x is the bin midpoint, y the plain mean, and the
/// error the mean error divided by sqrt(bin_points). Intervals that receive
/// no samples are dropped rather than reported as NaN.
pub fn rebin(
    x: &[f64],
    y: &[f64],
    error: &[f64],
    bin_points: usize,
) -> Result<BinnedSeries, SegmentError> {
    let n = x.len();
    if bin_points == 0 || bin_points > n {
        return Err(SegmentError::BinTooWide {
            len: n,
            bin_points,
        });
    }
    if y.len() != n || error.len() != n {
        return Err(SegmentError::LengthMismatch {
            id: "rebin input".to_string(),
            flux: y.len(),
            error: error.len(),
        });
    }
    check_monotonic(x)?;

    let n_bins = n / bin_points;
    let span = x[n - 1] - x[0];
    let width = span / n_bins as f64;

    let mut count = vec![0usize; n_bins];
    let mut y_sum = vec![0.0; n_bins];
    let mut e_sum = vec![0.0; n_bins];
    for i in 0..n {
        let mut bin = ((x[i] - x[0]) / width) as usize;
        if bin >= n_bins {
            bin = n_bins - 1;
        }
        count[bin] += 1;
        y_sum[bin] += y[i];
        e_sum[bin] += error[i];
    }

    let mut binned = BinnedSeries {
        x: Vec::with_capacity(n_bins),
        y: Vec::with_capacity(n_bins),
        error: Vec::with_capacity(n_bins),
    };
    let scale = 1.0 / (bin_points as f64).sqrt();
    for bin in 0..n_bins {
        if count[bin] == 0 {
            warn!("rebin: interval {} received no samples, dropping it", bin);
            continue;
        }
        let members = count[bin] as f64;
        binned.x.push(x[0] + (bin as f64 + 0.5) * width);
        binned.y.push(y_sum[bin] / members);
        binned.error.push(e_sum[bin] / members * scale);
    }
    Ok(binned)
}
