//! Geocoronal airglow template and its per-aperture alignment.
//!
//! Airglow enters every exposure at the instrument's rest frame, so moving
//! the slit does not move the star but does move where the geocoronal line
//! lands on the detector. The template is the inverse-variance combination
//! of the on-axis airglow columns across epochs; shifting it by an
//! empirically measured pixel offset predicts where contamination falls in
//! an offset exposure. The template is used to identify contaminated RV
//! windows, never subtracted from the data.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::combine::{self, CombineError};
use crate::segment::Aperture;

#[derive(Error, Debug)]
pub enum AirglowError {
    #[error(transparent)]
    Combine(#[from] CombineError),
    #[error("template and rv grid lengths differ: {template} vs {rv}")]
    GridMismatch { template: usize, rv: usize },
}

/// Empirical pixel offset of the geocoronal line for one (epoch, aperture)
/// exposure relative to the on-axis template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirglowShift {
    pub epoch: String,
    pub aperture: Aperture,
    pub pixels: i64,
}

/// Lookup table of empirical airglow shifts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirglowShiftTable {
    pub shifts: Vec<AirglowShift>,
}

impl AirglowShiftTable {
    pub fn offset_for(&self, epoch: &str, aperture: Aperture) -> Option<i64> {
        self.shifts
            .iter()
            .find(|s| s.epoch == epoch && s.aperture == aperture)
            .map(|s| s.pixels)
    }
}

/// Combined geocoronal emission template on the campaign's RV grid.
#[derive(Debug, Clone, PartialEq)]
pub struct AirglowTemplate {
    rv: Vec<f64>,
    flux: Vec<f64>,
    error: Vec<f64>,
}

impl AirglowTemplate {
    /// Build the template by inverse-variance combining the airglow columns
    /// of several epochs' on-axis exposures.
    pub fn from_epochs(
        rv: &[f64],
        airglow: &[(&[f64], &[f64])],
    ) -> Result<Self, AirglowError> {
        let combined = combine::inverse_variance_combine(airglow)?;
        if combined.flux.len() != rv.len() {
            return Err(AirglowError::GridMismatch {
                template: combined.flux.len(),
                rv: rv.len(),
            });
        }
        Ok(Self {
            rv: rv.to_vec(),
            flux: combined.flux,
            error: combined.error,
        })
    }

    pub fn rv(&self) -> &[f64] {
        &self.rv
    }

    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    pub fn error(&self) -> &[f64] {
        &self.error
    }

    /// Template flux circularly shifted by `pixels`. Positive shifts move
    /// samples toward higher indices, wrapping at the ends.
    pub fn shifted_flux(&self, pixels: i64) -> Vec<f64> {
        circular_shift(&self.flux, pixels)
    }

    /// RV span where the template, shifted for the given exposure, reaches
    /// at least `fraction_of_peak` of its maximum. `None` when the template
    /// has no positive flux anywhere.
    pub fn contamination_span(
        &self,
        pixels: i64,
        fraction_of_peak: f64,
    ) -> Option<(f64, f64)> {
        let shifted = self.shifted_flux(pixels);
        let peak = shifted.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if !(peak > 0.0) {
            return None;
        }
        let threshold = peak * fraction_of_peak;
        let mut span: Option<(f64, f64)> = None;
        for (i, &f) in shifted.iter().enumerate() {
            if f >= threshold {
                let rv = self.rv[i];
                span = Some(match span {
                    None => (rv, rv),
                    Some((lo, hi)) => (lo.min(rv), hi.max(rv)),
                });
            }
        }
        span
    }
}

/// Circular shift with wrap-around; positive `pixels` moves samples toward
/// higher indices.
pub fn circular_shift(series: &[f64], pixels: i64) -> Vec<f64> {
    let n = series.len();
    if n == 0 {
        return Vec::new();
    }
    let mut shifted = vec![0.0; n];
    for (i, value) in series.iter().enumerate() {
        let target = (i as i64 + pixels).rem_euclid(n as i64) as usize;
        shifted[target] = *value;
    }
    shifted
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn shift_moves_samples_toward_higher_indices() {
        let shifted = circular_shift(&[1.0, 2.0, 3.0, 4.0], 1);
        assert_eq!(shifted, vec![4.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn negative_shift_moves_samples_back() {
        let shifted = circular_shift(&[1.0, 2.0, 3.0, 4.0], -1);
        assert_eq!(shifted, vec![2.0, 3.0, 4.0, 1.0]);
    }

    #[test]
    fn shift_wraps_past_full_turns() {
        let series = [1.0, 2.0, 3.0];
        assert_eq!(circular_shift(&series, 4), circular_shift(&series, 1));
        assert_eq!(circular_shift(&series, -5), circular_shift(&series, 1));
    }

    #[test]
    fn template_combines_epochs() {
        let rv = [-1.0, 0.0, 1.0];
        let f1 = [1.0, 4.0, 1.0];
        let f2 = [3.0, 8.0, 3.0];
        let ones = [1.0; 3];
        let template = AirglowTemplate::from_epochs(&rv, &[(&f1, &ones), (&f2, &ones)]).unwrap();
        assert_relative_eq!(template.flux()[1], 6.0);
        // Equal input errors stay put under the pipeline convention.
        assert_relative_eq!(template.error()[1], 1.0);
    }

    #[test]
    fn contamination_span_tracks_the_shifted_peak() {
        let rv: Vec<f64> = (0..9).map(|i| (i as f64 - 4.0) * 10.0).collect();
        let flux = [0.0, 0.0, 0.5, 1.0, 2.0, 1.0, 0.5, 0.0, 0.0];
        let errors = [0.1; 9];
        let template = AirglowTemplate::from_epochs(&rv, &[(&flux, &errors)]).unwrap();

        // Unshifted: samples at half the peak or above sit at rv -10..10.
        assert_eq!(template.contamination_span(0, 0.5), Some((-10.0, 10.0)));
        // Shifting two pixels right moves the whole window by two samples.
        assert_eq!(template.contamination_span(2, 0.5), Some((10.0, 30.0)));
    }

    #[test]
    fn flat_zero_template_has_no_span() {
        let rv = [0.0, 1.0, 2.0];
        let flux = [0.0; 3];
        let errors = [0.1; 3];
        let template = AirglowTemplate::from_epochs(&rv, &[(&flux, &errors)]).unwrap();
        assert_eq!(template.contamination_span(0, 0.5), None);
    }

    #[test]
    fn shift_table_lookup() {
        let table = AirglowShiftTable {
            shifts: vec![AirglowShift {
                epoch: "2015-12-24".to_string(),
                aperture: Aperture::Plus11,
                pixels: -64,
            }],
        };
        assert_eq!(table.offset_for("2015-12-24", Aperture::Plus11), Some(-64));
        assert_eq!(table.offset_for("2015-12-24", Aperture::Plus08), None);
    }
}
