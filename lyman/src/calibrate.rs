//! Flux-scale calibration of offset exposures against a baseline segment.
//!
//! Each aperture-offset exposure sees the same star through a different slit
//! position, so its absolute flux scale drifts relative to the on-axis
//! baseline. The correction factor is the ratio of inverse-variance weighted
//! means over a clean continuum band shared by both segments; multiplying an
//! exposure's flux and error by its factor puts it on the baseline scale.

use std::ops::Range;

use log::debug;
use thiserror::Error;

use crate::combine::{self, CombineError};

#[derive(Error, Debug)]
pub enum CalibrateError {
    #[error("reference band {start}..{end} does not fit a series of length {len}")]
    BandOutOfRange {
        start: usize,
        end: usize,
        len: usize,
    },
    #[error("degenerate reference band: weighted mean {0} is not positive and finite")]
    DegenerateReference(f64),
    #[error("degenerate target band: weighted mean {0} is not positive and finite")]
    DegenerateTarget(f64),
    #[error(transparent)]
    Combine(#[from] CombineError),
}

/// Correction factor rescaling `target` onto `reference`'s flux calibration,
/// computed over the index band `[band.start, band.end)` of both segments.
///
/// A segment calibrated against itself over any valid band yields exactly 1.0.
/// Degenerate bands (non-positive or non-finite weighted mean on either side)
/// are rejected instead of letting a NaN or infinite factor propagate into
/// the composite.
pub fn correction_factor(
    target_flux: &[f64],
    target_error: &[f64],
    reference_flux: &[f64],
    reference_error: &[f64],
    band: Range<usize>,
) -> Result<f64, CalibrateError> {
    check_band(&band, target_flux.len())?;
    check_band(&band, target_error.len())?;
    check_band(&band, reference_flux.len())?;
    check_band(&band, reference_error.len())?;

    let reference_mean = combine::weighted_mean(
        &reference_flux[band.clone()],
        &reference_error[band.clone()],
    )?;
    if !(reference_mean.is_finite() && reference_mean > 0.0) {
        return Err(CalibrateError::DegenerateReference(reference_mean));
    }

    let target_mean =
        combine::weighted_mean(&target_flux[band.clone()], &target_error[band.clone()])?;
    if !(target_mean.is_finite() && target_mean > 0.0) {
        return Err(CalibrateError::DegenerateTarget(target_mean));
    }

    let factor = reference_mean / target_mean;
    debug!(
        "correction factor {:.6} from band {}..{} (reference mean {:.4e}, target mean {:.4e})",
        factor, band.start, band.end, reference_mean, target_mean
    );
    Ok(factor)
}

fn check_band(band: &Range<usize>, len: usize) -> Result<(), CalibrateError> {
    if band.start >= band.end || band.end > len {
        return Err(CalibrateError::BandOutOfRange {
            start: band.start,
            end: band.end,
            len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn self_calibration_is_unity() {
        let flux = [3.0, 2.5, 4.0, 3.5];
        let error = [0.3, 0.2, 0.4, 0.1];
        let factor = correction_factor(&flux, &error, &flux, &error, 0..4).unwrap();
        assert_eq!(factor, 1.0);
    }

    #[test]
    fn halved_target_gets_factor_two() {
        let target = [2.0, 2.0, 2.0, 2.0];
        let reference = [4.0, 4.0, 4.0, 4.0];
        let errors = [1.0, 1.0, 1.0, 1.0];
        let factor = correction_factor(&target, &errors, &reference, &errors, 0..4).unwrap();
        assert_relative_eq!(factor, 2.0);
    }

    #[test]
    fn factor_uses_only_the_band() {
        // Outside the band the target is wildly off; the factor must ignore it.
        let target = [100.0, 2.0, 2.0, 100.0];
        let reference = [-50.0, 4.0, 4.0, -50.0];
        let errors = [1.0; 4];
        let factor = correction_factor(&target, &errors, &reference, &errors, 1..3).unwrap();
        assert_relative_eq!(factor, 2.0);
    }

    #[test]
    fn rescaled_target_matches_reference_mean() {
        let target = [1.0, 1.2, 0.9, 1.1];
        let target_err = [0.1, 0.2, 0.15, 0.1];
        let reference = [2.1, 2.4, 1.7, 2.2];
        let reference_err = [0.2, 0.3, 0.25, 0.2];
        let factor =
            correction_factor(&target, &target_err, &reference, &reference_err, 0..4).unwrap();

        let scaled_flux: Vec<f64> = target.iter().map(|f| f * factor).collect();
        let scaled_err: Vec<f64> = target_err.iter().map(|e| e * factor).collect();
        let scaled_mean = combine::weighted_mean(&scaled_flux, &scaled_err).unwrap();
        let reference_mean = combine::weighted_mean(&reference, &reference_err).unwrap();
        assert_relative_eq!(scaled_mean, reference_mean, max_relative = 1e-12);
    }

    #[test]
    fn band_past_end_rejected() {
        let flux = [1.0, 2.0];
        let error = [1.0, 1.0];
        let result = correction_factor(&flux, &error, &flux, &error, 0..3);
        assert!(matches!(
            result,
            Err(CalibrateError::BandOutOfRange { end: 3, len: 2, .. })
        ));
    }

    #[test]
    fn short_error_series_rejected() {
        // The band must fit the error series too, on either side.
        let flux = [1.0, 2.0, 3.0];
        let errors = [1.0, 1.0, 1.0];
        let short = [1.0, 1.0];
        let result = correction_factor(&flux, &short, &flux, &errors, 0..3);
        assert!(matches!(
            result,
            Err(CalibrateError::BandOutOfRange { end: 3, len: 2, .. })
        ));
        let result = correction_factor(&flux, &errors, &flux, &short, 0..3);
        assert!(matches!(
            result,
            Err(CalibrateError::BandOutOfRange { end: 3, len: 2, .. })
        ));
    }

    #[test]
    fn zero_reference_band_rejected() {
        let target = [2.0, 2.0];
        let reference = [1.0, -1.0];
        let errors = [1.0, 1.0];
        let result = correction_factor(&target, &errors, &reference, &errors, 0..2);
        assert!(matches!(result, Err(CalibrateError::DegenerateReference(m)) if m == 0.0));
    }

    #[test]
    fn negative_target_band_rejected() {
        let target = [-2.0, -2.0];
        let reference = [4.0, 4.0];
        let errors = [1.0, 1.0];
        let result = correction_factor(&target, &errors, &reference, &errors, 0..2);
        assert!(matches!(result, Err(CalibrateError::DegenerateTarget(_))));
    }
}
