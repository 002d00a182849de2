//! Inverse-variance combination of co-registered flux series.
//!
//! The error bar of a combined sample follows the calibration pipeline's
//! convention sqrt(sum(w * err^2) / sum(w)) with w = 1/err^2, not the
//! textbook sqrt(1 / sum(w)). The two agree only when every input error is
//! equal, in which case this form returns the common error unchanged
//! instead of shrinking it by sqrt(K).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CombineError {
    #[error("no input series to combine")]
    Empty,
    #[error("series {index} has {len} samples, expected {expected}")]
    LengthMismatch {
        index: usize,
        len: usize,
        expected: usize,
    },
    #[error("series {series}, sample {index}: error value {value} is not positive and finite")]
    InvalidError {
        series: usize,
        index: usize,
        value: f64,
    },
    #[error("flux and error lengths differ: {flux} vs {error}")]
    FluxErrorMismatch { flux: usize, error: usize },
}

/// Combined flux/error pair produced by [`inverse_variance_combine`].
#[derive(Debug, Clone, PartialEq)]
pub struct Combined {
    pub flux: Vec<f64>,
    pub error: Vec<f64>,
}

/// Combine K co-registered (flux, error) series elementwise with inverse-variance
/// weights. A single input series is returned unchanged, bit for bit.
pub fn inverse_variance_combine(series: &[(&[f64], &[f64])]) -> Result<Combined, CombineError> {
    let (first_flux, first_error) = series.first().ok_or(CombineError::Empty)?;
    let n = first_flux.len();

    for (index, (flux, error)) in series.iter().enumerate() {
        if flux.len() != error.len() {
            return Err(CombineError::FluxErrorMismatch {
                flux: flux.len(),
                error: error.len(),
            });
        }
        if flux.len() != n {
            return Err(CombineError::LengthMismatch {
                index,
                len: flux.len(),
                expected: n,
            });
        }
        check_errors(index, error)?;
    }

    if series.len() == 1 {
        return Ok(Combined {
            flux: first_flux.to_vec(),
            error: first_error.to_vec(),
        });
    }

    let mut flux = vec![0.0; n];
    let mut error = vec![0.0; n];
    for i in 0..n {
        let mut weight_sum = 0.0;
        let mut flux_sum = 0.0;
        let mut variance_sum = 0.0;
        for (f, e) in series {
            let w = 1.0 / (e[i] * e[i]);
            weight_sum += w;
            flux_sum += w * f[i];
            variance_sum += w * e[i] * e[i];
        }
        flux[i] = flux_sum / weight_sum;
        error[i] = (variance_sum / weight_sum).sqrt();
    }
    Ok(Combined { flux, error })
}

/// Inverse-variance weighted mean of a single series, the averaging rule the
/// correction-factor calibration restricts to its reference band.
pub fn weighted_mean(flux: &[f64], error: &[f64]) -> Result<f64, CombineError> {
    if flux.is_empty() {
        return Err(CombineError::Empty);
    }
    if flux.len() != error.len() {
        return Err(CombineError::FluxErrorMismatch {
            flux: flux.len(),
            error: error.len(),
        });
    }
    check_errors(0, error)?;

    let mut weight_sum = 0.0;
    let mut flux_sum = 0.0;
    for (f, e) in flux.iter().zip(error) {
        let w = 1.0 / (e * e);
        weight_sum += w;
        flux_sum += w * f;
    }
    Ok(flux_sum / weight_sum)
}

fn check_errors(series: usize, error: &[f64]) -> Result<(), CombineError> {
    for (index, &value) in error.iter().enumerate() {
        if !(value.is_finite() && value > 0.0) {
            return Err(CombineError::InvalidError {
                series,
                index,
                value,
            });
        }
    }
    Ok(())
}
