//! Instrument line-spread function and grid plumbing.
//!
//! The convolution and resampling here must stay bit-compatible with the
//! reference analysis chain, because an external fitter compares model and
//! data at machine precision. Two consequences:
//!
//! - [`convolve_same`] reproduces discrete linear convolution in "same"
//!   mode: the signal is implicitly zero-padded, the full convolution is
//!   evaluated, and the central `max(n, m)` samples are returned with the
//!   left-of-center offset `(min(n, m) - 1) / 2`.
//! - [`resample_clamped`] reproduces clamped linear interpolation: query
//!   points outside the source grid take the nearest endpoint value instead
//!   of being rejected. That is a deliberate divergence from strict-domain
//!   interpolation and it is what keeps the model defined on the few edge
//!   samples the velocity grid does not reach.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LsfError {
    #[error("kernel width sigma must be positive and finite, got {0}")]
    NonPositiveSigma(f64),
    #[error("kernel sums to {0}, cannot normalize")]
    DegenerateKernel(f64),
    #[error("mismatched lengths: {x} x-values vs {y} y-values")]
    MismatchedLengths { x: usize, y: usize },
    #[error("source grid not strictly increasing at index {0}")]
    UnsortedData(usize),
    #[error("need at least {needed} samples, got {got}")]
    InsufficientData { needed: usize, got: usize },
}

/// Unit-area Gaussian kernel over a velocity grid.
pub fn gaussian_kernel(velocity: &[f64], sigma: f64) -> Result<Vec<f64>, LsfError> {
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(LsfError::NonPositiveSigma(sigma));
    }
    if velocity.is_empty() {
        return Err(LsfError::InsufficientData { needed: 1, got: 0 });
    }
    let mut kernel: Vec<f64> = velocity
        .iter()
        .map(|v| (-v * v / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f64 = kernel.iter().sum();
    if !(sum.is_finite() && sum > 0.0) {
        return Err(LsfError::DegenerateKernel(sum));
    }
    for k in &mut kernel {
        *k /= sum;
    }
    Ok(kernel)
}

/// Discrete linear convolution, "same" mode: output length `max(n, m)`,
/// centered on the full convolution with implicit zero padding.
pub fn convolve_same(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    assert!(
        !signal.is_empty() && !kernel.is_empty(),
        "convolution inputs must be non-empty"
    );
    let n = signal.len();
    let m = kernel.len();
    let out_len = n.max(m);
    let offset = (n.min(m) - 1) / 2;

    let mut out = vec![0.0; out_len];
    for (i, slot) in out.iter_mut().enumerate() {
        let k = i + offset;
        // full[k] = sum_j signal[j] * kernel[k - j]
        let j_lo = k.saturating_sub(m - 1);
        let j_hi = k.min(n - 1);
        let mut acc = 0.0;
        for j in j_lo..=j_hi {
            acc += signal[j] * kernel[k - j];
        }
        *slot = acc;
    }
    out
}

/// Linear interpolation of `(x, y)` onto `x_new`, clamping to the endpoint
/// values outside `[x[0], x[last]]`. A single source sample yields a
/// constant series.
pub fn resample_clamped(x_new: &[f64], x: &[f64], y: &[f64]) -> Result<Vec<f64>, LsfError> {
    if x.len() != y.len() {
        return Err(LsfError::MismatchedLengths {
            x: x.len(),
            y: y.len(),
        });
    }
    if x.is_empty() {
        return Err(LsfError::InsufficientData { needed: 1, got: 0 });
    }
    for (i, pair) in x.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(LsfError::UnsortedData(i + 1));
        }
    }

    let n = x.len();
    let out = x_new
        .iter()
        .map(|&q| {
            if q <= x[0] {
                y[0]
            } else if q >= x[n - 1] {
                y[n - 1]
            } else {
                // partition_point gives the first knot strictly above q, so
                // hi >= 1 and q lies in [x[hi - 1], x[hi]).
                let hi = x.partition_point(|&knot| knot <= q);
                let lo = hi - 1;
                let t = (q - x[lo]) / (x[hi] - x[lo]);
                y[lo] + t * (y[hi] - y[lo])
            }
        })
        .collect();
    Ok(out)
}

/// Median of consecutive differences, the observed-grid step estimator.
pub fn median_step(x: &[f64]) -> Result<f64, LsfError> {
    if x.len() < 2 {
        return Err(LsfError::InsufficientData {
            needed: 2,
            got: x.len(),
        });
    }
    let mut steps: Vec<f64> = x.windows(2).map(|pair| pair[1] - pair[0]).collect();
    steps.sort_by(|a, b| a.total_cmp(b));
    let mid = steps.len() / 2;
    if steps.len() % 2 == 1 {
        Ok(steps[mid])
    } else {
        Ok(0.5 * (steps[mid - 1] + steps[mid]))
    }
}

/// Mean of consecutive differences, the model-grid step estimator.
pub fn mean_step(x: &[f64]) -> Result<f64, LsfError> {
    if x.len() < 2 {
        return Err(LsfError::InsufficientData {
            needed: 2,
            got: x.len(),
        });
    }
    let total: f64 = x.windows(2).map(|pair| pair[1] - pair[0]).sum();
    Ok(total / (x.len() - 1) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn kernel_is_unit_area() {
        let velocity: Vec<f64> = (0..501).map(|i| i as f64 - 250.0).collect();
        let kernel = gaussian_kernel(&velocity, 7.3).unwrap();
        let sum: f64 = kernel.iter().sum();
        assert_relative_eq!(sum, 1.0, max_relative = 1e-9);
    }

    #[test]
    fn kernel_peaks_at_zero_velocity() {
        let velocity: Vec<f64> = (0..11).map(|i| i as f64 - 5.0).collect();
        let kernel = gaussian_kernel(&velocity, 2.0).unwrap();
        let peak = kernel
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 5);
        // Symmetric grid, symmetric kernel.
        assert_relative_eq!(kernel[3], kernel[7]);
    }

    #[test]
    fn zero_sigma_rejected() {
        let velocity = [-1.0, 0.0, 1.0];
        assert!(matches!(
            gaussian_kernel(&velocity, 0.0),
            Err(LsfError::NonPositiveSigma(_))
        ));
    }

    #[test]
    fn convolve_same_matches_reference_odd_kernel() {
        // [1,2,3] * [0,1,0.5]: full convolution [0,1,2.5,4,1.5], central
        // three samples [1,2.5,4].
        let out = convolve_same(&[1.0, 2.0, 3.0], &[0.0, 1.0, 0.5]);
        assert_eq!(out.len(), 3);
        assert_abs_diff_eq!(out[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[1], 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(out[2], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn convolve_same_matches_reference_even_kernel() {
        // Even kernels keep the left-of-center offset: [1,2,3,4] * [1,1]
        // -> [1,3,5,7].
        let out = convolve_same(&[1.0, 2.0, 3.0, 4.0], &[1.0, 1.0]);
        assert_eq!(out, vec![1.0, 3.0, 5.0, 7.0]);
    }

    #[test]
    fn convolve_same_equal_lengths() {
        // Signal and kernel the same length, the shape the forward model
        // always uses. [0.5,-1,2,0.25,3] * [0.2,0.5,0.2,0.05,0.05] ->
        // central five of the nine-sample full convolution.
        let out = convolve_same(
            &[0.5, -1.0, 2.0, 0.25, 3.0],
            &[0.2, 0.5, 0.2, 0.05, 0.05],
        );
        let expected = [0.0, 0.875, 1.1, 1.6, 0.7125];
        assert_eq!(out.len(), expected.len());
        for (a, b) in out.iter().zip(expected) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn convolution_with_delta_is_identity() {
        let signal = [3.0, -1.0, 4.0, 1.0, 5.0];
        let mut delta = vec![0.0; 5];
        delta[2] = 1.0;
        let out = convolve_same(&signal, &delta);
        for (a, b) in out.iter().zip(signal) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn unit_kernel_preserves_total_flux_away_from_edges() {
        let velocity: Vec<f64> = (0..101).map(|i| i as f64 - 50.0).collect();
        let kernel = gaussian_kernel(&velocity, 3.0).unwrap();
        let mut signal = vec![0.0; 101];
        signal[50] = 2.0;
        let out = convolve_same(&signal, &kernel);
        let total: f64 = out.iter().sum();
        assert_relative_eq!(total, 2.0, max_relative = 1e-9);
    }

    #[test]
    fn resample_interpolates_and_clamps() {
        let x = [1.0, 2.0, 4.0];
        let y = [10.0, 20.0, -4.0];
        let out =
            resample_clamped(&[0.0, 1.0, 1.5, 3.0, 4.0, 9.0], &x, &y).unwrap();
        let expected = [10.0, 10.0, 15.0, 8.0, -4.0, -4.0];
        for (a, b) in out.iter().zip(expected) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn resample_single_sample_is_constant() {
        let out = resample_clamped(&[-5.0, 0.0, 5.0], &[1.0], &[42.0]).unwrap();
        assert_eq!(out, vec![42.0, 42.0, 42.0]);
    }

    #[test]
    fn resample_rejects_unsorted_source() {
        let result = resample_clamped(&[0.0], &[1.0, 0.5, 2.0], &[1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(LsfError::UnsortedData(1))));
    }

    #[test]
    fn resample_rejects_mismatched_lengths() {
        let result = resample_clamped(&[0.0], &[1.0, 2.0], &[1.0]);
        assert!(matches!(
            result,
            Err(LsfError::MismatchedLengths { x: 2, y: 1 })
        ));
    }

    #[test]
    fn median_step_is_robust_to_one_gap() {
        // One double-width step does not move the median.
        let x = [0.0, 1.0, 2.0, 4.0, 5.0];
        assert_relative_eq!(median_step(&x).unwrap(), 1.0);
        assert_relative_eq!(mean_step(&x).unwrap(), 1.25);
    }

    #[test]
    fn step_estimators_need_two_samples() {
        assert!(matches!(
            median_step(&[1.0]),
            Err(LsfError::InsufficientData { needed: 2, got: 1 })
        ));
    }
}
