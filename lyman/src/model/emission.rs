//! Intrinsic stellar Ly-alpha emission profile.
//!
//! The chromospheric line is modeled as two Voigt components of equal
//! amplitude placed symmetrically about the line center, the whole pattern
//! Doppler-shifted by the system's bulk radial velocity. A peak offset of
//! zero merges the two components into a single self-reversed-free profile.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::Physical;
use crate::model::absorption::voigt;

#[derive(Error, Debug)]
pub enum EmissionError {
    #[error("emission parameter {name} must be positive and finite, got {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("emission parameter {name} is not finite: {value}")]
    NonFinite { name: &'static str, value: f64 },
}

/// Parameters of the two-component Voigt emission line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmissionParams {
    /// Peak amplitude [erg cm^-2 s^-1 A^-1].
    pub amplitude: f64,
    /// Half-separation of the blue and red peak centers [Angstrom].
    pub peak_offset: f64,
    /// Scale factor from wavelength offset [Angstrom] to the Voigt frequency
    /// coordinate u.
    pub scale: f64,
    /// Voigt damping parameter of each component.
    pub damping: f64,
}

impl EmissionParams {
    pub fn validate(&self) -> Result<(), EmissionError> {
        for (name, value) in [
            ("amplitude", self.amplitude),
            ("scale", self.scale),
            ("damping", self.damping),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(EmissionError::InvalidParameter { name, value });
            }
        }
        if !self.peak_offset.is_finite() {
            return Err(EmissionError::NonFinite {
                name: "peak_offset",
                value: self.peak_offset,
            });
        }
        Ok(())
    }
}

/// Evaluate the intrinsic profile on the model wavelength grid [Angstrom].
///
/// The peak centers sit at `rest_wavelength -/+ peak_offset`, both shifted
/// redward by the system velocity.
pub fn intrinsic_profile(
    model_wavelength: &[f64],
    rest_wavelength: f64,
    system_rv_km_s: f64,
    params: &EmissionParams,
) -> Vec<f64> {
    let doppler = rest_wavelength * system_rv_km_s / Physical::MODEL_LIGHT_SPEED_KM_S;
    let blue_center = rest_wavelength - params.peak_offset + doppler;
    let red_center = rest_wavelength + params.peak_offset + doppler;

    model_wavelength
        .iter()
        .map(|l| {
            let u_blue = params.scale * (l - blue_center);
            let u_red = params.scale * (l - red_center);
            params.amplitude * (voigt(params.damping, u_blue) + voigt(params.damping, u_red))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> EmissionParams {
        EmissionParams {
            amplitude: 4.395e-13,
            peak_offset: 0.0,
            scale: 11.0,
            damping: 8.0,
        }
    }

    #[test]
    fn merged_peaks_give_twice_the_component_height() {
        let rest = 1215.6737;
        let profile = intrinsic_profile(&[rest], rest, 0.0, &params());
        assert_relative_eq!(
            profile[0],
            2.0 * 4.395e-13 * voigt(8.0, 0.0),
            max_relative = 1e-12
        );
    }

    #[test]
    fn profile_is_symmetric_about_the_shifted_center() {
        let rest = 1215.6737;
        let system_rv = 20.5;
        let center = rest * (1.0 + system_rv / Physical::MODEL_LIGHT_SPEED_KM_S);
        let offsets = [0.05, 0.1, 0.4, 1.0];
        for d in offsets {
            let pair = intrinsic_profile(&[center - d, center + d], rest, system_rv, &params());
            assert_relative_eq!(pair[0], pair[1], max_relative = 1e-9);
        }
    }

    #[test]
    fn amplitude_scales_linearly() {
        let rest = 1215.6737;
        let grid = [rest - 0.3, rest, rest + 0.2];
        let base = intrinsic_profile(&grid, rest, 0.0, &params());
        let doubled = intrinsic_profile(
            &grid,
            rest,
            0.0,
            &EmissionParams {
                amplitude: 2.0 * 4.395e-13,
                ..params()
            },
        );
        for (a, b) in base.iter().zip(doubled) {
            assert_relative_eq!(2.0 * a, b, max_relative = 1e-12);
        }
    }

    #[test]
    fn split_peaks_dip_at_the_center() {
        // Needs a damping small enough that the components stay separated;
        // at av = 8 the Lorentzian wings merge the peaks into one hump.
        let rest = 1215.6737;
        let split = EmissionParams {
            amplitude: 1.0,
            peak_offset: 0.5,
            scale: 11.0,
            damping: 0.5,
        };
        let grid = [rest - 0.5, rest, rest + 0.5];
        let profile = intrinsic_profile(&grid, rest, 0.0, &split);
        assert!(profile[1] < profile[0]);
        assert!(profile[1] < profile[2]);
    }

    #[test]
    fn negative_amplitude_rejected() {
        let mut p = params();
        p.amplitude = -1.0;
        assert!(matches!(
            p.validate(),
            Err(EmissionError::InvalidParameter {
                name: "amplitude",
                ..
            })
        ));
    }
}
