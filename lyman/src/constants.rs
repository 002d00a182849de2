//! Physical constants and Lyman-series atomic data.
//!
//! Two light-speed values coexist here on purpose. The radial-velocity
//! conversion uses the exact SI value, while the absorption and emission
//! formulas carry the rounded values their calibration constants were
//! derived with. Swapping one for the other shifts line centers by a few
//! hundredths of an angstrom, enough to bias a fit at COS resolution.

use serde::{Deserialize, Serialize};

/// Doublet-weighted Lyman-alpha rest wavelength used for RV conversion [Angstrom].
pub const LYMAN_ALPHA: f64 = 1215.6702;

/// Physical constants in the unit conventions of the analysis.
pub struct Physical {}

impl Physical {
    /// Speed of light [m/s].
    pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;

    /// Speed of light on the model velocity grid [km/s], rounded.
    pub const MODEL_LIGHT_SPEED_KM_S: f64 = 3.0e5;

    /// Speed of light in the optical-depth formula's mixed Angstrom-based units.
    pub const ABSORPTION_LIGHT_SPEED: f64 = 2.99793e14;

    /// Scale from broadening velocity [km/s] to the Doppler parameter b.
    pub const DOPPLER_B_SCALE: f64 = 4.30136955e-3;

    /// Prefactor of the line-center optical depth, tau_0 = k * N * lambda * f / b_wid.
    pub const OPTICAL_DEPTH_PREFACTOR: f64 = 1.16117705e-14;

    /// Divisor turning a turbulent velocity [km/s] into its thermal-equivalent
    /// contribution inside the broadening width.
    pub const TURBULENCE_VELOCITY_SCALE: f64 = 0.129;
}

/// Atomic data for one absorbing transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralLine {
    /// Rest wavelength [Angstrom].
    pub rest_wavelength: f64,
    /// Oscillator strength of the transition.
    pub oscillator_strength: f64,
    /// Natural damping constant Gamma [1/s].
    pub damping_constant: f64,
    /// Atomic mass [amu].
    pub atomic_mass: f64,
}

/// Transitions modeled by this crate.
pub mod lines {
    use super::SpectralLine;

    /// Hydrogen Ly-alpha as used on the fitting side.
    pub const HYDROGEN_LYA: SpectralLine = SpectralLine {
        rest_wavelength: 1215.6737,
        oscillator_strength: 0.416,
        damping_constant: 6.27e8,
        atomic_mass: 1.0,
    };

    /// Deuterium Ly-alpha, isotope-shifted blueward of hydrogen.
    pub const DEUTERIUM_LYA: SpectralLine = SpectralLine {
        rest_wavelength: 1215.3394,
        oscillator_strength: 0.416,
        damping_constant: 6.27e8,
        atomic_mass: 2.0,
    };

    /// Abundance ratio N(D)/N(H) adopted for the local ISM.
    pub const D_TO_H_RATIO: f64 = 1.5e-5;
}
