//! Voigt-profile absorption by foreground gas columns.
//!
//! Each absorbing species contributes an optical depth
//! tau(lambda) = tau_0 * Re[w(u + i a)], with the Faddeeva function w
//! supplied by an external special-function implementation. The Gaussian
//! core width comes from thermal plus turbulent broadening, the Lorentzian
//! damping wing from the transition's natural width. Transmissions of the
//! species in one column, and of the interstellar and circumstellar
//! columns, combine multiplicatively (independent optically-thin columns).
//!
//! Saturated samples are forced to exactly zero transmission once tau
//! reaches 20; evaluating exp(-tau) there underflows into subnormals and
//! the fit residuals pick up the noise.

use errorfunctions::ComplexErrorFunctions;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{lines, Physical, SpectralLine};

/// Optical depth above which transmission is treated as fully saturated.
pub const TAU_SATURATION_CUTOFF: f64 = 20.0;

#[derive(Error, Debug)]
pub enum AbsorptionError {
    #[error("absorber parameter {name} must be positive and finite, got {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("absorber parameter {name} is not finite: {value}")]
    NonFinite { name: &'static str, value: f64 },
    #[error("gas column {0:?} has no species")]
    EmptyColumn(String),
}

/// Real part of the Faddeeva function, the Voigt profile shape H(a, u).
pub fn voigt(a: f64, u: f64) -> f64 {
    Complex64::new(u, a).w().re
}

/// One species in one absorbing region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbsorberParams {
    pub line: SpectralLine,
    /// Column density [log10 cm^-2].
    pub log_column: f64,
    /// Turbulent broadening velocity [km/s].
    pub turb_velocity: f64,
    /// Gas temperature [K].
    pub temperature: f64,
    /// Bulk radial velocity of the column [km/s].
    pub bulk_rv: f64,
}

impl AbsorberParams {
    pub fn validate(&self) -> Result<(), AbsorptionError> {
        for (name, value) in [
            ("rest_wavelength", self.line.rest_wavelength),
            ("oscillator_strength", self.line.oscillator_strength),
            ("damping_constant", self.line.damping_constant),
            ("atomic_mass", self.line.atomic_mass),
            ("temperature", self.temperature),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(AbsorptionError::InvalidParameter { name, value });
            }
        }
        for (name, value) in [
            ("log_column", self.log_column),
            ("turb_velocity", self.turb_velocity),
            ("bulk_rv", self.bulk_rv),
        ] {
            if !value.is_finite() {
                return Err(AbsorptionError::NonFinite { name, value });
            }
        }
        if self.broadening_width() <= 0.0 {
            return Err(AbsorptionError::InvalidParameter {
                name: "broadening_width",
                value: self.broadening_width(),
            });
        }
        Ok(())
    }

    /// Combined thermal plus turbulent broadening width b_wid [km/s].
    pub fn broadening_width(&self) -> f64 {
        let turb = self.turb_velocity / Physical::TURBULENCE_VELOCITY_SCALE;
        (self.temperature / self.line.atomic_mass + turb * turb).sqrt()
    }

    /// Optical depth of this species over the wavelength grid [Angstrom].
    pub fn optical_depth(&self, wavelength: &[f64]) -> Vec<f64> {
        let c = Physical::ABSORPTION_LIGHT_SPEED;
        let rest = self.line.rest_wavelength;

        let b_wid = self.broadening_width();
        let b = Physical::DOPPLER_B_SCALE * b_wid;
        let doppler_width = b * c / rest;
        let damping = (self.line.damping_constant / (4.0 * std::f64::consts::PI))
            / doppler_width;
        let tau_center = Physical::OPTICAL_DEPTH_PREFACTOR
            * 10f64.powf(self.log_column)
            * rest
            * self.line.oscillator_strength
            / b_wid;
        let bulk = 1.0 + self.bulk_rv * 1.0e9 / c;

        wavelength
            .iter()
            .map(|lambda| {
                let shifted = lambda / bulk;
                let u = 1.0e4 * ((c / shifted - c / rest) / doppler_width).abs();
                tau_center * voigt(damping, u)
            })
            .collect()
    }

    /// Transmission of this species alone, with the saturation cutoff.
    pub fn transmission(&self, wavelength: &[f64]) -> Vec<f64> {
        self.optical_depth(wavelength)
            .into_iter()
            .map(|tau| {
                if tau < TAU_SATURATION_CUTOFF {
                    (-tau).exp()
                } else {
                    0.0
                }
            })
            .collect()
    }
}

/// One absorbing region: a labeled set of species sharing a line of sight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasColumn {
    pub label: String,
    pub species: Vec<AbsorberParams>,
}

impl GasColumn {
    pub fn new(
        label: impl Into<String>,
        species: Vec<AbsorberParams>,
    ) -> Result<Self, AbsorptionError> {
        let label = label.into();
        if species.is_empty() {
            return Err(AbsorptionError::EmptyColumn(label));
        }
        for params in &species {
            params.validate()?;
        }
        Ok(Self { label, species })
    }

    /// Hydrogen plus deuterium sharing one column's temperature, turbulence
    /// and bulk velocity; the deuterium column density follows from the
    /// hydrogen one through the adopted D/H ratio.
    pub fn hydrogen_deuterium(
        label: impl Into<String>,
        log_nh: f64,
        turb_velocity: f64,
        temperature: f64,
        bulk_rv: f64,
    ) -> Result<Self, AbsorptionError> {
        let hydrogen = AbsorberParams {
            line: lines::HYDROGEN_LYA,
            log_column: log_nh,
            turb_velocity,
            temperature,
            bulk_rv,
        };
        let deuterium = AbsorberParams {
            line: lines::DEUTERIUM_LYA,
            log_column: log_nh + lines::D_TO_H_RATIO.log10(),
            turb_velocity,
            temperature,
            bulk_rv,
        };
        Self::new(label, vec![hydrogen, deuterium])
    }

    /// Validate every species; used after deserialization.
    pub fn validate(&self) -> Result<(), AbsorptionError> {
        if self.species.is_empty() {
            return Err(AbsorptionError::EmptyColumn(self.label.clone()));
        }
        for params in &self.species {
            params.validate()?;
        }
        Ok(())
    }

    /// Product of the species transmissions over the wavelength grid.
    pub fn transmission(&self, wavelength: &[f64]) -> Vec<f64> {
        let mut total = vec![1.0; wavelength.len()];
        for species in &self.species {
            for (t, s) in total.iter_mut().zip(species.transmission(wavelength)) {
                *t *= s;
            }
        }
        total
    }
}

/// Total foreground transmission: the product over all absorbing regions.
pub fn combined_transmission(columns: &[&GasColumn], wavelength: &[f64]) -> Vec<f64> {
    let mut total = vec![1.0; wavelength.len()];
    for column in columns {
        for (t, c) in total.iter_mut().zip(column.transmission(wavelength)) {
            *t *= c;
        }
    }
    total
}
