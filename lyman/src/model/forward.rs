//! End-to-end forward model of the observed Ly-alpha spectrum.
//!
//! Evaluation chain: intrinsic double-Voigt emission on the model velocity
//! grid, attenuated by the interstellar and circumstellar gas columns,
//! convolved with the instrument's Gaussian line-spread function, and
//! resampled onto the observation's wavelength grid. The model object owns
//! everything derived from the observation grid alone (velocity grid, model
//! wavelengths, kernel); each [`ForwardModel::evaluate`] call is a pure
//! function of the physical parameters, cheap enough for an external
//! least-squares or MCMC driver to hammer.
//!
//! The velocity grid spans one unit per observed sample, centered on zero:
//! for n samples, v = -n/2, -n/2 + 1, ..., n/2 - 1 [km/s]. The kernel width
//! is the instrument sigma in observed pixels scaled by the ratio of the
//! observed grid step (median) to the model grid step (mean).

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::absorption::{AbsorptionError, GasColumn};
use crate::model::emission::{self, EmissionError, EmissionParams};
use crate::model::lsf::{self, LsfError};

#[derive(Error, Debug)]
pub enum ForwardError {
    #[error("observation grid needs at least 2 samples, got {0}")]
    ObservationTooShort(usize),
    #[error("observation grid not strictly increasing at sample {0}")]
    UnsortedObservation(usize),
    #[error("instrument kernel sigma must be positive and finite, got {0}")]
    InvalidKernelSigma(f64),
    #[error(transparent)]
    Lsf(#[from] LsfError),
    #[error(transparent)]
    Absorption(#[from] AbsorptionError),
    #[error(transparent)]
    Emission(#[from] EmissionError),
}

/// Instrument response settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Gaussian LSF sigma in observed detector pixels.
    pub kernel_sigma_px: f64,
}

/// The model-side velocity and wavelength grids.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelGrid {
    pub velocity: Vec<f64>,
    pub wavelength: Vec<f64>,
}

impl ModelGrid {
    /// Velocity grid of one unit per observed sample centered on zero, and
    /// the wavelengths it maps to about the rest wavelength.
    pub fn for_observation(n: usize, rest_wavelength: f64) -> Self {
        let start = -(n as f64) / 2.0;
        let velocity: Vec<f64> = (0..n).map(|i| start + i as f64).collect();
        let wavelength = velocity
            .iter()
            .map(|v| {
                rest_wavelength * (1.0 + v / crate::constants::Physical::MODEL_LIGHT_SPEED_KM_S)
            })
            .collect();
        Self {
            velocity,
            wavelength,
        }
    }

    pub fn len(&self) -> usize {
        self.velocity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.velocity.is_empty()
    }
}

/// Intermediate and final products of one evaluation.
///
/// The three component series live on the model velocity grid; `observed`
/// is the full model resampled onto the observation wavelengths.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelComponents {
    pub velocity: Vec<f64>,
    pub intrinsic: Vec<f64>,
    pub ism_only: Vec<f64>,
    pub disk_only: Vec<f64>,
    pub observed: Vec<f64>,
}

/// Reusable forward model bound to one observation grid.
#[derive(Debug, Clone)]
pub struct ForwardModel {
    grid: ModelGrid,
    kernel: Vec<f64>,
    obs_wavelength: Vec<f64>,
    rest_wavelength: f64,
    system_rv_km_s: f64,
}

impl ForwardModel {
    pub fn new(
        obs_wavelength: &[f64],
        rest_wavelength: f64,
        system_rv_km_s: f64,
        instrument: InstrumentConfig,
    ) -> Result<Self, ForwardError> {
        if obs_wavelength.len() < 2 {
            return Err(ForwardError::ObservationTooShort(obs_wavelength.len()));
        }
        for (i, pair) in obs_wavelength.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(ForwardError::UnsortedObservation(i + 1));
            }
        }
        if !(instrument.kernel_sigma_px.is_finite() && instrument.kernel_sigma_px > 0.0) {
            return Err(ForwardError::InvalidKernelSigma(instrument.kernel_sigma_px));
        }

        let grid = ModelGrid::for_observation(obs_wavelength.len(), rest_wavelength);
        let obs_step = lsf::median_step(obs_wavelength)?;
        let model_step = lsf::mean_step(&grid.wavelength)?;
        let sigma = instrument.kernel_sigma_px * obs_step / model_step;
        let kernel = lsf::gaussian_kernel(&grid.velocity, sigma)?;
        debug!(
            "forward model: {} samples, obs step {:.4e} A, model step {:.4e} A, kernel sigma {:.3}",
            obs_wavelength.len(),
            obs_step,
            model_step,
            sigma
        );

        Ok(Self {
            grid,
            kernel,
            obs_wavelength: obs_wavelength.to_vec(),
            rest_wavelength,
            system_rv_km_s,
        })
    }

    pub fn grid(&self) -> &ModelGrid {
        &self.grid
    }

    pub fn kernel(&self) -> &[f64] {
        &self.kernel
    }

    /// Model flux on the observation grid for one parameter set.
    pub fn evaluate(
        &self,
        emission: &EmissionParams,
        ism: &GasColumn,
        disk: &GasColumn,
    ) -> Result<Vec<f64>, ForwardError> {
        emission.validate()?;
        ism.validate()?;
        disk.validate()?;

        let intrinsic = self.intrinsic(emission);
        let t_ism = ism.transmission(&self.grid.wavelength);
        let t_disk = disk.transmission(&self.grid.wavelength);

        let attenuated: Vec<f64> = intrinsic
            .iter()
            .zip(t_ism.iter().zip(&t_disk))
            .map(|(f, (a, b))| f * a * b)
            .collect();
        self.to_observation(&attenuated)
    }

    /// Full evaluation keeping the per-column intermediate spectra.
    pub fn evaluate_components(
        &self,
        emission: &EmissionParams,
        ism: &GasColumn,
        disk: &GasColumn,
    ) -> Result<ModelComponents, ForwardError> {
        emission.validate()?;
        ism.validate()?;
        disk.validate()?;

        let intrinsic = self.intrinsic(emission);
        let t_ism = ism.transmission(&self.grid.wavelength);
        let t_disk = disk.transmission(&self.grid.wavelength);

        let apply = |transmission: &[f64]| -> Vec<f64> {
            intrinsic
                .iter()
                .zip(transmission)
                .map(|(f, t)| f * t)
                .collect()
        };
        let attenuated: Vec<f64> = intrinsic
            .iter()
            .zip(t_ism.iter().zip(&t_disk))
            .map(|(f, (a, b))| f * a * b)
            .collect();

        Ok(ModelComponents {
            velocity: self.grid.velocity.clone(),
            intrinsic: self.convolve(&intrinsic),
            ism_only: self.convolve(&apply(&t_ism)),
            disk_only: self.convolve(&apply(&t_disk)),
            observed: self.to_observation(&attenuated)?,
        })
    }

    fn intrinsic(&self, emission: &EmissionParams) -> Vec<f64> {
        emission::intrinsic_profile(
            &self.grid.wavelength,
            self.rest_wavelength,
            self.system_rv_km_s,
            emission,
        )
    }

    fn convolve(&self, spectrum: &[f64]) -> Vec<f64> {
        lsf::convolve_same(spectrum, &self.kernel)
    }

    fn to_observation(&self, spectrum: &[f64]) -> Result<Vec<f64>, ForwardError> {
        let convolved = self.convolve(spectrum);
        Ok(lsf::resample_clamped(
            &self.obs_wavelength,
            &self.grid.wavelength,
            &convolved,
        )?)
    }
}
