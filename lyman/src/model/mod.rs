//! Radiative-transfer forward model of the stellar Ly-alpha line.

pub mod absorption;
pub mod emission;
pub mod forward;
pub mod lsf;

pub use absorption::{AbsorberParams, GasColumn};
pub use emission::EmissionParams;
pub use forward::{ForwardModel, InstrumentConfig, ModelComponents, ModelGrid};
