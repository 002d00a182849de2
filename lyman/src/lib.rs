//! Reconstruction and modelling of a stellar Ly-alpha emission line.
//!
//! The observation side calibrates multi-epoch, multi-aperture exposures of
//! the same target onto a common flux scale, combines them per slit
//! position, and stitches a composite spectrum whose every sample comes
//! from the aperture least affected by geocoronal airglow at that radial
//! velocity. The model side evaluates an intrinsic double-peaked emission
//! profile, attenuates it through interstellar and circumstellar gas
//! columns, convolves with the instrument response, and resamples onto the
//! observed grid.

pub mod airglow;
pub mod calibrate;
pub mod combine;
pub mod config;
pub mod constants;
pub mod io;
pub mod model;
pub mod pipeline;
pub mod segment;
pub mod stitch;

// Re-export commonly used types for external use
pub use crate::config::AnalysisConfig;
pub use crate::model::{ForwardModel, ModelComponents};
pub use crate::pipeline::{build_composite, build_wing_composite, load_epochs};
pub use crate::stitch::CompositeSpectrum;
