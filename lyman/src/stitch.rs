//! Assembly of the composite spectrum from aperture-offset candidates.
//!
//! Near the Ly-alpha core the on-axis exposures are swamped by geocoronal
//! airglow; offsetting the slit moves the airglow off the stellar line, at
//! the price of throughput and wavelength coverage. The stitcher therefore
//! selects, per wavelength sample, which aperture's combined spectrum to
//! trust, keyed purely by the sample's radial velocity:
//!
//! ```text
//!        on-axis | -0.8" |  +0.8"  | +1.1" |  +0.8"  | on-axis
//!     ----------b0------b1--------b2------b3--------b4---------->  RV
//! ```
//!
//! The five breakpoints must increase strictly; together they cut the RV
//! axis into six half-open intervals covering it without gap or overlap, so
//! every output sample traces to exactly one candidate series. Selection is
//! stateless: nothing carries over between samples except the breakpoint
//! table itself.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::combine::Combined;
use crate::segment::Aperture;

#[derive(Error, Debug)]
pub enum StitchError {
    #[error("breakpoints must increase strictly, got {0:?}")]
    UnorderedBreakpoints([f64; 5]),
    #[error("breakpoint {0} is not finite")]
    NonFiniteBreakpoint(f64),
    #[error("{series} has {len} samples, expected {expected}")]
    LengthMismatch {
        series: &'static str,
        len: usize,
        expected: usize,
    },
    #[error("empty input grid")]
    EmptyGrid,
}

/// The five RV breakpoints [km/s] separating aperture regions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RvBreakpoints {
    /// Below this RV the on-axis data is clean (blue edge).
    pub on_axis_blue_end: f64,
    /// Blue end of the +0.8" coverage; the -0.8" band stops here.
    pub minus08_end: f64,
    /// Start of the innermost +1.1" band.
    pub plus11_start: f64,
    /// End of the innermost +1.1" band.
    pub plus11_end: f64,
    /// At and above this RV the on-axis data is clean again (red edge).
    pub on_axis_red_start: f64,
}

impl RvBreakpoints {
    pub fn new(
        on_axis_blue_end: f64,
        minus08_end: f64,
        plus11_start: f64,
        plus11_end: f64,
        on_axis_red_start: f64,
    ) -> Result<Self, StitchError> {
        let breakpoints = Self {
            on_axis_blue_end,
            minus08_end,
            plus11_start,
            plus11_end,
            on_axis_red_start,
        };
        breakpoints.validate()?;
        Ok(breakpoints)
    }

    /// Reject non-finite or unordered breakpoints. Deserialized values
    /// bypass [`RvBreakpoints::new`], so this runs again at config
    /// validation time.
    pub fn validate(&self) -> Result<(), StitchError> {
        let ordered = self.as_array();
        for value in ordered {
            if !value.is_finite() {
                return Err(StitchError::NonFiniteBreakpoint(value));
            }
        }
        if !ordered.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(StitchError::UnorderedBreakpoints(ordered));
        }
        Ok(())
    }

    pub fn as_array(&self) -> [f64; 5] {
        [
            self.on_axis_blue_end,
            self.minus08_end,
            self.plus11_start,
            self.plus11_end,
            self.on_axis_red_start,
        ]
    }

    /// Which aperture's candidate covers the given RV. Intervals are closed
    /// on the left and open on the right, so a sample landing exactly on a
    /// breakpoint belongs to the redward region.
    pub fn aperture_for(&self, rv: f64) -> Aperture {
        if rv < self.on_axis_blue_end {
            Aperture::OnAxis
        } else if rv < self.minus08_end {
            Aperture::Minus08
        } else if rv < self.plus11_start {
            Aperture::Plus08
        } else if rv < self.plus11_end {
            Aperture::Plus11
        } else if rv < self.on_axis_red_start {
            Aperture::Plus08
        } else {
            Aperture::OnAxis
        }
    }
}

/// One pre-combined candidate series per aperture, co-registered with the
/// composite grid.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSet {
    pub on_axis: Combined,
    pub minus08: Combined,
    pub plus08: Combined,
    pub plus11: Combined,
}

impl CandidateSet {
    fn get(&self, aperture: Aperture) -> &Combined {
        match aperture {
            Aperture::OnAxis => &self.on_axis,
            Aperture::Minus08 => &self.minus08,
            Aperture::Plus08 => &self.plus08,
            Aperture::Plus11 => &self.plus11,
        }
    }

    fn check_lengths(&self, expected: usize) -> Result<(), StitchError> {
        let series = [
            ("on-axis candidate", &self.on_axis),
            ("-0.8\" candidate", &self.minus08),
            ("+0.8\" candidate", &self.plus08),
            ("+1.1\" candidate", &self.plus11),
        ];
        for (name, combined) in series {
            if combined.flux.len() != expected || combined.error.len() != expected {
                return Err(StitchError::LengthMismatch {
                    series: name,
                    len: combined.flux.len().min(combined.error.len()),
                    expected,
                });
            }
        }
        Ok(())
    }
}

/// The stitched spectrum over the full observed range.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeSpectrum {
    pub wavelength: Vec<f64>,
    pub rv: Vec<f64>,
    pub flux: Vec<f64>,
    pub error: Vec<f64>,
}

impl CompositeSpectrum {
    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }

    /// Rebuild a composite from parsed columns, recomputing the RV grid from
    /// the wavelengths.
    pub fn from_columns(
        wavelength: Vec<f64>,
        flux: Vec<f64>,
        error: Vec<f64>,
        rest_wavelength: f64,
        system_rv_km_s: f64,
    ) -> Result<Self, StitchError> {
        if wavelength.is_empty() {
            return Err(StitchError::EmptyGrid);
        }
        if flux.len() != wavelength.len() {
            return Err(StitchError::LengthMismatch {
                series: "flux column",
                len: flux.len(),
                expected: wavelength.len(),
            });
        }
        if error.len() != wavelength.len() {
            return Err(StitchError::LengthMismatch {
                series: "error column",
                len: error.len(),
                expected: wavelength.len(),
            });
        }
        let rv = crate::segment::wave_to_rv(&wavelength, rest_wavelength, system_rv_km_s);
        Ok(Self {
            wavelength,
            rv,
            flux,
            error,
        })
    }
}

/// Assemble the composite spectrum: per sample, copy flux and error from the
/// candidate selected by the sample's RV.
pub fn stitch(
    wavelength: &[f64],
    rv: &[f64],
    candidates: &CandidateSet,
    breakpoints: &RvBreakpoints,
) -> Result<CompositeSpectrum, StitchError> {
    breakpoints.validate()?;
    if wavelength.is_empty() {
        return Err(StitchError::EmptyGrid);
    }
    if rv.len() != wavelength.len() {
        return Err(StitchError::LengthMismatch {
            series: "rv grid",
            len: rv.len(),
            expected: wavelength.len(),
        });
    }
    candidates.check_lengths(wavelength.len())?;

    let mut flux = Vec::with_capacity(wavelength.len());
    let mut error = Vec::with_capacity(wavelength.len());
    for (i, &v) in rv.iter().enumerate() {
        let source = candidates.get(breakpoints.aperture_for(v));
        flux.push(source.flux[i]);
        error.push(source.error[i]);
    }
    Ok(CompositeSpectrum {
        wavelength: wavelength.to_vec(),
        rv: rv.to_vec(),
        flux,
        error,
    })
}

/// Two-candidate variant for the sky-subtracted product: the blue wing
/// (all -0.8" exposures) covers RV < 0 and the red wing (+0.8" with +1.1")
/// covers RV >= 0.
pub fn wing_composite(
    wavelength: &[f64],
    rv: &[f64],
    blue: &Combined,
    red: &Combined,
) -> Result<CompositeSpectrum, StitchError> {
    if wavelength.is_empty() {
        return Err(StitchError::EmptyGrid);
    }
    if rv.len() != wavelength.len() {
        return Err(StitchError::LengthMismatch {
            series: "rv grid",
            len: rv.len(),
            expected: wavelength.len(),
        });
    }
    for (name, combined) in [("blue wing", blue), ("red wing", red)] {
        if combined.flux.len() != wavelength.len() || combined.error.len() != wavelength.len() {
            return Err(StitchError::LengthMismatch {
                series: name,
                len: combined.flux.len().min(combined.error.len()),
                expected: wavelength.len(),
            });
        }
    }

    let mut flux = Vec::with_capacity(wavelength.len());
    let mut error = Vec::with_capacity(wavelength.len());
    for (i, &v) in rv.iter().enumerate() {
        let source = if v < 0.0 { blue } else { red };
        flux.push(source.flux[i]);
        error.push(source.error[i]);
    }
    Ok(CompositeSpectrum {
        wavelength: wavelength.to_vec(),
        rv: rv.to_vec(),
        flux,
        error,
    })
}
