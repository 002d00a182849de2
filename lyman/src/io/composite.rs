//! Writers and readers for the composite spectrum and model components.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::info;

use crate::io::format::format_row;
use crate::io::IoError;
use crate::model::forward::ModelComponents;
use crate::stitch::CompositeSpectrum;

/// Write the composite spectrum as wavelength, flux, error rows in
/// ascending wavelength order.
pub fn write_composite(path: &Path, composite: &CompositeSpectrum) -> Result<(), IoError> {
    let file = File::create(path).map_err(|source| IoError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    for i in 0..composite.len() {
        writeln!(
            writer,
            "{}",
            format_row(&[
                composite.wavelength[i],
                composite.flux[i],
                composite.error[i]
            ])
        )?;
    }
    writer.flush()?;
    info!(
        "wrote composite spectrum: {} samples to {}",
        composite.len(),
        path.display()
    );
    Ok(())
}

/// Read the three composite columns back.
pub fn read_composite(path: &Path) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>), IoError> {
    let rows = read_columns(path, 3)?;
    let mut wavelength = Vec::with_capacity(rows.len());
    let mut flux = Vec::with_capacity(rows.len());
    let mut error = Vec::with_capacity(rows.len());
    for row in rows {
        wavelength.push(row[0]);
        flux.push(row[1]);
        error.push(row[2]);
    }
    Ok((wavelength, flux, error))
}

/// Write the model components: velocity, intrinsic profile, ISM-attenuated,
/// disk-attenuated, and the full model on the observation grid.
pub fn write_components(path: &Path, components: &ModelComponents) -> Result<(), IoError> {
    let file = File::create(path).map_err(|source| IoError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    for i in 0..components.velocity.len() {
        writeln!(
            writer,
            "{}",
            format_row(&[
                components.velocity[i],
                components.intrinsic[i],
                components.ism_only[i],
                components.disk_only[i],
                components.observed[i]
            ])
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a model-component file back into its five series.
pub fn read_components(path: &Path) -> Result<ModelComponents, IoError> {
    let rows = read_columns(path, 5)?;
    let mut components = ModelComponents {
        velocity: Vec::with_capacity(rows.len()),
        intrinsic: Vec::with_capacity(rows.len()),
        ism_only: Vec::with_capacity(rows.len()),
        disk_only: Vec::with_capacity(rows.len()),
        observed: Vec::with_capacity(rows.len()),
    };
    for row in rows {
        components.velocity.push(row[0]);
        components.intrinsic.push(row[1]);
        components.ism_only.push(row[2]);
        components.disk_only.push(row[3]);
        components.observed.push(row[4]);
    }
    Ok(components)
}

fn read_columns(path: &Path, expected: usize) -> Result<Vec<Vec<f64>>, IoError> {
    let file = File::open(path).map_err(|source| IoError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    let mut rows = Vec::new();
    for (line_index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if tokens.len() != expected {
            return Err(IoError::Malformed {
                path: path.to_path_buf(),
                line: line_index + 1,
                detail: format!("expected {} columns, found {}", expected, tokens.len()),
            });
        }
        let row = tokens
            .iter()
            .enumerate()
            .map(|(column, token)| {
                let value = token.parse::<f64>().map_err(|_| IoError::Malformed {
                    path: path.to_path_buf(),
                    line: line_index + 1,
                    detail: format!("column {}: invalid number {:?}", column + 1, token),
                })?;
                // Same screen as the epoch reader: "nan" and "inf" parse.
                if !value.is_finite() {
                    return Err(IoError::Malformed {
                        path: path.to_path_buf(),
                        line: line_index + 1,
                        detail: format!("column {}: non-finite value {:?}", column + 1, token),
                    });
                }
                Ok(value)
            })
            .collect::<Result<Vec<f64>, IoError>>()?;
        rows.push(row);
    }
    Ok(rows)
}
