//! Evaluate the radiative-transfer forward model on a composite spectrum's
//! wavelength grid and write out the component profiles.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use lyman::config::{presets, AnalysisConfig};
use lyman::io;
use lyman::model::ForwardModel;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Evaluate the Ly-alpha emission + absorption model on an observed grid"
)]
struct Args {
    /// Composite spectrum to model (wavelength, flux, error columns)
    composite: PathBuf,

    /// Analysis configuration (JSON); defaults to the beta Pictoris preset
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output path for the model components
    #[arg(short, long, default_value = "model.dat")]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => presets::BETA_PIC.clone(),
    };

    let (wavelength, _, _) = io::read_composite(&args.composite)
        .with_context(|| format!("failed to read {}", args.composite.display()))?;

    let model = ForwardModel::new(
        &wavelength,
        config.line.fit_rest_wavelength,
        config.line.system_rv_km_s,
        config.instrument,
    )
    .context("failed to set up the forward model")?;
    let components = model
        .evaluate_components(&config.emission, &config.ism, &config.disk)
        .context("failed to evaluate the model")?;

    io::write_components(&args.output, &components)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!(
        "wrote {} model samples to {}",
        components.velocity.len(),
        args.output.display()
    );

    Ok(())
}
