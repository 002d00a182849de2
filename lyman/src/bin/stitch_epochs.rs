//! Build the composite Ly-alpha profile from multi-epoch exposure files.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;

use lyman::config::{presets, AnalysisConfig};
use lyman::io::{self, EpochLayout};
use lyman::pipeline;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Calibrate, combine and stitch multi-epoch spectra into a composite Ly-alpha profile"
)]
struct Args {
    /// Epoch data files in campaign order, baseline first
    #[arg(required = true)]
    epochs: Vec<PathBuf>,

    /// Analysis configuration (JSON); defaults to the beta Pictoris preset
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output path for the stitched composite
    #[arg(short, long, default_value = "composite.dat")]
    output: PathBuf,

    /// Also write the sky-subtracted wing composite to this path
    #[arg(long)]
    wings: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => presets::BETA_PIC.clone(),
    };

    let layouts: &[EpochLayout] = &presets::BETA_PIC_LAYOUTS;
    if args.epochs.len() != layouts.len() {
        let expected: Vec<&str> = layouts.iter().map(|l| l.epoch.as_str()).collect();
        bail!(
            "expected {} epoch files ({}), got {}",
            layouts.len(),
            expected.join(", "),
            args.epochs.len()
        );
    }

    let files: Vec<(&Path, &EpochLayout)> = args
        .epochs
        .iter()
        .map(|p| p.as_path())
        .zip(layouts.iter())
        .collect();
    let epochs = pipeline::load_epochs(&files).context("failed to read epoch files")?;

    let composite =
        pipeline::build_composite(&epochs, &config).context("failed to build the composite")?;
    io::write_composite(&args.output, &composite)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!(
        "wrote {} samples to {}",
        composite.len(),
        args.output.display()
    );

    if let Some(path) = &args.wings {
        let wings = pipeline::build_wing_composite(&epochs, &config)
            .context("failed to build the wing composite")?;
        io::write_composite(path, &wings)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("wrote {} samples to {}", wings.len(), path.display());
    }

    Ok(())
}
