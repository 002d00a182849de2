//! Text-file interchange for epoch data and derived spectra.

pub mod composite;
pub mod epoch;
pub mod format;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{path}:{line}: {detail}")]
    Malformed {
        path: PathBuf,
        line: usize,
        detail: String,
    },
}

pub use composite::{read_components, read_composite, write_components, write_composite};
pub use epoch::{read_epoch, EpochLayout, TrailingColumns};
