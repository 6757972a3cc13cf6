//! Error taxonomy for ingestion and configuration.
//!
//! Most of these never escape the library: a failing ingestion unit is logged
//! and contributes no features. Only [`FinderError::NoSourceFiles`] and
//! [`FinderError::Config`] abort a run.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinderError {
    #[error("I/O error accessing path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("source '{path}' is unavailable: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },
    #[error("source '{path}' exposes none of the expected attribute columns")]
    NoAttributesRecognized { path: PathBuf },
    #[error("no transect files found in {dir} (osm: {osm_files}, overture: {overture_files})")]
    NoSourceFiles {
        dir: PathBuf,
        osm_files: usize,
        overture_files: usize,
    },
    #[error("OSM PBF error: {0}")]
    Osm(#[from] osmpbfreader::Error),
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("invalid configuration in '{path}': {reason}")]
    Config { path: PathBuf, reason: String },
}

macro_rules! io_err {
    ($path:expr, $err:expr) => {
        $crate::error::FinderError::Io {
            path: $path.to_path_buf(),
            source: $err,
        }
    };
}

pub(crate) use io_err;
