//! Parallel ingestion of OSM layers and Overture files.
//!
//! Each [`IngestUnit`] reads one file (and layer) on its own handle and
//! applies the tag filter before returning. Failures are logged and the unit
//! contributes nothing.

pub mod discovery;
pub mod osm;
pub mod overture;

use crate::error::FinderError;
use crate::models::{Feature, OsmLayer};
use crate::tag_filter::{TagQuery, filter_osm_records, filter_overture_records};
use rayon::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestUnit {
    OsmLayer { path: PathBuf, layer: OsmLayer },
    OvertureFile { path: PathBuf },
}

impl fmt::Display for IngestUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestUnit::OsmLayer { path, layer } => write!(f, "{}[{}]", path.display(), layer),
            IngestUnit::OvertureFile { path } => write!(f, "{}", path.display()),
        }
    }
}

impl IngestUnit {
    pub fn path(&self) -> &Path {
        match self {
            IngestUnit::OsmLayer { path, .. } | IngestUnit::OvertureFile { path } => path,
        }
    }

    fn read(&self, query: &TagQuery) -> Result<Vec<Feature>, FinderError> {
        match self {
            IngestUnit::OsmLayer { path, layer } => {
                let records = osm::read_layer(path, *layer, query)?;
                Ok(filter_osm_records(records, query))
            }
            IngestUnit::OvertureFile { path } => {
                let records = overture::read_file(path)?;
                Ok(filter_overture_records(records, query))
            }
        }
    }

    /// Reads and filters this unit. Any failure yields an empty list.
    pub fn run(&self, query: &TagQuery) -> Vec<Feature> {
        match self.read(query) {
            Ok(features) => {
                debug!("{}: {} matching features", self, features.len());
                features
            }
            Err(FinderError::NoAttributesRecognized { path }) => {
                debug!("{:?} has no recognised attribute columns", path);
                Vec::new()
            }
            Err(e) => {
                let unavailable = FinderError::SourceUnavailable {
                    path: self.path().to_path_buf(),
                    reason: e.to_string(),
                };
                warn!("{}", unavailable);
                Vec::new()
            }
        }
    }
}

/// One unit per (file, layer).
pub fn osm_units(files: &[PathBuf]) -> Vec<IngestUnit> {
    files
        .iter()
        .flat_map(|path| {
            OsmLayer::ALL.iter().map(move |layer| IngestUnit::OsmLayer {
                path: path.clone(),
                layer: *layer,
            })
        })
        .collect()
}

pub fn overture_units(files: &[PathBuf]) -> Vec<IngestUnit> {
    files
        .iter()
        .map(|path| IngestUnit::OvertureFile { path: path.clone() })
        .collect()
}

/// Runs units on the rayon pool, concatenating results in dispatch order.
pub fn ingest(units: &[IngestUnit], query: &TagQuery) -> Vec<Feature> {
    let per_unit: Vec<Vec<Feature>> = units.par_iter().map(|unit| unit.run(query)).collect();
    per_unit.into_iter().flatten().collect()
}
