use crate::error::{FinderError, io_err};
use std::io;
use std::path::{Path, PathBuf};

pub const OSM_SUFFIX: &str = "-Transect.osm.pbf";
pub const OVERTURE_SUFFIX: &str = "-Transect.parquet";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFiles {
    pub osm: Vec<PathBuf>,
    pub overture: Vec<PathBuf>,
}

/// Lists transect extracts in `dir`, sorted by path.
///
/// Fails with [`FinderError::NoSourceFiles`] unless both sources have at least one file.
pub fn discover(dir: &Path) -> Result<SourceFiles, FinderError> {
    let mut files = SourceFiles::default();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => Some(entries),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(io_err!(dir, e)),
    };

    for entry in entries.into_iter().flatten() {
        let path = entry.map_err(|e| io_err!(dir, e))?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if name.ends_with(OSM_SUFFIX) {
            files.osm.push(path);
        } else if name.ends_with(OVERTURE_SUFFIX) {
            files.overture.push(path);
        }
    }

    files.osm.sort();
    files.overture.sort();

    if files.osm.is_empty() || files.overture.is_empty() {
        return Err(FinderError::NoSourceFiles {
            dir: dir.to_path_buf(),
            osm_files: files.osm.len(),
            overture_files: files.overture.len(),
        });
    }

    Ok(files)
}
