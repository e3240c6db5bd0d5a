#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the input datasets.
//!
//! All paths are relative to a data root directory, which defaults to the
//! current working directory.

use std::path::{Path, PathBuf};

/// Locations of the five input files read at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    /// Region geometry and metadata (JSON array).
    pub regions: PathBuf,
    /// Per-date observations (CSV).
    pub observations: PathBuf,
    /// Soil statistics per region (CSV).
    pub soil_stats: PathBuf,
    /// NDVI vegetation density classes (CSV).
    pub vegetation: PathBuf,
    /// Yield predictions per region (JSON object).
    pub predictions: PathBuf,
}

impl DataPaths {
    /// Builds the standard layout under `root`.
    #[must_use]
    pub fn from_root(root: &Path) -> Self {
        let files = files_dir(root);
        Self {
            regions: files.join("regions.json"),
            observations: files.join("data.csv"),
            soil_stats: files.join("soil_stats.csv"),
            vegetation: files.join("ndvi_data.csv"),
            predictions: models_dir(root).join("predictions_2020.json"),
        }
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::from_root(Path::new("."))
    }
}

/// Returns the `files/` directory holding the tabular inputs.
#[must_use]
pub fn files_dir(root: &Path) -> PathBuf {
    root.join("files")
}

/// Returns the `models/` directory holding prediction output.
#[must_use]
pub fn models_dir(root: &Path) -> PathBuf {
    root.join("models")
}

/// Returns the `static/` directory served to the front end.
#[must_use]
pub fn static_dir(root: &Path) -> PathBuf {
    root.join("static")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_layout_under_root() {
        let paths = DataPaths::from_root(Path::new("/srv/agri"));
        assert_eq!(paths.regions, Path::new("/srv/agri/files/regions.json"));
        assert_eq!(paths.observations, Path::new("/srv/agri/files/data.csv"));
        assert_eq!(paths.vegetation, Path::new("/srv/agri/files/ndvi_data.csv"));
        assert_eq!(
            paths.predictions,
            Path::new("/srv/agri/models/predictions_2020.json")
        );
    }
}
