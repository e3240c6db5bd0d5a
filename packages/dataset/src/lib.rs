#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dataset loading and region-level queries for the agri map.
//!
//! All input files are read once into a [`Datasets`] value, which is then
//! shared read-only by every request handler. Regions are addressed by slug;
//! every other table joins to a region by its name, and [`Datasets`] owns
//! that slug to name translation.

pub mod aggregate;
pub mod geometry;
pub mod load;
pub mod paths;

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use agri_map_dataset_models::{
    BoundingBox, Granularity, ObservationRecord, Region, Series, SoilStats, VegetationRecord,
    VegetationSummary, YieldLookup,
};
use thiserror::Error;

use crate::aggregate::{mean_by_group, round_to};
use crate::load::ObservationTable;

/// Observation column holding the recorded yield.
pub const PRODUCTION_COLUMN: &str = "Production";

/// Observation column holding the region area in square metres.
pub const REGION_AREA_COLUMN: &str = "region_area";

const SQUARE_METRES_PER_HECTARE: f64 = 10_000.0;

/// Errors that can occur while loading the input files.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// An input file could not be opened or read.
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required column is absent from a CSV header.
    #[error("Missing column '{column}' in {table} table")]
    MissingColumn {
        /// Table being read.
        table: &'static str,
        /// Name of the absent column.
        column: String,
    },

    /// Two regions in the geometry file share a slug.
    #[error("Duplicate region slug '{slug}'")]
    DuplicateSlug {
        /// The repeated slug.
        slug: String,
    },
}

/// Errors a caller can trigger through query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The slug does not name a known region.
    #[error("Invalid region")]
    UnknownRegion {
        /// Slug that failed to resolve.
        slug: String,
    },

    /// The variable is not a numeric column of the observation table.
    #[error("Unknown variable: {name}")]
    UnknownVariable {
        /// Requested variable name.
        name: String,
    },
}

/// Everything a region detail view needs.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionDetail<'a> {
    /// The region itself.
    pub region: &'a Region,
    /// Bounds of the region outline, if it has any vertices.
    pub bounds: Option<BoundingBox>,
    /// Soil statistics joined by region name.
    pub soil_stats: Option<&'a SoilStats>,
    /// Region area in hectares, rounded to two decimals.
    pub area_hectares: Option<f64>,
}

/// Immutable, fully indexed view of every input dataset.
///
/// Built once at startup (see [`Datasets::load`]) or from fixture records in
/// tests, then shared across request handlers.
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    /// Regions in geometry-file order.
    regions: Vec<Region>,
    /// slug -> index into `regions`
    slug_index: BTreeMap<String, usize>,
    /// region name -> observation rows in file order
    observations: BTreeMap<String, Vec<ObservationRecord>>,
    /// variable name -> index into each row's `values`
    variables: BTreeMap<String, usize>,
    /// region name -> vegetation rows in file order
    vegetation: BTreeMap<String, Vec<VegetationRecord>>,
    soil_stats: BTreeMap<String, SoilStats>,
    predictions: BTreeMap<String, f64>,
}

impl Datasets {
    /// Indexes `regions` by slug. The other tables start empty and are added
    /// with the `with_*` methods.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::DuplicateSlug`] if two regions share a slug.
    pub fn new(regions: Vec<Region>) -> Result<Self, DatasetError> {
        let mut slug_index = BTreeMap::new();
        for (idx, region) in regions.iter().enumerate() {
            if slug_index.insert(region.slug.clone(), idx).is_some() {
                return Err(DatasetError::DuplicateSlug {
                    slug: region.slug.clone(),
                });
            }
        }

        Ok(Self {
            regions,
            slug_index,
            ..Self::default()
        })
    }

    /// Sets the observation table, indexed by region name. Replaces any
    /// table added before.
    #[must_use]
    pub fn with_observations(mut self, table: ObservationTable) -> Self {
        self.observations.clear();
        for row in table.rows {
            self.observations
                .entry(row.region.clone())
                .or_default()
                .push(row);
        }
        self.variables = table
            .variables
            .into_iter()
            .enumerate()
            .map(|(idx, name)| (name, idx))
            .collect();
        self
    }

    /// Adds the vegetation table, indexed by region name.
    #[must_use]
    pub fn with_vegetation(mut self, rows: Vec<VegetationRecord>) -> Self {
        for row in rows {
            self.vegetation
                .entry(row.region.clone())
                .or_default()
                .push(row);
        }
        self
    }

    /// Adds soil statistics keyed by region name.
    #[must_use]
    pub fn with_soil_stats(mut self, stats: BTreeMap<String, SoilStats>) -> Self {
        self.soil_stats.extend(stats);
        self
    }

    /// Adds yield predictions keyed by region name.
    #[must_use]
    pub fn with_predictions(mut self, predictions: BTreeMap<String, f64>) -> Self {
        self.predictions.extend(predictions);
        self
    }

    /// All regions in geometry-file order.
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Names of the numeric observation variables, sorted.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    fn column(&self, variable: &str) -> Option<usize> {
        self.variables.get(variable).copied()
    }

    /// Resolves a slug to its region.
    #[must_use]
    pub fn region(&self, slug: &str) -> Option<&Region> {
        self.slug_index.get(slug).map(|&idx| &self.regions[idx])
    }

    /// Resolves a slug to its region, or fails with
    /// [`QueryError::UnknownRegion`].
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownRegion`] if the slug is not indexed.
    pub fn require_region(&self, slug: &str) -> Result<&Region, QueryError> {
        self.region(slug).ok_or_else(|| QueryError::UnknownRegion {
            slug: slug.to_owned(),
        })
    }

    /// Soil statistics for a region name.
    #[must_use]
    pub fn soil_stats(&self, region_name: &str) -> Option<&SoilStats> {
        self.soil_stats.get(region_name)
    }

    /// Forecast yield for a region name, unrounded.
    #[must_use]
    pub fn prediction(&self, region_name: &str) -> Option<f64> {
        self.predictions.get(region_name).copied()
    }

    fn observations_for(&self, region_name: &str) -> &[ObservationRecord] {
        self.observations
            .get(region_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn vegetation_for(&self, region_name: &str) -> &[VegetationRecord] {
        self.vegetation
            .get(region_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Bounding box of the region's outline.
    ///
    /// Returns `None` if the slug is unknown or the region has no vertices.
    #[must_use]
    pub fn bounds(&self, slug: &str) -> Option<BoundingBox> {
        self.region(slug).and_then(geometry::bounds)
    }

    /// Everything needed to render a region page, or `None` for an unknown
    /// slug.
    ///
    /// The area comes from the `region_area` column (square metres) of the
    /// region's first observation row.
    #[must_use]
    pub fn region_detail(&self, slug: &str) -> Option<RegionDetail<'_>> {
        let region = self.region(slug)?;

        let area_column = self.column(REGION_AREA_COLUMN);
        let area_hectares = self
            .observations_for(&region.name)
            .first()
            .zip(area_column)
            .and_then(|(row, column)| row.value(column))
            .map(|area| round_to(area / SQUARE_METRES_PER_HECTARE, 2));

        Some(RegionDetail {
            region,
            bounds: geometry::bounds(region),
            soil_stats: self.soil_stats(&region.name),
            area_hectares,
        })
    }

    /// Recorded and forecast yield for a region and year.
    ///
    /// The recorded value comes from the first observation row for that
    /// year; a missing row or a missing `Production` cell gives `None`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownRegion`] if the slug is not indexed.
    pub fn yield_for(&self, slug: &str, year: i32) -> Result<YieldLookup, QueryError> {
        let region = self.require_region(slug)?;
        let production = self.column(PRODUCTION_COLUMN);

        let actual = self
            .observations_for(&region.name)
            .iter()
            .find(|row| row.year == Some(year))
            .zip(production)
            .and_then(|(row, column)| row.value(column))
            .map(|value| round_to(value, 1));

        Ok(YieldLookup {
            actual,
            predicted: self.prediction(&region.name).map(|value| round_to(value, 1)),
        })
    }

    /// Every year with observation or vegetation data for the region, sorted
    /// and de-duplicated. Empty for an unknown slug.
    #[must_use]
    pub fn years(&self, slug: &str) -> Vec<i32> {
        let Some(region) = self.region(slug) else {
            return Vec::new();
        };

        let observed = self.observations_for(&region.name).iter().filter_map(|row| row.year);
        let imaged = self.vegetation_for(&region.name).iter().filter_map(|row| row.year);

        observed
            .chain(imaged)
            .collect::<BTreeSet<i32>>()
            .into_iter()
            .collect()
    }

    /// Mean of `variable` over the region's rows for `year`, grouped by
    /// `granularity`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownRegion`] if the slug is not indexed and
    /// [`QueryError::UnknownVariable`] if `variable` is not a numeric
    /// observation column.
    pub fn series(
        &self,
        slug: &str,
        year: i32,
        granularity: Granularity,
        variable: &str,
    ) -> Result<Series, QueryError> {
        let region = self.require_region(slug)?;

        let Some(column) = self.column(variable) else {
            return Err(QueryError::UnknownVariable {
                name: variable.to_owned(),
            });
        };

        let rows = self
            .observations_for(&region.name)
            .iter()
            .filter(|row| row.year == Some(year));

        Ok(mean_by_group(rows, granularity, column))
    }

    /// Distinct seasons with vegetation data for the region, sorted. Empty
    /// for an unknown slug.
    #[must_use]
    pub fn seasons(&self, slug: &str) -> Vec<String> {
        let Some(region) = self.region(slug) else {
            return Vec::new();
        };

        self.vegetation_for(&region.name)
            .iter()
            .filter_map(|row| row.season.clone())
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect()
    }

    /// Density-class totals over the vegetation rows matching the region,
    /// year and season exactly. No matching rows gives all zeros.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownRegion`] if the slug is not indexed.
    pub fn vegetation_summary(
        &self,
        slug: &str,
        year: i32,
        season: &str,
    ) -> Result<VegetationSummary, QueryError> {
        let region = self.require_region(slug)?;

        let mut summary = VegetationSummary::default();
        self.vegetation_for(&region.name)
            .iter()
            .filter(|row| row.year == Some(year) && row.season.as_deref() == Some(season))
            .for_each(|row| summary.add(row));

        Ok(summary)
    }
}
