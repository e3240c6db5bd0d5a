#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Region, geometry and agricultural record types.
//!
//! These types describe the datasets loaded at startup: region geometry,
//! per-date observations, vegetation density classes, soil statistics and
//! yield predictions. They are independent of how the data is stored on
//! disk and of the JSON shapes returned by the HTTP API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A single `[x, y]` vertex in normalized rendering coordinates.
pub type Vertex = [f64; 2];

/// A closed ring of vertices.
pub type Polygon = Vec<Vertex>;

/// A region as described by the geometry file.
///
/// The slug is the URL-facing identifier; every other dataset joins on
/// [`Region::name`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// URL-safe identifier, unique across all regions.
    #[serde(rename = "href")]
    pub slug: String,
    /// Human-readable region name used to join the tabular datasets.
    #[serde(rename = "RegionName")]
    pub name: String,
    /// Region outline, normalized for rendering.
    #[serde(rename = "normalized_polygons", default)]
    pub polygons: Vec<Polygon>,
}

impl Region {
    /// Iterates over every vertex of every polygon of this region.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.polygons.iter().flatten()
    }
}

/// Axis-aligned bounds of a set of vertices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    /// Smallest X coordinate.
    pub min_x: f64,
    /// Largest X coordinate.
    pub max_x: f64,
    /// Smallest Y coordinate.
    pub min_y: f64,
    /// Largest Y coordinate.
    pub max_y: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given extents.
    #[must_use]
    pub const fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Width of the box along the X axis.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the box along the Y axis.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// One row of the observation table: a region on a given date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Region name.
    pub region: String,
    /// Observation date as written in the source (e.g. "2019-03-01").
    pub date: Option<String>,
    /// Calendar year of the observation.
    pub year: Option<i32>,
    /// Month label as written in the source.
    pub month: Option<String>,
    /// Season label as written in the source.
    pub season: Option<String>,
    /// Numeric variables in the column order of the table the row was read
    /// from. `None` marks a missing cell.
    pub values: Vec<Option<f64>>,
}

impl ObservationRecord {
    /// Returns the value in variable column `column`, or `None` if the cell
    /// is missing or the column does not exist.
    #[must_use]
    pub fn value(&self, column: usize) -> Option<f64> {
        self.values.get(column).copied().flatten()
    }

    /// Returns the key this row falls under for the given granularity.
    #[must_use]
    pub fn group_key(&self, granularity: Granularity) -> Option<&str> {
        match granularity {
            Granularity::Daily => self.date.as_deref(),
            Granularity::Monthly => self.month.as_deref(),
            Granularity::Seasonal => self.season.as_deref(),
        }
    }
}

/// Aggregation period for time-series queries.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Granularity {
    /// Group by observation date.
    #[default]
    Daily,
    /// Group by month.
    Monthly,
    /// Group by season.
    Seasonal,
}

/// Vegetation density classes derived from NDVI.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum DensityClass {
    /// Sparse vegetation cover.
    Sparse,
    /// Moderate vegetation cover.
    Moderate,
    /// Dense vegetation cover.
    Dense,
    /// Very dense vegetation cover.
    #[serde(rename = "Very Dense")]
    #[strum(serialize = "Very Dense")]
    VeryDense,
}

impl DensityClass {
    /// Name of the column holding this class in the vegetation table.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Sparse => "Sparse Veg",
            Self::Moderate => "Moderate Veg",
            Self::Dense => "Dense Veg",
            Self::VeryDense => "Very Dense Veg",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Sparse, Self::Moderate, Self::Dense, Self::VeryDense]
    }
}

/// One row of the vegetation table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VegetationRecord {
    /// Region name.
    pub region: String,
    /// Year of the imagery.
    pub year: Option<i32>,
    /// Season label.
    pub season: Option<String>,
    /// Area fraction per density class. Missing cells are absent.
    pub fractions: BTreeMap<DensityClass, f64>,
}

impl VegetationRecord {
    /// Area fraction for `class`, treating a missing cell as zero.
    #[must_use]
    pub fn fraction(&self, class: DensityClass) -> f64 {
        self.fractions.get(&class).copied().unwrap_or(0.0)
    }
}

/// Sum of the density-class fractions over a set of vegetation rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VegetationSummary {
    /// Sparse vegetation total.
    pub sparse: f64,
    /// Moderate vegetation total.
    pub moderate: f64,
    /// Dense vegetation total.
    pub dense: f64,
    /// Very dense vegetation total.
    pub very_dense: f64,
}

impl VegetationSummary {
    /// Adds the fractions of `record` to the running totals.
    pub fn add(&mut self, record: &VegetationRecord) {
        self.sparse += record.fraction(DensityClass::Sparse);
        self.moderate += record.fraction(DensityClass::Moderate);
        self.dense += record.fraction(DensityClass::Dense);
        self.very_dense += record.fraction(DensityClass::VeryDense);
    }
}

/// Dominant soil types and median nutrient ranges for a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoilStats {
    /// Most common soil type.
    pub soil_1: String,
    /// Second most common soil type.
    pub soil_2: String,
    /// Median nitrogen level range.
    pub n_range: String,
    /// Median phosphorus level range.
    pub p_range: String,
    /// Median pH range.
    pub ph_range: String,
}

/// Actual and forecast yield for a region and year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct YieldLookup {
    /// Recorded production, rounded to one decimal. `None` when no row or
    /// no value exists for the year.
    pub actual: Option<f64>,
    /// Forecast yield for the region, rounded to one decimal.
    pub predicted: Option<f64>,
}

/// Mean of one variable per group key, in key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// `(group key, mean)` pairs. A `None` mean means every value in the
    /// group was missing.
    pub points: Vec<(String, Option<f64>)>,
}
