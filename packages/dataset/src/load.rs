//! Readers for the input files.
//!
//! Each reader takes any [`Read`] so tests can feed in-memory fixtures; the
//! path-based [`Datasets::load`] opens the files named by [`DataPaths`] and
//! hands them to the readers. CSV columns are looked up by header name, so
//! column order in the files does not matter.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use agri_map_dataset_models::{
    DensityClass, ObservationRecord, Region, SoilStats, VegetationRecord,
};

use crate::paths::DataPaths;
use crate::{DatasetError, Datasets};

/// Columns of the observation table that are labels rather than variables.
const OBSERVATION_LABEL_COLUMNS: &[&str] = &["Region", "Date", "Year", "Month", "Season"];

/// Observation rows together with the shared variable header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationTable {
    /// All rows in file order.
    pub rows: Vec<ObservationRecord>,
    /// Variable column names. `variables[i]` names `values[i]` of every row.
    pub variables: Vec<String>,
}

impl ObservationTable {
    /// Index of the variable column called `name`.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|variable| variable == name)
    }
}

impl Datasets {
    /// Reads every input file named by `paths` and builds the query context.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if a file cannot be opened or parsed, a
    /// required column is absent, or two regions share a slug.
    pub fn load(paths: &DataPaths) -> Result<Self, DatasetError> {
        let regions = read_regions(open(&paths.regions)?)?;
        log::info!(
            "Loaded {} regions from {}",
            regions.len(),
            paths.regions.display()
        );

        let observations = read_observations(open(&paths.observations)?)?;
        log::info!(
            "Loaded {} observation rows ({} variables) from {}",
            observations.rows.len(),
            observations.variables.len(),
            paths.observations.display()
        );

        let soil_stats = read_soil_stats(open(&paths.soil_stats)?)?;
        log::info!(
            "Loaded soil stats for {} regions from {}",
            soil_stats.len(),
            paths.soil_stats.display()
        );

        let vegetation = read_vegetation(open(&paths.vegetation)?)?;
        log::info!(
            "Loaded {} vegetation rows from {}",
            vegetation.len(),
            paths.vegetation.display()
        );

        let predictions = read_predictions(open(&paths.predictions)?)?;
        log::info!(
            "Loaded {} yield predictions from {}",
            predictions.len(),
            paths.predictions.display()
        );

        Ok(Self::new(regions)?
            .with_observations(observations)
            .with_soil_stats(soil_stats)
            .with_vegetation(vegetation)
            .with_predictions(predictions))
    }
}

fn open(path: &Path) -> Result<BufReader<File>, DatasetError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Reads the region geometry file: a JSON array of region objects.
///
/// # Errors
///
/// Returns [`DatasetError::Json`] if the input is not a valid region array.
pub fn read_regions<R: Read>(reader: R) -> Result<Vec<Region>, DatasetError> {
    Ok(serde_json::from_reader(reader)?)
}

/// Reads the prediction file: a JSON object of region name to forecast.
///
/// Entries whose value is `null` are skipped.
///
/// # Errors
///
/// Returns [`DatasetError::Json`] if the input is not such an object.
pub fn read_predictions<R: Read>(reader: R) -> Result<BTreeMap<String, f64>, DatasetError> {
    let raw: BTreeMap<String, Option<f64>> = serde_json::from_reader(reader)?;
    Ok(raw
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| (name, value)))
        .collect())
}

/// Reads the observation CSV.
///
/// Every column other than `Region`, `Date`, `Year`, `Month` and `Season` is
/// treated as a numeric variable.
///
/// # Errors
///
/// Returns [`DatasetError`] on malformed CSV or if `Region` or `Year` is
/// missing from the header.
pub fn read_observations<R: Read>(reader: R) -> Result<ObservationTable, DatasetError> {
    let mut reader = csv_reader(reader);
    let columns = Columns::new("observations", reader.headers()?);

    let region_col = columns.require("Region")?;
    let year_col = columns.require("Year")?;
    let date_col = columns.optional("Date");
    let month_col = columns.optional("Month");
    let season_col = columns.optional("Season");

    let variable_columns: Vec<(String, usize)> = columns
        .iter()
        .filter(|(name, _)| !OBSERVATION_LABEL_COLUMNS.contains(name))
        .map(|(name, idx)| (name.to_owned(), idx))
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let Some(region) = text(&record, Some(region_col)) else {
            continue;
        };

        let values = variable_columns
            .iter()
            .map(|(_, idx)| number(&record, Some(*idx)))
            .collect();

        rows.push(ObservationRecord {
            region,
            date: text(&record, date_col),
            year: parse_year(&record, Some(year_col)),
            month: text(&record, month_col),
            season: text(&record, season_col),
            values,
        });
    }

    Ok(ObservationTable {
        rows,
        variables: variable_columns.into_iter().map(|(name, _)| name).collect(),
    })
}

/// Reads the vegetation CSV.
///
/// Density columns that are absent from the header read as zero for every
/// row.
///
/// # Errors
///
/// Returns [`DatasetError`] on malformed CSV or if `Region`, `Year` or
/// `Season` is missing from the header.
pub fn read_vegetation<R: Read>(reader: R) -> Result<Vec<VegetationRecord>, DatasetError> {
    let mut reader = csv_reader(reader);
    let columns = Columns::new("vegetation", reader.headers()?);

    let region_col = columns.require("Region")?;
    let year_col = columns.require("Year")?;
    let season_col = columns.require("Season")?;
    let density: Vec<(DensityClass, usize)> = DensityClass::all()
        .iter()
        .filter_map(|class| columns.optional(class.column()).map(|idx| (*class, idx)))
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let Some(region) = text(&record, Some(region_col)) else {
            continue;
        };

        let fractions = density
            .iter()
            .filter_map(|(class, idx)| number(&record, Some(*idx)).map(|v| (*class, v)))
            .collect();

        rows.push(VegetationRecord {
            region,
            year: parse_year(&record, Some(year_col)),
            season: text(&record, Some(season_col)),
            fractions,
        });
    }

    Ok(rows)
}

/// Reads the soil statistics CSV, keyed by region name.
///
/// # Errors
///
/// Returns [`DatasetError`] on malformed CSV or if any of the expected
/// columns is missing from the header.
pub fn read_soil_stats<R: Read>(reader: R) -> Result<BTreeMap<String, SoilStats>, DatasetError> {
    let mut reader = csv_reader(reader);
    let columns = Columns::new("soil_stats", reader.headers()?);

    let region_col = columns.require("RegionName")?;
    let soil_1 = columns.require("1st_top_soil_type")?;
    let soil_2 = columns.require("2st_top_soil_type")?;
    let n_range = columns.require("median_nitrogen_levels")?;
    let p_range = columns.require("median_phosphorus_levels")?;
    let ph_range = columns.require("median_ph_levels")?;

    let mut stats = BTreeMap::new();
    for result in reader.records() {
        let record = result?;
        let Some(region) = text(&record, Some(region_col)) else {
            continue;
        };
        let field = |idx| text(&record, Some(idx)).unwrap_or_default();

        stats.insert(
            region,
            SoilStats {
                soil_1: field(soil_1),
                soil_2: field(soil_2),
                n_range: field(n_range),
                p_range: field(p_range),
                ph_range: field(ph_range),
            },
        );
    }

    Ok(stats)
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Header name to column index lookup for one table.
struct Columns {
    table: &'static str,
    index: Vec<(String, usize)>,
}

impl Columns {
    fn new(table: &'static str, headers: &csv::StringRecord) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_owned(), idx))
            .collect();
        Self { table, index }
    }

    fn optional(&self, name: &str) -> Option<usize> {
        self.index
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, idx)| *idx)
    }

    fn require(&self, name: &str) -> Result<usize, DatasetError> {
        self.optional(name)
            .ok_or_else(|| DatasetError::MissingColumn {
                table: self.table,
                column: name.to_owned(),
            })
    }

    fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.index
            .iter()
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, idx)| (name.as_str(), *idx))
    }
}

fn text(record: &csv::StringRecord, idx: Option<usize>) -> Option<String> {
    let value = record.get(idx?)?.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

fn number(record: &csv::StringRecord, idx: Option<usize>) -> Option<f64> {
    let value: f64 = record.get(idx?)?.trim().parse().ok()?;
    (!value.is_nan()).then_some(value)
}

/// Accepts `2020` as well as `2020.0`, which is how years come out of tools
/// that write integer columns containing blanks as floats.
#[allow(clippy::cast_possible_truncation)]
fn parse_year(record: &csv::StringRecord, idx: Option<usize>) -> Option<i32> {
    let value = record.get(idx?)?.trim();
    if let Ok(year) = value.parse::<i32>() {
        return Some(year);
    }
    let value: f64 = value.parse().ok()?;
    (value.is_finite() && value.fract() == 0.0).then_some(value as i32)
}
