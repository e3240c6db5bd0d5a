#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the agri map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the dataset record types so the API contract the map front end
//! depends on can evolve independently of the loaded tables.

use agri_map_dataset_models::{BoundingBox, Series, SoilStats, VegetationSummary, YieldLookup};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Query parameters carrying only a region slug.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegionQueryParams {
    /// Region slug.
    pub region: Option<String>,
}

/// Query parameters for the yield endpoint.
///
/// `year` is kept as text so a malformed value can be reported as a JSON
/// error rather than rejected by the extractor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct YieldQueryParams {
    /// Region slug.
    pub region: Option<String>,
    /// Calendar year.
    pub year: Option<String>,
}

/// Query parameters for the aggregated series endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataQueryParams {
    /// Region slug.
    pub region: Option<String>,
    /// Calendar year.
    pub year: Option<String>,
    /// `daily`, `monthly` or `seasonal`. Absent means `daily`.
    pub granularity: Option<String>,
    /// Observation column to average.
    pub variable: Option<String>,
}

/// Query parameters for the vegetation endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VegetationQueryParams {
    /// Region slug.
    pub region: Option<String>,
    /// Calendar year.
    pub year: Option<String>,
    /// Season label.
    pub season: Option<String>,
}

/// Actual and predicted yield as returned by `/api/yield`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ApiYield {
    /// Recorded yield, `null` when no data exists for the year.
    #[serde(rename = "yield")]
    pub actual: Option<f64>,
    /// Forecast yield. Omitted when the region has no forecast.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub predicted_yield: Option<f64>,
}

impl From<YieldLookup> for ApiYield {
    fn from(lookup: YieldLookup) -> Self {
        Self {
            actual: lookup.actual,
            predicted_yield: lookup.predicted,
        }
    }
}

/// Group key to mean mapping as returned by `/api/data`.
///
/// Serializes as a JSON object whose keys keep the series order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiSeries(pub Vec<(String, Option<f64>)>);

impl From<Series> for ApiSeries {
    fn from(series: Series) -> Self {
        Self(series.points)
    }
}

impl Serialize for ApiSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, mean) in &self.0 {
            map.serialize_entry(key, mean)?;
        }
        map.end()
    }
}

/// Density-class totals as returned by `/api/vegetation`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ApiVegetation {
    /// Sparse vegetation total.
    #[serde(rename = "Sparse")]
    pub sparse: f64,
    /// Moderate vegetation total.
    #[serde(rename = "Moderate")]
    pub moderate: f64,
    /// Dense vegetation total.
    #[serde(rename = "Dense")]
    pub dense: f64,
    /// Very dense vegetation total.
    #[serde(rename = "Very Dense")]
    pub very_dense: f64,
}

impl From<VegetationSummary> for ApiVegetation {
    fn from(summary: VegetationSummary) -> Self {
        Self {
            sparse: summary.sparse,
            moderate: summary.moderate,
            dense: summary.dense,
            very_dense: summary.very_dense,
        }
    }
}

/// Error body for 400 responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable reason.
    pub error: String,
}

impl ApiError {
    /// Creates an error body with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
    /// Number of regions loaded.
    pub region_count: usize,
}

/// One entry of the region list page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRegionSummary {
    /// Region slug, used as the detail page path.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Outline polygons, each as an SVG `points` string.
    pub polygons: Vec<String>,
}

/// View model of a region detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRegionPage {
    /// Region slug.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Outline polygons, each as an SVG `points` string.
    pub polygons: Vec<String>,
    /// Bounds of the outline, used to fit the map viewport.
    pub bounds: Option<BoundingBox>,
    /// Dominant soil types and nutrient ranges.
    pub soil_stats: Option<SoilStats>,
    /// Region area in hectares.
    pub region_area: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yield_omits_missing_prediction() {
        let body = serde_json::to_value(ApiYield::from(YieldLookup {
            actual: None,
            predicted: None,
        }))
        .unwrap();
        assert_eq!(body, serde_json::json!({ "yield": null }));

        let body = serde_json::to_value(ApiYield::from(YieldLookup {
            actual: Some(12.5),
            predicted: Some(13.1),
        }))
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "yield": 12.5, "predicted_yield": 13.1 })
        );
    }

    #[test]
    fn series_keeps_key_order() {
        let series = ApiSeries(vec![
            ("2".to_string(), Some(1.5)),
            ("10".to_string(), None),
            ("11".to_string(), Some(3.0)),
        ]);
        assert_eq!(
            serde_json::to_string(&series).unwrap(),
            r#"{"2":1.5,"10":null,"11":3.0}"#
        );
    }

    #[test]
    fn vegetation_uses_density_class_names() {
        let body = serde_json::to_value(ApiVegetation::from(VegetationSummary {
            sparse: 0.5,
            moderate: 0.25,
            dense: 0.0,
            very_dense: 1.0,
        }))
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "Sparse": 0.5,
                "Moderate": 0.25,
                "Dense": 0.0,
                "Very Dense": 1.0,
            })
        );
    }
}
