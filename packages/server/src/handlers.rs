//! HTTP handler functions for the agri map API and region pages.

use actix_web::{HttpResponse, web};
use agri_map_dataset::geometry::svg_points;
use agri_map_dataset::{QueryError, RegionDetail};
use agri_map_dataset_models::{Granularity, Region};
use agri_map_server_models::{
    ApiError, ApiHealth, ApiRegionPage, ApiRegionSummary, ApiSeries, ApiVegetation, ApiYield,
    DataQueryParams, RegionQueryParams, VegetationQueryParams, YieldQueryParams,
};

use crate::AppState;
use crate::query::FirstQuery;

const MISSING_PARAMETERS: &str = "Missing required parameters";
const INVALID_YEAR: &str = "Invalid year format";

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        region_count: state.datasets.regions().len(),
    })
}

/// `GET /api/yield`
///
/// Returns the recorded yield for a region and year alongside the region's
/// forecast.
pub async fn yield_lookup(
    state: web::Data<AppState>,
    params: FirstQuery<YieldQueryParams>,
) -> HttpResponse {
    let Some(year) = parse_year(params.year.as_deref()) else {
        return bad_request(INVALID_YEAR);
    };
    let slug = params.region.as_deref().unwrap_or_default();

    match state.datasets.yield_for(slug, year) {
        Ok(lookup) => HttpResponse::Ok().json(ApiYield::from(lookup)),
        Err(e) => query_error(&e),
    }
}

/// `GET /api/years`
///
/// Lists every year with data for a region. Unknown regions get `[]`.
pub async fn years(
    state: web::Data<AppState>,
    params: FirstQuery<RegionQueryParams>,
) -> HttpResponse {
    let slug = params.region.as_deref().unwrap_or_default();
    HttpResponse::Ok().json(state.datasets.years(slug))
}

/// `GET /api/data`
///
/// Averages one observation variable over a region's year, grouped by day,
/// month or season. Any granularity other than `monthly` or `seasonal`
/// groups by day.
pub async fn data(
    state: web::Data<AppState>,
    params: FirstQuery<DataQueryParams>,
) -> HttpResponse {
    let Some(year) = parse_year(params.year.as_deref()) else {
        return bad_request(INVALID_YEAR);
    };
    let slug = params.region.as_deref().unwrap_or_default();
    if let Err(e) = state.datasets.require_region(slug) {
        return query_error(&e);
    }

    let granularity = params
        .granularity
        .as_deref()
        .and_then(|raw| raw.parse::<Granularity>().ok())
        .unwrap_or_default();

    let Some(variable) = non_empty(params.variable.as_deref()) else {
        return bad_request(MISSING_PARAMETERS);
    };

    match state.datasets.series(slug, year, granularity, variable) {
        Ok(series) => HttpResponse::Ok().json(ApiSeries::from(series)),
        Err(e) => query_error(&e),
    }
}

/// `GET /api/seasons`
///
/// Lists the seasons with vegetation data for a region. Unknown regions get
/// `[]`.
pub async fn seasons(
    state: web::Data<AppState>,
    params: FirstQuery<RegionQueryParams>,
) -> HttpResponse {
    let slug = params.region.as_deref().unwrap_or_default();
    HttpResponse::Ok().json(state.datasets.seasons(slug))
}

/// `GET /api/vegetation`
///
/// Sums the vegetation density classes for a region, year and season.
pub async fn vegetation(
    state: web::Data<AppState>,
    params: FirstQuery<VegetationQueryParams>,
) -> HttpResponse {
    let (Some(slug), Some(year), Some(season)) = (
        non_empty(params.region.as_deref()),
        non_empty(params.year.as_deref()),
        non_empty(params.season.as_deref()),
    ) else {
        return bad_request(MISSING_PARAMETERS);
    };

    let Some(year) = parse_year(Some(year)) else {
        return bad_request(INVALID_YEAR);
    };

    match state.datasets.vegetation_summary(slug, year, season) {
        Ok(summary) => HttpResponse::Ok().json(ApiVegetation::from(summary)),
        Err(e) => query_error(&e),
    }
}

/// `GET /`
///
/// Region list page data.
pub async fn index(state: web::Data<AppState>) -> HttpResponse {
    let regions: Vec<ApiRegionSummary> = state
        .datasets
        .regions()
        .iter()
        .map(|region| ApiRegionSummary {
            slug: region.slug.clone(),
            name: region.name.clone(),
            polygons: polygon_points(region),
        })
        .collect();

    HttpResponse::Ok().json(regions)
}

/// `GET /{slug}`
///
/// Region detail page data, or an empty 204 for an unknown slug.
pub async fn region_page(state: web::Data<AppState>, slug: web::Path<String>) -> HttpResponse {
    render_region_page(&state, &slug)
}

/// `GET /api`
///
/// The scope swallows this path, so it is answered as the page for slug
/// `api`.
pub async fn api_root(state: web::Data<AppState>) -> HttpResponse {
    render_region_page(&state, "api")
}

fn render_region_page(state: &AppState, slug: &str) -> HttpResponse {
    let Some(detail) = state.datasets.region_detail(slug) else {
        log::debug!("No region for page slug '{slug}'");
        return HttpResponse::NoContent().finish();
    };

    HttpResponse::Ok().json(region_page_view(&detail))
}

/// `GET /{tail:.*}`
///
/// Multi-segment paths. Crawler `robots*.txt` requests get an empty 204,
/// anything else an empty 404.
pub async fn catch_all(tail: web::Path<String>) -> HttpResponse {
    if tail.starts_with("robots") && tail.ends_with(".txt") {
        HttpResponse::NoContent().finish()
    } else {
        HttpResponse::NotFound().finish()
    }
}

/// Empty 204, for favicon requests and unmatched routes.
pub async fn no_content() -> HttpResponse {
    HttpResponse::NoContent().finish()
}

/// Empty 404, for unknown `/api` paths.
pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().finish()
}

fn region_page_view(detail: &RegionDetail<'_>) -> ApiRegionPage {
    ApiRegionPage {
        slug: detail.region.slug.clone(),
        name: detail.region.name.clone(),
        polygons: polygon_points(detail.region),
        bounds: detail.bounds,
        soil_stats: detail.soil_stats.cloned(),
        region_area: detail.area_hectares,
    }
}

fn polygon_points(region: &Region) -> Vec<String> {
    region
        .polygons
        .iter()
        .map(|polygon| svg_points(polygon))
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn parse_year(raw: Option<&str>) -> Option<i32> {
    raw?.trim().parse().ok()
}

fn bad_request(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiError::new(message))
}

fn query_error(e: &QueryError) -> HttpResponse {
    if let QueryError::UnknownRegion { slug } = e {
        log::debug!("Unknown region slug '{slug}'");
    }
    bad_request(e.to_string())
}

#[cfg(test)]
mod tests {
    use actix_web::dev::ServiceResponse;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use agri_map_dataset::Datasets;
    use agri_map_dataset::load::{
        read_observations, read_predictions, read_regions, read_soil_stats, read_vegetation,
    };
    use serde_json::{Value, json};

    use super::*;

    const REGIONS_JSON: &str = r#"[
        {"href": "north-vale", "RegionName": "North Vale",
         "normalized_polygons": [[[10, 20], [30, 20], [30, 45]], [[5, 50]]]},
        {"href": "empty-flats", "RegionName": "Empty Flats", "normalized_polygons": []}
    ]"#;

    const OBSERVATIONS_CSV: &str = "\
Region,Date,Year,Month,Season,Production,Nitrogen,region_area
North Vale,2019-01-01,2019,1,Winter,101.26,2.0,50000000
North Vale,2019-02-01,2019,2,Winter,99,4.0,50000000
North Vale,2019-02-15,2019,2,Winter,,,50000000
North Vale,2019-07-01,2019,7,Summer,80,9.0,50000000
North Vale,2020-01-01,2020,1,Winter,,1.0,50000000
";

    const VEGETATION_CSV: &str = "\
Region,Year,Season,Sparse Veg,Moderate Veg,Dense Veg,Very Dense Veg
North Vale,2019,Summer,0.25,0.25,0.25,0.125
North Vale,2019,Summer,0.25,0,0,0.125
North Vale,2021,Autumn,0.5,0.25,0.125,0.125
";

    const SOIL_CSV: &str = "\
RegionName,1st_top_soil_type,2st_top_soil_type,median_nitrogen_levels,median_phosphorus_levels,median_ph_levels
North Vale,Loam,Clay,20-40,10-15,6.0-6.5
";

    const PREDICTIONS_JSON: &str = r#"{"North Vale": 104.349}"#;

    fn datasets() -> Datasets {
        Datasets::new(read_regions(REGIONS_JSON.as_bytes()).unwrap())
            .unwrap()
            .with_observations(read_observations(OBSERVATIONS_CSV.as_bytes()).unwrap())
            .with_vegetation(read_vegetation(VEGETATION_CSV.as_bytes()).unwrap())
            .with_soil_stats(read_soil_stats(SOIL_CSV.as_bytes()).unwrap())
            .with_predictions(read_predictions(PREDICTIONS_JSON.as_bytes()).unwrap())
    }

    async fn get(uri: &str) -> ServiceResponse {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new(datasets())))
                .configure(crate::configure),
        )
        .await;
        test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let resp = get(uri).await;
        let status = resp.status();
        (status, test::read_body_json(resp).await)
    }

    async fn get_empty(uri: &str) -> StatusCode {
        let resp = get(uri).await;
        let status = resp.status();
        assert!(test::read_body(resp).await.is_empty(), "{uri} should have an empty body");
        status
    }

    #[actix_web::test]
    async fn yield_for_known_year() {
        let (status, body) = get_json("/api/yield?region=north-vale&year=2019").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "yield": 101.3, "predicted_yield": 104.3 }));
    }

    #[actix_web::test]
    async fn yield_for_year_without_row_is_null() {
        let (status, body) = get_json("/api/yield?region=north-vale&year=1999").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "yield": null, "predicted_yield": 104.3 }));

        let (_, body) = get_json("/api/yield?region=north-vale&year=2020").await;
        assert_eq!(body["yield"], Value::Null);
    }

    #[actix_web::test]
    async fn yield_rejects_unknown_region_and_bad_year() {
        let (status, body) = get_json("/api/yield?region=nowhere&year=2020").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid region" }));

        let (status, body) = get_json("/api/yield?year=2020").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid region");

        let (status, body) = get_json("/api/yield?region=north-vale&year=soon").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], INVALID_YEAR);
    }

    #[actix_web::test]
    async fn years_are_sorted_union() {
        let (status, body) = get_json("/api/years?region=north-vale").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([2019, 2020, 2021]));

        let (_, body) = get_json("/api/years?region=nowhere").await;
        assert_eq!(body, json!([]));
        let (_, body) = get_json("/api/years").await;
        assert_eq!(body, json!([]));
    }

    #[actix_web::test]
    async fn data_grouped_by_season() {
        let (status, body) = get_json(
            "/api/data?region=north-vale&year=2019&granularity=seasonal&variable=Nitrogen",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "Summer": 9.0, "Winter": 3.0 }));
    }

    #[actix_web::test]
    async fn data_defaults_to_daily() {
        let (status, body) =
            get_json("/api/data?region=north-vale&year=2019&variable=Production").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "2019-01-01": 101.26,
                "2019-02-01": 99.0,
                "2019-02-15": null,
                "2019-07-01": 80.0,
            })
        );
    }

    #[actix_web::test]
    async fn data_unrecognized_granularity_groups_by_day() {
        let (status, weekly) = get_json(
            "/api/data?region=north-vale&year=2019&granularity=weekly&variable=Production",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (_, daily) = get_json(
            "/api/data?region=north-vale&year=2019&granularity=daily&variable=Production",
        )
        .await;
        assert_eq!(weekly, daily);
        assert_eq!(weekly["2019-01-01"], 101.26);
    }

    #[actix_web::test]
    async fn repeated_query_keys_use_first_value() {
        let (status, body) =
            get_json("/api/yield?region=north-vale&region=nowhere&year=2019&year=1999").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["yield"], 101.3);

        let (status, body) = get_json("/api/years?region=nowhere&region=north-vale").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[actix_web::test]
    async fn data_rejects_bad_parameters() {
        let (status, body) =
            get_json("/api/data?region=nowhere&year=2019&granularity=monthly&variable=Nitrogen")
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid region");

        let (status, body) =
            get_json("/api/data?region=north-vale&year=2019&variable=Rainfall").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unknown variable: Rainfall");

        let (status, body) = get_json("/api/data?region=north-vale&year=2019").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], MISSING_PARAMETERS);
    }

    #[actix_web::test]
    async fn seasons_for_known_and_unknown_region() {
        let (_, body) = get_json("/api/seasons?region=north-vale").await;
        assert_eq!(body, json!(["Autumn", "Summer"]));

        let (status, body) = get_json("/api/seasons?region=nowhere").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[actix_web::test]
    async fn vegetation_sums_matching_rows() {
        let (status, body) =
            get_json("/api/vegetation?region=north-vale&year=2019&season=Summer").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "Sparse": 0.5, "Moderate": 0.25, "Dense": 0.25, "Very Dense": 0.25 })
        );

        let (status, body) =
            get_json("/api/vegetation?region=north-vale&year=2019&season=Winter").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "Sparse": 0.0, "Moderate": 0.0, "Dense": 0.0, "Very Dense": 0.0 })
        );
    }

    #[actix_web::test]
    async fn vegetation_validates_parameters() {
        let (status, body) = get_json("/api/vegetation?region=north-vale&year=2019").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], MISSING_PARAMETERS);

        let (status, body) =
            get_json("/api/vegetation?region=north-vale&year=later&season=Summer").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], INVALID_YEAR);

        let (status, body) =
            get_json("/api/vegetation?region=nowhere&year=2019&season=Summer").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid region");
    }

    #[actix_web::test]
    async fn index_lists_regions_in_file_order() {
        let (status, body) = get_json("/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["slug"], "north-vale");
        assert_eq!(body[0]["polygons"], json!(["10,20,30,20,30,45", "5,50"]));
        assert_eq!(body[1]["slug"], "empty-flats");
    }

    #[actix_web::test]
    async fn region_page_for_known_slug() {
        let (status, body) = get_json("/north-vale").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "North Vale");
        assert_eq!(
            body["bounds"],
            json!({ "minX": 5.0, "maxX": 30.0, "minY": 20.0, "maxY": 50.0 })
        );
        assert_eq!(body["soilStats"]["soil_1"], "Loam");
        assert_eq!(body["regionArea"], 5000.0);
    }

    #[actix_web::test]
    async fn unknown_pages_degrade_to_empty_responses() {
        assert_eq!(get_empty("/nowhere").await, StatusCode::NO_CONTENT);
        assert_eq!(get_empty("/favicon.ico").await, StatusCode::NO_CONTENT);
        assert_eq!(get_empty("/deep/robots.txt").await, StatusCode::NOT_FOUND);
        assert_eq!(get_empty("/robots/v2.txt").await, StatusCode::NO_CONTENT);
        assert_eq!(get_empty("/some/other/path").await, StatusCode::NOT_FOUND);
        assert_eq!(get_empty("/api/unknown").await, StatusCode::NOT_FOUND);
        assert_eq!(get_empty("/api").await, StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn health_reports_region_count() {
        let (status, body) = get_json("/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["healthy"], true);
        assert_eq!(body["regionCount"], 2);
    }
}
