#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the agri map application.
//!
//! Serves the region pages and the `/api` endpoints the map front end uses
//! to chart yield, observation series and vegetation density per region.
//! All data is loaded into a [`Datasets`] value before the server binds and
//! is shared read-only by every worker.

mod handlers;
pub mod query;

use std::path::PathBuf;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use agri_map_dataset::paths::{DataPaths, static_dir};
use agri_map_dataset::{DatasetError, Datasets};
use thiserror::Error;

/// Shared application state.
pub struct AppState {
    /// Every input dataset, indexed for lookup.
    pub datasets: Datasets,
}

impl AppState {
    /// Wraps loaded datasets for use as actix application data.
    #[must_use]
    pub const fn new(datasets: Datasets) -> Self {
        Self { datasets }
    }
}

/// Where to read data from and where to listen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Directory holding `files/`, `models/` and `static/`.
    pub data_root: PathBuf,
    /// Address to bind to.
    pub bind_addr: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("."),
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The input datasets could not be loaded.
    #[error("Failed to load datasets: {0}")]
    Dataset(#[from] DatasetError),

    /// Binding or running the HTTP server failed.
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Registers every route on `cfg`.
///
/// Region pages are matched after the `/api` scope so a region can never
/// shadow an endpoint. A bare `/api` is still treated as a region page.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("", web::get().to(handlers::api_root))
            .route("/health", web::get().to(handlers::health))
            .route("/yield", web::get().to(handlers::yield_lookup))
            .route("/years", web::get().to(handlers::years))
            .route("/data", web::get().to(handlers::data))
            .route("/seasons", web::get().to(handlers::seasons))
            .route("/vegetation", web::get().to(handlers::vegetation))
            .default_service(web::to(handlers::not_found)),
    )
    .route("/", web::get().to(handlers::index))
    .route("/favicon.ico", web::get().to(handlers::no_content))
    .route("/{slug}", web::get().to(handlers::region_page))
    .route("/{tail:.*}", web::get().to(handlers::catch_all))
    .default_service(web::to(handlers::no_content));
}

/// Starts the agri map API server.
///
/// Loads every dataset under `config.data_root`, then serves until the
/// process is stopped. The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns [`ServerError::Dataset`] if an input file cannot be loaded and
/// [`ServerError::Io`] if the HTTP server fails to bind or run.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    log::info!("Loading datasets from {}...", config.data_root.display());
    let datasets = Datasets::load(&DataPaths::from_root(&config.data_root))?;

    let state = web::Data::new(AppState::new(datasets));
    let assets = static_dir(&config.data_root);

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            // Serve front-end assets
            .service(Files::new("/static", assets.clone()))
            .configure(configure)
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await?;

    Ok(())
}
