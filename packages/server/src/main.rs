#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Entry point for the agri map API server.

use std::path::PathBuf;

use agri_map_server::{ServerConfig, run_server};
use clap::Parser;

#[derive(Parser)]
#[command(name = "agri_map_server", about = "Agricultural region map server")]
struct Cli {
    /// Directory containing the `files/`, `models/` and `static/` folders
    #[arg(long, env = "AGRI_MAP_DATA_ROOT", default_value = ".")]
    data_root: PathBuf,
    /// Address to bind to
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1")]
    bind_addr: String,
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cli = Cli::parse();

    run_server(ServerConfig {
        data_root: cli.data_root,
        bind_addr: cli.bind_addr,
        port: cli.port,
    })
    .await?;

    Ok(())
}
