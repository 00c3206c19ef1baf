#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the geo catalog tooling.

use std::time::Instant;

use clap::{Parser, Subcommand};
use travel_map_database::{db, detect_postgis, ensure_spatial_schema, run_migrations};

#[derive(Parser)]
#[command(name = "travel_map_geo", about = "Travel map geo catalog tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Import country boundaries into the catalog
    SeedCountries {
        /// Override the boundary dataset URL (also settable via
        /// `COUNTRIES_GEOJSON_URL`)
        #[arg(long)]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate => {
            log::info!("Running database migrations...");
            let db = db::connect_from_env().await?;
            run_migrations(db.as_ref()).await?;
            if detect_postgis(db.as_ref()).await? {
                ensure_spatial_schema(db.as_ref()).await?;
            }
            log::info!("Migrations complete.");
        }
        Commands::SeedCountries { url } => {
            let db = db::connect_from_env().await?;
            run_migrations(db.as_ref()).await?;

            let has_postgis = detect_postgis(db.as_ref()).await?;
            if has_postgis {
                ensure_spatial_schema(db.as_ref()).await?;
            } else {
                log::warn!("PostGIS unavailable; seeding serialized boundaries only");
            }

            let url = url.or_else(|| std::env::var("COUNTRIES_GEOJSON_URL").ok());

            let start = Instant::now();
            let summary =
                travel_map_geo::ingest::seed_countries(db.as_ref(), has_postgis, url.as_deref())
                    .await?;

            log::info!(
                "Country import complete: {} imported, {} updated, {} skipped in {:.1}s",
                summary.imported,
                summary.updated,
                summary.skipped,
                start.elapsed().as_secs_f64()
            );
        }
    }

    Ok(())
}
