#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the travel map application.
//!
//! Serves the geo REST API: the country catalog as `GeoJSON`, per-user
//! country statuses, proximity searches, and geographic statistics.
//! Authentication is handled upstream; the auth gateway injects the
//! authenticated user id as the `X-User-Id` request header.

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use travel_map_database::{db, run_migrations};
use travel_map_geo::predicates::create_engine;
use travel_map_geo::service::GeoService;

/// Shared application state.
pub struct AppState {
    /// The geo query service with its injected storage handle and spatial
    /// predicate engine.
    pub geo: GeoService,
}

/// Starts the travel map API server.
///
/// Connects to the database, runs migrations, selects the spatial predicate
/// engine for the deployment's capability, and starts the Actix-Web HTTP
/// server. This is a regular async function — the caller is responsible for
/// providing the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
///
/// # Panics
///
/// Panics if the database connection, migrations, or spatial engine
/// selection fail at startup.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    log::info!("Connecting to database...");
    let db_conn = db::connect_from_env()
        .await
        .expect("Failed to connect to database");

    log::info!("Running migrations...");
    run_migrations(db_conn.as_ref())
        .await
        .expect("Failed to run migrations");

    log::info!("Selecting spatial predicate engine...");
    let db_conn: Arc<dyn switchy_database::Database> = Arc::from(db_conn);
    let predicates = create_engine(Arc::clone(&db_conn))
        .await
        .expect("Failed to initialize spatial predicates");

    let state = web::Data::new(AppState {
        geo: GeoService::new(db_conn, predicates),
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(handlers::health))
                    .service(
                        web::scope("/geo")
                            .route("/countries", web::get().to(handlers::countries_geojson))
                            .route(
                                "/countries/update",
                                web::post().to(handlers::update_country_status),
                            )
                            .route(
                                "/countries/nearby",
                                web::get().to(handlers::nearby_countries),
                            )
                            .route(
                                "/countries/by-continent",
                                web::get().to(handlers::countries_by_continent),
                            )
                            .route(
                                "/countries/search",
                                web::get().to(handlers::search_countries),
                            )
                            .route("/user-countries", web::get().to(handlers::user_countries))
                            .route(
                                "/user/geographic-stats",
                                web::get().to(handlers::user_geographic_stats),
                            )
                            .route(
                                "/locations/nearby",
                                web::get().to(handlers::nearby_locations),
                            )
                            .route(
                                "/locations/in-bounds",
                                web::get().to(handlers::locations_in_bounds),
                            ),
                    ),
            )
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
