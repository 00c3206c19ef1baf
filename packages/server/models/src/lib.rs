#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the travel map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the database row and catalog domain types to allow independent
//! evolution of the API contract. Types whose wire shape already matches
//! the domain type (search results, grouped statuses, statistics) are
//! serialized directly from `travel_map_geo_models`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use travel_map_database_models::{LocationRow, NearbyLocation};
use travel_map_geo_models::NearbyCountry;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// Request body for the country status update endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCountryStatusRequest {
    /// ISO alpha-2 code of the country to update.
    pub country_code: String,
    /// New status value (`visited`, `planned`, or `wishlist`).
    pub status: String,
    /// Explicit visit date; defaults to now for `visited`.
    pub visit_date: Option<NaiveDateTime>,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// Query parameters for the nearby countries endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyCountriesQuery {
    /// Reference point longitude.
    pub lng: f64,
    /// Reference point latitude.
    pub lat: f64,
    /// Search radius in kilometers (default 500).
    pub radius: Option<f64>,
}

/// Query parameters for the country search endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Search text; an empty or missing query yields an empty result.
    pub q: Option<String>,
    /// Maximum number of results (default 10).
    pub limit: Option<usize>,
}

/// Query parameters for the nearby locations endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyLocationsQuery {
    /// Reference location id.
    pub location_id: String,
    /// Search radius in kilometers (default 50).
    pub radius: Option<f64>,
}

/// Query parameters for the locations-in-bounds endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundsQuery {
    /// Bounding box as `west,south,east,north`.
    pub bbox: String,
}

/// A nearby country as returned by the API: identity fields plus distance,
/// without the boundary geometry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiNearbyCountry {
    /// Surrogate id.
    pub id: i32,
    /// Two-letter ISO code.
    pub iso_alpha2: String,
    /// Three-letter ISO code.
    pub iso_alpha3: String,
    /// Display name.
    pub name: String,
    /// Continent name.
    pub continent: Option<String>,
    /// Capital city.
    pub capital: Option<String>,
    /// Population.
    pub population: Option<i64>,
    /// Land area in square kilometers.
    pub area_sq_km: Option<f64>,
    /// Distance to the reference point in kilometers.
    pub distance_km: f64,
}

impl From<NearbyCountry> for ApiNearbyCountry {
    fn from(nearby: NearbyCountry) -> Self {
        Self {
            id: nearby.country.id,
            iso_alpha2: nearby.country.iso_alpha2,
            iso_alpha3: nearby.country.iso_alpha3,
            name: nearby.country.name,
            continent: nearby.country.continent,
            capital: nearby.country.capital,
            population: nearby.country.population,
            area_sq_km: nearby.country.area_sq_km,
            distance_km: nearby.distance_km,
        }
    }
}

/// A location as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLocation {
    /// Location id.
    pub id: String,
    /// Owning trip id, if any.
    pub trip_id: Option<String>,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Longitude.
    pub longitude: f64,
    /// Latitude.
    pub latitude: f64,
    /// Resolved country id, if any.
    pub country_id: Option<i32>,
    /// Visit date.
    pub visit_date: Option<NaiveDateTime>,
    /// Rating, 1-5.
    pub rating: Option<i32>,
    /// Category name.
    pub category: String,
}

impl From<LocationRow> for ApiLocation {
    fn from(row: LocationRow) -> Self {
        Self {
            id: row.id,
            trip_id: row.trip_id,
            name: row.name,
            description: row.description,
            longitude: row.longitude,
            latitude: row.latitude,
            country_id: row.country_id,
            visit_date: row.visit_date,
            rating: row.rating,
            category: row.category.to_string(),
        }
    }
}

/// A nearby location as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiNearbyLocation {
    /// The matched location.
    #[serde(flatten)]
    pub location: ApiLocation,
    /// Distance to the reference location in kilometers.
    pub distance_km: f64,
}

impl From<NearbyLocation> for ApiNearbyLocation {
    fn from(nearby: NearbyLocation) -> Self {
        Self {
            location: ApiLocation::from(nearby.location),
            distance_km: nearby.distance_km,
        }
    }
}
