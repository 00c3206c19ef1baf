#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Country catalog and per-user visit status types.
//!
//! These types define the canonical country reference data (identity codes,
//! boundary geometry, precomputed centroid) and the per-user country status
//! vocabulary shared across the catalog, tracker, and API layers.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A user's declared relationship to a country.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CountryStatus {
    /// The user has been to this country.
    Visited,
    /// The user has a concrete trip planned.
    Planned,
    /// The user would like to go someday.
    Wishlist,
}

/// Wire value emitted for countries the user has no status row for.
pub const DEFAULT_STATUS: &str = "default";

/// A country row as stored in the database.
///
/// `geometry_json` is the canonical serialized boundary (a GeoJSON `Polygon`
/// or `MultiPolygon` geometry); it is stored on every deployment and is what
/// the API serves regardless of whether the native spatial column exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    /// Surrogate primary key.
    pub id: i32,
    /// Two-letter ISO 3166-1 code (e.g. "ES").
    pub iso_alpha2: String,
    /// Three-letter ISO 3166-1 code (e.g. "ESP").
    pub iso_alpha3: String,
    /// Display name.
    pub name: String,
    /// Continent name, if known.
    pub continent: Option<String>,
    /// Capital city, if known.
    pub capital: Option<String>,
    /// Population, if known.
    pub population: Option<i64>,
    /// Land area in square kilometers, if known.
    pub area_sq_km: Option<f64>,
    /// Boundary geometry as a GeoJSON geometry string.
    pub geometry_json: String,
    /// Precomputed centroid longitude.
    pub centroid_lng: Option<f64>,
    /// Precomputed centroid latitude.
    pub centroid_lat: Option<f64>,
}

/// A country record without its boundary geometry, as returned by search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountrySummary {
    /// Surrogate primary key.
    pub id: i32,
    /// Two-letter ISO 3166-1 code.
    pub iso_alpha2: String,
    /// Three-letter ISO 3166-1 code.
    pub iso_alpha3: String,
    /// Display name.
    pub name: String,
    /// Continent name, if known.
    pub continent: Option<String>,
    /// Capital city, if known.
    pub capital: Option<String>,
    /// Population, if known.
    pub population: Option<i64>,
}

/// A catalog row joined with the requesting user's status, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryWithStatus {
    /// The country record.
    pub country: Country,
    /// The user's status for this country, absent when the user has none.
    pub status: Option<CountryStatus>,
}

/// A country matched by a proximity search, with its distance to the
/// reference point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyCountry {
    /// The country record.
    pub country: Country,
    /// Distance to the reference point in kilometers, rounded to two
    /// decimals.
    pub distance_km: f64,
}

/// Aggregate catalog statistics for a single continent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinentStats {
    /// Continent name.
    pub continent: String,
    /// Number of countries on this continent.
    pub country_count: i64,
    /// Average country area in square kilometers, rounded to a whole number.
    pub avg_area_sq_km: f64,
    /// Summed population across the continent.
    pub total_population: i64,
}

/// Visited-country count for a single continent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinentVisits {
    /// Continent name; `None` for countries with no continent assigned.
    pub continent: Option<String>,
    /// Number of visited countries on this continent.
    pub count: i64,
}

/// A user's countries grouped by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCountries {
    /// ISO alpha-2 codes of visited countries.
    pub visited: Vec<String>,
    /// ISO alpha-2 codes of planned countries.
    pub planned: Vec<String>,
    /// ISO alpha-2 codes of wishlist countries.
    pub wishlist: Vec<String>,
}

/// Geographic centroid of a user's locations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Centroid {
    /// Longitude.
    pub lng: f64,
    /// Latitude.
    pub lat: f64,
}

/// Per-user geographic statistics composed by the geo query service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeographicStats {
    /// Visited-country counts grouped by continent, descending by count.
    pub visited_by_continent: Vec<ContinentVisits>,
    /// Total travel distance in kilometers, rounded to two decimals.
    ///
    /// A chronological path length over the user's locations, not a tour
    /// optimization.
    pub total_distance_km: f64,
    /// Centroid of all the user's location coordinates; `(0, 0)` when the
    /// user has no locations.
    pub centroid: Centroid,
    /// Total number of locations the user has recorded.
    pub total_locations: i64,
    /// Number of distinct countries the user has marked visited.
    pub countries_visited: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_wire_values() {
        assert_eq!("visited".parse::<CountryStatus>().unwrap(), CountryStatus::Visited);
        assert_eq!("planned".parse::<CountryStatus>().unwrap(), CountryStatus::Planned);
        assert_eq!("wishlist".parse::<CountryStatus>().unwrap(), CountryStatus::Wishlist);
    }

    #[test]
    fn status_rejects_unknown_values() {
        assert!("lived".parse::<CountryStatus>().is_err());
        assert!("VISITED ".parse::<CountryStatus>().is_err());
        assert!(String::new().parse::<CountryStatus>().is_err());
    }

    #[test]
    fn status_round_trips_through_display() {
        for status in [
            CountryStatus::Visited,
            CountryStatus::Planned,
            CountryStatus::Wishlist,
        ] {
            assert_eq!(status.to_string().parse::<CountryStatus>().unwrap(), status);
        }
    }
}
