#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database row types and query parameter definitions.
//!
//! These types represent the shapes of data as stored in and retrieved from
//! the database. They are distinct from the API response types in
//! `travel_map_server_models` and the catalog domain types in
//! `travel_map_geo_models`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Whether a `(lng, lat)` point lies inside this box (inclusive).
    #[must_use]
    pub fn contains(&self, lng: f64, lat: f64) -> bool {
        lng >= self.west && lng <= self.east && lat >= self.south && lat <= self.north
    }
}

/// Category of a recorded location.
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
pub enum LocationCategory {
    /// A city or town.
    City,
    /// A landmark or monument.
    Landmark,
    /// A natural site.
    Nature,
    /// A restaurant or café.
    Restaurant,
    /// A hotel or other place stayed at.
    Accommodation,
    /// A station, airport, or other transit point.
    Transport,
    /// An activity or experience.
    Activity,
    /// A shop or market.
    Shopping,
    /// A bar, club, or venue.
    Nightlife,
    /// A museum, gallery, or cultural site.
    Cultural,
}

/// A geotagged location row as retrieved from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRow {
    /// Primary key (UUID, rendered as text).
    pub id: String,
    /// Owning trip, if the location belongs to one.
    pub trip_id: Option<String>,
    /// Owning user.
    pub user_id: i32,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Resolved country, if containment resolution found one.
    pub country_id: Option<i32>,
    /// When the location was visited.
    pub visit_date: Option<NaiveDateTime>,
    /// User rating, 1-5.
    pub rating: Option<i32>,
    /// Location category.
    pub category: LocationCategory,
    /// Elevation in meters above sea level.
    pub elevation: Option<f64>,
    /// IANA timezone name.
    pub timezone: Option<String>,
}

/// A location matched by a proximity search, with its distance to the
/// reference location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyLocation {
    /// The matched location.
    pub location: LocationRow,
    /// Distance to the reference point in kilometers, rounded to two
    /// decimals.
    pub distance_km: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_contains_is_inclusive() {
        let bbox = BoundingBox::new(-10.0, -5.0, 10.0, 5.0);
        assert!(bbox.contains(0.0, 0.0));
        assert!(bbox.contains(-10.0, 5.0));
        assert!(!bbox.contains(10.1, 0.0));
        assert!(!bbox.contains(0.0, -5.1));
    }

    #[test]
    fn category_parses_wire_values() {
        assert_eq!(
            "landmark".parse::<LocationCategory>().unwrap(),
            LocationCategory::Landmark
        );
        assert_eq!(
            "nightlife".parse::<LocationCategory>().unwrap(),
            LocationCategory::Nightlife
        );
        assert!("volcano".parse::<LocationCategory>().is_err());
    }
}
