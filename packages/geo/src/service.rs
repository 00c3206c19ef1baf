//! Geo query service.
//!
//! Orchestrates the catalog, status tracker, and spatial predicate engine
//! into the operations the API surface exposes: map-ready `GeoJSON`,
//! coordinate-to-country resolution for the locations collaborator,
//! proximity searches, and per-user geographic statistics.

use std::sync::Arc;

use chrono::NaiveDateTime;
use geojson::{Feature, FeatureCollection, GeoJson, feature::Id};
use switchy_database::Database;
use travel_map_database::queries as location_queries;
use travel_map_database_models::{BoundingBox, LocationRow, NearbyLocation};
use travel_map_geo_models::{
    Centroid, ContinentStats, CountryStatus, CountrySummary, CountryWithStatus, DEFAULT_STATUS,
    GeographicStats, NearbyCountry, UserCountries,
};
use travel_map_spatial::{centroid, path_length_km, planar_distance_km, round_km};

use crate::predicates::SpatialPredicates;
use crate::{GeoError, catalog, status};

/// Default radius for country proximity searches, in kilometers.
pub const DEFAULT_COUNTRY_RADIUS_KM: f64 = 500.0;

/// Default radius for location proximity searches, in kilometers.
pub const DEFAULT_LOCATION_RADIUS_KM: f64 = 50.0;

/// Result cap for location proximity searches.
pub const NEARBY_LOCATION_LIMIT: usize = 10;

/// Upper bound for caller-supplied radii: half the equatorial circumference.
const MAX_RADIUS_KM: f64 = 20_037.5;

/// The geo query service.
///
/// Holds an injected database handle and the spatial predicate engine
/// selected at startup; cheap to clone and share across request handlers.
#[derive(Clone)]
pub struct GeoService {
    db: Arc<dyn Database>,
    predicates: Arc<dyn SpatialPredicates>,
}

impl GeoService {
    /// Creates the service from its injected dependencies.
    #[must_use]
    pub fn new(db: Arc<dyn Database>, predicates: Arc<dyn SpatialPredicates>) -> Self {
        Self { db, predicates }
    }

    /// All countries as a `GeoJSON` `FeatureCollection`, ordered by name,
    /// each feature carrying the requesting user's status (or `"default"`).
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if the database operation fails.
    pub async fn countries_geojson(
        &self,
        user_id: Option<i32>,
    ) -> Result<FeatureCollection, GeoError> {
        let rows = catalog::get_all_with_status(self.db.as_ref(), user_id).await?;
        Ok(feature_collection(&rows))
    }

    /// Resolves the country containing a point, for the locations
    /// collaborator's post-write hook.
    ///
    /// `None` (no containing boundary) is a valid terminal outcome that
    /// leaves the location's country unset; it is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidInput`] for malformed coordinates, or
    /// [`GeoError`] if the containment query fails.
    pub async fn resolve_country_for_location(
        &self,
        lng: f64,
        lat: f64,
    ) -> Result<Option<i32>, GeoError> {
        validate_point(lng, lat)?;

        Ok(self
            .predicates
            .country_containing(lng, lat)
            .await?
            .map(|country| country.id))
    }

    /// Resolves and stores a location's country after the locations
    /// collaborator creates or updates it without an explicit country.
    ///
    /// This is the explicit post-write hook: resolution is never a hidden
    /// lifecycle side effect. A `None` resolution clears the reference.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidInput`] for malformed coordinates, or
    /// [`GeoError`] if a database operation fails.
    pub async fn apply_country_resolution(
        &self,
        location_id: &str,
        lng: f64,
        lat: f64,
    ) -> Result<Option<i32>, GeoError> {
        let country_id = self.resolve_country_for_location(lng, lat).await?;

        location_queries::set_location_country(self.db.as_ref(), location_id, country_id).await?;

        Ok(country_id)
    }

    /// Countries within a radius of a point, ascending by distance.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidInput`] for malformed coordinates or an
    /// out-of-range radius, or [`GeoError`] if the query fails.
    pub async fn nearby_countries(
        &self,
        lng: f64,
        lat: f64,
        radius_km: Option<f64>,
    ) -> Result<Vec<NearbyCountry>, GeoError> {
        validate_point(lng, lat)?;
        let radius_km = radius_km.unwrap_or(DEFAULT_COUNTRY_RADIUS_KM);
        validate_radius(radius_km)?;

        self.predicates
            .countries_within_radius(lng, lat, radius_km)
            .await
    }

    /// Catalog statistics grouped by continent.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if the database operation fails.
    pub async fn countries_by_continent(&self) -> Result<Vec<ContinentStats>, GeoError> {
        catalog::stats_by_continent(self.db.as_ref()).await
    }

    /// Searches countries by name or ISO code.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if the database operation fails.
    pub async fn search_countries(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CountrySummary>, GeoError> {
        catalog::search(self.db.as_ref(), query, limit).await
    }

    /// A user's country codes grouped by status.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if the database operation fails.
    pub async fn user_countries(&self, user_id: i32) -> Result<UserCountries, GeoError> {
        status::get_by_user(self.db.as_ref(), user_id).await
    }

    /// Sets a user's status for a country; pass-through to the tracker.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::CountryNotFound`] for an unknown code, or
    /// [`GeoError`] if a database operation fails.
    pub async fn update_country_status(
        &self,
        user_id: i32,
        country_code: &str,
        country_status: CountryStatus,
        visit_date: Option<NaiveDateTime>,
        notes: Option<&str>,
    ) -> Result<(), GeoError> {
        status::set_status(
            self.db.as_ref(),
            user_id,
            country_code,
            country_status,
            visit_date,
            notes,
        )
        .await
    }

    /// Per-user geographic statistics.
    ///
    /// The component reads are independent and read-only, so they are
    /// dispatched concurrently. A user with no data gets zeroed aggregates,
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if any database operation fails.
    pub async fn user_geographic_stats(&self, user_id: i32) -> Result<GeographicStats, GeoError> {
        let db = self.db.as_ref();

        let (visited_by_continent, countries_visited, total_locations, coordinates) = futures::try_join!(
            status::visited_by_continent(db, user_id),
            status::count_visited(db, user_id),
            async {
                location_queries::count_locations(db, user_id)
                    .await
                    .map_err(GeoError::from)
            },
            async {
                location_queries::ordered_location_coordinates(db, user_id)
                    .await
                    .map_err(GeoError::from)
            },
        )?;

        let location_centroid = centroid(&coordinates)
            .map_or(Centroid { lng: 0.0, lat: 0.0 }, |(lng, lat)| Centroid {
                lng,
                lat,
            });

        Ok(GeographicStats {
            visited_by_continent,
            total_distance_km: round_km(path_length_km(&coordinates)),
            centroid: location_centroid,
            total_locations,
            countries_visited,
        })
    }

    /// A user's other locations within a radius of one of their locations,
    /// ascending by distance, capped at [`NEARBY_LOCATION_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::LocationNotFound`] if the reference location does
    /// not belong to the user, [`GeoError::InvalidInput`] for an out-of-range
    /// radius, or [`GeoError`] if a database operation fails.
    pub async fn nearby_locations(
        &self,
        user_id: i32,
        location_id: &str,
        radius_km: Option<f64>,
    ) -> Result<Vec<NearbyLocation>, GeoError> {
        let radius_km = radius_km.unwrap_or(DEFAULT_LOCATION_RADIUS_KM);
        validate_radius(radius_km)?;

        let origin = location_queries::location_point(self.db.as_ref(), user_id, location_id)
            .await?
            .ok_or(GeoError::LocationNotFound)?;

        let locations = location_queries::locations_for_user(self.db.as_ref(), user_id).await?;

        Ok(nearby_from(
            origin,
            locations,
            location_id,
            radius_km,
            NEARBY_LOCATION_LIMIT,
        ))
    }

    /// A user's locations inside a bounding box, most recent visit first.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidInput`] for a malformed box, or
    /// [`GeoError`] if the database operation fails.
    pub async fn locations_in_bounds(
        &self,
        user_id: i32,
        bbox: BoundingBox,
    ) -> Result<Vec<LocationRow>, GeoError> {
        validate_point(bbox.west, bbox.south)?;
        validate_point(bbox.east, bbox.north)?;
        if bbox.west > bbox.east || bbox.south > bbox.north {
            return Err(GeoError::invalid_input("bounding box is inverted"));
        }

        location_queries::locations_in_bounds(self.db.as_ref(), user_id, bbox)
            .await
            .map_err(GeoError::from)
    }
}

/// Builds the map-ready `FeatureCollection` from catalog-with-status rows.
///
/// Each feature's id is the country's alpha-2 code and its geometry is the
/// stored boundary deserialized as-is, so serving the collection round-trips
/// the imported geometry unchanged. Rows whose stored geometry fails to
/// parse are skipped with a warning rather than failing the whole map.
#[must_use]
pub fn feature_collection(rows: &[CountryWithStatus]) -> FeatureCollection {
    let features = rows
        .iter()
        .filter_map(|row| {
            let geometry = match row.country.geometry_json.parse::<GeoJson>() {
                Ok(GeoJson::Geometry(geometry)) => geometry,
                Ok(_) | Err(_) => {
                    log::warn!(
                        "Skipping country {} with unparseable stored geometry",
                        row.country.iso_alpha2
                    );
                    return None;
                }
            };

            let status_value = row
                .status
                .as_ref()
                .map_or(DEFAULT_STATUS, AsRef::<str>::as_ref);

            let mut properties = geojson::JsonObject::new();
            properties.insert("isoAlpha2".into(), row.country.iso_alpha2.clone().into());
            properties.insert("isoAlpha3".into(), row.country.iso_alpha3.clone().into());
            properties.insert("name".into(), row.country.name.clone().into());
            properties.insert("continent".into(), row.country.continent.clone().into());
            properties.insert("capital".into(), row.country.capital.clone().into());
            properties.insert("population".into(), row.country.population.into());
            properties.insert("areaSqKm".into(), row.country.area_sq_km.into());
            properties.insert("status".into(), status_value.into());

            Some(Feature {
                bbox: None,
                geometry: Some(geometry),
                id: Some(Id::String(row.country.iso_alpha2.clone())),
                properties: Some(properties),
                foreign_members: None,
            })
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Filters, sorts, and caps a user's locations around an origin point.
fn nearby_from(
    origin: (f64, f64),
    locations: Vec<LocationRow>,
    exclude_id: &str,
    radius_km: f64,
    limit: usize,
) -> Vec<NearbyLocation> {
    let mut hits: Vec<NearbyLocation> = locations
        .into_iter()
        .filter(|location| location.id != exclude_id)
        .filter_map(|location| {
            let distance = planar_distance_km(origin, (location.longitude, location.latitude));
            (distance <= radius_km).then(|| NearbyLocation {
                location,
                distance_km: round_km(distance),
            })
        })
        .collect();

    hits.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    hits.truncate(limit);
    hits
}

fn validate_point(lng: f64, lat: f64) -> Result<(), GeoError> {
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(GeoError::invalid_input(format!(
            "longitude {lng} out of range"
        )));
    }
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(GeoError::invalid_input(format!(
            "latitude {lat} out of range"
        )));
    }
    Ok(())
}

fn validate_radius(radius_km: f64) -> Result<(), GeoError> {
    if !radius_km.is_finite() || radius_km <= 0.0 || radius_km > MAX_RADIUS_KM {
        return Err(GeoError::invalid_input(format!(
            "radius {radius_km} out of range"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use travel_map_database_models::LocationCategory;
    use travel_map_geo_models::Country;

    fn country_with_status(
        id: i32,
        alpha2: &str,
        geometry_json: &str,
        country_status: Option<CountryStatus>,
    ) -> CountryWithStatus {
        CountryWithStatus {
            country: Country {
                id,
                iso_alpha2: alpha2.to_string(),
                iso_alpha3: format!("{alpha2}X"),
                name: alpha2.to_string(),
                continent: Some("Europe".to_string()),
                capital: None,
                population: Some(1_000_000),
                area_sq_km: Some(500_000.0),
                geometry_json: geometry_json.to_string(),
                centroid_lng: None,
                centroid_lat: None,
            },
            status: country_status,
        }
    }

    fn location(id: &str, lng: f64, lat: f64) -> LocationRow {
        LocationRow {
            id: id.to_string(),
            trip_id: None,
            user_id: 1,
            name: id.to_string(),
            description: None,
            longitude: lng,
            latitude: lat,
            country_id: None,
            visit_date: None,
            rating: None,
            category: LocationCategory::City,
            elevation: None,
            timezone: None,
        }
    }

    const POLYGON: &str =
        "{\"type\":\"Polygon\",\"coordinates\":[[[0.0,0.0],[4.0,0.0],[4.0,4.0],[0.0,4.0],[0.0,0.0]]]}";

    #[test]
    fn features_round_trip_the_stored_geometry() {
        let rows = vec![country_with_status(1, "ES", POLYGON, None)];
        let collection = feature_collection(&rows);

        assert_eq!(collection.features.len(), 1);
        let feature = &collection.features[0];
        assert_eq!(feature.id, Some(Id::String("ES".to_string())));

        let expected = match POLYGON.parse::<GeoJson>().unwrap() {
            GeoJson::Geometry(geometry) => geometry,
            _ => unreachable!(),
        };
        assert_eq!(feature.geometry.as_ref().unwrap(), &expected);
    }

    #[test]
    fn feature_status_defaults_when_the_user_has_no_row() {
        let rows = vec![
            country_with_status(1, "ES", POLYGON, Some(CountryStatus::Visited)),
            country_with_status(2, "FR", POLYGON, None),
        ];
        let collection = feature_collection(&rows);

        let status_of = |idx: usize| {
            collection.features[idx]
                .properties
                .as_ref()
                .unwrap()
                .get("status")
                .unwrap()
                .clone()
        };
        assert_eq!(status_of(0), serde_json::json!("visited"));
        assert_eq!(status_of(1), serde_json::json!("default"));
    }

    #[test]
    fn unparseable_geometry_skips_the_feature() {
        let rows = vec![
            country_with_status(1, "ES", POLYGON, None),
            country_with_status(2, "XX", "not geojson", None),
        ];
        let collection = feature_collection(&rows);
        assert_eq!(collection.features.len(), 1);
    }

    #[test]
    fn nearby_from_excludes_the_origin_and_sorts_ascending() {
        let locations = vec![
            location("origin", 0.0, 0.0),
            location("far", 3.0, 0.0),
            location("near", 0.1, 0.0),
            location("outside", 20.0, 0.0),
        ];

        let hits = nearby_from((0.0, 0.0), locations, "origin", 500.0, 10);

        let ids: Vec<&str> = hits.iter().map(|h| h.location.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "far"]);
        assert!(hits[0].distance_km <= hits[1].distance_km);
    }

    #[test]
    fn nearby_from_caps_the_result_count() {
        let locations = (0..30)
            .map(|i| location(&format!("loc{i}"), f64::from(i) * 0.01, 0.0))
            .collect();

        let hits = nearby_from((0.0, 0.0), locations, "loc0", 500.0, NEARBY_LOCATION_LIMIT);
        assert_eq!(hits.len(), NEARBY_LOCATION_LIMIT);
    }

    #[test]
    fn point_validation_rejects_out_of_range_coordinates() {
        assert!(validate_point(0.0, 0.0).is_ok());
        assert!(validate_point(-180.0, 90.0).is_ok());
        assert!(validate_point(180.1, 0.0).is_err());
        assert!(validate_point(0.0, -90.1).is_err());
        assert!(validate_point(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn radius_validation_rejects_nonpositive_and_absurd_values() {
        assert!(validate_radius(500.0).is_ok());
        assert!(validate_radius(0.0).is_err());
        assert!(validate_radius(-10.0).is_err());
        assert!(validate_radius(f64::INFINITY).is_err());
        assert!(validate_radius(50_000.0).is_err());
    }
}
