//! Spatial predicate engine.
//!
//! Two implementations of the same containment and proximity predicates: a
//! native one that pushes the work to `PostGIS`, and a fallback that answers
//! from an in-memory R-tree over the stored boundary `GeoJSON`. The engine
//! is selected once at startup from the detected database capability; no
//! business logic ever branches on the capability per call.
//!
//! Both implementations use the same planar `degrees x 111.32` distance
//! approximation so they agree with each other and with the statistics
//! service.

use std::sync::Arc;

use async_trait::async_trait;
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};
use travel_map_geo_models::{Country, NearbyCountry};
use travel_map_spatial::{CountryIndex, KM_PER_DEGREE, round_km};

use crate::{GeoError, catalog};

/// Result cap for country radius searches.
pub const NEARBY_COUNTRY_LIMIT: usize = 20;

/// Geometric predicates against the country catalog.
#[async_trait]
pub trait SpatialPredicates: Send + Sync {
    /// Returns the country whose boundary contains the point, if any.
    ///
    /// A point outside every boundary (international waters) is a valid
    /// `None` outcome, not an error. Where boundaries overlap, the first
    /// match by catalog order wins.
    async fn country_containing(&self, lng: f64, lat: f64) -> Result<Option<Country>, GeoError>;

    /// Returns countries within `radius_km` of the point, ascending by
    /// distance, capped at [`NEARBY_COUNTRY_LIMIT`].
    async fn countries_within_radius(
        &self,
        lng: f64,
        lat: f64,
        radius_km: f64,
    ) -> Result<Vec<NearbyCountry>, GeoError>;
}

/// Native predicate engine backed by `PostGIS`.
pub struct PostgisPredicates {
    db: Arc<dyn Database>,
}

impl PostgisPredicates {
    /// Creates the native engine over an existing connection.
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SpatialPredicates for PostgisPredicates {
    async fn country_containing(&self, lng: f64, lat: f64) -> Result<Option<Country>, GeoError> {
        let rows = self
            .db
            .query_raw_params(
                &format!(
                    "SELECT {} FROM countries
                     WHERE geometry IS NOT NULL
                       AND ST_Contains(geometry, ST_SetSRID(ST_MakePoint($1, $2), 4326))
                     ORDER BY id
                     LIMIT 1",
                    catalog::COUNTRY_COLUMNS
                ),
                &[DatabaseValue::Real64(lng), DatabaseValue::Real64(lat)],
            )
            .await?;

        Ok(rows.first().map(catalog::country_from_row))
    }

    async fn countries_within_radius(
        &self,
        lng: f64,
        lat: f64,
        radius_km: f64,
    ) -> Result<Vec<NearbyCountry>, GeoError> {
        let rows = self
            .db
            .query_raw_params(
                &format!(
                    "SELECT {},
                            (ST_Distance(geometry, ST_SetSRID(ST_MakePoint($1, $2), 4326))
                             * {KM_PER_DEGREE})::double precision as distance_km
                     FROM countries
                     WHERE geometry IS NOT NULL
                       AND ST_DWithin(geometry, ST_SetSRID(ST_MakePoint($1, $2), 4326), $3)
                     ORDER BY distance_km
                     LIMIT {NEARBY_COUNTRY_LIMIT}",
                    catalog::COUNTRY_COLUMNS
                ),
                &[
                    DatabaseValue::Real64(lng),
                    DatabaseValue::Real64(lat),
                    DatabaseValue::Real64(radius_km / KM_PER_DEGREE),
                ],
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let distance_km: f64 = row.to_value("distance_km").unwrap_or(0.0);
                NearbyCountry {
                    country: catalog::country_from_row(row),
                    distance_km: round_km(distance_km),
                }
            })
            .collect())
    }
}

/// Fallback predicate engine for deployments without a spatial extension.
///
/// Answers from a [`CountryIndex`] built once at startup; the catalog is
/// read-only after import, so the index never goes stale while the process
/// runs.
pub struct FallbackPredicates {
    index: Arc<CountryIndex>,
}

impl FallbackPredicates {
    /// Creates the fallback engine over a pre-built index.
    #[must_use]
    pub fn new(index: Arc<CountryIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl SpatialPredicates for FallbackPredicates {
    async fn country_containing(&self, lng: f64, lat: f64) -> Result<Option<Country>, GeoError> {
        Ok(self.index.locate(lng, lat).cloned())
    }

    async fn countries_within_radius(
        &self,
        lng: f64,
        lat: f64,
        radius_km: f64,
    ) -> Result<Vec<NearbyCountry>, GeoError> {
        Ok(self
            .index
            .within_radius(lng, lat, radius_km, NEARBY_COUNTRY_LIMIT)
            .into_iter()
            .map(|(country, distance_km)| NearbyCountry {
                country: country.clone(),
                distance_km: round_km(distance_km),
            })
            .collect())
    }
}

/// Selects and constructs the predicate engine for this deployment.
///
/// Probes the database once for `PostGIS`; with the extension present the
/// native engine is used and the spatial enrichment DDL is ensured. Without
/// it the catalog is loaded into the in-memory index and the fallback engine
/// takes over, with degraded (centroid-based) proximity semantics.
///
/// # Errors
///
/// Returns [`GeoError`] if the capability probe, DDL, or catalog load fails.
pub async fn create_engine(db: Arc<dyn Database>) -> Result<Arc<dyn SpatialPredicates>, GeoError> {
    if travel_map_database::detect_postgis(db.as_ref()).await? {
        travel_map_database::ensure_spatial_schema(db.as_ref()).await?;
        log::info!("PostGIS detected; using native spatial predicates");
        return Ok(Arc::new(PostgisPredicates::new(db)));
    }

    log::warn!("PostGIS unavailable; falling back to in-memory spatial predicates");

    let countries = catalog::get_all(db.as_ref()).await?;
    let index = CountryIndex::from_countries(countries);
    log::info!("Loaded {} country boundaries into spatial index", index.len());

    Ok(Arc::new(FallbackPredicates::new(Arc::new(index))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn country(id: i32, alpha2: &str, geometry_json: &str, centroid: (f64, f64)) -> Country {
        Country {
            id,
            iso_alpha2: alpha2.to_string(),
            iso_alpha3: format!("{alpha2}X"),
            name: alpha2.to_string(),
            continent: None,
            capital: None,
            population: None,
            area_sq_km: None,
            geometry_json: geometry_json.to_string(),
            centroid_lng: Some(centroid.0),
            centroid_lat: Some(centroid.1),
        }
    }

    fn fallback_engine() -> FallbackPredicates {
        // Iberia-like box standing in for Spain.
        let spain = "{\"type\":\"Polygon\",\"coordinates\":[[[-9.0,36.0],[3.0,36.0],[3.0,43.0],[-9.0,43.0],[-9.0,36.0]]]}";
        let france = "{\"type\":\"Polygon\",\"coordinates\":[[[-4.0,43.5],[8.0,43.5],[8.0,51.0],[-4.0,51.0],[-4.0,43.5]]]}";
        let index = CountryIndex::from_countries(vec![
            country(1, "ES", spain, (-3.0, 40.0)),
            country(2, "FR", france, (2.0, 47.0)),
        ]);
        FallbackPredicates::new(Arc::new(index))
    }

    #[tokio::test]
    async fn fallback_resolves_a_contained_point() {
        let engine = fallback_engine();
        let resolved = engine.country_containing(-3.7, 40.4).await.unwrap();
        assert_eq!(resolved.unwrap().iso_alpha2, "ES");
    }

    #[tokio::test]
    async fn fallback_resolves_international_waters_to_none() {
        let engine = fallback_engine();
        let resolved = engine.country_containing(-40.0, 30.0).await.unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn fallback_radius_results_are_sorted_rounded_and_bounded() {
        let engine = fallback_engine();
        let nearby = engine
            .countries_within_radius(-3.7, 40.4, 1_500.0)
            .await
            .unwrap();

        assert_eq!(nearby.len(), 2);
        assert_eq!(nearby[0].country.iso_alpha2, "ES");
        assert!(nearby[0].distance_km <= nearby[1].distance_km);
        for hit in &nearby {
            assert!(hit.distance_km <= 1_500.0);
            // Rounded to two decimals.
            let scaled = hit.distance_km * 100.0;
            assert!((scaled - scaled.round()).abs() < 1e-6);
        }
    }
}
