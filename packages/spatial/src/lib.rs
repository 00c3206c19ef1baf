#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory spatial index for country boundary attribution.
//!
//! Loads country polygons from their stored `GeoJSON` boundaries at startup,
//! builds an R-tree spatial index, and provides point-in-polygon and
//! proximity lookups. Used as the spatial predicate engine on deployments
//! where the database has no spatial extension.
//!
//! All distance math here uses a planar approximation: Euclidean distance in
//! degrees multiplied by 111.32 (kilometers per degree at the equator). It
//! is intentionally not geodesic; the error grows at high latitudes and over
//! long distances.

use geo::{Contains, MultiPolygon};
use geojson::GeoJson;
use rstar::{AABB, RTree, RTreeObject};
use travel_map_geo_models::Country;

/// Kilometers per degree of arc at the equator.
pub const KM_PER_DEGREE: f64 = 111.32;

/// Planar approximate distance in kilometers between two `(lng, lat)` points.
#[must_use]
pub fn planar_distance_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    dx.hypot(dy) * KM_PER_DEGREE
}

/// Arithmetic mean of a set of `(lng, lat)` points.
///
/// Returns `None` for an empty set.
#[must_use]
pub fn centroid(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    if points.is_empty() {
        return None;
    }
    let (sum_lng, sum_lat) = points
        .iter()
        .fold((0.0, 0.0), |(lng, lat), p| (lng + p.0, lat + p.1));
    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f64;
    Some((sum_lng / n, sum_lat / n))
}

/// Sum of consecutive pairwise planar distances over a point sequence, in
/// kilometers.
///
/// The sequence order is preserved; this is a path length, not a tour
/// optimization.
#[must_use]
pub fn path_length_km(points: &[(f64, f64)]) -> f64 {
    points
        .windows(2)
        .map(|pair| planar_distance_km(pair[0], pair[1]))
        .sum()
}

/// Rounds a kilometer value to two decimal places.
#[must_use]
pub fn round_km(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}

/// A country polygon stored in the R-tree with its catalog record.
struct CountryEntry {
    country: Country,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for CountryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built spatial index over the country catalog.
///
/// Constructed once at startup and shared across all consumers. The catalog
/// is read-only after import, so the index never needs invalidation.
pub struct CountryIndex {
    countries: RTree<CountryEntry>,
}

impl CountryIndex {
    /// Builds the index from catalog rows, parsing each stored boundary.
    ///
    /// Rows whose `geometry_json` fails to parse are skipped with a warning
    /// rather than failing the whole load.
    #[must_use]
    pub fn from_countries(countries: Vec<Country>) -> Self {
        let mut entries = Vec::with_capacity(countries.len());

        for country in countries {
            let Some(polygon) = parse_geojson_to_multipolygon(&country.geometry_json) else {
                log::warn!(
                    "Failed to parse boundary GeoJSON for country {}",
                    country.iso_alpha2
                );
                continue;
            };

            let envelope = compute_envelope(&polygon);

            entries.push(CountryEntry {
                country,
                envelope,
                polygon,
            });
        }

        Self {
            countries: RTree::bulk_load(entries),
        }
    }

    /// Number of countries in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.countries.size()
    }

    /// Whether the index holds no countries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.countries.size() == 0
    }

    /// Finds the country whose boundary contains a point.
    ///
    /// Boundary datasets can contain slivers of overlap; the match with the
    /// lowest catalog id wins so repeated lookups are deterministic.
    #[must_use]
    pub fn locate(&self, lng: f64, lat: f64) -> Option<&Country> {
        let point = geo::Point::new(lng, lat);
        let query_env = AABB::from_point([lng, lat]);

        self.countries
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.contains(&point))
            .min_by_key(|entry| entry.country.id)
            .map(|entry| &entry.country)
    }

    /// Returns countries whose centroid lies within `radius_km` of a point,
    /// ascending by distance, capped at `limit`.
    ///
    /// Countries without a precomputed centroid are excluded. This measures
    /// to the centroid rather than to the nearest boundary edge; the native
    /// engine answers the same question against the boundary itself.
    #[must_use]
    pub fn within_radius(
        &self,
        lng: f64,
        lat: f64,
        radius_km: f64,
        limit: usize,
    ) -> Vec<(&Country, f64)> {
        let mut matches: Vec<(&Country, f64)> = self
            .countries
            .iter()
            .filter_map(|entry| {
                let clng = entry.country.centroid_lng?;
                let clat = entry.country.centroid_lat?;
                let distance = planar_distance_km((lng, lat), (clng, clat));
                (distance <= radius_km).then_some((&entry.country, distance))
            })
            .collect();

        matches.sort_by(|a, b| a.1.total_cmp(&b.1));
        matches.truncate(limit);
        matches
    }
}

/// Parse a `GeoJSON` geometry string into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
#[must_use]
pub fn parse_geojson_to_multipolygon(geojson_str: &str) -> Option<MultiPolygon<f64>> {
    let geojson: GeoJson = geojson_str.parse().ok()?;
    if let GeoJson::Geometry(geom) = geojson {
        let geo_geom: geo::Geometry<f64> = geom.try_into().ok()?;
        match geo_geom {
            geo::Geometry::MultiPolygon(mp) => Some(mp),
            geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
            _ => None,
        }
    } else {
        None
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    use geo::BoundingRect;

    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
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

    /// Axis-aligned square polygon as a GeoJSON geometry string.
    fn square(west: f64, south: f64, east: f64, north: f64) -> String {
        format!(
            "{{\"type\":\"Polygon\",\"coordinates\":[[[{west},{south}],[{east},{south}],[{east},{north}],[{west},{north}],[{west},{south}]]]}}"
        )
    }

    fn test_index() -> CountryIndex {
        // Rough stand-ins: an Iberia-like square, a France-like square, and
        // a two-part island nation.
        let iberia = square(-9.0, 36.0, 3.0, 43.0);
        let france = square(-4.0, 43.5, 8.0, 51.0);
        let islands = "{\"type\":\"MultiPolygon\",\"coordinates\":[\
            [[[20.0,10.0],[21.0,10.0],[21.0,11.0],[20.0,11.0],[20.0,10.0]]],\
            [[[22.0,12.0],[23.0,12.0],[23.0,13.0],[22.0,13.0],[22.0,12.0]]]]}";

        CountryIndex::from_countries(vec![
            country(1, "ES", &iberia, (-3.0, 40.0)),
            country(2, "FR", &france, (2.0, 47.0)),
            country(3, "IS", islands, (21.5, 11.5)),
        ])
    }

    #[test]
    fn planar_distance_is_pinned_to_the_equatorial_constant() {
        // One degree of longitude at the equator is exactly 111.32 km under
        // this approximation, regardless of latitude.
        assert!((planar_distance_km((0.0, 0.0), (1.0, 0.0)) - 111.32).abs() < 1e-9);
        assert!((planar_distance_km((10.0, 60.0), (11.0, 60.0)) - 111.32).abs() < 1e-9);
        // 3-4-5 triangle in degrees.
        assert!((planar_distance_km((0.0, 0.0), (3.0, 4.0)) - 5.0 * 111.32).abs() < 1e-9);
    }

    #[test]
    fn centroid_is_the_arithmetic_mean() {
        assert_eq!(centroid(&[]), None);
        assert_eq!(centroid(&[(2.0, 4.0)]), Some((2.0, 4.0)));
        let c = centroid(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]).unwrap();
        assert!((c.0 - 1.0).abs() < 1e-12);
        assert!((c.1 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn path_length_sums_consecutive_legs_in_order() {
        assert!(path_length_km(&[]).abs() < 1e-12);
        assert!(path_length_km(&[(5.0, 5.0)]).abs() < 1e-12);
        // Two 1-degree legs; out-and-back is counted twice, not optimized away.
        let path = [(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)];
        assert!((path_length_km(&path) - 2.0 * 111.32).abs() < 1e-9);
    }

    #[test]
    fn round_km_keeps_two_decimals() {
        assert!((round_km(111.325_4) - 111.33).abs() < 1e-9);
        assert!((round_km(0.004) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn locate_finds_the_containing_country() {
        let index = test_index();
        assert_eq!(index.locate(-3.7, 40.4).unwrap().iso_alpha2, "ES");
        assert_eq!(index.locate(2.35, 48.85).unwrap().iso_alpha2, "FR");
        // Second polygon of the multipolygon.
        assert_eq!(index.locate(22.5, 12.5).unwrap().iso_alpha2, "IS");
    }

    #[test]
    fn locate_returns_none_in_international_waters() {
        let index = test_index();
        assert!(index.locate(-30.0, 45.0).is_none());
        assert!(index.locate(0.0, 0.0).is_none());
    }

    #[test]
    fn locate_prefers_the_lowest_catalog_id_on_overlap() {
        let a = square(0.0, 0.0, 10.0, 10.0);
        let b = square(5.0, 5.0, 15.0, 15.0);
        let index = CountryIndex::from_countries(vec![
            country(7, "BB", &b, (10.0, 10.0)),
            country(4, "AA", &a, (5.0, 5.0)),
        ]);
        assert_eq!(index.locate(7.0, 7.0).unwrap().iso_alpha2, "AA");
    }

    #[test]
    fn unparseable_boundaries_are_skipped() {
        let index = CountryIndex::from_countries(vec![
            country(1, "OK", &square(0.0, 0.0, 1.0, 1.0), (0.5, 0.5)),
            country(2, "XX", "not geojson", (0.0, 0.0)),
            country(3, "YY", "{\"type\":\"Point\",\"coordinates\":[1.0,1.0]}", (1.0, 1.0)),
        ]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn within_radius_sorts_ascending_and_respects_the_cap() {
        let index = test_index();
        // From Madrid-ish: ES centroid is closest, FR next, islands far away.
        let hits = index.within_radius(-3.7, 40.4, 2_000.0, 20);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0.iso_alpha2, "ES");
        assert_eq!(hits[1].0.iso_alpha2, "FR");
        assert!(hits[0].1 <= hits[1].1);

        let capped = index.within_radius(-3.7, 40.4, 2_000.0, 1);
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].0.iso_alpha2, "ES");
    }

    #[test]
    fn within_radius_excludes_countries_beyond_the_radius() {
        let index = test_index();
        let hits = index.within_radius(-3.7, 40.4, 100.0, 20);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.iso_alpha2, "ES");
        for (_, d) in &hits {
            assert!(*d <= 100.0);
        }
    }
}
