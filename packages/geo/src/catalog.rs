//! Country catalog queries.
//!
//! The catalog is read-only after import: lookups by code, text search with
//! in-process ranking, and continent-level aggregates. Boundary geometry is
//! served from the stored `geometry_json` column on every deployment.

use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};
use travel_map_geo_models::{
    ContinentStats, Country, CountryStatus, CountrySummary, CountryWithStatus,
};

use crate::GeoError;

/// Default result cap for [`search`].
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

pub(crate) const COUNTRY_COLUMNS: &str = "id, iso_alpha2, iso_alpha3, name, continent, capital,
            population, area_sq_km, geometry_json, centroid_lng, centroid_lat";

pub(crate) fn country_from_row(row: &switchy_database::Row) -> Country {
    Country {
        id: row.to_value("id").unwrap_or(0),
        iso_alpha2: row.to_value("iso_alpha2").unwrap_or_default(),
        iso_alpha3: row.to_value("iso_alpha3").unwrap_or_default(),
        name: row.to_value("name").unwrap_or_default(),
        continent: row.to_value("continent").unwrap_or(None),
        capital: row.to_value("capital").unwrap_or(None),
        population: row.to_value("population").unwrap_or(None),
        area_sq_km: row.to_value("area_sq_km").unwrap_or(None),
        geometry_json: row.to_value("geometry_json").unwrap_or_default(),
        centroid_lng: row.to_value("centroid_lng").unwrap_or(None),
        centroid_lat: row.to_value("centroid_lat").unwrap_or(None),
    }
}

/// Returns all countries ordered by name.
///
/// # Errors
///
/// Returns [`GeoError`] if the database operation fails.
pub async fn get_all(db: &dyn Database) -> Result<Vec<Country>, GeoError> {
    let rows = db
        .query_raw_params(
            &format!("SELECT {COUNTRY_COLUMNS} FROM countries ORDER BY name"),
            &[],
        )
        .await?;

    Ok(rows.iter().map(country_from_row).collect())
}

/// Exact lookup by ISO alpha-2 code (case-insensitive input).
///
/// Returns `Ok(None)` when the code is unknown; absence is not an error.
///
/// # Errors
///
/// Returns [`GeoError`] if the database operation fails.
pub async fn find_by_code(db: &dyn Database, iso_alpha2: &str) -> Result<Option<Country>, GeoError> {
    let rows = db
        .query_raw_params(
            &format!("SELECT {COUNTRY_COLUMNS} FROM countries WHERE iso_alpha2 = $1"),
            &[DatabaseValue::String(iso_alpha2.to_uppercase())],
        )
        .await?;

    Ok(rows.first().map(country_from_row))
}

/// Exact lookup by surrogate id.
///
/// # Errors
///
/// Returns [`GeoError`] if the database operation fails.
pub async fn find_by_id(db: &dyn Database, id: i32) -> Result<Option<Country>, GeoError> {
    let rows = db
        .query_raw_params(
            &format!("SELECT {COUNTRY_COLUMNS} FROM countries WHERE id = $1"),
            &[DatabaseValue::Int32(id)],
        )
        .await?;

    Ok(rows.first().map(country_from_row))
}

/// Case-insensitive substring search over name and both ISO codes.
///
/// The database filters to substring matches; ranking happens in-process:
/// a prefix match on the name beats a prefix match on the alpha-2 code,
/// which beats any other substring match, with population (descending)
/// breaking ties. Results are capped at `limit`.
///
/// An empty query returns an empty list, not an error.
///
/// # Errors
///
/// Returns [`GeoError`] if the database operation fails.
pub async fn search(
    db: &dyn Database,
    query: &str,
    limit: Option<usize>,
) -> Result<Vec<CountrySummary>, GeoError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let pattern = format!("%{}%", query.to_lowercase());
    let rows = db
        .query_raw_params(
            "SELECT id, iso_alpha2, iso_alpha3, name, continent, capital, population
             FROM countries
             WHERE LOWER(name) LIKE $1
                OR LOWER(iso_alpha2) LIKE $1
                OR LOWER(iso_alpha3) LIKE $1",
            &[DatabaseValue::String(pattern)],
        )
        .await?;

    let mut matches: Vec<CountrySummary> = rows
        .iter()
        .map(|row| CountrySummary {
            id: row.to_value("id").unwrap_or(0),
            iso_alpha2: row.to_value("iso_alpha2").unwrap_or_default(),
            iso_alpha3: row.to_value("iso_alpha3").unwrap_or_default(),
            name: row.to_value("name").unwrap_or_default(),
            continent: row.to_value("continent").unwrap_or(None),
            capital: row.to_value("capital").unwrap_or(None),
            population: row.to_value("population").unwrap_or(None),
        })
        .collect();

    rank_matches(&mut matches, query);
    matches.truncate(limit.unwrap_or(DEFAULT_SEARCH_LIMIT));

    Ok(matches)
}

/// Search rank for a single country: lower is better.
fn search_rank(country: &CountrySummary, query_lower: &str) -> u8 {
    if country.name.to_lowercase().starts_with(query_lower) {
        0
    } else if country.iso_alpha2.to_lowercase().starts_with(query_lower) {
        1
    } else {
        2
    }
}

/// Sorts matches by rank, breaking ties by descending population.
fn rank_matches(matches: &mut [CountrySummary], query: &str) {
    let query_lower = query.to_lowercase();
    matches.sort_by(|a, b| {
        search_rank(a, &query_lower)
            .cmp(&search_rank(b, &query_lower))
            .then_with(|| b.population.unwrap_or(0).cmp(&a.population.unwrap_or(0)))
    });
}

/// Groups countries by continent: count, average area, and summed
/// population per continent, ordered by descending count.
///
/// Countries with no continent assigned are excluded.
///
/// # Errors
///
/// Returns [`GeoError`] if the database operation fails.
pub async fn stats_by_continent(db: &dyn Database) -> Result<Vec<ContinentStats>, GeoError> {
    let rows = db
        .query_raw_params(
            "SELECT continent,
                    COUNT(*)::bigint as country_count,
                    COALESCE(AVG(area_sq_km), 0)::double precision as avg_area,
                    COALESCE(SUM(population), 0)::bigint as total_population
             FROM countries
             WHERE continent IS NOT NULL
             GROUP BY continent
             ORDER BY country_count DESC",
            &[],
        )
        .await?;

    Ok(rows
        .iter()
        .map(|row| {
            let avg_area: f64 = row.to_value("avg_area").unwrap_or(0.0);
            ContinentStats {
                continent: row.to_value("continent").unwrap_or_default(),
                country_count: row.to_value("country_count").unwrap_or(0),
                avg_area_sq_km: avg_area.round(),
                total_population: row.to_value("total_population").unwrap_or(0),
            }
        })
        .collect())
}

/// Left-joins the full catalog with a user's statuses so every country is
/// represented exactly once, ordered by name.
///
/// An anonymous request (`user_id = None`) yields no status matches, so
/// every country comes back with no status.
///
/// # Errors
///
/// Returns [`GeoError`] if the database operation fails.
pub async fn get_all_with_status(
    db: &dyn Database,
    user_id: Option<i32>,
) -> Result<Vec<CountryWithStatus>, GeoError> {
    let rows = db
        .query_raw_params(
            "SELECT c.id as id, c.iso_alpha2 as iso_alpha2, c.iso_alpha3 as iso_alpha3,
                    c.name as name, c.continent as continent, c.capital as capital,
                    c.population as population, c.area_sq_km as area_sq_km,
                    c.geometry_json as geometry_json, c.centroid_lng as centroid_lng,
                    c.centroid_lat as centroid_lat, ucs.status as status
             FROM countries c
             LEFT JOIN user_country_statuses ucs
               ON c.id = ucs.country_id AND ucs.user_id = $1
             ORDER BY c.name",
            &[DatabaseValue::Int32(user_id.unwrap_or(-1))],
        )
        .await?;

    Ok(rows
        .iter()
        .map(|row| {
            let status: Option<String> = row.to_value("status").unwrap_or(None);
            CountryWithStatus {
                country: country_from_row(row),
                status: status.and_then(|s| s.parse::<CountryStatus>().ok()),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(name: &str, alpha2: &str, alpha3: &str, population: Option<i64>) -> CountrySummary {
        CountrySummary {
            id: 0,
            iso_alpha2: alpha2.to_string(),
            iso_alpha3: alpha3.to_string(),
            name: name.to_string(),
            continent: None,
            capital: None,
            population,
        }
    }

    #[test]
    fn name_prefix_outranks_code_prefix() {
        // "fr" is a name prefix for France and an alpha-2 prefix for nothing
        // else here; Gabon matches only via its alpha-3 substring.
        let mut matches = vec![
            summary("Gabon", "GA", "GAB", Some(2_000_000)),
            summary("France", "FR", "FRA", Some(67_000_000)),
        ];
        rank_matches(&mut matches, "fra");
        assert_eq!(matches[0].iso_alpha2, "FR");
    }

    #[test]
    fn code_prefix_outranks_plain_substring() {
        let mut matches = vec![
            // Matches "es" as a substring of the name only.
            summary("French Polynesia", "PF", "PYF", Some(280_000)),
            // Matches "es" as an alpha-2 prefix.
            summary("Spain", "ES", "ESP", Some(47_000_000)),
        ];
        rank_matches(&mut matches, "es");
        assert_eq!(matches[0].iso_alpha2, "ES");
    }

    #[test]
    fn population_breaks_rank_ties() {
        let mut matches = vec![
            summary("Guinea", "GN", "GIN", Some(13_000_000)),
            summary("Germany", "DE", "DEU", Some(83_000_000)),
            summary("Greece", "GR", "GRC", Some(10_000_000)),
        ];
        rank_matches(&mut matches, "g");
        assert_eq!(matches[0].name, "Germany");
        assert_eq!(matches[1].name, "Guinea");
        assert_eq!(matches[2].name, "Greece");
    }

    #[test]
    fn missing_population_ranks_last_within_a_tier() {
        let mut matches = vec![
            summary("Svalbard", "SJ", "SJM", None),
            summary("Sweden", "SE", "SWE", Some(10_000_000)),
        ];
        rank_matches(&mut matches, "s");
        assert_eq!(matches[0].name, "Sweden");
    }
}
