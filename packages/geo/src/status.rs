//! Per-user country status tracking.
//!
//! Each (user, country) pair holds at most one active status row. Setting a
//! status replaces whatever was there before in a single atomic upsert, then
//! refreshes the user's cached statistics. The cached row is a materialized
//! view, not a source of truth; readers tolerate a brief staleness window
//! between the status write and the recomputation.

use chrono::NaiveDateTime;
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};
use travel_map_database::queries as location_queries;
use travel_map_geo_models::{ContinentVisits, CountryStatus, UserCountries};

use crate::{GeoError, catalog};

/// Sets a user's status for a country, replacing any previous status.
///
/// The state machine per (user, country) pair is
/// `absent -> {visited|planned|wishlist}` and
/// `{visited|planned|wishlist} -> {new status}` with no intermediate state:
/// the upsert conflicts on the pair's uniqueness constraint, so concurrent
/// calls for the same pair can never leave two rows.
///
/// A `visited` status with no explicit date defaults the visit date to now.
///
/// # Errors
///
/// Returns [`GeoError::CountryNotFound`] if the code is unknown, or
/// [`GeoError`] if a database operation fails.
pub async fn set_status(
    db: &dyn Database,
    user_id: i32,
    country_code: &str,
    status: CountryStatus,
    visit_date: Option<NaiveDateTime>,
    notes: Option<&str>,
) -> Result<(), GeoError> {
    let country = catalog::find_by_code(db, country_code)
        .await?
        .ok_or(GeoError::CountryNotFound)?;

    let visit_date = visit_date.or_else(|| {
        (status == CountryStatus::Visited).then(|| chrono::Utc::now().naive_utc())
    });

    db.exec_raw_params(
        "INSERT INTO user_country_statuses (user_id, country_id, status, visit_date, notes)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (user_id, country_id) DO UPDATE SET
             status = EXCLUDED.status,
             visit_date = EXCLUDED.visit_date,
             notes = EXCLUDED.notes,
             updated_at = NOW()",
        &[
            DatabaseValue::Int32(user_id),
            DatabaseValue::Int32(country.id),
            DatabaseValue::String(status.to_string()),
            visit_date.map_or(DatabaseValue::Null, DatabaseValue::DateTime),
            notes.map_or(DatabaseValue::Null, |n| {
                DatabaseValue::String(n.to_string())
            }),
        ],
    )
    .await?;

    recompute_user_statistics(db, user_id).await?;

    Ok(())
}

/// Returns a user's country codes grouped by status.
///
/// # Errors
///
/// Returns [`GeoError`] if the database operation fails.
pub async fn get_by_user(db: &dyn Database, user_id: i32) -> Result<UserCountries, GeoError> {
    let rows = db
        .query_raw_params(
            "SELECT c.iso_alpha2 as iso_alpha2, ucs.status as status
             FROM user_country_statuses ucs
             JOIN countries c ON ucs.country_id = c.id
             WHERE ucs.user_id = $1
             ORDER BY c.name",
            &[DatabaseValue::Int32(user_id)],
        )
        .await?;

    Ok(group_by_status(rows.iter().filter_map(|row| {
        let code: String = row.to_value("iso_alpha2").unwrap_or_default();
        let status: String = row.to_value("status").unwrap_or_default();
        status.parse::<CountryStatus>().ok().map(|s| (code, s))
    })))
}

/// Groups (code, status) pairs into the three status lists.
fn group_by_status(rows: impl Iterator<Item = (String, CountryStatus)>) -> UserCountries {
    let mut countries = UserCountries::default();

    for (code, status) in rows {
        match status {
            CountryStatus::Visited => countries.visited.push(code),
            CountryStatus::Planned => countries.planned.push(code),
            CountryStatus::Wishlist => countries.wishlist.push(code),
        }
    }

    countries
}

/// Visited-country counts grouped by continent, descending by count.
///
/// Unlike the catalog-wide continent stats, countries with no continent
/// assigned are included here as a `None` bucket so every visited country is
/// counted.
///
/// # Errors
///
/// Returns [`GeoError`] if the database operation fails.
pub async fn visited_by_continent(
    db: &dyn Database,
    user_id: i32,
) -> Result<Vec<ContinentVisits>, GeoError> {
    let rows = db
        .query_raw_params(
            "SELECT c.continent as continent, COUNT(*)::bigint as count
             FROM user_country_statuses ucs
             JOIN countries c ON ucs.country_id = c.id
             WHERE ucs.user_id = $1 AND ucs.status = 'visited'
             GROUP BY c.continent
             ORDER BY count DESC",
            &[DatabaseValue::Int32(user_id)],
        )
        .await?;

    Ok(rows
        .iter()
        .map(|row| ContinentVisits {
            continent: row.to_value("continent").unwrap_or(None),
            count: row.to_value("count").unwrap_or(0),
        })
        .collect())
}

/// Number of distinct countries the user has marked visited.
///
/// # Errors
///
/// Returns [`GeoError`] if the database operation fails.
pub async fn count_visited(db: &dyn Database, user_id: i32) -> Result<i64, GeoError> {
    let rows = db
        .query_raw_params(
            "SELECT COUNT(DISTINCT country_id)::bigint as count
             FROM user_country_statuses
             WHERE user_id = $1 AND status = 'visited'",
            &[DatabaseValue::Int32(user_id)],
        )
        .await?;

    Ok(rows.first().map_or(0, |r| r.to_value("count").unwrap_or(0)))
}

/// Recomputes and upserts the user's cached statistics row.
///
/// The three inputs are independent read-only counts, so they are dispatched
/// concurrently and awaited jointly.
///
/// # Errors
///
/// Returns [`GeoError`] if any database operation fails.
pub async fn recompute_user_statistics(db: &dyn Database, user_id: i32) -> Result<(), GeoError> {
    let (countries_visited, total_locations, total_trips) = futures::try_join!(
        count_visited(db, user_id),
        async {
            location_queries::count_locations(db, user_id)
                .await
                .map_err(GeoError::from)
        },
        async {
            location_queries::count_completed_trips(db, user_id)
                .await
                .map_err(GeoError::from)
        },
    )?;

    #[allow(clippy::cast_possible_truncation)]
    let counts = [
        countries_visited as i32,
        total_locations as i32,
        total_trips as i32,
    ];

    db.exec_raw_params(
        "INSERT INTO user_statistics (user_id, countries_visited, total_locations, total_trips, last_calculated)
         VALUES ($1, $2, $3, $4, NOW())
         ON CONFLICT (user_id) DO UPDATE SET
             countries_visited = EXCLUDED.countries_visited,
             total_locations = EXCLUDED.total_locations,
             total_trips = EXCLUDED.total_trips,
             last_calculated = NOW()",
        &[
            DatabaseValue::Int32(user_id),
            DatabaseValue::Int32(counts[0]),
            DatabaseValue::Int32(counts[1]),
            DatabaseValue::Int32(counts[2]),
        ],
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_codes_into_status_lists() {
        let rows = vec![
            ("FR".to_string(), CountryStatus::Visited),
            ("ES".to_string(), CountryStatus::Planned),
            ("JP".to_string(), CountryStatus::Visited),
            ("NZ".to_string(), CountryStatus::Wishlist),
        ];

        let grouped = group_by_status(rows.into_iter());

        assert_eq!(grouped.visited, vec!["FR", "JP"]);
        assert_eq!(grouped.planned, vec!["ES"]);
        assert_eq!(grouped.wishlist, vec!["NZ"]);
    }

    #[test]
    fn empty_input_yields_empty_lists() {
        let grouped = group_by_status(std::iter::empty());
        assert!(grouped.visited.is_empty());
        assert!(grouped.planned.is_empty());
        assert!(grouped.wishlist.is_empty());
    }

    #[test]
    fn a_code_appears_in_exactly_one_list() {
        // The tracker enforces one row per (user, country); grouping a
        // replaced status therefore sees only the latest row.
        let rows = vec![("FR".to_string(), CountryStatus::Planned)];
        let grouped = group_by_status(rows.into_iter());
        assert!(grouped.visited.is_empty());
        assert_eq!(grouped.planned, vec!["FR"]);
    }
}
