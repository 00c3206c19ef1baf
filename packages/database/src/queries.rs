//! Database query functions for location and trip data.
//!
//! Locations and trips are owned by collaborator services; the queries here
//! are the read paths the geo core needs for statistics and proximity
//! lookups. Coordinates live in plain `longitude`/`latitude` columns on
//! every deployment, so these queries are identical with and without
//! `PostGIS`.

use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};
use travel_map_database_models::{BoundingBox, LocationCategory, LocationRow};

use crate::DbError;

/// Returns the total number of locations recorded by a user.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn count_locations(db: &dyn Database, user_id: i32) -> Result<i64, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT COUNT(*)::bigint as count FROM locations WHERE user_id = $1",
            &[DatabaseValue::Int32(user_id)],
        )
        .await?;

    Ok(rows.first().map_or(0, |r| r.to_value("count").unwrap_or(0)))
}

/// Returns the number of completed trips for a user.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn count_completed_trips(db: &dyn Database, user_id: i32) -> Result<i64, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT COUNT(*)::bigint as count FROM trips
             WHERE user_id = $1 AND status = 'completed'",
            &[DatabaseValue::Int32(user_id)],
        )
        .await?;

    Ok(rows.first().map_or(0, |r| r.to_value("count").unwrap_or(0)))
}

/// Returns a user's location coordinates in chronological visit order.
///
/// Ordered by `visit_date` ascending with nulls last, then by creation time.
/// This is the sequence the travel-distance statistic sums over; it is never
/// reordered for path minimality.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn ordered_location_coordinates(
    db: &dyn Database,
    user_id: i32,
) -> Result<Vec<(f64, f64)>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT longitude, latitude FROM locations
             WHERE user_id = $1
             ORDER BY visit_date ASC NULLS LAST, created_at ASC",
            &[DatabaseValue::Int32(user_id)],
        )
        .await?;

    Ok(rows
        .iter()
        .map(|row| {
            (
                row.to_value("longitude").unwrap_or(0.0),
                row.to_value("latitude").unwrap_or(0.0),
            )
        })
        .collect())
}

/// Looks up a single location's coordinates, scoped to its owning user.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn location_point(
    db: &dyn Database,
    user_id: i32,
    location_id: &str,
) -> Result<Option<(f64, f64)>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT longitude, latitude FROM locations
             WHERE id::text = $1 AND user_id = $2",
            &[
                DatabaseValue::String(location_id.to_string()),
                DatabaseValue::Int32(user_id),
            ],
        )
        .await?;

    Ok(rows.first().map(|row| {
        (
            row.to_value("longitude").unwrap_or(0.0),
            row.to_value("latitude").unwrap_or(0.0),
        )
    }))
}

const LOCATION_COLUMNS: &str = "id::text as id, trip_id::text as trip_id, user_id, name,
            description, longitude, latitude, country_id, visit_date, rating,
            category, elevation, timezone";

/// Returns all of a user's locations.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn locations_for_user(
    db: &dyn Database,
    user_id: i32,
) -> Result<Vec<LocationRow>, DbError> {
    let rows = db
        .query_raw_params(
            &format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE user_id = $1"),
            &[DatabaseValue::Int32(user_id)],
        )
        .await?;

    Ok(rows.iter().map(location_from_row).collect())
}

/// Returns a user's locations inside a bounding box, most recent visit
/// first.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn locations_in_bounds(
    db: &dyn Database,
    user_id: i32,
    bbox: BoundingBox,
) -> Result<Vec<LocationRow>, DbError> {
    let rows = db
        .query_raw_params(
            &format!(
                "SELECT {LOCATION_COLUMNS} FROM locations
                 WHERE user_id = $1
                   AND longitude >= $2 AND longitude <= $3
                   AND latitude >= $4 AND latitude <= $5
                 ORDER BY visit_date DESC NULLS LAST, created_at DESC"
            ),
            &[
                DatabaseValue::Int32(user_id),
                DatabaseValue::Real64(bbox.west),
                DatabaseValue::Real64(bbox.east),
                DatabaseValue::Real64(bbox.south),
                DatabaseValue::Real64(bbox.north),
            ],
        )
        .await?;

    Ok(rows.iter().map(location_from_row).collect())
}

/// Stores a resolved country reference on a location.
///
/// Called by the location collaborator's post-write hook after containment
/// resolution; a `None` country clears the reference.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn set_location_country(
    db: &dyn Database,
    location_id: &str,
    country_id: Option<i32>,
) -> Result<(), DbError> {
    db.exec_raw_params(
        "UPDATE locations SET country_id = $2, updated_at = NOW() WHERE id::text = $1",
        &[
            DatabaseValue::String(location_id.to_string()),
            country_id.map_or(DatabaseValue::Null, DatabaseValue::Int32),
        ],
    )
    .await?;

    Ok(())
}

fn location_from_row(row: &switchy_database::Row) -> LocationRow {
    let category: String = row.to_value("category").unwrap_or_default();

    LocationRow {
        id: row.to_value("id").unwrap_or_default(),
        trip_id: row.to_value("trip_id").unwrap_or(None),
        user_id: row.to_value("user_id").unwrap_or(0),
        name: row.to_value("name").unwrap_or_default(),
        description: row.to_value("description").unwrap_or(None),
        longitude: row.to_value("longitude").unwrap_or(0.0),
        latitude: row.to_value("latitude").unwrap_or(0.0),
        country_id: row.to_value("country_id").unwrap_or(None),
        visit_date: row.to_value("visit_date").unwrap_or(None),
        rating: row.to_value("rating").unwrap_or(None),
        category: category
            .parse::<LocationCategory>()
            .unwrap_or(LocationCategory::City),
        elevation: row.to_value("elevation").unwrap_or(None),
        timezone: row.to_value("timezone").unwrap_or(None),
    }
}
