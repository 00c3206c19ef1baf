//! HTTP handler functions for the travel map geo API.

use actix_web::{HttpRequest, HttpResponse, web};
use travel_map_database_models::BoundingBox;
use travel_map_geo::GeoError;
use travel_map_geo_models::CountryStatus;
use travel_map_server_models::{
    ApiHealth, ApiLocation, ApiNearbyCountry, ApiNearbyLocation, BoundsQuery,
    NearbyCountriesQuery, NearbyLocationsQuery, SearchQuery, UpdateCountryStatusRequest,
};

use crate::AppState;

/// Header carrying the authenticated user id, injected by the auth gateway.
const USER_ID_HEADER: &str = "X-User-Id";

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/geo/countries`
///
/// Returns all countries as a `GeoJSON` `FeatureCollection`, with the
/// requesting user's status per country when authenticated.
pub async fn countries_geojson(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let user_id = authenticated_user(&req);

    match state.geo.countries_geojson(user_id).await {
        Ok(collection) => HttpResponse::Ok().json(collection),
        Err(e) => error_response(&e, "Failed to build countries GeoJSON"),
    }
}

/// `GET /api/geo/user-countries`
///
/// Returns the user's country codes grouped by status.
pub async fn user_countries(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let Some(user_id) = authenticated_user(&req) else {
        return unauthorized();
    };

    match state.geo.user_countries(user_id).await {
        Ok(countries) => HttpResponse::Ok().json(countries),
        Err(e) => error_response(&e, "Failed to query user countries"),
    }
}

/// `POST /api/geo/countries/update`
///
/// Replaces the user's status for a country.
pub async fn update_country_status(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<UpdateCountryStatusRequest>,
) -> HttpResponse {
    let Some(user_id) = authenticated_user(&req) else {
        return unauthorized();
    };

    let Ok(country_status) = body.status.parse::<CountryStatus>() else {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": format!("Invalid status: {}", body.status)
        }));
    };

    match state
        .geo
        .update_country_status(
            user_id,
            &body.country_code,
            country_status,
            body.visit_date,
            body.notes.as_deref(),
        )
        .await
    {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "success": true })),
        Err(e) => error_response(&e, "Failed to update country status"),
    }
}

/// `GET /api/geo/countries/nearby`
///
/// Returns countries within a radius of a point, nearest first.
pub async fn nearby_countries(
    state: web::Data<AppState>,
    req: HttpRequest,
    params: web::Query<NearbyCountriesQuery>,
) -> HttpResponse {
    if authenticated_user(&req).is_none() {
        return unauthorized();
    }

    match state
        .geo
        .nearby_countries(params.lng, params.lat, params.radius)
        .await
    {
        Ok(nearby) => {
            let results: Vec<ApiNearbyCountry> =
                nearby.into_iter().map(ApiNearbyCountry::from).collect();
            HttpResponse::Ok().json(results)
        }
        Err(e) => error_response(&e, "Failed to query nearby countries"),
    }
}

/// `GET /api/geo/countries/by-continent`
///
/// Returns catalog statistics grouped by continent.
pub async fn countries_by_continent(state: web::Data<AppState>) -> HttpResponse {
    match state.geo.countries_by_continent().await {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(e) => error_response(&e, "Failed to query continent statistics"),
    }
}

/// `GET /api/geo/countries/search`
///
/// Searches countries by name or ISO code.
pub async fn search_countries(
    state: web::Data<AppState>,
    params: web::Query<SearchQuery>,
) -> HttpResponse {
    let query = params.q.as_deref().unwrap_or_default();

    match state.geo.search_countries(query, params.limit).await {
        Ok(matches) => HttpResponse::Ok().json(matches),
        Err(e) => error_response(&e, "Failed to search countries"),
    }
}

/// `GET /api/geo/user/geographic-stats`
///
/// Returns the user's geographic statistics.
pub async fn user_geographic_stats(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let Some(user_id) = authenticated_user(&req) else {
        return unauthorized();
    };

    match state.geo.user_geographic_stats(user_id).await {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(e) => error_response(&e, "Failed to compute geographic statistics"),
    }
}

/// `GET /api/geo/locations/nearby`
///
/// Returns the user's other locations near one of their locations.
pub async fn nearby_locations(
    state: web::Data<AppState>,
    req: HttpRequest,
    params: web::Query<NearbyLocationsQuery>,
) -> HttpResponse {
    let Some(user_id) = authenticated_user(&req) else {
        return unauthorized();
    };

    match state
        .geo
        .nearby_locations(user_id, &params.location_id, params.radius)
        .await
    {
        Ok(nearby) => {
            let results: Vec<ApiNearbyLocation> =
                nearby.into_iter().map(ApiNearbyLocation::from).collect();
            HttpResponse::Ok().json(results)
        }
        Err(e) => error_response(&e, "Failed to query nearby locations"),
    }
}

/// `GET /api/geo/locations/in-bounds`
///
/// Returns the user's locations inside a map viewport.
pub async fn locations_in_bounds(
    state: web::Data<AppState>,
    req: HttpRequest,
    params: web::Query<BoundsQuery>,
) -> HttpResponse {
    let Some(user_id) = authenticated_user(&req) else {
        return unauthorized();
    };

    let Some(bbox) = parse_bbox(&params.bbox) else {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "bbox must be west,south,east,north"
        }));
    };

    match state.geo.locations_in_bounds(user_id, bbox).await {
        Ok(locations) => {
            let results: Vec<ApiLocation> =
                locations.into_iter().map(ApiLocation::from).collect();
            HttpResponse::Ok().json(results)
        }
        Err(e) => error_response(&e, "Failed to query locations in bounds"),
    }
}

/// Reads the authenticated user id injected by the auth gateway.
fn authenticated_user(req: &HttpRequest) -> Option<i32> {
    req.headers()
        .get(USER_ID_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(serde_json::json!({
        "error": "Authentication required"
    }))
}

/// Maps a [`GeoError`] to its API response.
///
/// Degraded spatial capability never reaches here; it is resolved at engine
/// selection. Storage failures are logged and surfaced as a generic 500.
fn error_response(e: &GeoError, context: &str) -> HttpResponse {
    match e {
        GeoError::CountryNotFound | GeoError::LocationNotFound => {
            HttpResponse::NotFound().json(serde_json::json!({ "error": e.to_string() }))
        }
        GeoError::InvalidInput { message } => {
            HttpResponse::BadRequest().json(serde_json::json!({ "error": message }))
        }
        _ => {
            log::error!("{context}: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({ "error": context }))
        }
    }
}

/// Parses a bounding box string `"west,south,east,north"` into a
/// [`BoundingBox`].
fn parse_bbox(s: &str) -> Option<BoundingBox> {
    let parts: Vec<f64> = s.split(',').filter_map(|p| p.trim().parse().ok()).collect();
    if parts.len() == 4 {
        Some(BoundingBox::new(parts[0], parts[1], parts[2], parts[3]))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_valid_bbox() {
        let bbox = parse_bbox("-9.5, 35.9, 3.3, 43.8").unwrap();
        assert!((bbox.west - -9.5).abs() < f64::EPSILON);
        assert!((bbox.south - 35.9).abs() < f64::EPSILON);
        assert!((bbox.east - 3.3).abs() < f64::EPSILON);
        assert!((bbox.north - 43.8).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_malformed_bboxes() {
        assert!(parse_bbox("").is_none());
        assert!(parse_bbox("1,2,3").is_none());
        assert!(parse_bbox("a,b,c,d").is_none());
    }
}
