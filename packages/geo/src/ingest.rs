//! Country boundary import from a world-countries `GeoJSON` dataset.
//!
//! Downloads the boundary `FeatureCollection`, derives alpha-2 codes from
//! the dataset's alpha-3 feature ids, computes centroids in-process, and
//! upserts the catalog keyed by alpha-2 code. Re-running the job refreshes
//! existing rows; countries are never deleted by import.
//!
//! The canonical boundary is always stored as serialized `GeoJSON`; on
//! `PostGIS` deployments the native geometry column is populated as well,
//! from a `MULTIPOLYGON` WKT built from the outer rings.

use geo::{Centroid as _, MultiPolygon};
use geojson::{FeatureCollection, GeoJson, feature::Id};
use switchy_database::{Database, DatabaseValue};

use crate::GeoError;

/// Default source for world country boundaries.
pub const DEFAULT_COUNTRIES_URL: &str =
    "https://raw.githubusercontent.com/johan/world.geo.json/master/countries.geo.json";

/// Maximum retry attempts for the dataset download.
const SEED_MAX_RETRIES: u32 = 3;

/// User-Agent sent with the dataset download.
const SEED_USER_AGENT: &str = "travel-map/1.0 (+https://github.com/travelmap/travel-map)";

/// Outcome counts for a seed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Countries inserted for the first time.
    pub imported: u64,
    /// Existing countries refreshed.
    pub updated: u64,
    /// Features skipped (invalid codes or non-polygonal geometry).
    pub skipped: u64,
}

/// Builds a `reqwest::Client` configured for the dataset download.
///
/// # Errors
///
/// Returns [`GeoError`] if the client cannot be built.
fn build_seed_client() -> Result<reqwest::Client, GeoError> {
    reqwest::Client::builder()
        .user_agent(SEED_USER_AGENT)
        .build()
        .map_err(Into::into)
}

/// Fetches the dataset body with retry and exponential backoff on transient
/// failures.
async fn fetch_boundaries(client: &reqwest::Client, url: &str) -> Result<String, GeoError> {
    let mut last_error = String::new();

    for attempt in 0..SEED_MAX_RETRIES {
        if attempt > 0 {
            let delay_secs = 1u64 << attempt;
            log::warn!("Boundary download: retry {attempt}/{SEED_MAX_RETRIES} in {delay_secs}s...");
            tokio::time::sleep(std::time::Duration::from_secs(delay_secs)).await;
        }

        let resp = match client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                last_error = format!("HTTP request error: {e}");
                log::warn!("Boundary download (attempt {attempt}): {last_error}");
                continue;
            }
        };

        let resp_status = resp.status();
        if !resp_status.is_success() {
            last_error = format!("HTTP {resp_status}");
            log::warn!("Boundary download (attempt {attempt}): {last_error}");
            continue;
        }

        match resp.text().await {
            Ok(body) => return Ok(body),
            Err(e) => {
                last_error = format!("Failed to read response body: {e}");
                log::warn!("Boundary download (attempt {attempt}): {last_error}");
            }
        }
    }

    Err(GeoError::Conversion {
        message: format!(
            "Boundary download failed after {SEED_MAX_RETRIES} attempts: {last_error}"
        ),
    })
}

/// Downloads the boundary dataset and upserts the country catalog.
///
/// With `has_postgis` the native geometry column is populated alongside the
/// canonical serialized boundary; without it the serialized boundary plus
/// the precomputed centroid carry the same information.
///
/// # Errors
///
/// Returns [`GeoError`] if the download, parse, or any database operation
/// fails. Individual invalid features are skipped, not fatal.
pub async fn seed_countries(
    db: &dyn Database,
    has_postgis: bool,
    url: Option<&str>,
) -> Result<SeedSummary, GeoError> {
    let url = url.unwrap_or(DEFAULT_COUNTRIES_URL);
    let client = build_seed_client()?;

    log::info!("Downloading country boundaries from {url}...");
    let body = fetch_boundaries(&client, url).await?;

    let collection: FeatureCollection = match body.parse::<GeoJson>() {
        Ok(GeoJson::FeatureCollection(fc)) => fc,
        Ok(_) => {
            return Err(GeoError::Conversion {
                message: "Boundary dataset is not a FeatureCollection".to_string(),
            });
        }
        Err(e) => {
            return Err(GeoError::Conversion {
                message: format!("Failed to parse boundary dataset: {e}"),
            });
        }
    };

    let mut summary = SeedSummary::default();

    for feature in &collection.features {
        let iso_alpha3 = match &feature.id {
            Some(Id::String(id)) => id.trim().to_uppercase(),
            _ => String::new(),
        };

        let name = feature
            .properties
            .as_ref()
            .and_then(|props| props.get("name"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();

        if name.is_empty() || iso_alpha3.len() != 3 || iso_alpha3 == "-99" {
            log::debug!("Skipping invalid entry: {name} ({iso_alpha3})");
            summary.skipped += 1;
            continue;
        }

        let iso_alpha2 = alpha2_for(&iso_alpha3);

        let Some(geometry) = &feature.geometry else {
            summary.skipped += 1;
            continue;
        };
        let geometry_json = serde_json::to_string(geometry)?;

        let Some(multi_polygon) = travel_map_spatial::parse_geojson_to_multipolygon(&geometry_json)
        else {
            log::debug!("Skipping non-polygonal geometry for {name} ({iso_alpha3})");
            summary.skipped += 1;
            continue;
        };

        let (centroid_lng, centroid_lat) = multi_polygon
            .centroid()
            .map_or((None, None), |point| (Some(point.x()), Some(point.y())));

        let existing = db
            .query_raw_params(
                "SELECT id FROM countries WHERE iso_alpha2 = $1",
                &[DatabaseValue::String(iso_alpha2.clone())],
            )
            .await?;

        let mut params = vec![
            DatabaseValue::String(iso_alpha2.clone()),
            DatabaseValue::String(iso_alpha3.clone()),
            DatabaseValue::String(name.clone()),
            DatabaseValue::String(geometry_json),
            centroid_lng.map_or(DatabaseValue::Null, DatabaseValue::Real64),
            centroid_lat.map_or(DatabaseValue::Null, DatabaseValue::Real64),
        ];

        let sql = if existing.first().is_some() {
            if has_postgis {
                params.push(DatabaseValue::String(multipolygon_wkt(&multi_polygon)));
                "UPDATE countries SET iso_alpha3 = $2, name = $3, geometry_json = $4,
                        centroid_lng = $5, centroid_lat = $6,
                        geometry = ST_GeomFromText($7, 4326), updated_at = NOW()
                 WHERE iso_alpha2 = $1"
            } else {
                "UPDATE countries SET iso_alpha3 = $2, name = $3, geometry_json = $4,
                        centroid_lng = $5, centroid_lat = $6, updated_at = NOW()
                 WHERE iso_alpha2 = $1"
            }
        } else if has_postgis {
            params.push(DatabaseValue::String(multipolygon_wkt(&multi_polygon)));
            "INSERT INTO countries (iso_alpha2, iso_alpha3, name, geometry_json,
                                    centroid_lng, centroid_lat, geometry)
             VALUES ($1, $2, $3, $4, $5, $6, ST_GeomFromText($7, 4326))"
        } else {
            "INSERT INTO countries (iso_alpha2, iso_alpha3, name, geometry_json,
                                    centroid_lng, centroid_lat)
             VALUES ($1, $2, $3, $4, $5, $6)"
        };

        db.exec_raw_params(sql, &params).await?;

        if existing.first().is_some() {
            summary.updated += 1;
        } else {
            summary.imported += 1;
        }
        log::debug!("Seeded {name} ({iso_alpha3} -> {iso_alpha2})");
    }

    log::info!(
        "Countries imported: {}, updated: {}, skipped: {}",
        summary.imported,
        summary.updated,
        summary.skipped
    );

    Ok(summary)
}

/// Alpha-2 code for an alpha-3 code, falling back to the first two
/// characters for codes missing from the mapping.
fn alpha2_for(alpha3: &str) -> String {
    alpha3_to_alpha2(alpha3).map_or_else(|| alpha3.chars().take(2).collect(), str::to_string)
}

/// ISO 3166-1 alpha-3 to alpha-2 mapping for the boundary dataset.
#[allow(clippy::too_many_lines)]
fn alpha3_to_alpha2(alpha3: &str) -> Option<&'static str> {
    Some(match alpha3 {
        "AFG" => "AF",
        "AGO" => "AO",
        "ALB" => "AL",
        "ARE" => "AE",
        "ARG" => "AR",
        "ARM" => "AM",
        "ATA" => "AQ",
        "ATF" => "TF",
        "AUS" => "AU",
        "AUT" => "AT",
        "AZE" => "AZ",
        "BDI" => "BI",
        "BEL" => "BE",
        "BEN" => "BJ",
        "BFA" => "BF",
        "BGD" => "BD",
        "BGR" => "BG",
        "BHR" => "BH",
        "BHS" => "BS",
        "BIH" => "BA",
        "BLR" => "BY",
        "BLZ" => "BZ",
        "BOL" => "BO",
        "BRA" => "BR",
        "BRN" => "BN",
        "BTN" => "BT",
        "BWA" => "BW",
        "CAN" => "CA",
        "CHE" => "CH",
        "CHL" => "CL",
        "CHN" => "CN",
        "CIV" => "CI",
        "CMR" => "CM",
        "COD" => "CD",
        "COG" => "CG",
        "COK" => "CK",
        "COL" => "CO",
        "COM" => "KM",
        "CPV" => "CV",
        "CRI" => "CR",
        "CUB" => "CU",
        "CUW" => "CW",
        "CXR" => "CX",
        "CYM" => "KY",
        "CYP" => "CY",
        "CZE" => "CZ",
        "DEU" => "DE",
        "DJI" => "DJ",
        "DMA" => "DM",
        "DNK" => "DK",
        "DOM" => "DO",
        "DZA" => "DZ",
        "ECU" => "EC",
        "EGY" => "EG",
        "ERI" => "ER",
        "ESH" => "EH",
        "ESP" => "ES",
        "EST" => "EE",
        "ETH" => "ET",
        "FIN" => "FI",
        "FJI" => "FJ",
        "FLK" => "FK",
        "FRA" => "FR",
        "FRO" => "FO",
        "FSM" => "FM",
        "GAB" => "GA",
        "GBR" => "GB",
        "GEO" => "GE",
        "GGY" => "GG",
        "GHA" => "GH",
        "GIB" => "GI",
        "GIN" => "GN",
        "GLP" => "GP",
        "GMB" => "GM",
        "GNB" => "GW",
        "GNQ" => "GQ",
        "GRC" => "GR",
        "GRD" => "GD",
        "GRL" => "GL",
        "GTM" => "GT",
        "GUF" => "GF",
        "GUM" => "GU",
        "GUY" => "GY",
        "HKG" => "HK",
        "HMD" => "HM",
        "HND" => "HN",
        "HRV" => "HR",
        "HTI" => "HT",
        "HUN" => "HU",
        "IDN" => "ID",
        "IMN" => "IM",
        "IND" => "IN",
        "IOT" => "IO",
        "IRL" => "IE",
        "IRN" => "IR",
        "IRQ" => "IQ",
        "ISL" => "IS",
        "ITA" => "IT",
        "JEY" => "JE",
        "JAM" => "JM",
        "JOR" => "JO",
        "JPN" => "JP",
        "KAZ" => "KZ",
        "KEN" => "KE",
        "KGZ" => "KG",
        "KHM" => "KH",
        "KIR" => "KI",
        "KNA" => "KN",
        "KOR" => "KR",
        "KWT" => "KW",
        "LAO" => "LA",
        "LBN" => "LB",
        "LBR" => "LR",
        "LBY" => "LY",
        "LCA" => "LC",
        "LIE" => "LI",
        "LKA" => "LK",
        "LSO" => "LS",
        "LTU" => "LT",
        "LUX" => "LU",
        "LVA" => "LV",
        "MAC" => "MO",
        "MAF" => "MF",
        "MAR" => "MA",
        "MCO" => "MC",
        "MDA" => "MD",
        "MDG" => "MG",
        "MDV" => "MV",
        "MEX" => "MX",
        "MHL" => "MH",
        "MKD" => "MK",
        "MLI" => "ML",
        "MLT" => "MT",
        "MMR" => "MM",
        "MNE" => "ME",
        "MNG" => "MN",
        "MNP" => "MP",
        "MOZ" => "MZ",
        "MRT" => "MR",
        "MSR" => "MS",
        "MTQ" => "MQ",
        "MUS" => "MU",
        "MWI" => "MW",
        "MYS" => "MY",
        "MYT" => "YT",
        "NAM" => "NA",
        "NCL" => "NC",
        "NER" => "NE",
        "NFK" => "NF",
        "NGA" => "NG",
        "NIC" => "NI",
        "NIU" => "NU",
        "NLD" => "NL",
        "NOR" => "NO",
        "NPL" => "NP",
        "NRU" => "NR",
        "NZL" => "NZ",
        "OMN" => "OM",
        "PAK" => "PK",
        "PAN" => "PA",
        "PCN" => "PN",
        "PER" => "PE",
        "PHL" => "PH",
        "PLW" => "PW",
        "PNG" => "PG",
        "POL" => "PL",
        "PRI" => "PR",
        "PRK" => "KP",
        "PRT" => "PT",
        "PRY" => "PY",
        "PSE" => "PS",
        "PYF" => "PF",
        "QAT" => "QA",
        "REU" => "RE",
        "ROU" => "RO",
        "RUS" => "RU",
        "RWA" => "RW",
        "SAU" => "SA",
        "SDN" => "SD",
        "SEN" => "SN",
        "SGP" => "SG",
        "SGS" => "GS",
        "SHN" => "SH",
        "SJM" => "SJ",
        "SLB" => "SB",
        "SLE" => "SL",
        "SLV" => "SV",
        "SMR" => "SM",
        "SOM" => "SO",
        "SPM" => "PM",
        "SRB" => "RS",
        "SSD" => "SS",
        "STP" => "ST",
        "SUR" => "SR",
        "SVK" => "SK",
        "SVN" => "SI",
        "SWE" => "SE",
        "SWZ" => "SZ",
        "SXM" => "SX",
        "SYC" => "SC",
        "SYR" => "SY",
        "TCA" => "TC",
        "TCD" => "TD",
        "TGO" => "TG",
        "THA" => "TH",
        "TJK" => "TJ",
        "TKL" => "TK",
        "TKM" => "TM",
        "TLS" => "TL",
        "TON" => "TO",
        "TTO" => "TT",
        "TUN" => "TN",
        "TUR" => "TR",
        "TUV" => "TV",
        "TWN" => "TW",
        "TZA" => "TZ",
        "UGA" => "UG",
        "UKR" => "UA",
        "UMI" => "UM",
        "URY" => "UY",
        "USA" => "US",
        "UZB" => "UZ",
        "VAT" => "VA",
        "VCT" => "VC",
        "VEN" => "VE",
        "VGB" => "VG",
        "VIR" => "VI",
        "VNM" => "VN",
        "VUT" => "VU",
        "WLF" => "WF",
        "WSM" => "WS",
        "YEM" => "YE",
        "ZAF" => "ZA",
        "ZMB" => "ZM",
        "ZWE" => "ZW",
        _ => return None,
    })
}

/// Serializes a multipolygon's outer rings as `MULTIPOLYGON` WKT.
///
/// Interior rings are dropped, matching what the map renders; the canonical
/// boundary with holes intact is the stored `GeoJSON`.
fn multipolygon_wkt(multi_polygon: &MultiPolygon<f64>) -> String {
    let polygons: Vec<String> = multi_polygon
        .0
        .iter()
        .map(|polygon| {
            let points: Vec<String> = polygon
                .exterior()
                .coords()
                .map(|coord| format!("{} {}", coord.x, coord.y))
                .collect();
            format!("(({}))", points.join(", "))
        })
        .collect();

    format!("MULTIPOLYGON({})", polygons.join(","))
}

#[cfg(test)]
mod tests {
    use geo::Centroid as _;

    use super::*;

    #[test]
    fn maps_known_alpha3_codes() {
        assert_eq!(alpha2_for("ESP"), "ES");
        assert_eq!(alpha2_for("FRA"), "FR");
        assert_eq!(alpha2_for("DEU"), "DE");
        assert_eq!(alpha2_for("PRK"), "KP");
    }

    #[test]
    fn unknown_alpha3_falls_back_to_a_prefix() {
        assert_eq!(alpha2_for("XYZ"), "XY");
        assert_eq!(alpha2_for("KOS"), "KO");
    }

    #[test]
    fn wkt_uses_outer_rings_only() {
        let geometry_json = "{\"type\":\"Polygon\",\"coordinates\":[\
            [[0.0,0.0],[4.0,0.0],[4.0,4.0],[0.0,4.0],[0.0,0.0]],\
            [[1.0,1.0],[2.0,1.0],[2.0,2.0],[1.0,2.0],[1.0,1.0]]]}";
        let mp = travel_map_spatial::parse_geojson_to_multipolygon(geometry_json).unwrap();

        assert_eq!(
            multipolygon_wkt(&mp),
            "MULTIPOLYGON(((0 0, 4 0, 4 4, 0 4, 0 0)))"
        );
    }

    #[test]
    fn wkt_joins_multiple_polygons() {
        let geometry_json = "{\"type\":\"MultiPolygon\",\"coordinates\":[\
            [[[0.0,0.0],[1.0,0.0],[1.0,1.0],[0.0,0.0]]],\
            [[[5.0,5.0],[6.0,5.0],[6.0,6.0],[5.0,5.0]]]]}";
        let mp = travel_map_spatial::parse_geojson_to_multipolygon(geometry_json).unwrap();

        assert_eq!(
            multipolygon_wkt(&mp),
            "MULTIPOLYGON(((0 0, 1 0, 1 1, 0 0)),((5 5, 6 5, 6 6, 5 5)))"
        );
    }

    #[test]
    fn centroid_of_a_square_is_its_center() {
        let geometry_json = "{\"type\":\"Polygon\",\"coordinates\":[\
            [[0.0,0.0],[4.0,0.0],[4.0,4.0],[0.0,4.0],[0.0,0.0]]]}";
        let mp = travel_map_spatial::parse_geojson_to_multipolygon(geometry_json).unwrap();
        let center = mp.centroid().unwrap();

        assert!((center.x() - 2.0).abs() < 1e-9);
        assert!((center.y() - 2.0).abs() < 1e-9);
    }
}
