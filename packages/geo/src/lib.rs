#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Country catalog, per-user status tracking, and spatial queries.
//!
//! This is the geographic core of the travel map: the country reference
//! catalog and its import job, the per-user country status tracker, the
//! spatial predicate engine (native `PostGIS` or an in-memory fallback,
//! selected once at startup), and the query service that composes them into
//! map-ready `GeoJSON` and per-user statistics.

pub mod catalog;
pub mod ingest;
pub mod predicates;
pub mod service;
pub mod status;

use thiserror::Error;

/// Errors that can occur during geo operations.
#[derive(Debug, Error)]
pub enum GeoError {
    /// A country code did not resolve to a catalog entry.
    #[error("Country not found")]
    CountryNotFound,

    /// A location id did not resolve to one of the user's locations.
    #[error("Location not found")]
    LocationNotFound,

    /// Malformed or out-of-range caller input.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of what was wrong with the input.
        message: String,
    },

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Migration or connection-level database failure.
    #[error("Database error: {0}")]
    Db(#[from] travel_map_database::DbError),

    /// HTTP request failed (boundary dataset download).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

impl GeoError {
    /// Convenience constructor for [`GeoError::InvalidInput`].
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}
