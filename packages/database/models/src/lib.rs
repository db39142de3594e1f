#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database row types and query parameter definitions.
//!
//! These types represent the shapes of data as stored in and retrieved
//! from the `valeurs_foncieres_idf_2024` Postgres table. They are distinct
//! from the API response types in `immo_map_server_models` and the raw CSV
//! shapes in `immo_map_ingest`.

use immo_map_geo::Coordinate;
use immo_map_property_models::PropertyType;
use serde::{Deserialize, Serialize};

/// Parameters for the nearby-property search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyQuery {
    /// Center of the search circle.
    pub center: Coordinate,
    /// Search radius in meters.
    pub radius_m: f64,
    /// Maximum number of records to return.
    pub limit: usize,
}

impl NearbyQuery {
    /// Default result cap, matching the documented truncation policy.
    pub const DEFAULT_LIMIT: usize = 1000;

    /// Creates a query with the default result cap.
    #[must_use]
    pub const fn new(center: Coordinate, radius_m: f64) -> Self {
        Self {
            center,
            radius_m,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// One historical sale row as stored in the transactions table.
///
/// A single mutation (`id_mutation`) may cover several property rows when
/// a sale includes multiple units; rows are not deduplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRow {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Price per square meter in euros, when derivable for the mutation.
    pub prix_m2: Option<f64>,
    /// Residential property type.
    pub type_local: PropertyType,
    /// Mutation date, ISO 8601 (`YYYY-MM-DD`).
    pub date_mutation: String,
    /// Built area in square meters.
    pub surface_reelle_bati: Option<f64>,
    /// DVF mutation identifier (e.g. `"2024-123456"`).
    pub id_mutation: String,
    /// Number of main rooms.
    pub nombre_pieces_principales: Option<f64>,
}

impl PropertyRow {
    /// The row's coordinate.
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// A row produced by the ingestion pipeline, ready for insertion.
///
/// Carries the locating columns (`code_postal`, `departement`) that the
/// lookup path never reads back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPropertyRow {
    /// DVF mutation identifier.
    pub id_mutation: String,
    /// Mutation date, ISO 8601 (`YYYY-MM-DD`).
    pub date_mutation: String,
    /// Residential property type.
    pub type_local: PropertyType,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Derived price per square meter in euros.
    pub prix_m2: Option<f64>,
    /// Built area in square meters.
    pub surface_reelle_bati: Option<f64>,
    /// Number of main rooms.
    pub nombre_pieces_principales: Option<f64>,
    /// Postal code.
    pub code_postal: Option<String>,
    /// Department code (e.g. `"75"`).
    pub departement: String,
}

/// A property row paired with its great-circle distance from the query
/// center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyProperty {
    /// The underlying sale row.
    #[serde(flatten)]
    pub row: PropertyRow,
    /// Distance from the query center in meters.
    pub distance_m: f64,
}

/// Result of a nearby-property search.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyResult {
    /// Matching rows, ascending by distance.
    pub properties: Vec<NearbyProperty>,
    /// Whether the result was cut off at the query limit. When `true` the
    /// true match count may exceed `properties.len()`.
    pub truncated: bool,
}
