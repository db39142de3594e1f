#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the immo-map server.
//!
//! These types are serialized to JSON for the REST API. Field names match
//! the service's historical French contract (`biens_proches`, `nb_biens`,
//! `rayon_m`, ...) and are kept separate from the database row types so
//! the API can evolve independently.

use immo_map_database_models::NearbyProperty;
use immo_map_property_models::PropertyType;
use immo_map_stats::LookupSummary;
use serde::{Deserialize, Serialize};

/// A property sale as returned by the lookup endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiProperty {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Price per square meter in euros.
    pub prix_m2: Option<f64>,
    /// Residential property type.
    pub type_local: PropertyType,
    /// Mutation date (`YYYY-MM-DD`).
    pub date_mutation: String,
    /// Built area in square meters.
    pub surface_reelle_bati: Option<f64>,
    /// DVF mutation identifier.
    pub id_mutation: String,
    /// Number of main rooms.
    pub nombre_pieces_principales: Option<f64>,
    /// Distance from the query address in meters.
    pub distance_m: f64,
}

impl From<NearbyProperty> for ApiProperty {
    fn from(property: NearbyProperty) -> Self {
        Self {
            latitude: property.row.latitude,
            longitude: property.row.longitude,
            prix_m2: property.row.prix_m2,
            type_local: property.row.type_local,
            date_mutation: property.row.date_mutation,
            surface_reelle_bati: property.row.surface_reelle_bati,
            id_mutation: property.row.id_mutation,
            nombre_pieces_principales: property.row.nombre_pieces_principales,
            distance_m: property.distance_m,
        }
    }
}

/// The `stats` block of the lookup response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiStats {
    /// Total number of returned records.
    pub nb_biens: u64,
    /// Mean price per m² over priced records.
    pub prix_moyen: Option<f64>,
    /// Mean built area over area-bearing records.
    pub surface_moyenne: Option<f64>,
    /// Distance of the farthest returned record in meters.
    pub distance_max: Option<f64>,
    /// Whether the result set was cut off at the server-side cap; when
    /// `true` the true match count may be higher.
    pub tronque: bool,
    /// Server-side elapsed time in seconds.
    pub temps_execution: f64,
}

impl ApiStats {
    /// Builds the stats block from the aggregation summary plus
    /// request-level metadata.
    #[must_use]
    pub fn from_summary(summary: &LookupSummary, tronque: bool, temps_execution: f64) -> Self {
        Self {
            nb_biens: summary.nb_biens,
            prix_moyen: summary.prix_moyen,
            surface_moyenne: summary.surface_moyenne,
            distance_max: summary.distance_max,
            tronque,
            temps_execution,
        }
    }
}

/// Response of `GET /biens_proches`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyResponse {
    /// Matching sales, ascending by distance.
    pub biens_proches: Vec<ApiProperty>,
    /// Summary statistics.
    pub stats: ApiStats,
    /// Market narrative, the fixed fallback, or the still-processing
    /// placeholder.
    pub analyse: String,
}

/// Query parameters for `GET /biens_proches`.
#[derive(Debug, Clone, Deserialize)]
pub struct NearbyQueryParams {
    /// Free-text address in Île-de-France.
    pub adresse: String,
    /// Search radius in meters (default 500).
    pub rayon_m: Option<u32>,
}

/// Query parameters for `GET /analyse_stream`.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamQueryParams {
    /// Free-text address in Île-de-France.
    pub adresse: String,
    /// Search radius in meters (default 500).
    pub rayon_m: Option<u32>,
}

/// Error body shared by all endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Human-readable description.
    pub detail: String,
}

/// Response of `POST /clear_cache`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearCacheResponse {
    /// Confirmation message.
    pub message: String,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}
