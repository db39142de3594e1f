#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Address geocoding for immo-map.
//!
//! Converts free-text Île-de-France addresses to WGS84 coordinates via the
//! BAN (Base Adresse Nationale) API at `api-adresse.data.gouv.fr`, with a
//! bounded in-process LRU cache in front so repeated lookups for the same
//! address within a process lifetime hit the network only once.
//!
//! Failure policy: callers of [`CachedGeocoder::resolve`] see `None` for
//! both "no such address" and "geocoder unreachable". The ambiguity is
//! deliberate (the HTTP layer maps both to the same 400), and so is the
//! consequence that a transient failure stays memoized as a miss until the
//! entry is evicted or the cache is cleared.

pub mod ban;
pub mod cache;

use immo_map_geo::Coordinate;
use thiserror::Error;

/// A geocoding result with coordinates and the matched address label.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedAddress {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// The matched/canonical address returned by the geocoder.
    pub label: Option<String>,
}

impl GeocodedAddress {
    /// The result's coordinate.
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

/// BAN client with bounded LRU memoization, shared across requests.
pub struct CachedGeocoder {
    client: reqwest::Client,
    base_url: String,
    cache: cache::GeocodeCache,
}

impl CachedGeocoder {
    /// Creates a geocoder against `base_url` with the given cache
    /// capacity.
    #[must_use]
    pub fn new(base_url: String, cache_capacity: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            cache: cache::GeocodeCache::new(cache_capacity),
        }
    }

    /// Resolves an address to a coordinate, or `None` when it cannot be
    /// resolved.
    ///
    /// Network and malformed-response failures are logged and degraded to
    /// `None`; the negative result is cached like any other.
    pub async fn resolve(&self, address: &str) -> Option<Coordinate> {
        if let Some(cached) = self.cache.get(address) {
            log::debug!("Geocode cache hit for {address:?}");
            return cached;
        }

        let resolved = match ban::geocode(&self.client, &self.base_url, address).await {
            Ok(result) => result.map(|r| r.coordinate()),
            Err(e) => {
                log::error!("Geocoding failed for {address:?}: {e}");
                None
            }
        };

        self.cache.insert(address.to_string(), resolved);
        resolved
    }

    /// Evicts every cached entry.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Number of cached entries.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}
