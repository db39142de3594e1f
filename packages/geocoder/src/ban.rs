//! BAN (Base Adresse Nationale) geocoder client.
//!
//! The public instance at <https://api-adresse.data.gouv.fr/search/>
//! answers free-form queries with a GeoJSON `FeatureCollection`; features
//! carry `[longitude, latitude]` coordinate pairs.

use crate::{GeocodeError, GeocodedAddress};

/// Default base URL for the public BAN instance.
pub const DEFAULT_BASE_URL: &str = "https://api-adresse.data.gouv.fr/search/";

/// Geocodes a free-form address query, returning the best match.
///
/// Only the first feature is requested (`limit=1`); an empty feature list
/// means the address could not be resolved and yields `Ok(None)`.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the HTTP request or response parsing fails.
pub async fn geocode(
    client: &reqwest::Client,
    base_url: &str,
    query: &str,
) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let resp = client
        .get(base_url)
        .query(&[("q", query), ("limit", "1")])
        .send()
        .await?;

    let body: serde_json::Value = resp.json().await?;
    parse_response(&body)
}

/// Parses a BAN GeoJSON `FeatureCollection` response.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let features = body["features"]
        .as_array()
        .ok_or_else(|| GeocodeError::Parse {
            message: "BAN response has no features array".to_string(),
        })?;

    let Some(first) = features.first() else {
        return Ok(None);
    };

    let coordinates = first["geometry"]["coordinates"]
        .as_array()
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing geometry.coordinates in BAN feature".to_string(),
        })?;

    // GeoJSON order: [longitude, latitude].
    let longitude = coordinates
        .first()
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing longitude in BAN feature".to_string(),
        })?;

    let latitude = coordinates
        .get(1)
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing latitude in BAN feature".to_string(),
        })?;

    let label = first["properties"]["label"].as_str().map(String::from);

    Ok(Some(GeocodedAddress {
        latitude,
        longitude,
        label,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ban_result() {
        let body = serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [2.3632, 48.8673]
                },
                "properties": {
                    "label": "1 Place de la République 75003 Paris",
                    "score": 0.97
                }
            }]
        });
        let result = parse_response(&body).unwrap().unwrap();
        assert!((result.latitude - 48.8673).abs() < 1e-4);
        assert!((result.longitude - 2.3632).abs() < 1e-4);
        assert_eq!(
            result.label.as_deref(),
            Some("1 Place de la République 75003 Paris")
        );
    }

    #[test]
    fn parses_empty_feature_collection() {
        let body = serde_json::json!({
            "type": "FeatureCollection",
            "features": []
        });
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn rejects_malformed_response() {
        let body = serde_json::json!({ "message": "internal error" });
        assert!(parse_response(&body).is_err());
    }

    #[test]
    fn rejects_feature_without_coordinates() {
        let body = serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": { "type": "Point" },
                "properties": {}
            }]
        });
        assert!(parse_response(&body).is_err());
    }
}
