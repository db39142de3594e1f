//! HTTP handler functions for the immo-map API.

use std::time::Instant;

use actix_web::{HttpResponse, web};
use immo_map_ai::NarrativeEvent;
use immo_map_ai::generate::{self, FALLBACK_MESSAGE};
use immo_map_database::queries;
use immo_map_database_models::NearbyQuery;
use immo_map_geo::Coordinate;
use immo_map_server_models::{
    ApiErrorBody, ApiHealth, ApiProperty, ApiStats, ClearCacheResponse, NearbyQueryParams,
    NearbyResponse, StreamQueryParams,
};
use immo_map_stats::{compute_lookup_summary, compute_market_stats};
use tokio::sync::mpsc;

use crate::AppState;

/// Radius applied when the query omits `rayon_m`.
const DEFAULT_RADIUS_M: u32 = 500;

/// Smallest accepted radius.
const MIN_RADIUS_M: u32 = 100;

/// Largest radius for the lookup endpoint.
const MAX_LOOKUP_RADIUS_M: u32 = 10_000;

/// Largest radius for the streaming endpoint; narratives over huge result
/// sets are not useful and hold the connection open for too long.
const MAX_STREAM_RADIUS_M: u32 = 1_000;

/// Placeholder returned when the narrative misses the lookup timeout.
const NARRATIVE_PENDING: &str = "Analyse en cours...";

/// Error frame content when the stream query matches nothing.
const NO_PROPERTIES_MESSAGE: &str = "Aucun bien trouvé";

/// `GET /health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /biens_proches`
///
/// Geocodes the address, searches sales within the radius, aggregates
/// statistics, and joins the narrative under a bounded timeout.
pub async fn biens_proches(
    state: web::Data<AppState>,
    params: web::Query<NearbyQueryParams>,
) -> HttpResponse {
    let started = Instant::now();

    let rayon_m = match validate_radius(params.rayon_m, MAX_LOOKUP_RADIUS_M) {
        Ok(r) => r,
        Err(detail) => return HttpResponse::BadRequest().json(ApiErrorBody { detail }),
    };

    let Some(center) = resolve_address(&state, &params.adresse).await else {
        return address_not_found(&params.adresse);
    };

    let result = match search_nearby(&state, center, rayon_m).await {
        Ok(result) => result,
        Err(response) => return *response,
    };

    // Fire the narrative worker first so it overlaps the synchronous
    // aggregation; the prompt only needs the per-type statistics.
    let market_stats = compute_market_stats(&result.properties);
    let task_state = state.clone();
    let mut narrative = tokio::spawn(async move {
        generate::analyse_market(task_state.provider.as_ref(), &market_stats, rayon_m).await
    });

    let summary = compute_lookup_summary(&result.properties);

    let analyse = match tokio::time::timeout(state.narrative_timeout, &mut narrative).await {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            log::error!("Narrative worker failed for {:?}: {e}", params.adresse);
            FALLBACK_MESSAGE.to_string()
        }
        Err(_) => {
            // The response cannot wait any longer; cancel the in-flight
            // completion call instead of leaking it.
            narrative.abort();
            log::warn!(
                "Narrative timed out after {:?} for {:?} (rayon_m={rayon_m})",
                state.narrative_timeout,
                params.adresse
            );
            NARRATIVE_PENDING.to_string()
        }
    };

    let elapsed = round_seconds(started.elapsed().as_secs_f64());
    log::info!(
        "Lookup for {:?} (rayon_m={rayon_m}): {} biens in {elapsed}s",
        params.adresse,
        result.properties.len()
    );

    HttpResponse::Ok().json(NearbyResponse {
        stats: ApiStats::from_summary(&summary, result.truncated, elapsed),
        biens_proches: result
            .properties
            .into_iter()
            .map(ApiProperty::from)
            .collect(),
        analyse,
    })
}

/// `GET /analyse_stream`
///
/// Same lookup as `biens_proches`, then an event stream of typed
/// narrative frames. The stream always terminates with an `end` or
/// `error` frame.
pub async fn analyse_stream(
    state: web::Data<AppState>,
    params: web::Query<StreamQueryParams>,
) -> HttpResponse {
    let rayon_m = match validate_radius(params.rayon_m, MAX_STREAM_RADIUS_M) {
        Ok(r) => r,
        Err(detail) => return HttpResponse::BadRequest().json(ApiErrorBody { detail }),
    };

    let Some(center) = resolve_address(&state, &params.adresse).await else {
        return address_not_found(&params.adresse);
    };

    let result = match search_nearby(&state, center, rayon_m).await {
        Ok(result) => result,
        Err(response) => return *response,
    };

    if result.properties.is_empty() {
        let frame = sse_frame(&NarrativeEvent::Error {
            content: NO_PROPERTIES_MESSAGE.to_string(),
        });
        return event_stream_response().body(frame);
    }

    let market_stats = compute_market_stats(&result.properties);
    let (tx, mut rx) = mpsc::channel::<NarrativeEvent>(32);

    let task_state = state.clone();
    tokio::spawn(async move {
        generate::analyse_market_stream(
            task_state.provider.as_ref(),
            &market_stats,
            rayon_m,
            tx,
        )
        .await;
    });

    // If the client disconnects, dropping this stream drops `rx`; the
    // worker's next send fails and the provider stops pulling from the
    // network.
    let frames = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let terminal = matches!(
                event,
                NarrativeEvent::End { .. } | NarrativeEvent::Error { .. }
            );
            yield Ok::<_, actix_web::Error>(web::Bytes::from(sse_frame(&event)));
            if terminal {
                break;
            }
        }
    };

    event_stream_response().streaming(frames)
}

/// `POST /clear_cache`
///
/// Evicts every geocoding cache entry so the next lookup for any address
/// hits the geocoder again.
pub async fn clear_cache(state: web::Data<AppState>) -> HttpResponse {
    state.geocoder.clear_cache();
    log::info!("Geocode cache cleared");

    HttpResponse::Ok().json(ClearCacheResponse {
        message: "Cache nettoyé avec succès".to_string(),
    })
}

/// Validates the radius, applying the default when absent.
fn validate_radius(rayon_m: Option<u32>, max: u32) -> Result<u32, String> {
    let rayon_m = rayon_m.unwrap_or(DEFAULT_RADIUS_M);
    if (MIN_RADIUS_M..=max).contains(&rayon_m) {
        Ok(rayon_m)
    } else {
        Err(format!(
            "rayon_m doit être compris entre {MIN_RADIUS_M} et {max}"
        ))
    }
}

/// Geocodes with the shared cache, logging the outcome.
async fn resolve_address(state: &web::Data<AppState>, adresse: &str) -> Option<Coordinate> {
    let center = state.geocoder.resolve(adresse).await;
    match center {
        Some(c) => log::info!(
            "Géocodage: {adresse:?} -> ({}, {})",
            c.latitude,
            c.longitude
        ),
        None => log::warn!("Géocodage sans résultat pour {adresse:?}"),
    }
    center
}

fn address_not_found(adresse: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiErrorBody {
        detail: format!("Impossible de géocoder l'adresse: {adresse}"),
    })
}

/// Runs the nearby search on a pooled connection, shaping storage
/// failures into a 500.
async fn search_nearby(
    state: &web::Data<AppState>,
    center: Coordinate,
    rayon_m: u32,
) -> Result<immo_map_database_models::NearbyResult, Box<HttpResponse>> {
    let query = NearbyQuery::new(center, f64::from(rayon_m));

    let conn = match state.pool.acquire().await {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to acquire database connection: {e}");
            return Err(Box::new(internal_error()));
        }
    };

    match queries::nearby_properties(conn.database(), &query).await {
        Ok(result) => Ok(result),
        Err(e) => {
            log::error!("Nearby search failed (rayon_m={rayon_m}): {e}");
            Err(Box::new(internal_error()))
        }
    }
}

fn internal_error() -> HttpResponse {
    HttpResponse::InternalServerError().json(ApiErrorBody {
        detail: "Erreur interne du serveur".to_string(),
    })
}

fn event_stream_response() -> actix_web::HttpResponseBuilder {
    let mut builder = HttpResponse::Ok();
    builder
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"));
    builder
}

/// Formats one narrative event as an SSE `data:` frame.
fn sse_frame(event: &NarrativeEvent) -> String {
    serde_json::to_string(event).map_or_else(
        |e| {
            log::error!("Failed to serialize narrative event: {e}");
            String::new()
        },
        |json| format!("data: {json}\n\n"),
    )
}

fn round_seconds(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_defaults_when_absent() {
        assert_eq!(validate_radius(None, MAX_LOOKUP_RADIUS_M), Ok(500));
    }

    #[test]
    fn radius_bounds_are_inclusive() {
        assert_eq!(validate_radius(Some(100), MAX_LOOKUP_RADIUS_M), Ok(100));
        assert_eq!(
            validate_radius(Some(10_000), MAX_LOOKUP_RADIUS_M),
            Ok(10_000)
        );
    }

    #[test]
    fn out_of_range_radius_is_rejected() {
        assert!(validate_radius(Some(99), MAX_LOOKUP_RADIUS_M).is_err());
        assert!(validate_radius(Some(10_001), MAX_LOOKUP_RADIUS_M).is_err());
        assert!(validate_radius(Some(1_001), MAX_STREAM_RADIUS_M).is_err());
    }

    #[test]
    fn sse_frames_are_newline_terminated_data_lines() {
        let frame = sse_frame(&NarrativeEvent::Start {
            content: "Reflexion...".to_string(),
        });
        assert_eq!(frame, "data: {\"type\":\"start\",\"content\":\"Reflexion...\"}\n\n");
    }

    #[test]
    fn elapsed_time_rounds_to_centiseconds() {
        assert!((round_seconds(1.23456) - 1.23).abs() < f64::EPSILON);
    }
}
