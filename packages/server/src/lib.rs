#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the immo-map application.
//!
//! Serves the property lookup API: geocodes the query address (with a
//! bounded in-process cache), searches the DVF transactions table for
//! nearby sales, aggregates per-type statistics, and attaches an
//! LLM-generated market narrative, either joined into the lookup
//! response under a bounded timeout or delivered incrementally over an
//! event stream from the `/analyse_stream` endpoint.

mod handlers;

use std::time::Duration;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use immo_map_ai::providers::{CompletionProvider, create_provider_from_env};
use immo_map_database::pool::{DEFAULT_POOL_SIZE, DEFAULT_RECYCLE_AFTER, DbPool};
use immo_map_database::run_migrations;
use immo_map_geocoder::{CachedGeocoder, ban, cache};

/// Shared application state, explicitly constructed in [`run_server`] and
/// handed to every worker through `web::Data`; none of it is a process
/// global.
pub struct AppState {
    /// Bounded pool of Postgres connections.
    pub pool: DbPool,
    /// BAN geocoder with LRU memoization.
    pub geocoder: CachedGeocoder,
    /// Market narrative completion provider.
    pub provider: Box<dyn CompletionProvider>,
    /// How long the lookup endpoint waits for the narrative before
    /// answering with the still-processing placeholder.
    pub narrative_timeout: Duration,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Starts the immo-map API server.
///
/// Opens the connection pool, runs migrations, builds the geocoder and
/// completion provider, and starts the Actix-Web HTTP server. This is a
/// regular async function; the caller provides the async runtime (e.g.
/// via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
///
/// # Panics
///
/// Panics if the database pool cannot be opened, migrations fail, or the
/// completion provider is not configured.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    log::info!("Opening database pool...");
    let pool_size = env_or("POOL_SIZE", DEFAULT_POOL_SIZE);
    let recycle_secs = env_or("POOL_RECYCLE_SECS", DEFAULT_RECYCLE_AFTER.as_secs());
    let pool = DbPool::connect_from_env(pool_size, Duration::from_secs(recycle_secs))
        .await
        .expect("Failed to open database pool");

    log::info!("Running migrations...");
    {
        let conn = pool
            .acquire()
            .await
            .expect("Failed to acquire connection for migrations");
        run_migrations(conn.database())
            .await
            .expect("Failed to run migrations");
    }

    let ban_url =
        std::env::var("BAN_API_URL").unwrap_or_else(|_| ban::DEFAULT_BASE_URL.to_string());
    let cache_size = env_or("GEOCODE_CACHE_SIZE", cache::DEFAULT_CAPACITY);
    let geocoder = CachedGeocoder::new(ban_url, cache_size);

    let provider = create_provider_from_env().expect("Failed to configure completion provider");

    let narrative_timeout = Duration::from_secs(env_or("NARRATIVE_TIMEOUT_SECS", 20));

    let state = web::Data::new(AppState {
        pool,
        geocoder,
        provider,
        narrative_timeout,
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = env_or("PORT", 8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .route("/health", web::get().to(handlers::health))
            .route("/biens_proches", web::get().to(handlers::biens_proches))
            .route("/analyse_stream", web::get().to(handlers::analyse_stream))
            .route("/clear_cache", web::post().to(handlers::clear_cache))
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
