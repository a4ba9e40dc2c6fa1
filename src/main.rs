/// Geospatial itinerary engine service
mod clients;
mod config;
mod domain;
mod errors;
mod geo;
mod handlers;
mod routes;
mod services;
mod utils;

use crate::clients::NominatimClient;
use crate::config::AppConfig;
use crate::handlers::AppState;
use crate::routes::build_router;
use crate::services::animator::{FlightAnimator, TokioClock};
use crate::services::geocoder::{CityDirectory, Geocoder};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Load configuration
    let config = AppConfig::from_env()?;
    info!("Configuration loaded successfully");

    // Initialize geocoder
    let directory = CityDirectory::builtin();
    info!("City table holds {} names", directory.len());
    let client = if config.geocoder.enabled {
        info!("Network geocoding via {}", config.geocoder.nominatim_url);
        Some(NominatimClient::new(config.geocoder.nominatim_url.clone())?)
    } else {
        None
    };
    let geocoder = Arc::new(Geocoder::new(directory, client));

    // Initialize animator
    let animator = FlightAnimator::new(
        Arc::new(TokioClock::default()),
        config.playback.animator_settings(),
    );

    let shutdown_animator = animator.clone();

    // Initialize application state
    let bind_addr = config.bind_addr.clone();
    let state = AppState {
        animator,
        geocoder,
        config: Arc::new(config),
    };

    // Build router
    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("voyage_atlas service listening on {}", bind_addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down, stopping flight animations");
            shutdown_animator.stop();
        })
        .await?;

    Ok(())
}
