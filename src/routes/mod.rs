/// Application routes configuration
use crate::handlers::{
    create_itinerary, geocode_city, get_continent, get_distance, get_solar, get_stats,
    get_timeline, health, plan_trip_playback, preview_flight, replay_flight, suggest_visits,
    AppState,
};
use axum::{
    routing::{get, post},
    Router,
};

/// Build the application router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Trip building and journal views
        .route("/itinerary", post(create_itinerary))
        .route("/timeline", post(get_timeline))
        .route("/stats", post(get_stats))
        // Geometry
        .route("/continent", get(get_continent))
        .route("/solar", get(get_solar))
        .route("/distance", get(get_distance))
        .route("/geocode/:city", get(geocode_city))
        // Flight animation and playback
        .route("/flight/replay", post(replay_flight))
        .route("/flight/preview", post(preview_flight))
        .route("/playback", post(plan_trip_playback))
        // Photo grouping
        .route("/media/clusters", post(suggest_visits))
        .with_state(state)
}
