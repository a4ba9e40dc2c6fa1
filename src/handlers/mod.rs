/// HTTP request handlers
use crate::config::AppConfig;
use crate::domain::{
    AnimationSample, CanonicalTrip, Health, Leg, PhotoInfo, SolarSample, TimelineSegment,
    TripDraft, TripStats, VisitSuggestion,
};
use crate::errors::ApiError;
use crate::geo::{classify_continent, Continent, GeoPoint};
use crate::services::animator::{sample_path, FlightAnimator};
use crate::services::clustering::cluster_photos;
use crate::services::geocoder::Geocoder;
use crate::services::itinerary::build_itinerary;
use crate::services::playback::{plan_playback, PlaybackPlan};
use crate::services::solar::subsolar_point;
use crate::services::stats::trip_stats;
use crate::services::timeline::compute_segments;
use crate::utils::parse_instant;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, trace};

/// Upper bound on preview frames per request
const MAX_PREVIEW_STEPS: usize = 1000;
/// Frames buffered between the animation task and a replay request
const REPLAY_BUFFER: usize = 256;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub animator: FlightAnimator,
    pub geocoder: Arc<Geocoder>,
    pub config: Arc<AppConfig>,
}

/// Successful response wrapper
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub ok: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self { ok: true, data }
    }
}

type ApiJson<T> = Result<Json<SuccessResponse<T>>, ApiError>;

fn ok<T: Serialize>(data: T) -> ApiJson<T> {
    Ok(Json(SuccessResponse::new(data)))
}

/// Legs as handed over by the storage layer, put into playback order
#[derive(Deserialize)]
pub struct LegsRequest {
    pub legs: Vec<Leg>,
}

impl LegsRequest {
    fn ordered(mut self) -> Vec<Leg> {
        self.legs.sort_by_key(|l| l.start_timestamp);
        self.legs
    }
}

#[derive(Deserialize)]
pub struct FlightRequest {
    pub leg: Leg,
    pub speed: Option<f64>,
    pub steps: Option<usize>,
}

#[derive(Deserialize)]
pub struct PlaybackRequest {
    pub legs: Vec<Leg>,
    pub speed: Option<f64>,
    #[serde(default)]
    pub from_index: usize,
}

#[derive(Deserialize)]
pub struct ClusterRequest {
    pub photos: Vec<PhotoInfo>,
}

#[derive(Serialize)]
pub struct ItineraryPayload {
    pub trip: CanonicalTrip,
}

#[derive(Serialize)]
pub struct TimelinePayload {
    pub segments: Vec<TimelineSegment>,
}

#[derive(Serialize)]
pub struct StatsPayload {
    pub stats: Option<TripStats>,
}

#[derive(Serialize)]
pub struct ContinentPayload {
    pub lat: f64,
    pub lng: f64,
    pub continent: Continent,
}

#[derive(Serialize)]
pub struct SolarPayload {
    pub at: chrono::DateTime<Utc>,
    pub subsolar: SolarSample,
}

#[derive(Serialize)]
pub struct ReplayFrame {
    #[serde(flatten)]
    pub sample: AnimationSample,
    pub sun: SolarSample,
}

#[derive(Serialize)]
pub struct ReplayPayload {
    pub token: u64,
    pub arrived: bool,
    pub frames: Vec<ReplayFrame>,
}

#[derive(Serialize)]
pub struct PreviewPayload {
    pub frames: Vec<AnimationSample>,
}

#[derive(Serialize)]
pub struct PlaybackPayload {
    pub plan: PlaybackPlan,
}

#[derive(Serialize)]
pub struct DistancePayload {
    pub from: String,
    pub to: String,
    /// `None` when either city is unknown
    pub distance_km: Option<f64>,
}

#[derive(Serialize)]
pub struct GeocodePayload {
    pub city: String,
    pub location: Option<GeoPoint>,
}

#[derive(Serialize)]
pub struct ClusterPayload {
    pub suggestions: Vec<VisitSuggestion>,
}

fn query_f64(params: &HashMap<String, String>, key: &str) -> Result<f64, ApiError> {
    let raw = params
        .get(key)
        .ok_or_else(|| ApiError::InvalidInput(format!("missing query parameter {}", key)))?;
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ApiError::InvalidInput(format!("{} must be a number, got {:?}", key, raw))),
    }
}

fn query_str<'a>(params: &'a HashMap<String, String>, key: &str) -> Result<&'a str, ApiError> {
    params
        .get(key)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::InvalidInput(format!("missing query parameter {}", key)))
}

/// Health check handler
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        now: Utc::now(),
    })
}

/// Validate and canonicalize a trip draft
pub async fn create_itinerary(Json(draft): Json<TripDraft>) -> ApiJson<ItineraryPayload> {
    let trip = build_itinerary(&draft)?;
    info!("Built itinerary {:?} with {} legs", trip.title, trip.legs.len());
    ok(ItineraryPayload { trip })
}

/// Transit/stay journal for a trip
pub async fn get_timeline(Json(req): Json<LegsRequest>) -> ApiJson<TimelinePayload> {
    let segments = compute_segments(&req.ordered());
    ok(TimelinePayload { segments })
}

/// Distance, duration and continent statistics for a trip
pub async fn get_stats(Json(req): Json<LegsRequest>) -> ApiJson<StatsPayload> {
    let stats = trip_stats(&req.ordered());
    ok(StatsPayload { stats })
}

/// Classify a single coordinate
pub async fn get_continent(
    Query(params): Query<HashMap<String, String>>,
) -> ApiJson<ContinentPayload> {
    let lat = query_f64(&params, "lat")?;
    let lng = query_f64(&params, "lng")?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(ApiError::InvalidInput(format!(
            "coordinate out of range: {}, {}",
            lat, lng
        )));
    }
    ok(ContinentPayload {
        lat,
        lng,
        continent: classify_continent(lat, lng),
    })
}

/// Subsolar point for `at` (defaults to now)
pub async fn get_solar(Query(params): Query<HashMap<String, String>>) -> ApiJson<SolarPayload> {
    let at = match params.get("at") {
        Some(raw) => parse_instant(raw)
            .ok_or_else(|| ApiError::InvalidInput(format!("unrecognised instant {:?}", raw)))?,
        None => Utc::now(),
    };
    ok(SolarPayload {
        at,
        subsolar: subsolar_point(at),
    })
}

/// Check a replay speed and make sure the run fits within `max_wall`
fn replay_speed(speed: Option<f64>, nominal: Duration, max_wall: Duration) -> Result<f64, ApiError> {
    let speed = speed.unwrap_or(1.0);
    if !speed.is_finite() || speed <= 0.0 {
        return Err(ApiError::InvalidInput(
            "replay speed must be a positive number".to_string(),
        ));
    }
    let wall_secs = nominal.as_secs_f64() / speed;
    if !wall_secs.is_finite() || wall_secs > max_wall.as_secs_f64() {
        return Err(ApiError::InvalidInput(format!(
            "replay at {}x would run {:.0}s, limit is {}s",
            speed,
            wall_secs,
            max_wall.as_secs()
        )));
    }
    Ok(speed)
}

/// Animate one leg in real time and return every emitted frame.
///
/// Only one replay runs at a time: starting another cancels this one, which
/// then returns the frames it had so far with `arrived = false`. A client
/// that goes away drops the handle, which cancels the run.
pub async fn replay_flight(
    State(state): State<AppState>,
    Json(req): Json<FlightRequest>,
) -> ApiJson<ReplayPayload> {
    let speed = replay_speed(
        req.speed,
        state.animator.settings().nominal_duration,
        Duration::from_secs(state.config.playback.replay_max_secs),
    )?;

    let (frame_tx, mut frame_rx) = mpsc::channel(REPLAY_BUFFER);
    let (done_tx, mut done_rx) = tokio::sync::oneshot::channel();
    let mut handle = state.animator.start_flight_animation(
        req.leg,
        speed,
        move |sample, sun| {
            if frame_tx.try_send(ReplayFrame { sample, sun }).is_err() {
                trace!("Replay buffer full, skipping frame");
            }
        },
        move || {
            let _ = done_tx.send(());
        },
    );

    let mut frames = Vec::new();
    while let Some(frame) = frame_rx.recv().await {
        frames.push(frame);
    }
    handle.finished().await;
    let arrived = done_rx.try_recv().is_ok();

    info!(
        "Replay {} finished with {} frames (arrived: {})",
        handle.token(),
        frames.len(),
        arrived
    );
    ok(ReplayPayload {
        token: handle.token(),
        arrived,
        frames,
    })
}

/// Evenly spaced frames along a leg, without waiting for real time
pub async fn preview_flight(
    State(state): State<AppState>,
    Json(req): Json<FlightRequest>,
) -> ApiJson<PreviewPayload> {
    let steps = req.steps.unwrap_or(50).clamp(1, MAX_PREVIEW_STEPS);
    let frames = sample_path(&req.leg, steps, state.animator.settings());
    ok(PreviewPayload { frames })
}

/// Whole-trip playback sequence and its ending
pub async fn plan_trip_playback(
    State(state): State<AppState>,
    Json(req): Json<PlaybackRequest>,
) -> ApiJson<PlaybackPayload> {
    let mut legs = req.legs;
    legs.sort_by_key(|l| l.start_timestamp);
    let plan = plan_playback(
        legs,
        req.from_index,
        req.speed.unwrap_or(1.0),
        state.animator.settings().nominal_duration,
    );
    ok(PlaybackPayload { plan })
}

/// Distance preview between two city names
pub async fn get_distance(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiJson<DistancePayload> {
    let from = query_str(&params, "from")?;
    let to = query_str(&params, "to")?;
    let distance_km = state.geocoder.distance_km(from, to).await;
    ok(DistancePayload {
        from: from.to_string(),
        to: to.to_string(),
        distance_km,
    })
}

/// Resolve a city name to coordinates
pub async fn geocode_city(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> ApiJson<GeocodePayload> {
    match state.geocoder.resolve(&city).await {
        Some(location) => ok(GeocodePayload {
            city,
            location: Some(location),
        }),
        None => Err(ApiError::NotFound(format!("Could not resolve city: {}", city))),
    }
}

/// Group photo metadata into suggested visits
pub async fn suggest_visits(
    State(state): State<AppState>,
    Json(req): Json<ClusterRequest>,
) -> ApiJson<ClusterPayload> {
    let suggestions = cluster_photos(&req.photos, state.config.clustering.thresholds());
    info!(
        "Grouped {} photos into {} suggestions",
        req.photos.len(),
        suggestions.len()
    );
    ok(ClusterPayload { suggestions })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_f64() {
        let mut params = HashMap::new();
        params.insert("lat".to_string(), " 37.5 ".to_string());
        params.insert("lng".to_string(), "east".to_string());
        assert_eq!(query_f64(&params, "lat").unwrap(), 37.5);
        assert!(matches!(query_f64(&params, "lng"), Err(ApiError::InvalidInput(_))));
        assert!(matches!(query_f64(&params, "alt"), Err(ApiError::InvalidInput(_))));
    }

    #[test]
    fn test_legs_request_orders_by_start() {
        let json = serde_json::json!({
            "legs": [
                {"from_name": "Tokyo", "from_lat": 35.6762, "from_lng": 139.6503,
                 "to_name": "Osaka", "to_lat": 34.6937, "to_lng": 135.5023,
                 "start_timestamp": "2024-01-03T12:00:00Z"},
                {"from_name": "Seoul", "from_lat": 37.5665, "from_lng": 126.978,
                 "to_name": "Tokyo", "to_lat": 35.6762, "to_lng": 139.6503,
                 "start_timestamp": "2024-01-01T12:00:00Z"}
            ]
        });
        let req: LegsRequest = serde_json::from_value(json).unwrap();
        let legs = req.ordered();
        assert_eq!(legs[0].to_name, "Tokyo");
        assert_eq!(legs[1].to_name, "Osaka");
    }

    #[test]
    fn test_replay_speed_bounds_wall_time() {
        let nominal = Duration::from_secs(5);
        let cap = Duration::from_secs(60);
        assert_eq!(replay_speed(None, nominal, cap).unwrap(), 1.0);
        assert_eq!(replay_speed(Some(0.1), nominal, cap).unwrap(), 0.1);
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY, 1e-6, 0.05] {
            assert!(
                matches!(replay_speed(Some(bad), nominal, cap), Err(ApiError::InvalidInput(_))),
                "{} accepted",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_create_itinerary_reports_validation_error() {
        let draft = TripDraft {
            title: "Trip".to_string(),
            ..Default::default()
        };
        let err = create_itinerary(Json(draft)).await.err().unwrap();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_continent_handler_rejects_out_of_range() {
        let mut params = HashMap::new();
        params.insert("lat".to_string(), "95".to_string());
        params.insert("lng".to_string(), "0".to_string());
        assert!(get_continent(Query(params)).await.is_err());

        let mut params = HashMap::new();
        params.insert("lat".to_string(), "-33.8688".to_string());
        params.insert("lng".to_string(), "151.2093".to_string());
        let Json(body) = get_continent(Query(params)).await.ok().unwrap();
        assert_eq!(body.data.continent, Continent::Oceania);
    }

    #[tokio::test]
    async fn test_solar_handler_parses_instant() {
        let mut params = HashMap::new();
        params.insert("at".to_string(), "2024-03-01T12:00:00Z".to_string());
        let Json(body) = get_solar(Query(params)).await.ok().unwrap();
        assert!(body.data.subsolar.lng.abs() < 1e-9);

        let mut params = HashMap::new();
        params.insert("at".to_string(), "teatime".to_string());
        assert!(get_solar(Query(params)).await.is_err());
    }
}
