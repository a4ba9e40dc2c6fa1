/// Application configuration module
use crate::services::animator::AnimatorSettings;
use crate::services::clustering::ClusterThresholds;
use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub geocoder: GeocoderConfig,
    pub playback: PlaybackConfig,
    pub clustering: ClusteringConfig,
}

#[derive(Clone, Debug)]
pub struct GeocoderConfig {
    pub enabled: bool,
    pub nominatim_url: String,
}

#[derive(Clone, Debug)]
pub struct PlaybackConfig {
    pub nominal_ms: u64,
    pub simulated_flight_hours: i64,
    pub frame_interval_ms: u64,
    /// Longest wall-clock time a single replay request may animate
    pub replay_max_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ClusteringConfig {
    pub time_hours: i64,
    pub distance_km: f64,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let geocoder = GeocoderConfig {
            enabled: env_bool("GEOCODER_ENABLED", false),
            nominatim_url: env::var("NOMINATIM_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org/search".to_string()),
        };

        let playback = PlaybackConfig {
            nominal_ms: env_parse("PLAYBACK_NOMINAL_MS", 5000),
            simulated_flight_hours: env_parse("SIMULATED_FLIGHT_HOURS", 4),
            frame_interval_ms: env_parse("FRAME_INTERVAL_MS", 16),
            replay_max_secs: env_parse("REPLAY_MAX_SECONDS", 60),
        };
        if playback.nominal_ms == 0 {
            anyhow::bail!("PLAYBACK_NOMINAL_MS must be positive");
        }

        let clustering = ClusteringConfig {
            time_hours: env_parse("CLUSTER_TIME_HOURS", 6),
            distance_km: env_parse("CLUSTER_DISTANCE_KM", 50.0),
        };

        Ok(Self {
            bind_addr,
            geocoder,
            playback,
            clustering,
        })
    }
}

impl PlaybackConfig {
    pub fn animator_settings(&self) -> AnimatorSettings {
        AnimatorSettings {
            nominal_duration: Duration::from_millis(self.nominal_ms),
            simulated_flight: chrono::Duration::hours(self.simulated_flight_hours),
            frame_interval: Duration::from_millis(self.frame_interval_ms),
        }
    }
}

impl ClusteringConfig {
    pub fn thresholds(&self) -> ClusterThresholds {
        ClusterThresholds {
            max_gap: chrono::Duration::hours(self.time_hours),
            max_distance_km: self.distance_km,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key).ok().as_deref().map(str::trim) {
        Some("1") | Some("true") | Some("yes") => true,
        Some("0") | Some("false") | Some("no") => false,
        _ => default,
    }
}
