/// Domain models for the itinerary engine
use crate::geo::{Continent, GeoPoint};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    #[default]
    Image,
    Video,
    PanoImage,
}

impl MediaType {
    /// Infer the media kind from an uploaded file name
    pub fn from_filename(filename: &str) -> Self {
        let lower = filename.to_lowercase();
        if lower.contains("pano") {
            MediaType::PanoImage
        } else if [".mp4", ".mov", ".avi", ".mkv"]
            .iter()
            .any(|ext| lower.ends_with(ext))
        {
            MediaType::Video
        } else {
            MediaType::Image
        }
    }
}

/// Media attached to a leg by the storage layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    pub id: i64,
    pub url: String,
    /// Missing when the uploader did not classify the file
    #[serde(default)]
    pub media_type: Option<MediaType>,
}

impl MediaRef {
    pub fn kind(&self) -> MediaType {
        self.media_type
            .unwrap_or_else(|| MediaType::from_filename(&self.url))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    #[default]
    Plane,
    Train,
    Car,
}

/// One persisted point-to-point movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    #[serde(default)]
    pub id: i64,
    pub from_name: String,
    pub from_lat: f64,
    pub from_lng: f64,
    pub to_name: String,
    pub to_lat: f64,
    pub to_lng: f64,
    #[serde(alias = "start_datetime")]
    pub start_timestamp: DateTime<Utc>,
    #[serde(default, alias = "media_list")]
    pub media: Vec<MediaRef>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub transport: Transport,
    #[serde(default)]
    pub note: Option<String>,
}

impl Leg {
    pub fn origin(&self) -> GeoPoint {
        GeoPoint::new(self.from_lat, self.from_lng)
    }

    pub fn destination(&self) -> GeoPoint {
        GeoPoint::new(self.to_lat, self.to_lng)
    }

    pub fn panorama(&self) -> Option<&MediaRef> {
        self.media
            .iter()
            .find(|m| m.kind() == MediaType::PanoImage)
    }
}

/// Journal entry derived from a trip's legs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimelineSegment {
    Transit {
        leg: Leg,
    },
    Stay {
        city: String,
        arrival: DateTime<Utc>,
        departure: Option<DateTime<Utc>>,
        nights: Option<i64>,
        is_final: bool,
        media: Vec<MediaRef>,
    },
}

/// Point on the globe directly under the sun
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SolarSample {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationPhase {
    Idle,
    Departing,
    Cruising,
    Arrived,
}

/// Where the globe camera should look for a frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraTarget {
    pub lat: f64,
    pub lng: f64,
    pub altitude: f64,
}

/// A single frame of leg playback
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnimationSample {
    pub lat: f64,
    pub lng: f64,
    pub heading_degrees: f64,
    pub progress: f64,
    pub phase: AnimationPhase,
    pub camera: CameraTarget,
    pub simulated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TripType {
    OneWay,
    #[default]
    Round,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftLeg {
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub date: String,
}

/// Trip as entered by the user, before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub start_city: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub trip_type: TripType,
    #[serde(default)]
    pub legs: Vec<DraftLeg>,
    #[serde(default)]
    pub return_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalLeg {
    pub city_name: String,
    pub arrival_timestamp: DateTime<Utc>,
}

/// Validated trip, ready for the event-creation collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTrip {
    pub title: String,
    pub start_city: String,
    pub start_timestamp: DateTime<Utc>,
    pub legs: Vec<CanonicalLeg>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinentCount {
    pub continent: Continent,
    pub count: usize,
}

/// Aggregate figures for a trip dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripStats {
    pub days: i64,
    pub city_count: usize,
    pub leg_count: usize,
    pub total_distance_km: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub continents: Vec<ContinentCount>,
}

/// Photo metadata as extracted by the media analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoInfo {
    pub filename: String,
    pub captured_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Proposed travel event grouped from photos
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitSuggestion {
    pub title: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub files: Vec<String>,
}

/// Health check response
#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub now: DateTime<Utc>,
}
