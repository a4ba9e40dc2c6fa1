/// Grouping of photo metadata into suggested travel events
use crate::domain::{PhotoInfo, VisitSuggestion};
use crate::geo::{haversine_distance_km, GeoPoint};
use chrono::Duration;

#[derive(Debug, Clone, Copy)]
pub struct ClusterThresholds {
    pub max_gap: Duration,
    pub max_distance_km: f64,
}

impl Default for ClusterThresholds {
    fn default() -> Self {
        Self {
            max_gap: Duration::hours(6),
            max_distance_km: 50.0,
        }
    }
}

fn position(photo: &PhotoInfo) -> Option<GeoPoint> {
    Some(GeoPoint::new(photo.lat?, photo.lng?))
}

fn open_group(photo: &PhotoInfo) -> Option<VisitSuggestion> {
    let at = photo.captured_at?;
    Some(VisitSuggestion {
        title: String::new(),
        start_date: at,
        end_date: at,
        city: photo.city.clone(),
        country: photo.country.clone(),
        lat: photo.lat,
        lng: photo.lng,
        files: vec![photo.filename.clone()],
    })
}

fn close_group(mut group: VisitSuggestion) -> VisitSuggestion {
    group.title = format!(
        "Visit to {}",
        group.city.as_deref().unwrap_or("Unknown Region")
    );
    group
}

/// Split time-sorted photos wherever the time gap or the distance between
/// consecutive shots exceeds the thresholds. Photos without a capture time
/// are skipped; missing coordinates count as zero distance.
pub fn cluster_photos(photos: &[PhotoInfo], thresholds: ClusterThresholds) -> Vec<VisitSuggestion> {
    let mut dated: Vec<&PhotoInfo> = photos.iter().filter(|p| p.captured_at.is_some()).collect();
    dated.sort_by_key(|p| p.captured_at);

    let mut suggestions = Vec::new();
    let mut iter = dated.into_iter();
    let Some(first) = iter.next() else {
        return suggestions;
    };
    let mut prev = first;
    let Some(mut current) = open_group(first) else {
        return suggestions;
    };

    for photo in iter {
        let (Some(prev_at), Some(at)) = (prev.captured_at, photo.captured_at) else {
            continue;
        };
        let gap = at - prev_at;
        let distance = match (position(prev), position(photo)) {
            (Some(a), Some(b)) => haversine_distance_km(a, b),
            _ => 0.0,
        };

        if gap > thresholds.max_gap || distance > thresholds.max_distance_km {
            if let Some(next) = open_group(photo) {
                suggestions.push(close_group(std::mem::replace(&mut current, next)));
            }
        } else {
            current.end_date = at;
            current.files.push(photo.filename.clone());
            if current.city.is_none() && photo.city.is_some() {
                current.city = photo.city.clone();
                current.country = photo.country.clone();
                current.lat = photo.lat;
                current.lng = photo.lng;
            }
        }
        prev = photo;
    }

    suggestions.push(close_group(current));
    suggestions
}
