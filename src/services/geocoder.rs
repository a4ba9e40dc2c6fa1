/// City name resolution: a read-only table first, the network second
use crate::clients::NominatimClient;
use crate::geo::{haversine_distance_km, GeoPoint};
use std::collections::HashMap;
use tracing::{debug, warn};

const BUILTIN_CITIES: &[(&str, f64, f64)] = &[
    ("서울", 37.5665, 126.9780),
    ("인천", 37.4563, 126.7052),
    ("부산", 35.1796, 129.0756),
    ("제주", 33.4996, 126.5312),
    ("Seoul", 37.5665, 126.9780),
    ("Incheon", 37.4563, 126.7052),
    ("Busan", 35.1796, 129.0756),
    ("Jeju", 33.4996, 126.5312),
    ("도쿄", 35.6762, 139.6503),
    ("오사카", 34.6937, 135.5023),
    ("후쿠오카", 33.5904, 130.4017),
    ("삿포로", 43.0611, 141.3564),
    ("Tokyo", 35.6762, 139.6503),
    ("Osaka", 34.6937, 135.5023),
    ("Fukuoka", 33.5904, 130.4017),
    ("Sapporo", 43.0611, 141.3564),
    ("파리", 48.8566, 2.3522),
    ("런던", 51.5074, -0.1278),
    ("로마", 41.9028, 12.4964),
    ("베를린", 52.5200, 13.4050),
    ("Paris", 48.8566, 2.3522),
    ("London", 51.5074, -0.1278),
    ("Rome", 41.9028, 12.4964),
    ("Berlin", 52.5200, 13.4050),
    ("뉴욕", 40.7128, -74.0060),
    ("로스앤젤레스", 34.0522, -118.2437),
    ("시카고", 41.8781, -87.6298),
    ("밴쿠버", 49.2827, -123.1207),
    ("New York", 40.7128, -74.0060),
    ("Los Angeles", 34.0522, -118.2437),
    ("Chicago", 41.8781, -87.6298),
    ("Vancouver", 49.2827, -123.1207),
    ("방콕", 13.7563, 100.5018),
    ("다낭", 16.0544, 108.2022),
    ("싱가포르", 1.3521, 103.8198),
    ("타이베이", 25.0330, 121.5654),
    ("Bangkok", 13.7563, 100.5018),
    ("Da Nang", 16.0544, 108.2022),
    ("Singapore", 1.3521, 103.8198),
    ("Taipei", 25.0330, 121.5654),
];

/// Read-only mapping of city names to coordinates
#[derive(Debug, Clone, Default)]
pub struct CityDirectory {
    cities: HashMap<String, GeoPoint>,
}

impl CityDirectory {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, GeoPoint)>,
        S: Into<String>,
    {
        Self {
            cities: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_CITIES
                .iter()
                .map(|(name, lat, lng)| (*name, GeoPoint::new(*lat, *lng))),
        )
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    /// Exact name first, then a case-insensitive match
    pub fn lookup(&self, name: &str) -> Option<GeoPoint> {
        let name = name.trim();
        if let Some(p) = self.cities.get(name) {
            return Some(*p);
        }
        let lower = name.to_lowercase();
        self.cities
            .iter()
            .find(|(k, _)| k.to_lowercase() == lower)
            .map(|(_, p)| *p)
    }

    /// Distance between two known cities; `None` means unknown, not an error
    pub fn distance_preview(&self, from: &str, to: &str) -> Option<f64> {
        Some(haversine_distance_km(self.lookup(from)?, self.lookup(to)?))
    }
}

/// Directory lookup with an optional network fallback
pub struct Geocoder {
    directory: CityDirectory,
    client: Option<NominatimClient>,
}

impl Geocoder {
    pub fn new(directory: CityDirectory, client: Option<NominatimClient>) -> Self {
        Self { directory, client }
    }

    /// Resolve a city; lookup failures degrade to `None`
    pub async fn resolve(&self, city: &str) -> Option<GeoPoint> {
        if let Some(p) = self.directory.lookup(city) {
            return Some(p);
        }
        let client = self.client.as_ref()?;
        debug!("{} not in city table, asking {}", city, client.base_url());
        match client.search(city).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Geocoding error for {}: {}", city, e);
                None
            }
        }
    }

    /// Distance between two city names, trying the table alone first
    pub async fn distance_km(&self, from: &str, to: &str) -> Option<f64> {
        if let Some(d) = self.directory.distance_preview(from, to) {
            return Some(d);
        }
        let a = self.resolve(from).await?;
        let b = self.resolve(to).await?;
        Some(haversine_distance_km(a, b))
    }
}
