/// Spherical geometry helpers shared by the engine
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Mean Earth radius used for every distance in the engine
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Angular tolerance (radians) under which two points count as coincident or antipodal
const DEGENERATE_RAD: f64 = 1e-7;

/// A coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    fn to_unit_vector(self) -> [f64; 3] {
        let (lat, lng) = (self.lat.to_radians(), self.lng.to_radians());
        [lat.cos() * lng.cos(), lat.cos() * lng.sin(), lat.sin()]
    }

    fn from_unit_vector(v: [f64; 3]) -> Self {
        let lat = v[2].atan2((v[0] * v[0] + v[1] * v[1]).sqrt());
        let lng = v[1].atan2(v[0]);
        Self {
            lat: lat.to_degrees(),
            lng: lng.to_degrees(),
        }
    }
}

/// Central angle between two points in radians, via the haversine formula
pub fn angular_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let rlat1 = a.lat.to_radians();
    let rlat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + rlat1.cos() * rlat2.cos() * (dlng / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);
    2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Great-circle distance in kilometres
pub fn haversine_distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    if !a.is_finite() || !b.is_finite() {
        return 0.0;
    }
    EARTH_RADIUS_KM * angular_distance(a, b)
}

/// Point at fraction `t` along the minor arc from `a` to `b`.
///
/// `t` is clamped to `[0, 1]`; the endpoints are returned verbatim so callers
/// can rely on exact equality at `t = 0` and `t = 1`.
pub fn great_circle_interpolate(a: GeoPoint, b: GeoPoint, t: f64) -> GeoPoint {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    if t <= 0.0 {
        return a;
    }
    if t >= 1.0 {
        return b;
    }

    let d = angular_distance(a, b);
    if d < DEGENERATE_RAD {
        return a;
    }
    if PI - d < DEGENERATE_RAD {
        // Antipodal: every great circle is a shortest path, blend coordinates instead
        return GeoPoint::new(a.lat + (b.lat - a.lat) * t, a.lng + (b.lng - a.lng) * t);
    }
    let sin_d = d.sin();

    let wa = ((1.0 - t) * d).sin() / sin_d;
    let wb = (t * d).sin() / sin_d;
    let va = a.to_unit_vector();
    let vb = b.to_unit_vector();
    GeoPoint::from_unit_vector([
        wa * va[0] + wb * vb[0],
        wa * va[1] + wb * vb[1],
        wa * va[2] + wb * vb[2],
    ])
}

/// Forward azimuth from `a` to `b` in degrees `[0, 360)`.
///
/// The bearing is undefined for coincident or antipodal points; `fallback` is
/// returned in that case (and for non-finite input) so playback keeps its
/// last heading instead of spinning.
pub fn initial_bearing(a: GeoPoint, b: GeoPoint, fallback: f64) -> f64 {
    if !a.is_finite() || !b.is_finite() {
        return fallback;
    }
    let d = angular_distance(a, b);
    if d < DEGENERATE_RAD || PI - d < DEGENERATE_RAD {
        return fallback;
    }

    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let y = dlng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlng.cos();
    let bearing = y.atan2(x).to_degrees();
    if !bearing.is_finite() {
        return fallback;
    }
    let normalized = bearing.rem_euclid(360.0);
    // rem_euclid can round a tiny negative up to exactly 360
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Wrap a longitude into `[-180, 180]`
pub fn normalize_lng(lng: f64) -> f64 {
    if !lng.is_finite() {
        return 0.0;
    }
    if (-180.0..=180.0).contains(&lng) {
        return lng;
    }
    let wrapped = (lng + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lng > 0.0 {
        180.0
    } else {
        wrapped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Continent {
    Asia,
    Europe,
    Africa,
    #[serde(rename = "North America")]
    NorthAmerica,
    #[serde(rename = "South America")]
    SouthAmerica,
    Oceania,
    Antarctica,
}

impl Continent {
    #[allow(dead_code)]
    pub const ALL: [Continent; 7] = [
        Continent::Asia,
        Continent::Europe,
        Continent::Africa,
        Continent::NorthAmerica,
        Continent::SouthAmerica,
        Continent::Oceania,
        Continent::Antarctica,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Continent::Asia => "Asia",
            Continent::Europe => "Europe",
            Continent::Africa => "Africa",
            Continent::NorthAmerica => "North America",
            Continent::SouthAmerica => "South America",
            Continent::Oceania => "Oceania",
            Continent::Antarctica => "Antarctica",
        }
    }
}

impl fmt::Display for Continent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bounding-box continent heuristic, first match wins.
///
/// The boxes are coarse: Istanbul and the Caucasus land in Europe or Asia
/// depending on which side of the lines they fall. Downstream tallies assume
/// this exact partition, so it must not be refined here.
pub fn classify_continent(lat: f64, lng: f64) -> Continent {
    if lat < -60.0 {
        return Continent::Antarctica;
    }
    if lat < 0.0 && lat > -50.0 && lng > 110.0 && lng < 180.0 {
        return Continent::Oceania;
    }
    if lat > 12.0 && lng < -30.0 && lng > -170.0 {
        return Continent::NorthAmerica;
    }
    if lat <= 12.0 && lng < -30.0 {
        return Continent::SouthAmerica;
    }
    if lat > 35.0 && lng > -30.0 && lng < 60.0 {
        return Continent::Europe;
    }
    if lat <= 35.0 && lat > -40.0 && lng > -20.0 && lng < 60.0 {
        return Continent::Africa;
    }
    Continent::Asia
}
