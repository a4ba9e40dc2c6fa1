/// Low-order subsolar point model used to light the day/night terminator
use crate::domain::SolarSample;
use crate::geo::normalize_lng;
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::f64::consts::PI;

/// Maximum solar declination in degrees
const AXIAL_TILT_DEG: f64 = 23.44;

/// Ordinal day treated as the spring equinox
const EQUINOX_DAY: f64 = 81.0;

/// Subsolar point for `instant`.
///
/// Declination follows a single sine over a 365-day year and longitude moves
/// 15 degrees per hour from 0 at 12:00 UTC.
pub fn subsolar_point(instant: DateTime<Utc>) -> SolarSample {
    let day_of_year = instant.ordinal() as f64;
    let lat = AXIAL_TILT_DEG * (2.0 * PI * (day_of_year - EQUINOX_DAY) / 365.0).sin();

    let utc_hours = instant.hour() as f64
        + instant.minute() as f64 / 60.0
        + instant.second() as f64 / 3600.0;
    let lng = normalize_lng((12.0 - utc_hours) * 15.0);

    SolarSample {
        lat: lat.clamp(-90.0, 90.0),
        lng,
    }
}
