/// Trip draft validation and canonicalization
use crate::domain::{CanonicalLeg, CanonicalTrip, TripDraft, TripType};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use thiserror::Error;
use tracing::debug;

/// Departure from home on the trip's start date
const TRIP_START_HOUR: u32 = 9;
/// First leg of any date arrives at noon, later legs one hour apart
const LEG_BASE_HOUR: i64 = 12;
/// Return leg on an explicitly chosen date
const EXPLICIT_RETURN_HOUR: u32 = 14;
/// Return leg defaulted to the morning after the last leg
const DEFAULT_RETURN_HOUR: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("itinerary needs at least one leg")]
    NoLegs,
    #[error("leg {index} is missing {field}")]
    MissingLegField { index: usize, field: &'static str },
    #[error("{field} must be a YYYY-MM-DD date, got {value:?}")]
    MalformedDate { field: String, value: String },
    #[error("leg {index} arrives before the trip starts")]
    LegBeforeDeparture { index: usize },
    #[error("leg {index} is dated before the leg entered ahead of it")]
    LegOutOfOrder { index: usize },
    #[error("return must come after the last leg")]
    ReturnBeforeLastLeg,
}

/// Validate `draft` and turn it into a strictly time-ordered leg list.
///
/// Validation stops at the first violation. Every leg gets `12:00 + index`
/// hours on its date so same-day legs keep their entry order; a round trip
/// that does not already end at home gets a synthetic return leg.
///
/// Drafts whose legs cannot come out strictly time-ordered are rejected:
/// a leg at or before the 09:00 start, a leg dated before the one entered
/// ahead of it, or an explicit return date that is not after the last leg.
pub fn build_itinerary(draft: &TripDraft) -> Result<CanonicalTrip, ValidationError> {
    let title = required(&draft.title, "title")?;
    let start_city = required(&draft.start_city, "start_city")?;
    let start_date = required(&draft.start_date, "start_date")?;
    if draft.legs.is_empty() {
        return Err(ValidationError::NoLegs);
    }
    for (index, leg) in draft.legs.iter().enumerate() {
        if leg.destination.trim().is_empty() {
            return Err(ValidationError::MissingLegField {
                index,
                field: "destination",
            });
        }
        if leg.date.trim().is_empty() {
            return Err(ValidationError::MissingLegField {
                index,
                field: "date",
            });
        }
    }

    let start_day = parse_ymd("start_date", start_date)?;
    let mut leg_days = Vec::with_capacity(draft.legs.len());
    for (index, leg) in draft.legs.iter().enumerate() {
        leg_days.push(parse_ymd(&format!("legs[{}].date", index), leg.date.trim())?);
    }
    let return_day = match draft.return_date.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => Some(parse_ymd("return_date", s)?),
        _ => None,
    };

    let start_timestamp = at_hour(start_day, TRIP_START_HOUR);

    let mut legs: Vec<CanonicalLeg> = Vec::with_capacity(draft.legs.len() + 1);
    for (index, (leg, day)) in draft.legs.iter().zip(&leg_days).enumerate() {
        let arrival = at_hour(*day, 0) + Duration::hours(LEG_BASE_HOUR + index as i64);
        if arrival <= start_timestamp {
            return Err(ValidationError::LegBeforeDeparture { index });
        }
        if let Some(prev) = legs.last() {
            if arrival <= prev.arrival_timestamp {
                return Err(ValidationError::LegOutOfOrder { index });
            }
        }
        legs.push(CanonicalLeg {
            city_name: leg.destination.trim().to_string(),
            arrival_timestamp: arrival,
        });
    }

    if draft.trip_type == TripType::Round {
        let last = legs
            .last()
            .map(|l| (l.city_name.to_lowercase(), l.arrival_timestamp));
        if let (Some((last_city, last_arrival)), Some(last_day)) = (last, leg_days.last()) {
            if last_city != start_city.to_lowercase() {
                let arrival = match return_day {
                    Some(day) => at_hour(day, EXPLICIT_RETURN_HOUR),
                    None => at_hour(*last_day + Duration::days(1), DEFAULT_RETURN_HOUR),
                };
                if arrival <= last_arrival {
                    return Err(ValidationError::ReturnBeforeLastLeg);
                }
                debug!("Appending return leg to {} at {}", start_city, arrival);
                legs.push(CanonicalLeg {
                    city_name: start_city.to_string(),
                    arrival_timestamp: arrival,
                });
            }
        }
    }

    Ok(CanonicalTrip {
        title: title.to_string(),
        start_city: start_city.to_string(),
        start_timestamp,
        legs,
    })
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(trimmed)
    }
}

/// Parse a strict `YYYY-MM-DD` calendar date
pub fn parse_ymd(field: &str, value: &str) -> Result<NaiveDate, ValidationError> {
    let malformed = || ValidationError::MalformedDate {
        field: field.to_string(),
        value: value.to_string(),
    };
    let bytes = value.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return Err(malformed());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| malformed())
}

fn at_hour(day: NaiveDate, hour: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&day.and_time(time))
}
