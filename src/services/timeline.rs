/// Travel journal projection: alternating transit and stay segments
use crate::domain::{Leg, TimelineSegment};
use chrono::{DateTime, Duration, Utc};

/// Split a trip's legs into `Transit`/`Stay` pairs.
///
/// Legs must already be in strictly increasing `start_timestamp` order; the
/// stay at a destination lasts until the next leg departs, and the stay after
/// the last leg is left open.
pub fn compute_segments(legs: &[Leg]) -> Vec<TimelineSegment> {
    let mut segments = Vec::with_capacity(legs.len() * 2);

    for (i, leg) in legs.iter().enumerate() {
        segments.push(TimelineSegment::Transit { leg: leg.clone() });

        let stay = match legs.get(i + 1) {
            Some(next) => TimelineSegment::Stay {
                city: leg.to_name.clone(),
                arrival: leg.start_timestamp,
                departure: Some(next.start_timestamp),
                nights: Some(nights_between(leg.start_timestamp, next.start_timestamp)),
                is_final: false,
                media: leg.media.clone(),
            },
            None => TimelineSegment::Stay {
                city: leg.to_name.clone(),
                arrival: leg.start_timestamp,
                departure: None,
                nights: None,
                is_final: true,
                media: leg.media.clone(),
            },
        };
        segments.push(stay);
    }

    segments
}

/// Whole days between two instants, rounded up and never negative
pub fn nights_between(arrival: DateTime<Utc>, departure: DateTime<Utc>) -> i64 {
    let gap = departure - arrival;
    if gap <= Duration::zero() {
        return 0;
    }
    let whole = gap.num_days();
    if gap > Duration::days(whole) {
        whole + 1
    } else {
        whole
    }
}
