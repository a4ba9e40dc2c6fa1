/// Trip statistics: distance, duration, cities and continent tallies
use crate::domain::{ContinentCount, Leg, TripStats};
use crate::geo::{classify_continent, haversine_distance_km, Continent};
use crate::services::timeline::nights_between;
use std::collections::{BTreeMap, HashSet};

/// Sum of great-circle lengths of every leg
pub fn total_distance_km(legs: &[Leg]) -> f64 {
    legs.iter()
        .map(|l| haversine_distance_km(l.origin(), l.destination()))
        .sum()
}

/// Visits per continent over the distinct destinations, most visited first.
///
/// A destination is identified by name and coordinates together, so two
/// stops in the same city only count once.
pub fn continent_tally(legs: &[Leg]) -> Vec<ContinentCount> {
    let mut seen = HashSet::new();
    let mut counts: BTreeMap<Continent, usize> = BTreeMap::new();

    for leg in legs {
        let key = (leg.to_name.as_str(), leg.to_lat.to_bits(), leg.to_lng.to_bits());
        if seen.insert(key) {
            *counts
                .entry(classify_continent(leg.to_lat, leg.to_lng))
                .or_default() += 1;
        }
    }

    let mut tally: Vec<ContinentCount> = counts
        .into_iter()
        .map(|(continent, count)| ContinentCount { continent, count })
        .collect();
    // Stable sort keeps the BTreeMap order for ties
    tally.sort_by(|a, b| b.count.cmp(&a.count));
    tally
}

/// Dashboard figures for one trip; `None` when it has no legs
pub fn trip_stats(legs: &[Leg]) -> Option<TripStats> {
    let first = legs.first()?;
    let last = legs.last()?;

    let days = nights_between(first.start_timestamp, last.start_timestamp).max(1);

    let mut cities: HashSet<&str> = legs.iter().map(|l| l.to_name.as_str()).collect();
    cities.insert(first.from_name.as_str());

    Some(TripStats {
        days,
        city_count: cities.len(),
        leg_count: legs.len(),
        total_distance_km: total_distance_km(legs),
        start_date: first.start_timestamp.date_naive(),
        end_date: last.start_timestamp.date_naive(),
        continents: continent_tally(legs),
    })
}
