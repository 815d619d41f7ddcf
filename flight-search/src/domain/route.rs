//! Routes through the airport graph.
//!
//! A [`Route`] is a simple path of airport codes discovered by the route
//! graph. A [`RouteEdge`] is the aggregated topology record pushed into the
//! graph backend: one edge per (origin, destination, flight number).

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{Airport, AirportCode, DomainError, Schedule};

/// A simple path of airport codes from origin to destination.
///
/// # Invariants
///
/// - At least two airports
/// - No airport appears twice
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Route(Vec<AirportCode>);

impl Route {
    pub fn new(airports: Vec<AirportCode>) -> Result<Self, DomainError> {
        if airports.len() < 2 {
            return Err(DomainError::InvalidRoute("needs at least two airports"));
        }
        let mut seen = HashSet::with_capacity(airports.len());
        for code in &airports {
            if !seen.insert(*code) {
                return Err(DomainError::RepeatedAirport(*code));
            }
        }
        Ok(Self(airports))
    }

    /// Build a route and check it joins `origin` to `destination` with exactly
    /// `hops` intermediate stops.
    pub fn with_shape(
        airports: Vec<AirportCode>,
        origin: AirportCode,
        destination: AirportCode,
        hops: usize,
    ) -> Result<Self, DomainError> {
        let route = Self::new(airports)?;
        if route.origin() != origin || route.destination() != destination {
            return Err(DomainError::InvalidRoute("wrong endpoints"));
        }
        if route.hop_count() != hops {
            return Err(DomainError::InvalidRoute("wrong number of stops"));
        }
        Ok(route)
    }

    /// The direct route `[origin, destination]`.
    pub fn direct(origin: AirportCode, destination: AirportCode) -> Result<Self, DomainError> {
        Self::new(vec![origin, destination])
    }

    pub fn airports(&self) -> &[AirportCode] {
        &self.0
    }

    pub fn origin(&self) -> AirportCode {
        self.0[0]
    }

    pub fn destination(&self) -> AirportCode {
        self.0[self.0.len() - 1]
    }

    /// Intermediate stops.
    pub fn hop_count(&self) -> usize {
        self.0.len() - 2
    }

    /// Consecutive (from, to) pairs.
    pub fn edges(&self) -> impl Iterator<Item = (AirportCode, AirportCode)> + '_ {
        self.0.windows(2).map(|pair| (pair[0], pair[1]))
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let codes: Vec<&str> = self.0.iter().map(|c| c.as_str()).collect();
        f.write_str(&codes.join("->"))
    }
}

impl<'de> Deserialize<'de> for Route {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let airports = Vec::<AirportCode>::deserialize(deserializer)?;
        Route::new(airports).map_err(serde::de::Error::custom)
    }
}

/// Aggregated connection between two airports, used for graph topology only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEdge {
    pub origin: AirportCode,
    pub destination: AirportCode,
    pub airline: String,
    pub flight_number: String,
    /// Great-circle distance, when both airports have coordinates.
    pub distance_km: Option<f64>,
    pub avg_duration_mins: f64,
    /// Average fare in major units.
    pub avg_fare: f64,
    /// Schedules per distinct departure day.
    pub frequency: f64,
}

impl RouteEdge {
    /// Group schedules by (origin, destination, flight number) and summarise
    /// each group. Output is ordered by that key.
    pub fn aggregate(schedules: &[Schedule], airports: &[Airport]) -> Vec<RouteEdge> {
        let by_code: HashMap<AirportCode, &Airport> =
            airports.iter().map(|a| (a.code, a)).collect();

        let mut groups: BTreeMap<(AirportCode, AirportCode, &str), Vec<&Schedule>> =
            BTreeMap::new();
        for s in schedules {
            groups
                .entry((s.origin, s.destination, s.flight_number.as_str()))
                .or_default()
                .push(s);
        }

        groups
            .into_iter()
            .map(|((origin, destination, flight_number), group)| {
                let n = group.len() as f64;
                let avg_duration_mins =
                    group.iter().map(|s| s.duration().num_minutes() as f64).sum::<f64>() / n;
                let avg_fare = group.iter().map(|s| s.fare.as_major()).sum::<f64>() / n;
                let days: BTreeSet<_> = group.iter().map(|s| s.departure.date()).collect();
                let frequency = n / days.len() as f64;

                let distance_km = match (by_code.get(&origin), by_code.get(&destination)) {
                    (Some(a), Some(b)) => a.distance_km(b),
                    _ => None,
                };

                RouteEdge {
                    origin,
                    destination,
                    airline: group[0].airline.clone(),
                    flight_number: flight_number.to_string(),
                    distance_km,
                    avg_duration_mins,
                    avg_fare,
                    frequency,
                }
            })
            .collect()
    }
}
