//! Itinerary types.
//!
//! An `Itinerary` is an ordered chain of schedules from an overall origin to
//! an overall destination. Structural validity (segments connect, times move
//! forward, no airport is visited twice) is enforced at construction. Layover
//! limits are configuration, so they live in [`LayoverRules`] and are checked
//! separately.

use std::collections::HashSet;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{AirportCode, DomainError, Fare, Schedule, ScheduleId};

/// Default minimum connection time.
pub const MIN_LAYOVER_MINUTES: i64 = 60;

/// Default maximum connection time (6 hours).
pub const MAX_LAYOVER_MINUTES: i64 = 6 * 60;

/// Allowed range for the wait between two consecutive segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoverRules {
    min: Duration,
    max: Duration,
}

impl LayoverRules {
    /// Create rules from minute bounds (inclusive on both ends).
    pub fn from_minutes(min_mins: i64, max_mins: i64) -> Self {
        Self {
            min: Duration::minutes(min_mins),
            max: Duration::minutes(max_mins),
        }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Whether a layover of this length is acceptable.
    pub fn permits(&self, layover: Duration) -> bool {
        layover >= self.min && layover <= self.max
    }

    /// The connection validity rule: `next` leaves from where `prev` lands,
    /// strictly after it lands, with a layover inside the allowed range.
    pub fn connects(&self, prev: &Schedule, next: &Schedule) -> bool {
        if prev.destination != next.origin {
            return false;
        }
        if prev.arrival >= next.departure {
            return false;
        }
        // Whole minutes, truncated, like the layover limits themselves.
        let layover = Duration::minutes((next.departure - prev.arrival).num_minutes());
        self.permits(layover)
    }
}

impl Default for LayoverRules {
    fn default() -> Self {
        Self::from_minutes(MIN_LAYOVER_MINUTES, MAX_LAYOVER_MINUTES)
    }
}

/// A complete trip from origin to destination.
///
/// # Invariants
///
/// - At least one segment
/// - Consecutive segments connect (destination of one = origin of next)
/// - Each segment departs strictly after the previous one arrives
/// - No airport appears twice along the path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Schedule>", into = "Vec<Schedule>")]
pub struct Itinerary {
    segments: Vec<Schedule>,
}

impl Itinerary {
    /// Build an itinerary, checking the structural invariants.
    pub fn new(segments: Vec<Schedule>) -> Result<Self, DomainError> {
        let first = segments.first().ok_or(DomainError::EmptyItinerary)?;

        let mut seen = HashSet::with_capacity(segments.len() + 1);
        seen.insert(first.origin);

        for (index, segment) in segments.iter().enumerate() {
            if index > 0 {
                let prev = &segments[index - 1];
                if prev.destination != segment.origin {
                    return Err(DomainError::Disconnected {
                        index,
                        expected: prev.destination,
                        found: segment.origin,
                    });
                }
                if prev.arrival >= segment.departure {
                    return Err(DomainError::MissedConnection { index });
                }
            }
            if !seen.insert(segment.destination) {
                return Err(DomainError::RepeatedAirport(segment.destination));
            }
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Schedule] {
        &self.segments
    }

    /// Number of intermediate stops: segments minus one.
    pub fn hop_count(&self) -> usize {
        self.segments.len() - 1
    }

    pub fn is_direct(&self) -> bool {
        self.segments.len() == 1
    }

    pub fn origin(&self) -> AirportCode {
        self.segments[0].origin
    }

    pub fn destination(&self) -> AirportCode {
        self.last().destination
    }

    pub fn departure_time(&self) -> NaiveDateTime {
        self.segments[0].departure
    }

    pub fn arrival_time(&self) -> NaiveDateTime {
        self.last().arrival
    }

    /// First departure to last arrival.
    pub fn total_duration(&self) -> Duration {
        self.arrival_time() - self.departure_time()
    }

    /// Sum of segment fares.
    pub fn total_fare(&self) -> Fare {
        self.segments.iter().map(|s| s.fare).sum()
    }

    /// Waits between consecutive segments, in order.
    pub fn layovers(&self) -> Vec<Duration> {
        self.segments
            .windows(2)
            .map(|pair| pair[1].departure - pair[0].arrival)
            .collect()
    }

    /// Whether every connection satisfies the layover rules.
    pub fn satisfies(&self, rules: &LayoverRules) -> bool {
        self.segments
            .windows(2)
            .all(|pair| rules.connects(&pair[0], &pair[1]))
    }

    /// Whether every segment still has `seats` seats available.
    pub fn has_seats(&self, seats: u32) -> bool {
        self.segments.iter().all(|s| s.has_seats(seats))
    }

    /// Ordered segment identifiers: the structural identity of an itinerary.
    pub fn segment_ids(&self) -> Vec<ScheduleId> {
        self.segments.iter().map(|s| s.id).collect()
    }

    /// Every airport along the path, origin first.
    pub fn airports(&self) -> Vec<AirportCode> {
        std::iter::once(self.origin())
            .chain(self.segments.iter().map(|s| s.destination))
            .collect()
    }

    /// Flight numbers joined with `+`, e.g. "AI101+6E202".
    pub fn flight_numbers(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.flight_number.as_str())
            .collect::<Vec<_>>()
            .join("+")
    }

    /// Distinct carriers in order of appearance, joined with " / ".
    pub fn carriers(&self) -> String {
        let mut names: Vec<&str> = Vec::new();
        for s in &self.segments {
            if !names.contains(&s.airline.as_str()) {
                names.push(&s.airline);
            }
        }
        names.join(" / ")
    }

    /// Case-insensitive substring match against any segment's carrier.
    ///
    /// Each carrier is matched on its own, so a pattern spanning the ` / `
    /// separator of [`carriers`](Self::carriers) never matches.
    pub fn operated_by(&self, carrier: &str) -> bool {
        let needle = carrier.to_lowercase();
        self.segments
            .iter()
            .any(|s| s.airline.to_lowercase().contains(&needle))
    }

    fn last(&self) -> &Schedule {
        &self.segments[self.segments.len() - 1]
    }
}

impl TryFrom<Vec<Schedule>> for Itinerary {
    type Error = DomainError;

    fn try_from(segments: Vec<Schedule>) -> Result<Self, Self::Error> {
        Itinerary::new(segments)
    }
}

impl From<Itinerary> for Vec<Schedule> {
    fn from(itinerary: Itinerary) -> Self {
        itinerary.segments
    }
}
