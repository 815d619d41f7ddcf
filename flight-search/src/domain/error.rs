//! Domain error types.
//!
//! These errors represent validation failures in the domain layer: a schedule
//! whose times are out of order, an itinerary whose segments do not connect,
//! a route that revisits an airport. They are distinct from store and graph
//! I/O errors.

use super::AirportCode;

/// Domain-level errors for validation and data consistency.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Schedule data violates a basic invariant
    #[error("invalid schedule: {0}")]
    InvalidSchedule(&'static str),

    /// Itinerary has no segments
    #[error("itinerary must have at least one segment")]
    EmptyItinerary,

    /// Consecutive segments don't meet at the same airport
    #[error("segment {index} departs {found} but the previous segment arrives at {expected}")]
    Disconnected {
        index: usize,
        expected: AirportCode,
        found: AirportCode,
    },

    /// A segment departs before the previous one arrives
    #[error("segment {index} departs before the previous segment arrives")]
    MissedConnection { index: usize },

    /// The same airport is visited twice
    #[error("airport {0} appears more than once")]
    RepeatedAirport(AirportCode),

    /// Route shape is wrong (too short, wrong endpoints)
    #[error("invalid route: {0}")]
    InvalidRoute(&'static str),
}
