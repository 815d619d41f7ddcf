//! Domain types for the flight search engine.
//!
//! This module contains the core domain model types that represent
//! validated flight data. All types enforce their invariants at construction
//! time, so code that receives these types can trust their validity.

mod airport;
mod error;
mod itinerary;
mod route;
mod schedule;

pub use airport::{Airport, AirportCode, Coordinates, InvalidAirportCode};
pub use error::DomainError;
pub use itinerary::{Itinerary, LayoverRules, MAX_LAYOVER_MINUTES, MIN_LAYOVER_MINUTES};
pub use route::{Route, RouteEdge};
pub use schedule::{Fare, Schedule, ScheduleId};
