//! Schedule storage backends.
//!
//! The planner asks a [`ScheduleStore`] for candidate flights. Two backends
//! implement it: [`ScheduleIndex`], an in-memory index rebuilt from the
//! relational store, and [`SqliteScheduleStore`], the relational store itself.
//! The planner prefers the index and falls back to SQLite.

mod error;
mod index;
mod sqlite;

use std::future::Future;

use chrono::NaiveDateTime;

use crate::domain::{AirportCode, Schedule};

pub use error::StoreError;
pub use index::ScheduleIndex;
pub use sqlite::SqliteScheduleStore;

/// Source of bookable flight schedules.
///
/// Every query returns schedules with at least `seats` available seats,
/// ordered by departure ascending.
pub trait ScheduleStore: Send + Sync {
    /// Flights from `origin` to `destination` departing at or after `after`.
    fn find_direct(
        &self,
        origin: AirportCode,
        destination: AirportCode,
        after: NaiveDateTime,
        seats: u32,
    ) -> impl Future<Output = Result<Vec<Schedule>, StoreError>> + Send;

    /// Flights leaving `origin` with departure in `[window_start, window_end]`,
    /// to any destination.
    fn find_departing(
        &self,
        origin: AirportCode,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
        seats: u32,
    ) -> impl Future<Output = Result<Vec<Schedule>, StoreError>> + Send;

    /// Distinct airports with at least one scheduled flight from `origin`.
    fn destinations_reachable_from(
        &self,
        origin: AirportCode,
    ) -> impl Future<Output = Result<Vec<AirportCode>, StoreError>> + Send;

    /// Flights between two airports with departure inside the window.
    fn find_between(
        &self,
        origin: AirportCode,
        destination: AirportCode,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
        seats: u32,
    ) -> impl Future<Output = Result<Vec<Schedule>, StoreError>> + Send {
        async move {
            let departing = self
                .find_departing(origin, window_start, window_end, seats)
                .await?;
            Ok(departing
                .into_iter()
                .filter(|s| s.destination == destination)
                .collect())
        }
    }
}
