//! In-memory schedule index.
//!
//! Schedules are grouped by origin and kept sorted by departure, so a window
//! query is two binary searches and a seat filter. The index is rebuilt
//! wholesale from the relational store; readers never see a half-built index.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDateTime;
use tokio::sync::RwLock;
use tracing::info;

use crate::domain::{AirportCode, Schedule};

use super::{ScheduleStore, SqliteScheduleStore, StoreError};

type ByOrigin = HashMap<AirportCode, Vec<Schedule>>;

/// Fast filtered index over schedules, keyed by origin airport.
#[derive(Default)]
pub struct ScheduleIndex {
    by_origin: RwLock<ByOrigin>,
}

impl ScheduleIndex {
    /// Create an empty index. Every query returns nothing until rebuilt.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an index holding the given schedules.
    pub fn from_schedules(schedules: Vec<Schedule>) -> Self {
        Self {
            by_origin: RwLock::new(group(schedules)),
        }
    }

    /// Replace the index contents. Returns the number of schedules indexed.
    pub async fn rebuild(&self, schedules: Vec<Schedule>) -> usize {
        let count = schedules.len();
        let grouped = group(schedules);
        *self.by_origin.write().await = grouped;
        count
    }

    /// Reload every schedule from the relational store.
    pub async fn sync_from(&self, store: &SqliteScheduleStore) -> Result<usize, StoreError> {
        let schedules = store.all_schedules().await?;
        let count = self.rebuild(schedules).await;
        info!(schedules = count, "Schedule index rebuilt");
        Ok(count)
    }

    /// Number of indexed schedules.
    pub async fn len(&self) -> usize {
        self.by_origin.read().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn group(schedules: Vec<Schedule>) -> ByOrigin {
    let mut by_origin: ByOrigin = HashMap::new();
    for s in schedules {
        by_origin.entry(s.origin).or_default().push(s);
    }
    for list in by_origin.values_mut() {
        list.sort_by(|a, b| a.departure.cmp(&b.departure).then(a.id.cmp(&b.id)));
    }
    by_origin
}

/// Schedules from `list` (sorted by departure) departing at or after `start`
/// and, when given, at or before `end`.
fn departing_between(
    list: &[Schedule],
    start: NaiveDateTime,
    end: Option<NaiveDateTime>,
) -> &[Schedule] {
    let lo = list.partition_point(|s| s.departure < start);
    let hi = match end {
        Some(end) => list.partition_point(|s| s.departure <= end),
        None => list.len(),
    };
    if lo >= hi { &[] } else { &list[lo..hi] }
}

impl ScheduleStore for ScheduleIndex {
    async fn find_direct(
        &self,
        origin: AirportCode,
        destination: AirportCode,
        after: NaiveDateTime,
        seats: u32,
    ) -> Result<Vec<Schedule>, StoreError> {
        let index = self.by_origin.read().await;
        let Some(list) = index.get(&origin) else {
            return Ok(Vec::new());
        };
        Ok(departing_between(list, after, None)
            .iter()
            .filter(|s| s.destination == destination && s.has_seats(seats))
            .cloned()
            .collect())
    }

    async fn find_departing(
        &self,
        origin: AirportCode,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
        seats: u32,
    ) -> Result<Vec<Schedule>, StoreError> {
        let index = self.by_origin.read().await;
        let Some(list) = index.get(&origin) else {
            return Ok(Vec::new());
        };
        Ok(departing_between(list, window_start, Some(window_end))
            .iter()
            .filter(|s| s.has_seats(seats))
            .cloned()
            .collect())
    }

    async fn destinations_reachable_from(
        &self,
        origin: AirportCode,
    ) -> Result<Vec<AirportCode>, StoreError> {
        let index = self.by_origin.read().await;
        let destinations: BTreeSet<AirportCode> = index
            .get(&origin)
            .map(|list| list.iter().map(|s| s.destination).collect())
            .unwrap_or_default();
        Ok(destinations.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Fare, ScheduleId};
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 8, 20)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn code(s: &str) -> AirportCode {
        AirportCode::parse(s).unwrap()
    }

    fn flight(id: u64, from: &str, to: &str, dep: NaiveDateTime, seats: u32) -> Schedule {
        Schedule {
            id: ScheduleId(id),
            flight_number: format!("AI{id}"),
            airline: "Air India".into(),
            origin: code(from),
            destination: code(to),
            departure: dep,
            arrival: dep + chrono::Duration::hours(2),
            available_seats: seats,
            fare: Fare::from_major(5000.0),
        }
    }

    fn sample() -> ScheduleIndex {
        ScheduleIndex::from_schedules(vec![
            flight(3, "DEL", "BOM", at(18, 0), 5),
            flight(1, "DEL", "BOM", at(6, 0), 5),
            flight(2, "DEL", "BLR", at(9, 0), 1),
            flight(4, "BLR", "BOM", at(12, 0), 5),
        ])
    }

    fn ids(schedules: &[Schedule]) -> Vec<u64> {
        schedules.iter().map(|s| s.id.0).collect()
    }

    #[tokio::test]
    async fn find_direct_orders_by_departure() {
        let index = sample();
        let found = index
            .find_direct(code("DEL"), code("BOM"), at(0, 0), 1)
            .await
            .unwrap();
        assert_eq!(ids(&found), vec![1, 3]);

        let later = index
            .find_direct(code("DEL"), code("BOM"), at(6, 1), 1)
            .await
            .unwrap();
        assert_eq!(ids(&later), vec![3]);
    }

    #[tokio::test]
    async fn window_bounds_are_inclusive() {
        let index = sample();
        let found = index
            .find_departing(code("DEL"), at(6, 0), at(9, 0), 1)
            .await
            .unwrap();
        assert_eq!(ids(&found), vec![1, 2]);
    }

    #[tokio::test]
    async fn seat_filter() {
        let index = sample();
        let found = index
            .find_departing(code("DEL"), at(0, 0), at(23, 0), 2)
            .await
            .unwrap();
        assert_eq!(ids(&found), vec![1, 3]);
    }

    #[tokio::test]
    async fn find_between_uses_departing() {
        let index = sample();
        let found = index
            .find_between(code("DEL"), code("BLR"), at(0, 0), at(23, 0), 1)
            .await
            .unwrap();
        assert_eq!(ids(&found), vec![2]);
    }

    #[tokio::test]
    async fn reachable_destinations_are_distinct() {
        let index = sample();
        let dests = index.destinations_reachable_from(code("DEL")).await.unwrap();
        assert_eq!(dests, vec![code("BLR"), code("BOM")]);
        assert!(
            index
                .destinations_reachable_from(code("MAA"))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn rebuild_replaces_contents() {
        let index = ScheduleIndex::new();
        assert!(index.is_empty().await);

        assert_eq!(index.rebuild(vec![flight(9, "MAA", "DEL", at(7, 0), 3)]).await, 1);
        assert_eq!(index.len().await, 1);
        assert!(
            index
                .find_direct(code("DEL"), code("BOM"), at(0, 0), 1)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
