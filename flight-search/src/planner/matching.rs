//! Segment matching.
//!
//! Finds candidate schedules for each edge of a route. The index is asked
//! first; when it has nothing, errors or times out, the relational store is
//! asked instead. If both fail the edge simply has no candidates.

use std::future::Future;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::domain::{AirportCode, Route, Schedule};
use crate::schedules::{ScheduleStore, StoreError};

use super::config::{SearchConfig, WindowStrategy};

/// Per-edge candidate lookup with index-then-store fallback.
pub struct SegmentMatcher<'a, I: ScheduleStore, S: ScheduleStore> {
    index: Option<&'a I>,
    store: &'a S,
    config: &'a SearchConfig,
}

impl<'a, I: ScheduleStore, S: ScheduleStore> SegmentMatcher<'a, I, S> {
    pub fn new(index: Option<&'a I>, store: &'a S, config: &'a SearchConfig) -> Self {
        Self {
            index,
            store,
            config,
        }
    }

    /// Candidates from `from` to `to` departing inside the window, ordered by
    /// departure and capped per edge.
    pub async fn match_segment(
        &self,
        from: AirportCode,
        to: AirportCode,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
        seats: u32,
    ) -> Vec<Schedule> {
        if let Some(index) = self.index {
            let found = self
                .bounded("index", from, to, || {
                    index.find_between(from, to, window_start, window_end, seats)
                })
                .await;
            if let Some(found) = found.filter(|f| !f.is_empty()) {
                return self.finish(found, to, seats);
            }
        }

        let found = self
            .bounded("store", from, to, || {
                self.store
                    .find_departing(from, window_start, window_end, seats)
            })
            .await
            .unwrap_or_default();
        self.finish(found, to, seats)
    }

    /// Direct flights from `from` to `to` departing at or after `after`.
    pub async fn match_direct(
        &self,
        from: AirportCode,
        to: AirportCode,
        after: NaiveDateTime,
        seats: u32,
    ) -> Vec<Schedule> {
        if let Some(index) = self.index {
            let found = self
                .bounded("index", from, to, || index.find_direct(from, to, after, seats))
                .await;
            if let Some(found) = found.filter(|f| !f.is_empty()) {
                return self.finish(found, to, seats);
            }
        }

        let found = self
            .bounded("store", from, to, || {
                self.store.find_direct(from, to, after, seats)
            })
            .await
            .unwrap_or_default();
        self.finish(found, to, seats)
    }

    /// Candidates for every edge of `route`, or `None` if any edge has none.
    ///
    /// The first window opens at `departure`. Later windows open one minimum
    /// layover after the earliest arrival among the previous edge's
    /// candidates; where they close depends on the configured
    /// [`WindowStrategy`].
    pub async fn match_path(
        &self,
        route: &Route,
        departure: NaiveDateTime,
        seats: u32,
    ) -> Option<Vec<Vec<Schedule>>> {
        let horizon = self.config.segment_window();
        let mut window_start = departure;
        let mut window_end = departure + horizon;
        let mut per_edge = Vec::with_capacity(route.hop_count() + 1);

        for (from, to) in route.edges() {
            let candidates = self
                .match_segment(from, to, window_start, window_end, seats)
                .await;

            let earliest = candidates.iter().map(|s| s.arrival).min();
            let latest = candidates.iter().map(|s| s.arrival).max();
            let (Some(earliest), Some(latest)) = (earliest, latest) else {
                debug!(route = %route, from = %from, to = %to, "No candidates for edge");
                return None;
            };

            window_start = earliest + self.config.min_layover();
            window_end = match self.config.window_strategy {
                WindowStrategy::AnchorEarliest => window_start + horizon,
                WindowStrategy::SpanCandidates => latest + self.config.max_layover(),
            };
            per_edge.push(candidates);
        }

        Some(per_edge)
    }

    /// Run one backend call under the per-call timeout. `None` on error or
    /// timeout.
    async fn bounded<F, Fut>(
        &self,
        backend: &'static str,
        from: AirportCode,
        to: AirportCode,
        call: F,
    ) -> Option<Vec<Schedule>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Schedule>, StoreError>>,
    {
        match tokio::time::timeout(self.config.call_timeout(), call()).await {
            Ok(Ok(found)) => Some(found),
            Ok(Err(e)) => {
                warn!(backend, from = %from, to = %to, error = %e, "Schedule lookup failed");
                None
            }
            Err(_) => {
                warn!(backend, from = %from, to = %to, "Schedule lookup timed out");
                None
            }
        }
    }

    /// Keep exact-destination, seat-satisfying schedules in departure order.
    fn finish(&self, mut found: Vec<Schedule>, to: AirportCode, seats: u32) -> Vec<Schedule> {
        found.retain(|s| s.destination == to && s.has_seats(seats));
        found.sort_by(|a, b| a.departure.cmp(&b.departure).then(a.id.cmp(&b.id)));
        found.truncate(self.config.max_candidates_per_edge);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Fare, ScheduleId};
    use crate::schedules::ScheduleIndex;
    use chrono::{Duration, NaiveDate};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 8, 20)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn code(s: &str) -> AirportCode {
        AirportCode::parse(s).unwrap()
    }

    fn seg(id: u64, from: &str, to: &str, dep: NaiveDateTime, mins: i64) -> Schedule {
        Schedule {
            id: ScheduleId(id),
            flight_number: format!("6E{id}"),
            airline: "IndiGo".into(),
            origin: code(from),
            destination: code(to),
            departure: dep,
            arrival: dep + Duration::minutes(mins),
            available_seats: 3,
            fare: Fare::from_major(3000.0),
        }
    }

    /// Store that always fails and counts calls.
    #[derive(Default)]
    struct FailingStore {
        calls: AtomicUsize,
    }

    impl ScheduleStore for FailingStore {
        async fn find_direct(
            &self,
            _: AirportCode,
            _: AirportCode,
            _: NaiveDateTime,
            _: u32,
        ) -> Result<Vec<Schedule>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Database("index offline".into()))
        }

        async fn find_departing(
            &self,
            _: AirportCode,
            _: NaiveDateTime,
            _: NaiveDateTime,
            _: u32,
        ) -> Result<Vec<Schedule>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Database("index offline".into()))
        }

        async fn destinations_reachable_from(
            &self,
            _: AirportCode,
        ) -> Result<Vec<AirportCode>, StoreError> {
            Err(StoreError::Database("index offline".into()))
        }
    }

    /// Store that never answers in time.
    struct SlowStore;

    impl ScheduleStore for SlowStore {
        async fn find_direct(
            &self,
            _: AirportCode,
            _: AirportCode,
            _: NaiveDateTime,
            _: u32,
        ) -> Result<Vec<Schedule>, StoreError> {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Ok(Vec::new())
        }

        async fn find_departing(
            &self,
            _: AirportCode,
            _: NaiveDateTime,
            _: NaiveDateTime,
            _: u32,
        ) -> Result<Vec<Schedule>, StoreError> {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Ok(Vec::new())
        }

        async fn destinations_reachable_from(
            &self,
            _: AirportCode,
        ) -> Result<Vec<AirportCode>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn store() -> ScheduleIndex {
        ScheduleIndex::from_schedules(vec![
            seg(1, "DEL", "BLR", at(7, 0), 180),
            seg(2, "DEL", "BLR", at(12, 0), 180),
            seg(3, "DEL", "BOM", at(8, 0), 120),
            seg(4, "BLR", "BOM", at(11, 30), 90),
            seg(5, "BLR", "BOM", at(20, 0), 90),
        ])
    }

    fn ids(found: &[Schedule]) -> Vec<u64> {
        found.iter().map(|s| s.id.0).collect()
    }

    #[tokio::test]
    async fn falls_back_to_store_when_index_fails() {
        let index = FailingStore::default();
        let store = store();
        let config = SearchConfig::default();
        let matcher = SegmentMatcher::new(Some(&index), &store, &config);

        let found = matcher
            .match_segment(code("DEL"), code("BLR"), at(0, 0), at(23, 59), 1)
            .await;

        assert_eq!(ids(&found), vec![1, 2]);
        assert_eq!(index.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn falls_back_when_index_is_empty() {
        let index = ScheduleIndex::new();
        let store = store();
        let config = SearchConfig::default();
        let matcher = SegmentMatcher::new(Some(&index), &store, &config);

        let found = matcher
            .match_direct(code("DEL"), code("BOM"), at(0, 0), 1)
            .await;
        assert_eq!(ids(&found), vec![3]);
    }

    #[tokio::test]
    async fn both_backends_failing_yields_nothing() {
        let index = FailingStore::default();
        let store = FailingStore::default();
        let config = SearchConfig::default();
        let matcher = SegmentMatcher::new(Some(&index), &store, &config);

        let found = matcher
            .match_segment(code("DEL"), code("BLR"), at(0, 0), at(23, 59), 1)
            .await;
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let index = SlowStore;
        let store = store();
        let config = SearchConfig::default().with_call_timeout(100);
        let matcher = SegmentMatcher::new(Some(&index), &store, &config);

        let found = matcher
            .match_direct(code("DEL"), code("BOM"), at(0, 0), 1)
            .await;
        assert_eq!(ids(&found), vec![3]);
    }

    #[tokio::test]
    async fn candidates_are_capped() {
        let index = ScheduleIndex::from_schedules(
            (0..10)
                .map(|i| seg(i, "DEL", "BOM", at(6, 0) + Duration::minutes(i as i64 * 10), 120))
                .collect(),
        );
        let store = FailingStore::default();
        let mut config = SearchConfig::default();
        config.max_candidates_per_edge = 3;
        let matcher = SegmentMatcher::new(Some(&index), &store, &config);

        let found = matcher
            .match_direct(code("DEL"), code("BOM"), at(0, 0), 1)
            .await;
        assert_eq!(ids(&found), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn anchored_window_follows_earliest_arrival() {
        let index = store();
        let config = SearchConfig::default();
        let matcher = SegmentMatcher::<ScheduleIndex, _>::new(None, &index, &config);
        let route = Route::new(vec![code("DEL"), code("BLR"), code("BOM")]).unwrap();

        let per_edge = matcher.match_path(&route, at(0, 0), 1).await.unwrap();

        // Earliest DEL->BLR arrival is 10:00, so BLR->BOM opens at 11:00.
        assert_eq!(ids(&per_edge[0]), vec![1, 2]);
        assert_eq!(ids(&per_edge[1]), vec![4, 5]);
    }

    #[tokio::test]
    async fn span_window_closes_after_latest_arrival() {
        let index = store();
        let config = SearchConfig::default().with_window_strategy(WindowStrategy::SpanCandidates);
        let matcher = SegmentMatcher::<ScheduleIndex, _>::new(None, &index, &config);
        let route = Route::new(vec![code("DEL"), code("BLR"), code("BOM")]).unwrap();

        let per_edge = matcher.match_path(&route, at(0, 0), 1).await.unwrap();

        // Latest DEL->BLR arrival is 15:00, so the window closes at 21:00.
        assert_eq!(ids(&per_edge[1]), vec![4, 5]);

        let tight = SearchConfig::default()
            .with_window_strategy(WindowStrategy::SpanCandidates)
            .with_layovers(60, 240);
        let matcher = SegmentMatcher::<ScheduleIndex, _>::new(None, &index, &tight);
        let per_edge = matcher.match_path(&route, at(0, 0), 1).await.unwrap();
        // 15:00 + 4h closes the window at 19:00.
        assert_eq!(ids(&per_edge[1]), vec![4]);
    }

    #[tokio::test]
    async fn missing_edge_drops_path() {
        let index = store();
        let config = SearchConfig::default();
        let matcher = SegmentMatcher::<ScheduleIndex, _>::new(None, &index, &config);
        let route = Route::new(vec![code("DEL"), code("HYD"), code("BOM")]).unwrap();

        assert!(matcher.match_path(&route, at(0, 0), 1).await.is_none());
    }
}
