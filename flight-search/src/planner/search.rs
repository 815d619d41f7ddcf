//! Itinerary search.
//!
//! Ties the stages together: direct flights for hop 0, then for each larger
//! hop count the route graph proposes paths, each path's edges are matched
//! against the schedule stores, and the candidates are combined into valid
//! itineraries. The merged, deduplicated set is cached before the request's
//! filters, sort and page are applied.

use chrono::NaiveDateTime;
use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, ResultCache};
use crate::domain::{AirportCode, Itinerary, LayoverRules, Route};
use crate::graph::RouteGraph;
use crate::schedules::ScheduleStore;

use super::combine::combine;
use super::config::SearchConfig;
use super::discovery::RouteFinder;
use super::matching::SegmentMatcher;
use super::rank::{SearchPage, deduplicate, filter, paginate, sort_itineraries};
use super::request::SearchRequest;

/// Error from itinerary search.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// Invalid search request
    #[error("invalid search request: {0}")]
    InvalidRequest(String),
}

/// Multi-hop itinerary planner.
///
/// `G` is the preferred route graph, `I` the preferred schedule index and `S`
/// the relational schedule store. Both preferred backends are optional; the
/// store also feeds the depth-first route fallback.
pub struct Planner<'a, G: RouteGraph, I: ScheduleStore, S: ScheduleStore, C: ResultCache> {
    routes: RouteFinder<'a, G, S>,
    matcher: SegmentMatcher<'a, I, S>,
    cache: &'a C,
    config: &'a SearchConfig,
}

impl<'a, G, I, S, C> Planner<'a, G, I, S, C>
where
    G: RouteGraph,
    I: ScheduleStore,
    S: ScheduleStore,
    C: ResultCache,
{
    /// Create a new planner.
    pub fn new(
        graph: Option<&'a G>,
        index: Option<&'a I>,
        store: &'a S,
        cache: &'a C,
        config: &'a SearchConfig,
    ) -> Self {
        Self {
            routes: RouteFinder::new(graph, store, config),
            matcher: SegmentMatcher::new(index, store, config),
            cache,
            config,
        }
    }

    /// Search for itineraries and return the requested page.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchPage, SearchError> {
        request.validate(self.config)?;

        let departure = request.effective_departure().ok_or_else(|| {
            SearchError::InvalidRequest("a departure date or time is required".to_string())
        })?;
        let max_hops = request.effective_max_hops(self.config);

        let key = CacheKey::new(
            &self.config.cache.key_prefix,
            request.origin,
            request.destination,
            departure,
            request.seats,
            max_hops,
        );

        let itineraries = match self.cached(&key).await {
            Some(found) => found,
            None => {
                let found = self
                    .compute(request.origin, request.destination, departure, request.seats, max_hops)
                    .await;
                self.remember(&key, &found).await;
                found
            }
        };

        let filtered = filter(itineraries, request.max_price, request.carrier.as_deref());
        let sorted = sort_itineraries(filtered, request.sort);
        let page = paginate(sorted, request.page, request.size);

        info!(
            origin = %request.origin,
            destination = %request.destination,
            total = page.total,
            page = page.page,
            returned = page.itineraries.len(),
            "Search complete"
        );

        Ok(page)
    }

    /// Routes with exactly `hops` intermediate stops.
    pub async fn find_routes_with_hops(
        &self,
        origin: AirportCode,
        destination: AirportCode,
        hops: usize,
    ) -> Vec<Route> {
        self.routes
            .find_routes_with_hops(origin, destination, hops)
            .await
    }

    /// Shortest routes regardless of stop count.
    pub async fn shortest_routes(&self, origin: AirportCode, destination: AirportCode) -> Vec<Route> {
        self.routes.shortest_routes(origin, destination).await
    }

    /// Routes through exactly one intermediate airport.
    pub async fn one_stop_routes(&self, origin: AirportCode, destination: AirportCode) -> Vec<Route> {
        self.routes.one_stop_routes(origin, destination).await
    }

    /// Every valid itinerary with up to `max_hops` stops, deduplicated.
    async fn compute(
        &self,
        origin: AirportCode,
        destination: AirportCode,
        departure: NaiveDateTime,
        seats: u32,
        max_hops: usize,
    ) -> Vec<Itinerary> {
        let deadline = Instant::now() + self.config.search_deadline();
        let rules = self.config.layover_rules();

        let direct = tokio::time::timeout_at(
            deadline,
            self.matcher.match_direct(origin, destination, departure, seats),
        )
        .await
        .unwrap_or_else(|_| {
            warn!(origin = %origin, destination = %destination, "Direct lookup missed the search deadline");
            Vec::new()
        });
        let mut found = combine(&[direct], &rules, seats);
        info!(hops = 0, itineraries = found.len(), "Hop search complete");

        for hops in 1..=max_hops {
            let routes = self
                .routes
                .routes_before(origin, destination, hops, deadline)
                .await;
            let itineraries = self
                .evaluate(&routes, departure, seats, &rules, deadline)
                .await;
            info!(
                hops,
                routes = routes.len(),
                itineraries = itineraries.len(),
                "Hop search complete"
            );
            found.extend(itineraries);
        }

        deduplicate(found)
    }

    /// Evaluate routes concurrently, `batch_size` at a time.
    async fn evaluate(
        &self,
        routes: &[Route],
        departure: NaiveDateTime,
        seats: u32,
        rules: &LayoverRules,
        deadline: Instant,
    ) -> Vec<Itinerary> {
        let mut found = Vec::new();

        for batch in routes.chunks(self.config.batch_size.max(1)) {
            let futures = batch
                .iter()
                .map(|route| self.evaluate_route(route, departure, seats, rules, deadline));
            for itineraries in join_all(futures).await {
                found.extend(itineraries);
            }
        }

        found
    }

    /// Itineraries along one route. A missed deadline drops only this route.
    async fn evaluate_route(
        &self,
        route: &Route,
        departure: NaiveDateTime,
        seats: u32,
        rules: &LayoverRules,
        deadline: Instant,
    ) -> Vec<Itinerary> {
        match tokio::time::timeout_at(deadline, self.matcher.match_path(route, departure, seats)).await {
            Ok(Some(candidates)) => {
                let itineraries = combine(&candidates, rules, seats);
                debug!(route = %route, itineraries = itineraries.len(), "Route evaluated");
                itineraries
            }
            Ok(None) => Vec::new(),
            Err(_) => {
                warn!(route = %route, "Route evaluation missed the search deadline");
                Vec::new()
            }
        }
    }

    /// Cached itineraries for `key`. Corrupt entries are evicted.
    async fn cached(&self, key: &CacheKey) -> Option<Vec<Itinerary>> {
        let Some(bytes) = self.cache.get(key.as_str()).await else {
            debug!(key = %key, "Cache miss");
            return None;
        };

        match serde_json::from_slice::<Vec<Itinerary>>(&bytes) {
            Ok(itineraries) => {
                debug!(key = %key, itineraries = itineraries.len(), "Cache hit");
                Some(itineraries)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding corrupt cache entry");
                self.cache.evict(key.as_str()).await;
                None
            }
        }
    }

    async fn remember(&self, key: &CacheKey, itineraries: &[Itinerary]) {
        match serde_json::to_vec(itineraries) {
            Ok(bytes) => {
                self.cache
                    .put(key.as_str(), bytes, self.config.cache.ttl)
                    .await
            }
            Err(e) => warn!(key = %key, error = %e, "Failed to serialise search results"),
        }
    }
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
