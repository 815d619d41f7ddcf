//! Route discovery.
//!
//! Asks the graph backend for paths of each hop count, falling back to a
//! depth-first walk of the schedule store when the backend is missing, fails
//! or is too slow. Whatever comes back is re-validated before use.

use std::collections::HashSet;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{AirportCode, Route};
use crate::graph::{DfsRouteGraph, GraphError, RouteGraph};
use crate::schedules::ScheduleStore;

use super::config::SearchConfig;

/// Route enumeration with graph-then-DFS fallback.
pub struct RouteFinder<'a, G: RouteGraph, S: ScheduleStore> {
    graph: Option<&'a G>,
    fallback: DfsRouteGraph<'a, S>,
    config: &'a SearchConfig,
}

impl<'a, G: RouteGraph, S: ScheduleStore> RouteFinder<'a, G, S> {
    pub fn new(graph: Option<&'a G>, store: &'a S, config: &'a SearchConfig) -> Self {
        Self {
            graph,
            fallback: DfsRouteGraph::new(store),
            config,
        }
    }

    /// Every route with 0 to `max_hops` intermediate stops, fewest stops first.
    pub async fn discover_paths(
        &self,
        origin: AirportCode,
        destination: AirportCode,
        max_hops: usize,
    ) -> Vec<Route> {
        let deadline = self.deadline();
        let mut routes = Vec::new();
        for hops in 0..=max_hops {
            routes.extend(
                self.routes_before(origin, destination, hops, deadline)
                    .await,
            );
        }
        info!(
            origin = %origin,
            destination = %destination,
            max_hops,
            routes = routes.len(),
            "Route discovery complete"
        );
        routes
    }

    /// Simple routes with exactly `hops` intermediate stops.
    pub async fn find_routes_with_hops(
        &self,
        origin: AirportCode,
        destination: AirportCode,
        hops: usize,
    ) -> Vec<Route> {
        self.routes_before(origin, destination, hops, self.deadline())
            .await
    }

    /// As [`find_routes_with_hops`](Self::find_routes_with_hops), giving up
    /// at `deadline`.
    pub async fn routes_before(
        &self,
        origin: AirportCode,
        destination: AirportCode,
        hops: usize,
        deadline: Instant,
    ) -> Vec<Route> {
        let raw = self
            .with_fallback(Query::ExactHops(hops), origin, destination, deadline)
            .await;
        let routes = self.validated(raw, origin, destination, Some(hops));
        debug!(origin = %origin, destination = %destination, hops, routes = routes.len(), "Routes found");
        routes
    }

    /// Shortest routes regardless of stop count, for diagnostics.
    pub async fn shortest_routes(&self, origin: AirportCode, destination: AirportCode) -> Vec<Route> {
        let raw = self
            .with_fallback(Query::Shortest, origin, destination, self.deadline())
            .await;
        self.validated(raw, origin, destination, None)
    }

    /// One-stop routes, for diagnostics.
    pub async fn one_stop_routes(&self, origin: AirportCode, destination: AirportCode) -> Vec<Route> {
        let raw = self
            .with_fallback(Query::OneStop, origin, destination, self.deadline())
            .await;
        self.validated(raw, origin, destination, Some(1))
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.config.search_deadline()
    }

    /// Run `query` against the graph backend under the call timeout, and
    /// against the DFS fallback if that doesn't produce an answer. Nothing
    /// runs past `deadline`.
    async fn with_fallback(
        &self,
        query: Query,
        origin: AirportCode,
        destination: AirportCode,
        deadline: Instant,
    ) -> Vec<Vec<AirportCode>> {
        let limit = self.config.max_routes_per_hop;

        if let Some(graph) = self.graph {
            let call = query.run(graph, origin, destination, limit);
            let call_deadline = deadline.min(Instant::now() + self.config.call_timeout());
            match tokio::time::timeout_at(call_deadline, call).await {
                Ok(Ok(paths)) => return paths,
                Ok(Err(e)) => warn!(
                    query = ?query,
                    origin = %origin,
                    destination = %destination,
                    error = %e,
                    "Graph query failed, falling back to DFS"
                ),
                Err(_) => warn!(
                    query = ?query,
                    origin = %origin,
                    destination = %destination,
                    "Graph query timed out, falling back to DFS"
                ),
            }
        }

        // The DFS issues many store calls, so it gets whatever is left of the
        // search deadline.
        let call = query.run(&self.fallback, origin, destination, limit);
        match tokio::time::timeout_at(deadline, call).await {
            Ok(Ok(paths)) => paths,
            Ok(Err(e)) => {
                warn!(query = ?query, origin = %origin, destination = %destination, error = %e, "DFS fallback failed");
                Vec::new()
            }
            Err(_) => {
                warn!(query = ?query, origin = %origin, destination = %destination, "DFS fallback timed out");
                Vec::new()
            }
        }
    }

    /// Drop malformed or duplicate paths and cap the count.
    fn validated(
        &self,
        raw: Vec<Vec<AirportCode>>,
        origin: AirportCode,
        destination: AirportCode,
        hops: Option<usize>,
    ) -> Vec<Route> {
        let mut seen = HashSet::new();
        let mut routes = Vec::new();

        for path in raw {
            let checked = match hops {
                Some(hops) => Route::with_shape(path.clone(), origin, destination, hops),
                None => Route::new(path.clone()).and_then(|r| {
                    Route::with_shape(r.airports().to_vec(), origin, destination, r.hop_count())
                }),
            };
            match checked {
                Ok(route) => {
                    if seen.insert(route.clone()) {
                        routes.push(route);
                    }
                }
                Err(e) => warn!(path = ?path, error = %e, "Dropping malformed route"),
            }
            if routes.len() >= self.config.max_routes_per_hop {
                break;
            }
        }

        routes
    }
}

/// Shape of a route graph query.
#[derive(Debug, Clone, Copy)]
enum Query {
    ExactHops(usize),
    Shortest,
    OneStop,
}

impl Query {
    async fn run<R: RouteGraph>(
        self,
        graph: &R,
        origin: AirportCode,
        destination: AirportCode,
        limit: usize,
    ) -> Result<Vec<Vec<AirportCode>>, GraphError> {
        match self {
            Query::ExactHops(hops) => {
                graph
                    .paths_with_exact_hops(origin, destination, hops, limit)
                    .await
            }
            Query::Shortest => graph.shortest_paths(origin, destination, limit).await,
            Query::OneStop => graph.one_stop_connections(origin, destination, limit).await,
        }
    }
}
