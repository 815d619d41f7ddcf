//! Depth-first route enumeration over the schedule store.
//!
//! Used when no graph database is configured or it fails. Two airports are
//! adjacent when any schedule flies between them; adjacency lists are fetched
//! lazily and memoised for the duration of one call.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::AirportCode;
use crate::schedules::ScheduleStore;

use super::{GraphError, MAX_GRAPH_HOPS, RouteGraph};

/// Route graph derived from `destinations_reachable_from`.
pub struct DfsRouteGraph<'a, S: ScheduleStore> {
    store: &'a S,
}

impl<'a, S: ScheduleStore> DfsRouteGraph<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    async fn neighbours(
        &self,
        memo: &mut HashMap<AirportCode, Vec<AirportCode>>,
        at: AirportCode,
    ) -> Result<Vec<AirportCode>, GraphError> {
        if let Some(known) = memo.get(&at) {
            return Ok(known.clone());
        }
        let found = self.store.destinations_reachable_from(at).await?;
        memo.insert(at, found.clone());
        Ok(found)
    }

    /// Enumerate simple paths with exactly `hops` intermediate stops.
    ///
    /// Iterative backtracking: `stack[i]` holds the unexplored neighbours of
    /// `path[i]`, so the two always have equal length.
    async fn enumerate(
        &self,
        origin: AirportCode,
        destination: AirportCode,
        hops: usize,
        max_results: usize,
        memo: &mut HashMap<AirportCode, Vec<AirportCode>>,
    ) -> Result<Vec<Vec<AirportCode>>, GraphError> {
        let mut routes = Vec::new();
        if max_results == 0 || origin == destination {
            return Ok(routes);
        }

        if hops == 0 {
            if self.neighbours(memo, origin).await?.contains(&destination) {
                routes.push(vec![origin, destination]);
            }
            return Ok(routes);
        }

        let mut path = vec![origin];
        let mut stack = vec![(self.neighbours(memo, origin).await?, 0usize)];

        while let Some((candidates, next)) = stack.last_mut() {
            if *next >= candidates.len() {
                stack.pop();
                path.pop();
                continue;
            }
            let candidate = candidates[*next];
            *next += 1;

            if candidate == destination || path.contains(&candidate) {
                continue;
            }

            if path.len() == hops {
                // `candidate` would be the last intermediate stop.
                if self.neighbours(memo, candidate).await?.contains(&destination) {
                    let mut route = path.clone();
                    route.push(candidate);
                    route.push(destination);
                    routes.push(route);
                    if routes.len() >= max_results {
                        break;
                    }
                }
                continue;
            }

            let onward = self.neighbours(memo, candidate).await?;
            path.push(candidate);
            stack.push((onward, 0));
        }

        debug!(
            origin = %origin,
            destination = %destination,
            hops,
            routes = routes.len(),
            "DFS route enumeration complete"
        );
        Ok(routes)
    }
}

impl<S: ScheduleStore> RouteGraph for DfsRouteGraph<'_, S> {
    async fn shortest_paths(
        &self,
        origin: AirportCode,
        destination: AirportCode,
        max_results: usize,
    ) -> Result<Vec<Vec<AirportCode>>, GraphError> {
        let mut memo = HashMap::new();
        let mut routes = Vec::new();
        for hops in 0..=MAX_GRAPH_HOPS {
            let remaining = max_results.saturating_sub(routes.len());
            if remaining == 0 {
                break;
            }
            let found = self
                .enumerate(origin, destination, hops, remaining, &mut memo)
                .await?;
            routes.extend(found);
        }
        Ok(routes)
    }

    async fn paths_with_exact_hops(
        &self,
        origin: AirportCode,
        destination: AirportCode,
        hops: usize,
        max_results: usize,
    ) -> Result<Vec<Vec<AirportCode>>, GraphError> {
        let mut memo = HashMap::new();
        self.enumerate(origin, destination, hops, max_results, &mut memo)
            .await
    }

    async fn one_stop_connections(
        &self,
        origin: AirportCode,
        destination: AirportCode,
        max_results: usize,
    ) -> Result<Vec<Vec<AirportCode>>, GraphError> {
        self.paths_with_exact_hops(origin, destination, 1, max_results)
            .await
    }
}
