//! Airport connectivity graph.
//!
//! A [`RouteGraph`] enumerates simple paths of airport codes. The Neo4j
//! backend answers from a synced topology; the depth-first backend walks the
//! schedule store's reachability relation and is always available.

mod dfs;
mod error;
mod neo4j;

use std::future::Future;

use crate::domain::AirportCode;

pub use dfs::DfsRouteGraph;
pub use error::GraphError;
pub use neo4j::{Neo4jConfig, Neo4jRouteGraph};

/// Longest path any backend enumerates, in intermediate stops.
pub const MAX_GRAPH_HOPS: usize = 3;

/// Source of candidate paths between airports.
///
/// Paths are ordered airport codes, origin first. Callers re-validate what
/// they receive, so a backend returning a malformed path costs only that path.
pub trait RouteGraph: Send + Sync {
    /// Up to `max_results` paths with between 0 and [`MAX_GRAPH_HOPS`] stops,
    /// fewest stops first.
    fn shortest_paths(
        &self,
        origin: AirportCode,
        destination: AirportCode,
        max_results: usize,
    ) -> impl Future<Output = Result<Vec<Vec<AirportCode>>, GraphError>> + Send;

    /// Up to `max_results` simple paths with exactly `hops` intermediate stops.
    fn paths_with_exact_hops(
        &self,
        origin: AirportCode,
        destination: AirportCode,
        hops: usize,
        max_results: usize,
    ) -> impl Future<Output = Result<Vec<Vec<AirportCode>>, GraphError>> + Send;

    /// Up to `max_results` paths through exactly one intermediate airport.
    fn one_stop_connections(
        &self,
        origin: AirportCode,
        destination: AirportCode,
        max_results: usize,
    ) -> impl Future<Output = Result<Vec<Vec<AirportCode>>, GraphError>> + Send;
}
