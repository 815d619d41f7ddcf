//! Application state for the web layer.

use std::sync::Arc;

use crate::cache::MokaResultCache;
use crate::graph::Neo4jRouteGraph;
use crate::planner::SearchConfig;
use crate::schedules::{ScheduleIndex, SqliteScheduleStore};

/// Shared application state.
///
/// Contains all the services needed to handle requests.
#[derive(Clone)]
pub struct AppState {
    /// Relational schedule store
    pub store: Arc<SqliteScheduleStore>,

    /// In-memory schedule index, preferred over the store
    pub index: Arc<ScheduleIndex>,

    /// Graph backend; `None` when unconfigured or unreachable at startup
    pub graph: Option<Arc<Neo4jRouteGraph>>,

    /// Search result cache
    pub cache: Arc<MokaResultCache>,

    /// Planner configuration
    pub config: Arc<SearchConfig>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(
        store: SqliteScheduleStore,
        index: ScheduleIndex,
        graph: Option<Neo4jRouteGraph>,
        config: SearchConfig,
    ) -> Self {
        let cache = MokaResultCache::new(&config.cache);
        Self {
            store: Arc::new(store),
            index: Arc::new(index),
            graph: graph.map(Arc::new),
            cache: Arc::new(cache),
            config: Arc::new(config),
        }
    }
}
