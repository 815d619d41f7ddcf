//! Multi-hop itinerary planner.
//!
//! This module answers: "which flights get me from A to B, leaving after T,
//! with at most N stops?"
//!
//! The search runs in stages. Route discovery proposes airport paths for each
//! hop count, segment matching finds candidate flights for every edge of a
//! path, and combination validation keeps the choices whose connections obey
//! the layover rules. Results are merged, cached, filtered, ranked and paged.

mod combine;
mod config;
mod discovery;
mod matching;
mod rank;
mod request;
mod search;

pub use combine::{combine, is_valid_connection};
pub use config::{SearchConfig, WindowStrategy};
pub use discovery::RouteFinder;
pub use matching::SegmentMatcher;
pub use rank::{SearchPage, deduplicate, filter, paginate, sort_itineraries};
pub use request::{DEFAULT_PAGE_SIZE, SearchRequest, SortMode};
pub use search::{Planner, SearchError};
