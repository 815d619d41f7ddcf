//! Search configuration for the itinerary planner.

use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::Duration;

use crate::cache::CacheConfig;
use crate::domain::{LayoverRules, MAX_LAYOVER_MINUTES, MIN_LAYOVER_MINUTES};

/// How the departure window of each later segment is derived from the
/// candidates of the segment before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowStrategy {
    /// Start at the earliest previous arrival plus the minimum layover and
    /// span the fixed horizon. Cheap, but can miss connections from later
    /// candidates when the previous edge has a wide spread of arrivals.
    #[default]
    AnchorEarliest,

    /// Start at the earliest previous arrival plus the minimum layover and
    /// end at the latest previous arrival plus the maximum layover.
    SpanCandidates,
}

impl FromStr for WindowStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "anchorearliest" | "anchor" => Ok(WindowStrategy::AnchorEarliest),
            "spancandidates" | "span" => Ok(WindowStrategy::SpanCandidates),
            other => Err(format!("unknown window strategy: {other}")),
        }
    }
}

/// Configuration parameters for itinerary search.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Minimum connection time (minutes). Tighter connections are rejected.
    pub min_layover_mins: i64,

    /// Maximum connection time (minutes). Longer waits are rejected.
    pub max_layover_mins: i64,

    /// Width of each segment's departure window (hours).
    pub segment_window_hours: i64,

    /// Maximum candidate schedules kept per edge of a path.
    pub max_candidates_per_edge: usize,

    /// Maximum paths taken from the route graph per hop count.
    pub max_routes_per_hop: usize,

    /// Hop bound used when the request doesn't name one.
    pub default_max_hops: usize,

    /// Largest hop bound a request may ask for.
    pub max_hops_limit: usize,

    /// Largest page size a request may ask for.
    pub max_page_size: usize,

    /// Number of paths evaluated concurrently.
    pub batch_size: usize,

    /// Deadline for each graph or schedule store call (milliseconds).
    pub call_timeout_ms: u64,

    /// Deadline for evaluating all paths of one search (milliseconds).
    pub search_deadline_ms: u64,

    pub window_strategy: WindowStrategy,

    /// Result cache TTL, capacity and key prefix.
    pub cache: CacheConfig,
}

impl SearchConfig {
    /// Set the layover bounds.
    pub fn with_layovers(mut self, min_mins: i64, max_mins: i64) -> Self {
        self.min_layover_mins = min_mins;
        self.max_layover_mins = max_mins;
        self
    }

    pub fn with_window_strategy(mut self, strategy: WindowStrategy) -> Self {
        self.window_strategy = strategy;
        self
    }

    /// Set the per-call timeout.
    pub fn with_call_timeout(mut self, ms: u64) -> Self {
        self.call_timeout_ms = ms;
        self
    }

    /// Set the overall search deadline.
    pub fn with_search_deadline(mut self, ms: u64) -> Self {
        self.search_deadline_ms = ms;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Returns the layover bounds as rules.
    pub fn layover_rules(&self) -> LayoverRules {
        LayoverRules::from_minutes(self.min_layover_mins, self.max_layover_mins)
    }

    /// Returns the minimum layover as a Duration.
    pub fn min_layover(&self) -> Duration {
        Duration::minutes(self.min_layover_mins)
    }

    /// Returns the maximum layover as a Duration.
    pub fn max_layover(&self) -> Duration {
        Duration::minutes(self.max_layover_mins)
    }

    /// Returns the segment window as a Duration.
    pub fn segment_window(&self) -> Duration {
        Duration::hours(self.segment_window_hours)
    }

    pub fn call_timeout(&self) -> StdDuration {
        StdDuration::from_millis(self.call_timeout_ms)
    }

    pub fn search_deadline(&self) -> StdDuration {
        StdDuration::from_millis(self.search_deadline_ms)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_layover_mins: MIN_LAYOVER_MINUTES,
            max_layover_mins: MAX_LAYOVER_MINUTES,
            segment_window_hours: 24,
            max_candidates_per_edge: 100,
            max_routes_per_hop: 100,
            default_max_hops: 3,
            max_hops_limit: 3,
            max_page_size: 100,
            batch_size: 8,
            call_timeout_ms: 2_000,
            search_deadline_ms: 10_000,
            window_strategy: WindowStrategy::AnchorEarliest,
            cache: CacheConfig::default(),
        }
    }
}
