//! Server settings read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::graph::Neo4jConfig;
use crate::planner::{SearchConfig, WindowStrategy};

const DEFAULT_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DATABASE: &str = "flight_search.db";

/// Error reading settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid value for {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

/// Settings for the server binary.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Address to listen on (`FLIGHT_SEARCH_ADDR`).
    pub addr: SocketAddr,

    /// SQLite database file (`FLIGHT_SEARCH_DB`).
    pub database: PathBuf,

    /// Graph backend, if `NEO4J_URL` is set.
    pub neo4j: Option<Neo4jConfig>,

    /// Result cache TTL (`FLIGHT_SEARCH_CACHE_TTL_SECS`).
    pub cache_ttl: Duration,

    /// Later-segment window strategy (`FLIGHT_SEARCH_WINDOW_STRATEGY`).
    pub window_strategy: WindowStrategy,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`, which returns a variable's value if set.
    pub fn from_lookup<F>(mut lookup: F) -> Result<Self, SettingsError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let addr = var("FLIGHT_SEARCH_ADDR")
            .unwrap_or_else(|| DEFAULT_ADDR.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| SettingsError::Invalid {
                name: "FLIGHT_SEARCH_ADDR",
                message: e.to_string(),
            })?;

        let database = var("FLIGHT_SEARCH_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE));

        let neo4j = var("NEO4J_URL").map(|url| {
            let mut config = Neo4jConfig::new(url);
            if let Some(database) = var("NEO4J_DATABASE") {
                config = config.with_database(database);
            }
            if let (Some(user), Some(password)) = (var("NEO4J_USER"), var("NEO4J_PASSWORD")) {
                config = config.with_credentials(user, password);
            }
            config
        });

        let cache_ttl = match var("FLIGHT_SEARCH_CACHE_TTL_SECS") {
            Some(secs) => Duration::from_secs(secs.trim().parse().map_err(
                |e: std::num::ParseIntError| SettingsError::Invalid {
                    name: "FLIGHT_SEARCH_CACHE_TTL_SECS",
                    message: e.to_string(),
                },
            )?),
            None => CacheConfig::default().ttl,
        };

        let window_strategy = match var("FLIGHT_SEARCH_WINDOW_STRATEGY") {
            Some(s) => s.parse().map_err(|message| SettingsError::Invalid {
                name: "FLIGHT_SEARCH_WINDOW_STRATEGY",
                message,
            })?,
            None => WindowStrategy::default(),
        };

        Ok(Self {
            addr,
            database,
            neo4j,
            cache_ttl,
            window_strategy,
        })
    }

    /// Cache configuration with the configured TTL.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: self.cache_ttl,
            ..CacheConfig::default()
        }
    }

    /// Planner configuration with the configured window strategy and cache.
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig::default()
            .with_window_strategy(self.window_strategy)
            .with_cache(self.cache_config())
    }
}
