//! Web layer for the flight search service.
//!
//! Provides HTTP endpoints for searching itineraries and for the admin
//! operations that keep the index, graph and cache in step with the store.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
