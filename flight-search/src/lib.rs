//! Multi-hop flight search server.
//!
//! A web service that answers: "which flights, possibly with connections,
//! get me from this airport to that one?"

pub mod cache;
pub mod domain;
pub mod graph;
pub mod planner;
pub mod schedules;
pub mod settings;
pub mod web;
