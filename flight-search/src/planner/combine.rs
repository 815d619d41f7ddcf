//! Combination validation.
//!
//! Given candidate schedules for every edge of a path, enumerate each choice
//! of one schedule per edge whose consecutive segments form valid
//! connections. Pure and synchronous; runs once per path.

use tracing::warn;

use crate::domain::{Itinerary, LayoverRules, Schedule};

/// Whether `next` can follow `prev` in an itinerary.
pub fn is_valid_connection(prev: &Schedule, next: &Schedule, rules: &LayoverRules) -> bool {
    rules.connects(prev, next)
}

/// Every valid itinerary formed by picking one candidate per edge.
///
/// Depth-first backtracking over edge index with one reusable buffer.
/// Candidates are pruned as soon as they fail to connect to the previous
/// choice. Complete assignments are re-checked in full before being emitted;
/// anything failing that check is logged and dropped.
pub fn combine(candidates: &[Vec<Schedule>], rules: &LayoverRules, seats: u32) -> Vec<Itinerary> {
    let mut found = Vec::new();
    if candidates.is_empty() || candidates.iter().any(Vec::is_empty) {
        return found;
    }

    let mut current: Vec<&Schedule> = Vec::with_capacity(candidates.len());
    backtrack(0, candidates, rules, seats, &mut current, &mut found);
    found
}

fn backtrack<'c>(
    edge: usize,
    candidates: &'c [Vec<Schedule>],
    rules: &LayoverRules,
    seats: u32,
    current: &mut Vec<&'c Schedule>,
    found: &mut Vec<Itinerary>,
) {
    if edge == candidates.len() {
        if let Some(itinerary) = accept(current, rules, seats) {
            found.push(itinerary);
        }
        return;
    }

    for candidate in &candidates[edge] {
        if let Some(prev) = current.last() {
            if !is_valid_connection(prev, candidate, rules) {
                continue;
            }
        }
        current.push(candidate);
        backtrack(edge + 1, candidates, rules, seats, current, found);
        current.pop();
    }
}

fn accept(chosen: &[&Schedule], rules: &LayoverRules, seats: u32) -> Option<Itinerary> {
    let segments: Vec<Schedule> = chosen.iter().map(|s| (*s).clone()).collect();
    let ids: Vec<u64> = segments.iter().map(|s| s.id.0).collect();

    match Itinerary::new(segments) {
        Ok(itinerary) if itinerary.satisfies(rules) && itinerary.has_seats(seats) => {
            Some(itinerary)
        }
        Ok(_) => {
            warn!(segments = ?ids, "Dropping combination that breaks layover or seat limits");
            None
        }
        Err(e) => {
            warn!(segments = ?ids, error = %e, "Dropping invalid combination");
            None
        }
    }
}
