//! Itinerary ranking for search results.
//!
//! Merges the itineraries found for every hop count, applies the request's
//! filters, orders them and cuts out the requested page.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Serialize;

use crate::domain::{Fare, Itinerary};

use super::request::SortMode;

/// One page of ranked itineraries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPage {
    pub itineraries: Vec<Itinerary>,

    /// Itineraries across all pages, after filtering.
    pub total: usize,

    /// Zero-based page index.
    pub page: usize,

    pub size: usize,
}

impl SearchPage {
    /// An empty first page.
    pub fn empty(size: usize) -> Self {
        Self {
            itineraries: Vec::new(),
            total: 0,
            page: 0,
            size,
        }
    }

    pub fn total_pages(&self) -> usize {
        if self.size == 0 {
            return 0;
        }
        self.total.div_ceil(self.size)
    }
}

/// Remove itineraries with the same ordered segments.
///
/// The first occurrence wins, so callers control which copy survives by the
/// order they merge in.
pub fn deduplicate(itineraries: Vec<Itinerary>) -> Vec<Itinerary> {
    let mut seen = HashSet::new();
    itineraries
        .into_iter()
        .filter(|it| seen.insert(it.segment_ids()))
        .collect()
}

/// Keep itineraries within `max_price` and operated (in part) by `carrier`.
///
/// The carrier matches when any single segment's airline contains it; see
/// [`Itinerary::operated_by`].
pub fn filter(
    itineraries: Vec<Itinerary>,
    max_price: Option<Fare>,
    carrier: Option<&str>,
) -> Vec<Itinerary> {
    let carrier = carrier.map(str::trim).filter(|c| !c.is_empty());
    itineraries
        .into_iter()
        .filter(|it| max_price.is_none_or(|max| it.total_fare() <= max))
        .filter(|it| carrier.is_none_or(|c| it.operated_by(c)))
        .collect()
}

/// Sort itineraries by `mode`.
///
/// Every mode ends with departure, arrival and segment ids, so the order is
/// total and two runs over the same set agree.
pub fn sort_itineraries(mut itineraries: Vec<Itinerary>, mode: SortMode) -> Vec<Itinerary> {
    itineraries.sort_by(|a, b| primary(a, b, mode).then_with(|| tie_break(a, b)));
    itineraries
}

fn primary(a: &Itinerary, b: &Itinerary, mode: SortMode) -> Ordering {
    match mode {
        SortMode::PriceThenHops => a
            .total_fare()
            .cmp(&b.total_fare())
            .then(a.hop_count().cmp(&b.hop_count())),
        SortMode::Price => a.total_fare().cmp(&b.total_fare()),
        SortMode::Hops => a.hop_count().cmp(&b.hop_count()),
        SortMode::Departure => Ordering::Equal,
    }
}

fn tie_break(a: &Itinerary, b: &Itinerary) -> Ordering {
    a.departure_time()
        .cmp(&b.departure_time())
        .then(a.arrival_time().cmp(&b.arrival_time()))
        .then_with(|| a.segment_ids().cmp(&b.segment_ids()))
}

/// Cut page `page` of `size` out of an already ordered list.
///
/// A page past the end is empty but still reports the full total.
pub fn paginate(itineraries: Vec<Itinerary>, page: usize, size: usize) -> SearchPage {
    let total = itineraries.len();
    let offset = page.saturating_mul(size).min(total);
    let end = offset.saturating_add(size).min(total);

    SearchPage {
        itineraries: itineraries
            .into_iter()
            .skip(offset)
            .take(end - offset)
            .collect(),
        total,
        page,
        size,
    }
}
