//! Search requests.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::domain::{AirportCode, Fare};

use super::config::SearchConfig;
use super::search::SearchError;

/// Default page size when the caller doesn't name one.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Cheapest first, fewer stops breaking ties
    PriceThenHops,
    /// Cheapest first
    Price,
    /// Fewest stops first
    Hops,
    /// Earliest departure first
    #[default]
    Departure,
}

impl SortMode {
    /// Resolve the two request flags into one mode.
    pub fn from_flags(by_price: bool, by_hops: bool) -> Self {
        match (by_price, by_hops) {
            (true, true) => SortMode::PriceThenHops,
            (true, false) => SortMode::Price,
            (false, true) => SortMode::Hops,
            (false, false) => SortMode::Departure,
        }
    }
}

/// Request for itinerary search.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub origin: AirportCode,
    pub destination: AirportCode,

    /// Seats required on every segment.
    pub seats: u32,

    /// Departure date. Takes priority over `departure_time`.
    pub departure_date: Option<NaiveDate>,

    /// Earliest time of day on `departure_date`; midnight when absent.
    pub preferred_time: Option<NaiveTime>,

    /// Combined earliest-departure timestamp, used only without a date.
    pub departure_time: Option<NaiveDateTime>,

    /// Upper bound on total fare.
    pub max_price: Option<Fare>,

    /// Upper bound on intermediate stops.
    pub max_hops: Option<usize>,

    /// Case-insensitive carrier substring; matches if any segment matches.
    pub carrier: Option<String>,

    pub sort: SortMode,

    /// Zero-based page index.
    pub page: usize,

    pub size: usize,
}

impl SearchRequest {
    /// Create a request for flights departing at or after `departure`.
    pub fn new(origin: AirportCode, destination: AirportCode, departure: NaiveDateTime) -> Self {
        Self {
            origin,
            destination,
            seats: 1,
            departure_date: None,
            preferred_time: None,
            departure_time: Some(departure),
            max_price: None,
            max_hops: None,
            carrier: None,
            sort: SortMode::default(),
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Create a request for flights on `date`, from midnight.
    pub fn on_date(origin: AirportCode, destination: AirportCode, date: NaiveDate) -> Self {
        Self {
            departure_date: Some(date),
            departure_time: None,
            ..Self::new(origin, destination, date.and_time(NaiveTime::MIN))
        }
    }

    pub fn with_seats(mut self, seats: u32) -> Self {
        self.seats = seats;
        self
    }

    pub fn with_preferred_time(mut self, time: NaiveTime) -> Self {
        self.preferred_time = Some(time);
        self
    }

    pub fn with_max_price(mut self, fare: Fare) -> Self {
        self.max_price = Some(fare);
        self
    }

    pub fn with_max_hops(mut self, hops: usize) -> Self {
        self.max_hops = Some(hops);
        self
    }

    pub fn with_carrier(mut self, carrier: impl Into<String>) -> Self {
        self.carrier = Some(carrier.into());
        self
    }

    pub fn with_sort(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_page(mut self, page: usize, size: usize) -> Self {
        self.page = page;
        self.size = size;
        self
    }

    /// The earliest departure to search from.
    ///
    /// A date (plus preferred time, or midnight) wins over the combined
    /// timestamp. `None` when neither is set.
    pub fn effective_departure(&self) -> Option<NaiveDateTime> {
        match self.departure_date {
            Some(date) => Some(date.and_time(self.preferred_time.unwrap_or(NaiveTime::MIN))),
            None => self.departure_time,
        }
    }

    /// The hop bound to search up to.
    pub fn effective_max_hops(&self, config: &SearchConfig) -> usize {
        self.max_hops.unwrap_or(config.default_max_hops)
    }

    /// Validate the search request.
    pub fn validate(&self, config: &SearchConfig) -> Result<(), SearchError> {
        if self.origin == self.destination {
            return Err(SearchError::InvalidRequest(
                "origin and destination must differ".to_string(),
            ));
        }

        if self.seats == 0 {
            return Err(SearchError::InvalidRequest(
                "number of seats must be positive".to_string(),
            ));
        }

        if self.effective_departure().is_none() {
            return Err(SearchError::InvalidRequest(
                "a departure date or time is required".to_string(),
            ));
        }

        if self.size == 0 || self.size > config.max_page_size {
            return Err(SearchError::InvalidRequest(format!(
                "page size must be between 1 and {}",
                config.max_page_size
            )));
        }

        if let Some(hops) = self.max_hops {
            if hops > config.max_hops_limit {
                return Err(SearchError::InvalidRequest(format!(
                    "max hops must be at most {}",
                    config.max_hops_limit
                )));
            }
        }

        if let Some(price) = self.max_price {
            if price < Fare::ZERO {
                return Err(SearchError::InvalidRequest(
                    "max price must not be negative".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> AirportCode {
        AirportCode::parse(s).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 20).unwrap()
    }

    fn request() -> SearchRequest {
        SearchRequest::on_date(code("DEL"), code("BOM"), date())
    }

    #[test]
    fn date_defaults_to_midnight() {
        assert_eq!(
            request().effective_departure(),
            Some(date().and_hms_opt(0, 0, 0).unwrap())
        );
    }

    #[test]
    fn date_and_time_win_over_timestamp() {
        let mut req = request().with_preferred_time(NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        req.departure_time = Some(date().and_hms_opt(18, 0, 0).unwrap());
        assert_eq!(
            req.effective_departure(),
            Some(date().and_hms_opt(9, 30, 0).unwrap())
        );
    }

    #[test]
    fn timestamp_used_without_date() {
        let at = date().and_hms_opt(6, 0, 0).unwrap();
        let req = SearchRequest::new(code("DEL"), code("BOM"), at);
        assert_eq!(req.effective_departure(), Some(at));
    }

    #[test]
    fn sort_flags() {
        assert_eq!(SortMode::from_flags(true, true), SortMode::PriceThenHops);
        assert_eq!(SortMode::from_flags(true, false), SortMode::Price);
        assert_eq!(SortMode::from_flags(false, true), SortMode::Hops);
        assert_eq!(SortMode::from_flags(false, false), SortMode::Departure);
    }

    #[test]
    fn effective_max_hops_defaults_from_config() {
        let config = SearchConfig::default();
        assert_eq!(request().effective_max_hops(&config), 3);
        assert_eq!(request().with_max_hops(1).effective_max_hops(&config), 1);
    }

    #[test]
    fn validation() {
        let config = SearchConfig::default();
        assert!(request().validate(&config).is_ok());

        assert!(request().with_seats(0).validate(&config).is_err());
        assert!(request().with_page(0, 0).validate(&config).is_err());
        assert!(request().with_page(0, 101).validate(&config).is_err());
        assert!(request().with_max_hops(4).validate(&config).is_err());
        assert!(
            request()
                .with_max_price(Fare::from_minor(-1))
                .validate(&config)
                .is_err()
        );

        let mut no_departure = request();
        no_departure.departure_date = None;
        assert!(no_departure.validate(&config).is_err());

        let same = SearchRequest::on_date(code("DEL"), code("DEL"), date());
        assert!(same.validate(&config).is_err());
    }
}
