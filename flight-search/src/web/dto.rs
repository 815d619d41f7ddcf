//! Data transfer objects for web requests and responses.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::{AirportCode, Fare, Itinerary, Route, Schedule};
use crate::planner::{DEFAULT_PAGE_SIZE, SearchPage, SearchRequest, SortMode};

/// Flight search parameters, as a query string or JSON body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Origin airport code
    pub source: String,

    /// Destination airport code
    pub destination: String,

    /// Departure date, `YYYY-MM-DD`
    pub departure_date: Option<String>,

    /// Earliest departure on `departure_date`, `HH:MM`
    pub preferred_time: Option<String>,

    /// Legacy combined departure, `YYYY-MM-DDTHH:MM:SS`
    pub time: Option<String>,

    pub no_of_seats: u32,

    #[serde(default)]
    pub sort_by_price: bool,

    #[serde(default)]
    pub sort_by_hops: bool,

    /// Zero-based page index
    pub page: Option<usize>,

    pub size: Option<usize>,

    /// Upper bound on total price, in major units
    pub max_price: Option<f64>,

    pub max_hops: Option<usize>,

    /// Carrier name, partial match
    pub airline: Option<String>,
}

impl SearchQuery {
    /// Convert into a planner request.
    ///
    /// Only parses; range checks happen in [`SearchRequest::validate`].
    pub fn to_request(&self) -> Result<SearchRequest, String> {
        let origin = parse_code("source", &self.source)?;
        let destination = parse_code("destination", &self.destination)?;

        let departure_date = non_empty(&self.departure_date)
            .map(|s| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map_err(|e| format!("Invalid departureDate {s:?}: {e}"))
            })
            .transpose()?;
        let preferred_time = non_empty(&self.preferred_time)
            .map(parse_time)
            .transpose()?;
        let departure_time = non_empty(&self.time).map(parse_date_time).transpose()?;
        let max_price = self.max_price.map(parse_price).transpose()?;

        Ok(SearchRequest {
            origin,
            destination,
            seats: self.no_of_seats,
            departure_date,
            preferred_time,
            departure_time,
            max_price,
            max_hops: self.max_hops,
            carrier: non_empty(&self.airline).map(str::to_string),
            sort: SortMode::from_flags(self.sort_by_price, self.sort_by_hops),
            page: self.page.unwrap_or(0),
            size: self.size.unwrap_or(DEFAULT_PAGE_SIZE),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_code(field: &str, value: &str) -> Result<AirportCode, String> {
    AirportCode::parse_normalized(value.trim())
        .map_err(|_| format!("Invalid {field} airport code: {value}"))
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|e| format!("Invalid preferredTime {s:?}: {e}"))
}

fn parse_price(major: f64) -> Result<Fare, String> {
    if !major.is_finite() {
        return Err(format!("Invalid maxPrice: {major}"));
    }
    Ok(Fare::from_major(major))
}

fn parse_date_time(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .map_err(|e| format!("Invalid time {s:?}: {e}"))
}

/// One flight of an itinerary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResult {
    pub schedule_id: u64,
    pub flight_number: String,
    pub airline: String,
    pub source: AirportCode,
    pub destination: AirportCode,
    pub departure_time: NaiveDateTime,
    pub arrival_time: NaiveDateTime,
    pub available_seats: u32,
    pub price: Fare,
}

impl ScheduleResult {
    pub fn from_schedule(schedule: &Schedule) -> Self {
        Self {
            schedule_id: schedule.id.0,
            flight_number: schedule.flight_number.clone(),
            airline: schedule.airline.clone(),
            source: schedule.origin,
            destination: schedule.destination,
            departure_time: schedule.departure,
            arrival_time: schedule.arrival,
            available_seats: schedule.available_seats,
            price: schedule.fare,
        }
    }
}

/// An itinerary in search results.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryResult {
    /// Flight numbers joined with `+`
    pub flight_number: String,

    /// Distinct carriers joined with ` / `
    pub airline: String,

    pub departure_time: NaiveDateTime,
    pub arrival_time: NaiveDateTime,

    /// Total duration in minutes
    pub duration_mins: i64,

    /// Total price in major units
    pub price: Fare,

    pub number_of_hops: usize,

    /// Wait before each connecting flight, in minutes
    pub layover_mins: Vec<i64>,

    pub schedules: Vec<ScheduleResult>,
}

impl ItineraryResult {
    pub fn from_itinerary(itinerary: &Itinerary) -> Self {
        Self {
            flight_number: itinerary.flight_numbers(),
            airline: itinerary.carriers(),
            departure_time: itinerary.departure_time(),
            arrival_time: itinerary.arrival_time(),
            duration_mins: itinerary.total_duration().num_minutes(),
            price: itinerary.total_fare(),
            number_of_hops: itinerary.hop_count(),
            layover_mins: itinerary
                .layovers()
                .iter()
                .map(|wait| wait.num_minutes())
                .collect(),
            schedules: itinerary
                .segments()
                .iter()
                .map(ScheduleResult::from_schedule)
                .collect(),
        }
    }
}

/// One page of search results.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub content: Vec<ItineraryResult>,
    pub page: usize,
    pub size: usize,
    pub total_elements: usize,
    pub total_pages: usize,
}

impl SearchResponse {
    pub fn from_page(page: &SearchPage) -> Self {
        Self {
            content: page
                .itineraries
                .iter()
                .map(ItineraryResult::from_itinerary)
                .collect(),
            page: page.page,
            size: page.size,
            total_elements: page.total,
            total_pages: page.total_pages(),
        }
    }
}

/// Route enumeration parameters.
#[derive(Debug, Deserialize)]
pub struct RouteQuery {
    pub source: String,
    pub destination: String,

    /// Exact intermediate stops; shortest routes of any length when absent
    pub hops: Option<usize>,
}

impl RouteQuery {
    pub fn codes(&self) -> Result<(AirportCode, AirportCode), String> {
        Ok((
            parse_code("source", &self.source)?,
            parse_code("destination", &self.destination)?,
        ))
    }
}

/// Route enumeration response.
#[derive(Debug, Serialize)]
pub struct RoutesResponse {
    pub routes: Vec<Route>,
}

/// Result of an index rebuild.
#[derive(Debug, Serialize)]
pub struct IndexSyncResponse {
    pub schedules: usize,
}

/// Result of a graph sync.
#[derive(Debug, Serialize)]
pub struct GraphSyncResponse {
    pub airports: usize,
    pub routes: usize,
}

/// Relational store health.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseHealthResponse {
    pub status: &'static str,
    pub schedule_count: Option<u64>,
    pub message: String,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ScheduleId;
    use chrono::Duration;

    fn query() -> SearchQuery {
        SearchQuery {
            source: "del".into(),
            destination: " BOM ".into(),
            departure_date: Some("2025-08-20".into()),
            no_of_seats: 2,
            ..SearchQuery::default()
        }
    }

    #[test]
    fn codes_are_normalised() {
        let req = query().to_request().unwrap();
        assert_eq!(req.origin.as_str(), "DEL");
        assert_eq!(req.destination.as_str(), "BOM");
        assert_eq!(req.seats, 2);
        assert_eq!(req.page, 0);
        assert_eq!(req.size, 10);
        assert_eq!(req.sort, SortMode::Departure);
    }

    #[test]
    fn date_and_preferred_time() {
        let mut q = query();
        q.preferred_time = Some("09:30".into());
        q.time = Some("2025-08-21T18:00:00".into());

        let req = q.to_request().unwrap();
        assert_eq!(
            req.effective_departure(),
            NaiveDate::from_ymd_opt(2025, 8, 20)
                .unwrap()
                .and_hms_opt(9, 30, 0)
        );
    }

    #[test]
    fn legacy_time_only() {
        let mut q = query();
        q.departure_date = None;
        q.time = Some("2025-08-20T06:00:00".into());

        let req = q.to_request().unwrap();
        assert_eq!(
            req.effective_departure(),
            NaiveDate::from_ymd_opt(2025, 8, 20)
                .unwrap()
                .and_hms_opt(6, 0, 0)
        );
    }

    #[test]
    fn filters_and_sort() {
        let mut q = query();
        q.sort_by_price = true;
        q.sort_by_hops = true;
        q.max_price = Some(25000.0);
        q.max_hops = Some(1);
        q.airline = Some("Air India".into());
        q.page = Some(2);
        q.size = Some(5);

        let req = q.to_request().unwrap();
        assert_eq!(req.sort, SortMode::PriceThenHops);
        assert_eq!(req.max_price, Some(Fare::from_major(25000.0)));
        assert_eq!(req.max_hops, Some(1));
        assert_eq!(req.carrier.as_deref(), Some("Air India"));
        assert_eq!((req.page, req.size), (2, 5));
    }

    #[test]
    fn malformed_input_rejected() {
        let mut q = query();
        q.source = "DELHI".into();
        assert!(q.to_request().is_err());

        let mut q = query();
        q.departure_date = Some("20/08/2025".into());
        assert!(q.to_request().is_err());

        let mut q = query();
        q.preferred_time = Some("9am".into());
        assert!(q.to_request().is_err());
    }

    #[test]
    fn non_finite_price_cap_rejected() {
        for raw in ["NaN", "inf", "-inf"] {
            let uri: axum::http::Uri =
                format!("/search?source=DEL&destination=BOM&noOfSeats=1&maxPrice={raw}")
                    .parse()
                    .unwrap();
            let axum::extract::Query(q) = axum::extract::Query::<SearchQuery>::try_from_uri(&uri).unwrap();
            assert!(q.to_request().is_err(), "maxPrice={raw} accepted");
        }
    }

    #[test]
    fn json_body_uses_camel_case() {
        let q: SearchQuery = serde_json::from_str(
            r#"{"source":"DEL","destination":"BOM","departureDate":"2025-08-20","noOfSeats":1,"sortByPrice":true}"#,
        )
        .unwrap();
        assert!(q.sort_by_price);
        assert_eq!(q.no_of_seats, 1);
    }

    #[test]
    fn itinerary_result_fields() {
        let dep = NaiveDate::from_ymd_opt(2025, 8, 20)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        let leg = |id: u64, from: &str, to: &str, at: NaiveDateTime, airline: &str| Schedule {
            id: ScheduleId(id),
            flight_number: format!("AI{id}"),
            airline: airline.into(),
            origin: AirportCode::parse(from).unwrap(),
            destination: AirportCode::parse(to).unwrap(),
            departure: at,
            arrival: at + Duration::hours(2),
            available_seats: 4,
            fare: Fare::from_major(5000.0),
        };
        let itinerary = Itinerary::new(vec![
            leg(101, "DEL", "BLR", dep, "Air India"),
            leg(202, "BLR", "BOM", dep + Duration::hours(3), "IndiGo"),
        ])
        .unwrap();

        let result = ItineraryResult::from_itinerary(&itinerary);
        assert_eq!(result.flight_number, "AI101+AI202");
        assert_eq!(result.airline, "Air India / IndiGo");
        assert_eq!(result.number_of_hops, 1);
        assert_eq!(result.layover_mins, vec![60]);
        assert_eq!(result.duration_mins, 300);
        assert_eq!(result.price, Fare::from_major(10000.0));
        assert_eq!(result.schedules.len(), 2);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["flightNumber"], "AI101+AI202");
        assert_eq!(json["numberOfHops"], 1);
        assert_eq!(json["layoverMins"][0], 60);
        assert_eq!(json["price"], 10000.0);
        assert_eq!(json["schedules"][0]["source"], "DEL");
    }
}
