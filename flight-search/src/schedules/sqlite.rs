//! Relational schedule store backed by SQLite.
//!
//! Queries run on tokio's blocking pool. Times are stored as ISO-8601 text
//! (`2025-08-20T06:00:00`), which sorts lexicographically in time order, so
//! range predicates and `ORDER BY` work on the raw column.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use rusqlite::{Connection, Row, params};
use tracing::debug;

use crate::domain::{Airport, AirportCode, Coordinates, Fare, Schedule, ScheduleId};

use super::{ScheduleStore, StoreError};

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS airports (
    code      TEXT PRIMARY KEY,
    name      TEXT NOT NULL,
    city      TEXT NOT NULL,
    country   TEXT NOT NULL,
    latitude  REAL,
    longitude REAL
);
CREATE TABLE IF NOT EXISTS schedules (
    id              INTEGER PRIMARY KEY,
    flight_number   TEXT NOT NULL,
    airline         TEXT NOT NULL,
    source          TEXT NOT NULL,
    destination     TEXT NOT NULL,
    departure_time  TEXT NOT NULL,
    arrival_time    TEXT NOT NULL,
    available_seats INTEGER NOT NULL,
    fare_minor      INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_schedule_source_dest_time
    ON schedules(source, destination, departure_time);
";

const SCHEDULE_COLUMNS: &str = "id, flight_number, airline, source, destination, \
     departure_time, arrival_time, available_seats, fare_minor";

/// SQLite-backed schedule store.
///
/// Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct SqliteScheduleStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteScheduleStore {
    /// Open (or create) a database file and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Worker("connection lock poisoned".to_string()))?;
            f(&guard)
        })
        .await?
    }

    /// Insert or replace an airport.
    pub async fn insert_airport(&self, airport: Airport) -> Result<(), StoreError> {
        self.run(move |conn| {
            let (lat, lon) = match airport.coordinates {
                Some(c) => (Some(c.latitude), Some(c.longitude)),
                None => (None, None),
            };
            conn.execute(
                "INSERT OR REPLACE INTO airports(code, name, city, country, latitude, longitude) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    airport.code.as_str(),
                    airport.name,
                    airport.city,
                    airport.country,
                    lat,
                    lon
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Insert or replace a schedule, keyed by its id.
    pub async fn insert_schedule(&self, schedule: Schedule) -> Result<(), StoreError> {
        let id = i64::try_from(schedule.id.0).map_err(|_| StoreError::CorruptRow {
            id: -1,
            message: format!("schedule id {} does not fit in a row id", schedule.id),
        })?;
        self.run(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO schedules(id, flight_number, airline, source, destination, \
                 departure_time, arrival_time, available_seats, fare_minor) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id,
                    schedule.flight_number,
                    schedule.airline,
                    schedule.origin.as_str(),
                    schedule.destination.as_str(),
                    format_time(schedule.departure),
                    format_time(schedule.arrival),
                    schedule.available_seats,
                    schedule.fare.minor()
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Every stored schedule, ordered by departure.
    pub async fn all_schedules(&self) -> Result<Vec<Schedule>, StoreError> {
        self.run(|conn| {
            query_schedules(
                conn,
                &format!("SELECT {SCHEDULE_COLUMNS} FROM schedules ORDER BY departure_time, id"),
                [],
            )
        })
        .await
    }

    /// Every stored airport, ordered by code.
    pub async fn airports(&self) -> Result<Vec<Airport>, StoreError> {
        self.run(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT code, name, city, country, latitude, longitude FROM airports ORDER BY code",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<f64>>(4)?,
                    row.get::<_, Option<f64>>(5)?,
                ))
            })?;

            let mut airports = Vec::new();
            for (index, row) in rows.enumerate() {
                let (code, name, city, country, lat, lon) = row?;
                let code = AirportCode::parse(&code).map_err(|e| StoreError::CorruptRow {
                    id: index as i64,
                    message: e.to_string(),
                })?;
                let mut airport = Airport::new(code, name, city, country);
                if let (Some(lat), Some(lon)) = (lat, lon) {
                    airport.coordinates = Some(Coordinates::new(lat, lon));
                }
                airports.push(airport);
            }
            Ok(airports)
        })
        .await
    }

    /// Number of stored schedules.
    pub async fn count_schedules(&self) -> Result<u64, StoreError> {
        self.run(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM schedules", [], |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
        .await
    }
}

impl ScheduleStore for SqliteScheduleStore {
    async fn find_direct(
        &self,
        origin: AirportCode,
        destination: AirportCode,
        after: NaiveDateTime,
        seats: u32,
    ) -> Result<Vec<Schedule>, StoreError> {
        self.run(move |conn| {
            query_schedules(
                conn,
                &format!(
                    "SELECT {SCHEDULE_COLUMNS} FROM schedules \
                     WHERE source = ?1 AND destination = ?2 AND departure_time >= ?3 \
                     AND available_seats >= ?4 \
                     ORDER BY departure_time, id"
                ),
                params![origin.as_str(), destination.as_str(), format_time(after), seats],
            )
        })
        .await
    }

    async fn find_departing(
        &self,
        origin: AirportCode,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
        seats: u32,
    ) -> Result<Vec<Schedule>, StoreError> {
        self.run(move |conn| {
            query_schedules(
                conn,
                &format!(
                    "SELECT {SCHEDULE_COLUMNS} FROM schedules \
                     WHERE source = ?1 AND departure_time BETWEEN ?2 AND ?3 \
                     AND available_seats >= ?4 \
                     ORDER BY departure_time, id"
                ),
                params![
                    origin.as_str(),
                    format_time(window_start),
                    format_time(window_end),
                    seats
                ],
            )
        })
        .await
    }

    async fn destinations_reachable_from(
        &self,
        origin: AirportCode,
    ) -> Result<Vec<AirportCode>, StoreError> {
        self.run(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT DISTINCT destination FROM schedules WHERE source = ?1 ORDER BY destination",
            )?;
            let rows = stmt.query_map(params![origin.as_str()], |row| row.get::<_, String>(0))?;

            let mut codes = Vec::new();
            for row in rows {
                let raw = row?;
                match AirportCode::parse(&raw) {
                    Ok(code) => codes.push(code),
                    Err(e) => debug!(origin = %origin, value = %raw, error = %e, "Skipping bad destination code"),
                }
            }
            Ok(codes)
        })
        .await
    }
}

fn format_time(t: NaiveDateTime) -> String {
    t.format(TIME_FORMAT).to_string()
}

fn parse_time(id: i64, s: &str) -> Result<NaiveDateTime, StoreError> {
    NaiveDateTime::parse_from_str(s, TIME_FORMAT).map_err(|e| StoreError::CorruptRow {
        id,
        message: format!("bad timestamp {s:?}: {e}"),
    })
}

/// A schedules row before validation.
struct RawSchedule {
    id: i64,
    flight_number: String,
    airline: String,
    source: String,
    destination: String,
    departure: String,
    arrival: String,
    seats: i64,
    fare_minor: i64,
}

impl RawSchedule {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            flight_number: row.get(1)?,
            airline: row.get(2)?,
            source: row.get(3)?,
            destination: row.get(4)?,
            departure: row.get(5)?,
            arrival: row.get(6)?,
            seats: row.get(7)?,
            fare_minor: row.get(8)?,
        })
    }

    fn into_schedule(self) -> Result<Schedule, StoreError> {
        let id = self.id;
        let corrupt = |message: String| StoreError::CorruptRow { id, message };

        let schedule = Schedule {
            id: ScheduleId(u64::try_from(id).map_err(|_| corrupt("negative id".into()))?),
            flight_number: self.flight_number,
            airline: self.airline,
            origin: AirportCode::parse(&self.source).map_err(|e| corrupt(e.to_string()))?,
            destination: AirportCode::parse(&self.destination)
                .map_err(|e| corrupt(e.to_string()))?,
            departure: parse_time(id, &self.departure)?,
            arrival: parse_time(id, &self.arrival)?,
            available_seats: u32::try_from(self.seats)
                .map_err(|_| corrupt(format!("bad seat count {}", self.seats)))?,
            fare: Fare::from_minor(self.fare_minor),
        };
        schedule.validated().map_err(|e| corrupt(e.to_string()))
    }
}

fn query_schedules<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<Schedule>, StoreError> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params, RawSchedule::from_row)?;
    let mut schedules = Vec::new();
    for row in rows {
        schedules.push(row?.into_schedule()?);
    }
    Ok(schedules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 8, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn code(s: &str) -> AirportCode {
        AirportCode::parse(s).unwrap()
    }

    fn flight(id: u64, from: &str, to: &str, dep: NaiveDateTime, seats: u32) -> Schedule {
        Schedule {
            id: ScheduleId(id),
            flight_number: format!("6E{id}"),
            airline: "IndiGo".into(),
            origin: code(from),
            destination: code(to),
            departure: dep,
            arrival: dep + chrono::Duration::minutes(150),
            available_seats: seats,
            fare: Fare::from_major(4321.5),
        }
    }

    async fn seeded() -> SqliteScheduleStore {
        let store = SqliteScheduleStore::open_in_memory().unwrap();
        for s in [
            flight(1, "DEL", "BOM", at(20, 6, 0), 9),
            flight(2, "DEL", "BOM", at(20, 18, 0), 1),
            flight(3, "DEL", "BLR", at(20, 9, 30), 9),
            flight(4, "DEL", "BOM", at(21, 6, 0), 9),
            flight(5, "BLR", "BOM", at(20, 13, 0), 9),
        ] {
            store.insert_schedule(s).await.unwrap();
        }
        store
    }

    fn ids(schedules: &[Schedule]) -> Vec<u64> {
        schedules.iter().map(|s| s.id.0).collect()
    }

    #[tokio::test]
    async fn find_direct_filters_and_orders() {
        let store = seeded().await;
        let found = store
            .find_direct(code("DEL"), code("BOM"), at(20, 6, 0), 2)
            .await
            .unwrap();
        assert_eq!(ids(&found), vec![1, 4]);
    }

    #[tokio::test]
    async fn find_departing_respects_window() {
        let store = seeded().await;
        let found = store
            .find_departing(code("DEL"), at(20, 6, 0), at(20, 18, 0), 1)
            .await
            .unwrap();
        assert_eq!(ids(&found), vec![1, 3, 2]);
    }

    #[tokio::test]
    async fn reachable_destinations() {
        let store = seeded().await;
        let dests = store.destinations_reachable_from(code("DEL")).await.unwrap();
        assert_eq!(dests, vec![code("BLR"), code("BOM")]);
    }

    #[tokio::test]
    async fn roundtrip_preserves_fields() {
        let store = seeded().await;
        let all = store.all_schedules().await.unwrap();
        assert_eq!(all.len(), 5);
        let s = all.iter().find(|s| s.id == ScheduleId(3)).unwrap();
        assert_eq!(*s, flight(3, "DEL", "BLR", at(20, 9, 30), 9));
        assert_eq!(store.count_schedules().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn airports_roundtrip() {
        let store = SqliteScheduleStore::open_in_memory().unwrap();
        store
            .insert_airport(
                Airport::new(code("DEL"), "Indira Gandhi", "New Delhi", "India")
                    .with_coordinates(28.5562, 77.1),
            )
            .await
            .unwrap();
        store
            .insert_airport(Airport::new(code("BOM"), "Chhatrapati Shivaji", "Mumbai", "India"))
            .await
            .unwrap();

        let airports = store.airports().await.unwrap();
        assert_eq!(airports.len(), 2);
        assert_eq!(airports[0].code, code("BOM"));
        assert_eq!(airports[0].coordinates, None);
        assert_eq!(airports[1].coordinates, Some(Coordinates::new(28.5562, 77.1)));
    }

    #[tokio::test]
    async fn corrupt_rows_surface_as_errors() {
        let store = SqliteScheduleStore::open_in_memory().unwrap();
        store
            .run(|conn| {
                conn.execute(
                    "INSERT INTO schedules VALUES (1, 'X1', 'X', 'del', 'BOM', \
                     '2025-08-20T06:00:00', '2025-08-20T08:00:00', 5, 100)",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let err = store.all_schedules().await.unwrap_err();
        assert!(matches!(err, StoreError::CorruptRow { id: 1, .. }));
    }

    #[tokio::test]
    async fn persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flights.db");

        {
            let store = SqliteScheduleStore::open(&path).unwrap();
            store
                .insert_schedule(flight(1, "DEL", "BOM", at(20, 6, 0), 9))
                .await
                .unwrap();
        }

        let reopened = SqliteScheduleStore::open(&path).unwrap();
        assert_eq!(reopened.count_schedules().await.unwrap(), 1);
    }
}
