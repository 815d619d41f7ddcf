//! Bookable flight segments and fares.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{AirportCode, DomainError};

/// Identifier of a schedule row in the relational store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleId(pub u64);

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fare in minor currency units (paise, cents).
///
/// Stored as an integer so sums and comparisons are exact; serialised as a
/// major-unit number (`15000.5`) for JSON consumers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Fare(i64);

impl Fare {
    pub const ZERO: Fare = Fare(0);

    pub fn from_minor(minor: i64) -> Self {
        Fare(minor)
    }

    /// Convert a major-unit amount, rounding to the nearest minor unit.
    pub fn from_major(major: f64) -> Self {
        Fare((major * 100.0).round() as i64)
    }

    pub fn minor(&self) -> i64 {
        self.0
    }

    pub fn as_major(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Debug for Fare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fare({self})")
    }
}

impl fmt::Display for Fare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Add for Fare {
    type Output = Fare;

    /// Saturates at the `i64` bounds.
    fn add(self, rhs: Fare) -> Fare {
        Fare(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Fare {
    fn sum<I: Iterator<Item = Fare>>(iter: I) -> Fare {
        iter.fold(Fare::ZERO, Add::add)
    }
}

impl Serialize for Fare {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_major())
    }
}

impl<'de> Deserialize<'de> for Fare {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let major = f64::deserialize(deserializer)?;
        if !major.is_finite() {
            return Err(serde::de::Error::custom("fare must be a finite number"));
        }
        Ok(Fare::from_major(major))
    }
}

/// A concrete bookable flight instance between two airports.
///
/// Schedules are read-only to the search engine. Stores construct them with a
/// struct literal and pass them through [`Schedule::validated`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    /// Owning flight identifier, e.g. "AI101".
    pub flight_number: String,
    /// Operating carrier, e.g. "Air India".
    pub airline: String,
    pub origin: AirportCode,
    pub destination: AirportCode,
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
    pub available_seats: u32,
    pub fare: Fare,
}

impl Schedule {
    /// Check the schedule invariants, returning it unchanged when they hold.
    pub fn validated(self) -> Result<Self, DomainError> {
        if self.origin == self.destination {
            return Err(DomainError::InvalidSchedule(
                "origin and destination must differ",
            ));
        }
        if self.departure >= self.arrival {
            return Err(DomainError::InvalidSchedule(
                "departure must be before arrival",
            ));
        }
        if self.fare < Fare::ZERO {
            return Err(DomainError::InvalidSchedule("fare must not be negative"));
        }
        Ok(self)
    }

    /// Time in the air.
    pub fn duration(&self) -> Duration {
        self.arrival - self.departure
    }

    /// Whether at least `seats` seats are still available.
    pub fn has_seats(&self, seats: u32) -> bool {
        self.available_seats >= seats
    }
}
