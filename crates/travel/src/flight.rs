use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CabinClass {
    #[default]
    Economy,
    Premium,
    Business,
    First,
}

impl CabinClass {
    pub const ALL: [CabinClass; 4] = [
        CabinClass::Economy,
        CabinClass::Premium,
        CabinClass::Business,
        CabinClass::First,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CabinClass::Economy => "economy",
            CabinClass::Premium => "premium",
            CabinClass::Business => "business",
            CabinClass::First => "first",
        }
    }
}

impl fmt::Display for CabinClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CabinClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "economy" => Ok(CabinClass::Economy),
            "premium" => Ok(CabinClass::Premium),
            "business" => Ok(CabinClass::Business),
            "first" => Ok(CabinClass::First),
            other => Err(format!("unknown class type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassPrices {
    pub economy: u32,
    pub premium: u32,
    pub business: u32,
    pub first: u32,
    pub currency: String,
}

impl ClassPrices {
    pub fn get(&self, class: CabinClass) -> u32 {
        match class {
            CabinClass::Economy => self.economy,
            CabinClass::Premium => self.premium,
            CabinClass::Business => self.business,
            CabinClass::First => self.first,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSeats {
    pub economy: u32,
    pub premium: u32,
    pub business: u32,
    pub first: u32,
}

impl ClassSeats {
    pub fn get(&self, class: CabinClass) -> u32 {
        match class {
            CabinClass::Economy => self.economy,
            CabinClass::Premium => self.premium,
            CabinClass::Business => self.business,
            CabinClass::First => self.first,
        }
    }

    pub fn get_mut(&mut self, class: CabinClass) -> &mut u32 {
        match class {
            CabinClass::Economy => &mut self.economy,
            CabinClass::Premium => &mut self.premium,
            CabinClass::Business => &mut self.business,
            CabinClass::First => &mut self.first,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Carrier {
    pub code: String,
    pub name: String,
    pub logo: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub date: NaiveDate,
    /// `HH:MM`
    pub time: String,
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightDuration {
    /// Minutes
    pub total: u32,
    pub formatted: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stops {
    pub count: u8,
    pub airports: Vec<String>,
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Amenities {
    pub wifi: bool,
    pub entertainment: bool,
    pub meals: bool,
    pub power_outlets: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restrictions {
    pub baggage_policy: String,
    pub cancellation_policy: String,
    pub change_policy: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightState {
    Scheduled,
    Delayed,
    Cancelled,
    Departed,
    Arrived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub id: String,
    pub flight_number: String,
    pub airline: Carrier,
    pub aircraft: String,
    pub origin: Endpoint,
    pub destination: Endpoint,
    pub departure: Schedule,
    pub arrival: Schedule,
    pub duration: FlightDuration,
    pub price: ClassPrices,
    pub availability: ClassSeats,
    pub stops: Stops,
    pub amenities: Amenities,
    pub status: FlightState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<Restrictions>,
}

impl Flight {
    pub fn is_bookable(&self, class: CabinClass, passengers: usize) -> bool {
        self.status == FlightState::Scheduled && self.availability.get(class) as usize >= passengers
    }

    /// Departure instant in UTC; midnight when the time string is malformed.
    pub fn departure_at(&self) -> DateTime<Utc> {
        let time = NaiveTime::parse_from_str(&self.departure.time, "%H:%M").unwrap_or(NaiveTime::MIN);
        Utc.from_utc_datetime(&self.departure.date.and_time(time))
    }
}

pub fn format_duration(minutes: u32) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// Adds minutes to an `HH:MM` clock time, wrapping at midnight.
pub fn add_minutes(time: &str, minutes: u32) -> String {
    let (h, m) = time.split_once(':').unwrap_or(("0", "0"));
    let start = h.parse::<u32>().unwrap_or(0) * 60 + m.parse::<u32>().unwrap_or(0);
    let total = start + minutes;
    format!("{:02}:{:02}", (total / 60) % 24, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_and_clock_helpers() {
        assert_eq!(format_duration(135), "2h 15m");
        assert_eq!(format_duration(59), "0h 59m");
        assert_eq!(add_minutes("23:30", 45), "00:15");
        assert_eq!(add_minutes("08:05", 120), "10:05");
    }

    #[test]
    fn test_cabin_class_parsing() {
        assert_eq!("Business".parse::<CabinClass>(), Ok(CabinClass::Business));
        assert!("coach".parse::<CabinClass>().is_err());
        assert_eq!(CabinClass::default(), CabinClass::Economy);
    }
}
