use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use travel::{CabinClass, NewBooking, SearchQuery, SortBy};
use uuid::Uuid;

use crate::error::{ApiError, FieldError};

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern must compile"));
static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 ()\-]{6,18}[0-9]$").expect("phone pattern must compile"));

pub const MAX_PASSENGERS: usize = 9;

/// Collects every failed rule so the client sees them all at once.
#[derive(Debug, Default)]
struct Violations(Vec<FieldError>);

impl Violations {
    fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.0.push(FieldError { field: field.to_string(), message: message.to_string() });
        }
    }

    fn finish(self) -> Result<(), ApiError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.0))
        }
    }
}

fn is_airport_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic())
}

fn within(text: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&text.trim().chars().count())
}

pub fn is_email(text: &str) -> bool {
    EMAIL.is_match(text.trim())
}

pub fn is_phone(text: &str) -> bool {
    PHONE.is_match(text.trim())
}

pub fn chat_message(message: &str, session_id: Option<&str>) -> Result<(), ApiError> {
    let mut v = Violations::default();
    v.check(within(message, 1, 1000), "message", "Message must be between 1 and 1000 characters");
    if let Some(id) = session_id {
        v.check(Uuid::parse_str(id).is_ok(), "sessionId", "Invalid session ID");
    }
    v.finish()
}

pub fn booking_reference(reference: &str) -> Result<(), ApiError> {
    let mut v = Violations::default();
    v.check(
        reference.len() == 6 && reference.chars().all(|c| c.is_ascii_alphanumeric()),
        "bookingReference",
        "Booking reference must be 6 alphanumeric characters",
    );
    v.finish()
}

pub fn registration(name: &str, email: &str, phone: Option<&str>) -> Result<(), ApiError> {
    let mut v = Violations::default();
    v.check(within(name, 2, 50), "name", "Name must be between 2 and 50 characters");
    v.check(is_email(email), "email", "Please provide a valid email");
    if let Some(phone) = phone {
        v.check(is_phone(phone), "phone", "Please provide a valid phone number");
    }
    v.finish()
}

pub fn new_booking(request: &NewBooking, today: NaiveDate) -> Result<(), ApiError> {
    let mut v = Violations::default();
    v.check(!request.flight_id.trim().is_empty(), "flightId", "Invalid flight ID");
    v.check(
        (1..=MAX_PASSENGERS).contains(&request.passengers.len()),
        "passengers",
        "Passengers array must contain 1-9 passengers",
    );

    for (i, p) in request.passengers.iter().enumerate() {
        v.check(
            within(&p.first_name, 2, 50),
            &format!("passengers[{}].firstName", i),
            "First name must be between 2 and 50 characters",
        );
        v.check(
            within(&p.last_name, 2, 50),
            &format!("passengers[{}].lastName", i),
            "Last name must be between 2 and 50 characters",
        );
        let age = today.year() - p.date_of_birth.year();
        v.check(
            p.date_of_birth <= today && age <= 120,
            &format!("passengers[{}].dateOfBirth", i),
            "Invalid date of birth",
        );
    }

    v.check(is_email(&request.contact_info.email), "contactInfo.email", "Please provide a valid email");
    v.check(
        is_phone(&request.contact_info.phone),
        "contactInfo.phone",
        "Please provide a valid phone number",
    );
    v.finish()
}

/// Raw `/api/flights/search` query string. Everything arrives as text so the
/// rules below can report field-level messages.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure_date: Option<String>,
    pub return_date: Option<String>,
    pub passengers: Option<String>,
    pub class_type: Option<String>,
    pub stops: Option<String>,
    pub max_price: Option<String>,
    pub airlines: Option<String>,
    pub sort_by: Option<String>,
}

impl SearchParams {
    pub fn into_query(self, today: NaiveDate) -> Result<SearchQuery, ApiError> {
        let (Some(origin), Some(destination), Some(departure)) =
            (self.origin.as_deref(), self.destination.as_deref(), self.departure_date.as_deref())
        else {
            return Err(ApiError::BadRequest(
                "Origin, destination, and departure date are required".to_string(),
            ));
        };

        let mut v = Violations::default();
        v.check(is_airport_code(origin), "origin", "Origin must be a valid 3-letter airport code");
        v.check(
            is_airport_code(destination),
            "destination",
            "Destination must be a valid 3-letter airport code",
        );

        let departure_date = NaiveDate::parse_from_str(departure, "%Y-%m-%d").ok();
        match departure_date {
            Some(date) => v.check(date >= today, "departureDate", "Departure date cannot be in the past"),
            None => v.check(false, "departureDate", "Departure date must be an ISO 8601 date"),
        }

        let return_date = match self.return_date.as_deref() {
            Some(raw) => {
                let parsed = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok();
                v.check(parsed.is_some(), "returnDate", "Return date must be an ISO 8601 date");
                if let (Some(ret), Some(dep)) = (parsed, departure_date) {
                    v.check(ret > dep, "returnDate", "Return date must be after departure date");
                }
                parsed
            }
            None => None,
        };

        let passengers = match self.passengers.as_deref() {
            Some(raw) => {
                let parsed = raw.parse::<u32>().ok().filter(|n| (1..=MAX_PASSENGERS as u32).contains(n));
                v.check(parsed.is_some(), "passengers", "Passengers must be between 1 and 9");
                parsed.unwrap_or(1)
            }
            None => 1,
        };

        let class_type = match self.class_type.as_deref() {
            Some(raw) => {
                let parsed = raw.parse::<CabinClass>().ok();
                v.check(
                    parsed.is_some(),
                    "classType",
                    "Class type must be economy, premium, business, or first",
                );
                parsed.unwrap_or_default()
            }
            None => CabinClass::default(),
        };

        let stops = self.stops.as_deref().map(|raw| raw.parse::<u8>().ok());
        v.check(!matches!(stops, Some(None)), "stops", "Stops must be a number");

        let max_price = self.max_price.as_deref().map(|raw| raw.parse::<f64>().ok());
        v.check(
            !matches!(max_price, Some(None)) && max_price.flatten().map_or(true, |p| p >= 0.0),
            "maxPrice",
            "Max price must be a positive number",
        );

        let sort_by = match self.sort_by.as_deref() {
            Some(raw) => {
                let parsed = serde_json::from_value::<SortBy>(serde_json::Value::from(raw)).ok();
                v.check(parsed.is_some(), "sortBy", "Sort must be price, duration, departure, or airline");
                parsed.unwrap_or_default()
            }
            None => SortBy::default(),
        };

        v.finish()?;

        let Some(departure_date) = departure_date else {
            return Err(ApiError::BadRequest("Departure date must be an ISO 8601 date".to_string()));
        };
        let mut query = SearchQuery::new(origin, destination, departure_date);
        query.return_date = return_date;
        query.passengers = passengers;
        query.class_type = class_type;
        query.stops = stops.flatten();
        query.max_price = max_price.flatten().map(|p| p.floor() as u32);
        query.airlines = self
            .airlines
            .as_deref()
            .map(|list| {
                list.split(',')
                    .map(|a| a.trim().to_uppercase())
                    .filter(|a| !a.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        query.sort_by = sort_by;
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn params(origin: &str, destination: &str, date: &str) -> SearchParams {
        SearchParams {
            origin: Some(origin.into()),
            destination: Some(destination.into()),
            departure_date: Some(date.into()),
            ..Default::default()
        }
    }

    fn field_names(err: ApiError) -> Vec<String> {
        match err {
            ApiError::Validation(errors) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_search_params_build_query() {
        let mut p = params("jfk", "lax", "2026-11-01");
        p.passengers = Some("2".into());
        p.class_type = Some("business".into());
        p.airlines = Some("aa, dl".into());
        p.sort_by = Some("duration".into());

        let q = p.into_query(day(2026, 10, 20)).unwrap();
        assert_eq!(q.origin, "JFK");
        assert_eq!(q.destination, "LAX");
        assert_eq!(q.passengers, 2);
        assert_eq!(q.class_type, CabinClass::Business);
        assert_eq!(q.airlines, vec!["AA".to_string(), "DL".to_string()]);
        assert_eq!(q.sort_by, SortBy::Duration);
    }

    #[test]
    fn test_search_params_reject_bad_fields() {
        let mut p = params("JF1", "LAX", "2026-10-01");
        p.return_date = Some("2026-09-30".into());
        p.passengers = Some("12".into());
        p.class_type = Some("luxury".into());

        let fields = field_names(p.into_query(day(2026, 10, 20)).unwrap_err());
        assert_eq!(fields, vec!["origin", "departureDate", "returnDate", "passengers", "classType"]);
    }

    #[test]
    fn test_search_params_require_route_and_date() {
        let p = SearchParams { origin: Some("JFK".into()), ..Default::default() };
        assert!(matches!(p.into_query(day(2026, 10, 20)), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_chat_and_reference_rules() {
        assert!(chat_message("hello", None).is_ok());
        assert!(chat_message("   ", None).is_err());
        assert!(chat_message(&"x".repeat(1001), None).is_err());
        assert!(chat_message("hi", Some("not-a-uuid")).is_err());
        assert!(chat_message("hi", Some("6f1c1f1e-8a4b-4c0e-9d1a-2b3c4d5e6f70")).is_ok());

        assert!(booking_reference("AB12CD").is_ok());
        assert!(booking_reference("AB12C").is_err());
        assert!(booking_reference("AB-2CD").is_err());
    }

    #[test]
    fn test_contact_formats() {
        assert!(is_email("jane@example.com"));
        assert!(!is_email("jane@example"));
        assert!(is_phone("+1 555-123-4567"));
        assert!(!is_phone("call me"));
        assert!(registration("J", "jane@example.com", None).is_err());
    }
}
