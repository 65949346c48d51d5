use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::intent::is_reference_like;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: u32,
    pub max: u32,
}

/// Fields pulled out of one utterance. Every field is optional; scans are
/// independent, so values may contradict one another.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passengers: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub requested_other_dates: bool,
}

impl Entities {
    /// Number of populated fields.
    pub fn count(&self) -> usize {
        [
            self.origin.is_some(),
            self.destination.is_some(),
            self.departure_date.is_some(),
            self.return_date.is_some(),
            self.passengers.is_some(),
            self.class_type.is_some(),
            self.booking_reference.is_some(),
            self.flight_number.is_some(),
            self.airline.is_some(),
            self.max_price.is_some(),
            self.price_range.is_some(),
            self.requested_other_dates,
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn has_route(&self) -> bool {
        self.origin.is_some() && self.destination.is_some()
    }

    /// Shallow merge: values from `self` win, gaps are filled from
    /// `previous`. The other-dates request belongs to the current turn only.
    pub fn merge_over(&self, previous: &Entities) -> Entities {
        Entities {
            origin: self.origin.clone().or_else(|| previous.origin.clone()),
            destination: self.destination.clone().or_else(|| previous.destination.clone()),
            departure_date: self.departure_date.clone().or_else(|| previous.departure_date.clone()),
            return_date: self.return_date.clone().or_else(|| previous.return_date.clone()),
            passengers: self.passengers.or(previous.passengers),
            class_type: self.class_type.clone().or_else(|| previous.class_type.clone()),
            booking_reference: self
                .booking_reference
                .clone()
                .or_else(|| previous.booking_reference.clone()),
            flight_number: self.flight_number.clone().or_else(|| previous.flight_number.clone()),
            airline: self.airline.clone().or_else(|| previous.airline.clone()),
            max_price: self.max_price.or(previous.max_price),
            price_range: self.price_range.or(previous.price_range),
            requested_other_dates: self.requested_other_dates,
        }
    }
}

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("entity pattern must compile")
}

static AIRPORT_CODE: Lazy<Regex> = Lazy::new(|| pattern(r"\b[A-Z]{3}\b"));
static BARE_CODE: Lazy<Regex> = Lazy::new(|| pattern(r"^[A-Za-z]{3}$"));

// Tried in order; the first pattern with any match supplies the dates.
static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        pattern(r"(?i)\b(today|tomorrow|next week|next month)\b"),
        pattern(
            r"(?i)\b(january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{1,2}(?:st|nd|rd|th)?\b",
        ),
        pattern(r"\b\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4}\b"),
        pattern(r"\b\d{4}-\d{2}-\d{2}\b"),
    ]
});

static OTHER_DATES: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)^(try\s+)?(different dates|other dates|change date|show more options)$")
});
static PASSENGERS: Lazy<Regex> =
    Lazy::new(|| pattern(r"(?i)(\d+)\s*(passenger|person|people|adult|traveler|traveller)"));
static CLASS_TYPE: Lazy<Regex> = Lazy::new(|| pattern(r"(?i)\b(economy|business|first|premium)\b"));
static REFERENCE_TOKEN: Lazy<Regex> = Lazy::new(|| pattern(r"\b[A-Z0-9]{6}\b"));
static FLIGHT_NUMBER: Lazy<Regex> = Lazy::new(|| pattern(r"\b[A-Z]{2}\d{1,4}\b"));
static AIRLINE: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)\b(american|delta|united|lufthansa|emirates|british airways|air france|klm|southwest)\b")
});
static PRICE: Lazy<Regex> = Lazy::new(|| {
    pattern(r"(?i)\$(\d+)(?:\s*to\s*\$(\d+)|\s*-\s*\$(\d+))?|under\s*\$(\d+)|below\s*\$(\d+)")
});

const CITY_CODES: &[(&str, &str)] = &[
    ("new york", "JFK"),
    ("los angeles", "LAX"),
    ("chicago", "ORD"),
    ("london", "LHR"),
    ("paris", "CDG"),
    ("tokyo", "NRT"),
    ("dubai", "DXB"),
    ("singapore", "SIN"),
    ("delhi", "DEL"),
    ("mumbai", "BOM"),
    ("bengaluru", "BLR"),
    ("bangalore", "BLR"),
    ("hyderabad", "HYD"),
    ("chennai", "MAA"),
    ("kolkata", "CCU"),
    ("pune", "PNQ"),
];

static CITY_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    CITY_CODES
        .iter()
        .map(|(city, code)| (pattern(&format!(r"(?i)\b{}\b", city)), *code))
        .collect()
});

/// Airport code for a known city name; unknown names are upper-cased.
pub fn city_to_airport_code(city: &str) -> String {
    let lower = city.trim().to_lowercase();
    CITY_CODES
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, code)| code.to_string())
        .unwrap_or_else(|| lower.to_uppercase())
}

pub fn extract_entities(text: &str) -> Entities {
    let mut entities = Entities::default();
    let trimmed = text.trim();
    let upper = trimmed.to_uppercase();

    let airports: Vec<&str> = AIRPORT_CODE.find_iter(trimmed).map(|m| m.as_str()).take(2).collect();
    if let Some(origin) = airports.first() {
        entities.origin = Some(origin.to_string());
    } else if BARE_CODE.is_match(trimmed) {
        entities.origin = Some(upper.clone());
    }
    if let Some(destination) = airports.get(1) {
        entities.destination = Some(destination.to_string());
    }

    for date_pattern in DATE_PATTERNS.iter() {
        let found: Vec<&str> = date_pattern.find_iter(trimmed).map(|m| m.as_str()).take(2).collect();
        if let Some(first) = found.first() {
            entities.departure_date = Some(first.to_string());
            entities.return_date = found.get(1).map(|s| s.to_string());
            break;
        }
    }

    entities.requested_other_dates = OTHER_DATES.is_match(trimmed);

    if let Some(caps) = PASSENGERS.captures(trimmed) {
        entities.passengers = caps.get(1).and_then(|m| m.as_str().parse().ok());
    }

    if let Some(m) = CLASS_TYPE.find(trimmed) {
        entities.class_type = Some(m.as_str().to_lowercase());
    }

    entities.booking_reference = REFERENCE_TOKEN
        .find_iter(&upper)
        .map(|m| m.as_str())
        .find(|token| is_reference_like(token))
        .map(str::to_string);

    entities.flight_number = FLIGHT_NUMBER.find(&upper).map(|m| m.as_str().to_string());

    if let Some(m) = AIRLINE.find(trimmed) {
        entities.airline = Some(m.as_str().to_lowercase());
    }

    fill_route_from_cities(trimmed, &mut entities);

    if let Some(caps) = PRICE.captures(trimmed) {
        let numbers: Vec<u32> = caps
            .iter()
            .skip(1)
            .flatten()
            .filter_map(|m| m.as_str().parse().ok())
            .collect();
        match numbers.as_slice() {
            [max] => entities.max_price = Some(*max),
            [min, max, ..] => entities.price_range = Some(PriceRange { min: *min, max: *max }),
            [] => {}
        }
    }

    entities
}

/// City names fill origin, then destination, in order of appearance.
fn fill_route_from_cities(text: &str, entities: &mut Entities) {
    let mut hits: Vec<(usize, &str)> = CITY_PATTERNS
        .iter()
        .filter_map(|(re, code)| re.find(text).map(|m| (m.start(), *code)))
        .collect();
    hits.sort_by_key(|(pos, _)| *pos);

    for (_, code) in hits {
        if entities.origin.is_none() {
            entities.origin = Some(code.to_string());
        } else if entities.destination.is_none() && entities.origin.as_deref() != Some(code) {
            entities.destination = Some(code.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_airport_codes_are_positional() {
        let e = extract_entities("flights from JFK to LAX via ORD");
        assert_eq!(e.origin.as_deref(), Some("JFK"));
        assert_eq!(e.destination.as_deref(), Some("LAX"));
    }

    #[test]
    fn test_lowercase_words_are_not_airports() {
        let e = extract_entities("fly the red eye");
        assert!(e.origin.is_none());
        assert!(e.destination.is_none());
    }

    #[test]
    fn test_bare_code_becomes_origin() {
        assert_eq!(extract_entities("lax").origin.as_deref(), Some("LAX"));
    }

    #[test]
    fn test_cities_follow_text_order() {
        let e = extract_entities("from paris to london");
        assert_eq!(e.origin.as_deref(), Some("CDG"));
        assert_eq!(e.destination.as_deref(), Some("LHR"));

        let e = extract_entities("JFK to bangalore");
        assert_eq!(e.origin.as_deref(), Some("JFK"));
        assert_eq!(e.destination.as_deref(), Some("BLR"));
    }

    #[test]
    fn test_date_pattern_priority() {
        let e = extract_entities("leaving tomorrow, back 2026-12-01");
        assert_eq!(e.departure_date.as_deref(), Some("tomorrow"));
        assert!(e.return_date.is_none());

        let e = extract_entities("from 12/20/2026 to 12/28/2026");
        assert_eq!(e.departure_date.as_deref(), Some("12/20/2026"));
        assert_eq!(e.return_date.as_deref(), Some("12/28/2026"));

        let e = extract_entities("on March 3rd");
        assert_eq!(e.departure_date.as_deref(), Some("March 3rd"));

        let e = extract_entities("2026-11-03");
        assert_eq!(e.departure_date.as_deref(), Some("2026-11-03"));
    }

    #[test]
    fn test_passengers_class_and_price() {
        let e = extract_entities("3 passengers in business under $600");
        assert_eq!(e.passengers, Some(3));
        assert_eq!(e.class_type.as_deref(), Some("business"));
        assert_eq!(e.max_price, Some(600));
        assert!(e.price_range.is_none());

        let e = extract_entities("between $200 - $450");
        assert_eq!(e.price_range, Some(PriceRange { min: 200, max: 450 }));
    }

    #[test]
    fn test_booking_reference_needs_letter_and_digit() {
        assert_eq!(extract_entities("my ref is x7k2pq").booking_reference.as_deref(), Some("X7K2PQ"));
        assert!(extract_entities("london").booking_reference.is_none());
        assert!(extract_entities("call 555123").booking_reference.is_none());
    }

    #[test]
    fn test_flight_number_and_airline() {
        let e = extract_entities("status of delta DL567");
        assert_eq!(e.flight_number.as_deref(), Some("DL567"));
        assert_eq!(e.airline.as_deref(), Some("delta"));
    }

    #[test]
    fn test_other_dates_request() {
        assert!(extract_entities("Try different dates").requested_other_dates);
        assert!(extract_entities("other dates").requested_other_dates);
        assert!(!extract_entities("other dates for JFK please").requested_other_dates);
    }

    #[test]
    fn test_merge_new_values_win() {
        let previous = Entities {
            origin: Some("JFK".into()),
            destination: Some("LAX".into()),
            passengers: Some(2),
            requested_other_dates: true,
            ..Default::default()
        };
        let current = Entities {
            destination: Some("SFO".into()),
            departure_date: Some("tomorrow".into()),
            ..Default::default()
        };
        let merged = current.merge_over(&previous);
        assert_eq!(merged.origin.as_deref(), Some("JFK"));
        assert_eq!(merged.destination.as_deref(), Some("SFO"));
        assert_eq!(merged.departure_date.as_deref(), Some("tomorrow"));
        assert_eq!(merged.passengers, Some(2));
        assert!(!merged.requested_other_dates);
    }

    #[test]
    fn test_city_code_lookup() {
        assert_eq!(city_to_airport_code("New York"), "JFK");
        assert_eq!(city_to_airport_code("atlantis"), "ATLANTIS");
    }
}
