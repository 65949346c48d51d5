use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entities::Entities;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    SearchFlights,
    BookFlight,
    ViewBookings,
    CancelBooking,
    ModifyBooking,
    CheckFlightStatus,
    PriceInquiry,
    DestinationInfo,
    Help,
    Goodbye,
    Complaint,
    Unknown,
    /// Assigned when reply generation fails, never by the classifier.
    Error,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::SearchFlights => "search_flights",
            Intent::BookFlight => "book_flight",
            Intent::ViewBookings => "view_bookings",
            Intent::CancelBooking => "cancel_booking",
            Intent::ModifyBooking => "modify_booking",
            Intent::CheckFlightStatus => "check_flight_status",
            Intent::PriceInquiry => "price_inquiry",
            Intent::DestinationInfo => "destination_info",
            Intent::Help => "help",
            Intent::Goodbye => "goodbye",
            Intent::Complaint => "complaint",
            Intent::Unknown => "unknown",
            Intent::Error => "error",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("intent pattern must compile")
}

// Fixed priority order; the first pattern that matches decides the intent
// even when a later one is more specific.
static INTENT_PATTERNS: Lazy<Vec<(Intent, Regex)>> = Lazy::new(|| {
    vec![
        (
            Intent::Greeting,
            pattern(r"(?i)\b(hi|hello|hey|good morning|good afternoon|good evening|greetings)\b"),
        ),
        (
            Intent::SearchFlights,
            pattern(r"(?i)\b(search|find|look for|book|flight|flights|ticket|tickets|travel|fly)\b"),
        ),
        (
            Intent::BookFlight,
            pattern(r"(?i)\b(book|reserve|purchase|buy|confirm)\b.*\b(flight|ticket)\b"),
        ),
        (
            Intent::ViewBookings,
            pattern(r"(?i)\b(show|view|see|check|my)\b.*\b(booking|bookings|reservation|reservations|trip|trips)\b"),
        ),
        (
            Intent::CancelBooking,
            pattern(r"(?i)\b(cancel|delete|remove)\b.*\b(booking|reservation|trip)\b"),
        ),
        (
            Intent::ModifyBooking,
            pattern(r"(?i)\b(change|modify|update|edit)\b.*\b(booking|reservation|flight)\b"),
        ),
        (
            Intent::CheckFlightStatus,
            pattern(r"(?i)\b(status|delay|delayed|on time)\b.*\b(flight)\b"),
        ),
        (
            Intent::PriceInquiry,
            pattern(r"(?i)\b(price|cost|how much|cheap|expensive|deal)\b"),
        ),
        (
            Intent::DestinationInfo,
            pattern(r"(?i)\b(tell me about|information|weather|attractions|visit|popular destinations)\b"),
        ),
        (
            Intent::Help,
            pattern(r"(?i)\b(help|assist|support|what can you do|commands)\b"),
        ),
        (
            Intent::Goodbye,
            pattern(r"(?i)\b(bye|goodbye|thanks|thank you|see you|exit|quit)\b"),
        ),
        (
            Intent::Complaint,
            pattern(r"(?i)\b(problem|issue|complain|terrible|awful|bad|worst)\b"),
        ),
    ]
});

static BARE_AIRPORT_CODE: Lazy<Regex> = Lazy::new(|| pattern(r"^[A-Za-z]{3}$"));
static BARE_REFERENCE: Lazy<Regex> = Lazy::new(|| pattern(r"^[A-Za-z0-9]{6}$"));

/// Classifies normalized text. Exactly one intent is returned; `Unknown`
/// when nothing matches.
pub fn classify_intent(text: &str) -> Intent {
    if let Some((intent, _)) = INTENT_PATTERNS.iter().find(|(_, re)| re.is_match(text)) {
        return *intent;
    }

    let token = text.trim();
    if BARE_AIRPORT_CODE.is_match(token) {
        return Intent::SearchFlights;
    }
    if is_reference_like(token) {
        return Intent::ViewBookings;
    }

    Intent::Unknown
}

/// Six alphanumerics with at least one letter and one digit.
pub(crate) fn is_reference_like(token: &str) -> bool {
    BARE_REFERENCE.is_match(token)
        && token.chars().any(|c| c.is_ascii_alphabetic())
        && token.chars().any(|c| c.is_ascii_digit())
}

/// Fixed heuristic: 0.5 base, +0.3 for a recognised intent, +0.05 per
/// extracted entity up to 0.2.
pub fn calculate_confidence(intent: Intent, entities: &Entities) -> f32 {
    let mut confidence = 0.5;
    if intent != Intent::Unknown {
        confidence += 0.3;
    }
    confidence += (entities.count() as f32 * 0.05).min(0.2);
    confidence.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_wins() {
        assert_eq!(classify_intent("hello, find me a flight"), Intent::Greeting);
        // the generic search keywords sit above the booking and status patterns
        assert_eq!(classify_intent("book a flight"), Intent::SearchFlights);
        assert_eq!(classify_intent("reserve a ticket"), Intent::SearchFlights);
        assert_eq!(classify_intent("status of flight DL567"), Intent::SearchFlights);
        assert_eq!(classify_intent("change my flight"), Intent::SearchFlights);
        // "my ... booking" is claimed by view before cancel is tried
        assert_eq!(classify_intent("cancel my booking"), Intent::ViewBookings);
        assert_eq!(classify_intent("cancel booking"), Intent::CancelBooking);
        assert_eq!(classify_intent("show my bookings"), Intent::ViewBookings);
    }

    #[test]
    fn test_bare_token_fallbacks() {
        assert_eq!(classify_intent("lax"), Intent::SearchFlights);
        assert_eq!(classify_intent("ABC123"), Intent::ViewBookings);
        assert_eq!(classify_intent("abcdef"), Intent::Unknown);
        assert_eq!(classify_intent("123456"), Intent::Unknown);
    }

    #[test]
    fn test_confidence_bounds() {
        let none = Entities::default();
        assert!((calculate_confidence(Intent::Unknown, &none) - 0.5).abs() < f32::EPSILON);
        assert!((calculate_confidence(Intent::Help, &none) - 0.8).abs() < 1e-6);

        let many = Entities {
            origin: Some("JFK".into()),
            destination: Some("LAX".into()),
            departure_date: Some("tomorrow".into()),
            passengers: Some(2),
            class_type: Some("business".into()),
            max_price: Some(500),
            ..Default::default()
        };
        assert!((calculate_confidence(Intent::SearchFlights, &many) - 1.0).abs() < 1e-6);
    }
}
