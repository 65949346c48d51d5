//! Static reference data: airports, airlines and the destinations shown on
//! the landing page.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Airport {
    pub code: &'static str,
    pub name: &'static str,
    pub city: &'static str,
    pub country: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Airline {
    pub code: &'static str,
    pub name: &'static str,
    pub logo: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Destination {
    pub code: &'static str,
    pub name: &'static str,
    pub country: &'static str,
    pub image: &'static str,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AirportFilter {
    pub search: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
}

const AIRPORTS: &[(&str, &str, &str, &str)] = &[
    ("JFK", "John F. Kennedy International Airport", "New York", "United States"),
    ("LAX", "Los Angeles International Airport", "Los Angeles", "United States"),
    ("ORD", "Chicago O'Hare International Airport", "Chicago", "United States"),
    ("LHR", "London Heathrow Airport", "London", "United Kingdom"),
    ("CDG", "Charles de Gaulle Airport", "Paris", "France"),
    ("NRT", "Narita International Airport", "Tokyo", "Japan"),
    ("DXB", "Dubai International Airport", "Dubai", "United Arab Emirates"),
    ("SIN", "Singapore Changi Airport", "Singapore", "Singapore"),
];

pub(crate) const AIRLINES: &[(&str, &str)] = &[
    ("AA", "American Airlines"),
    ("DL", "Delta Air Lines"),
    ("UA", "United Airlines"),
    ("SW", "Southwest Airlines"),
    ("BA", "British Airways"),
    ("LH", "Lufthansa"),
    ("EK", "Emirates"),
    ("AF", "Air France"),
];

pub fn airline_logo(code: &str) -> String {
    format!("https://images.kiwi.com/airlines/64/{}.png", code)
}

fn all_airports() -> impl Iterator<Item = Airport> {
    AIRPORTS.iter().map(|&(code, name, city, country)| Airport { code, name, city, country })
}

pub fn airports(filter: &AirportFilter) -> Vec<Airport> {
    let contains = |haystack: &str, needle: &str| haystack.to_lowercase().contains(&needle.to_lowercase());

    all_airports()
        .filter(|a| {
            filter.search.as_deref().map_or(true, |s| {
                contains(a.code, s) || contains(a.name, s) || contains(a.city, s)
            })
        })
        .filter(|a| filter.country.as_deref().map_or(true, |c| contains(a.country, c)))
        .filter(|a| filter.city.as_deref().map_or(true, |c| contains(a.city, c)))
        .collect()
}

pub fn airport(code: &str) -> Option<Airport> {
    all_airports().find(|a| a.code.eq_ignore_ascii_case(code))
}

pub fn airport_name(code: &str) -> String {
    airport(code).map(|a| a.name.to_string()).unwrap_or_else(|| format!("{} Airport", code))
}

pub fn city_name(code: &str) -> String {
    if code == "NYC" {
        return "New York".to_string();
    }
    airport(code).map(|a| a.city.to_string()).unwrap_or_else(|| code.to_string())
}

pub fn country_name(code: &str) -> String {
    if code == "NYC" {
        return "United States".to_string();
    }
    airport(code).map(|a| a.country.to_string()).unwrap_or_else(|| "Country".to_string())
}

pub fn airlines() -> Vec<Airline> {
    AIRLINES
        .iter()
        .map(|&(code, name)| Airline {
            code,
            name,
            // Southwest's logo is published under its IATA code
            logo: airline_logo(if code == "SW" { "WN" } else { code }),
        })
        .collect()
}

pub fn popular_destinations() -> Vec<Destination> {
    vec![
        Destination { code: "NYC", name: "New York", country: "United States", image: "https://example.com/nyc.jpg" },
        Destination { code: "LAX", name: "Los Angeles", country: "United States", image: "https://example.com/la.jpg" },
        Destination { code: "LHR", name: "London", country: "United Kingdom", image: "https://example.com/london.jpg" },
        Destination { code: "CDG", name: "Paris", country: "France", image: "https://example.com/paris.jpg" },
        Destination { code: "NRT", name: "Tokyo", country: "Japan", image: "https://example.com/tokyo.jpg" },
        Destination { code: "DXB", name: "Dubai", country: "UAE", image: "https://example.com/dubai.jpg" },
    ]
}
