//! Synthetic flights used when neither the store nor the upstream provider
//! has anything for a route.

use chrono::{Duration, NaiveDate, NaiveTime};
use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::catalog::{airline_logo, airport_name, city_name, country_name, AIRLINES};
use crate::flight::{
    format_duration, Amenities, Carrier, ClassPrices, ClassSeats, Endpoint, Flight, FlightDuration,
    FlightState, Restrictions, Schedule, Stops,
};

const AIRCRAFT: &[&str] = &[
    "Boeing 737",
    "Boeing 787",
    "Airbus A320",
    "Airbus A350",
    "Boeing 777",
    "Airbus A380",
];

const CONNECTIONS: &[&str] = &["ORD", "DFW", "ATL"];

pub fn generate_flights<R: Rng + ?Sized>(
    rng: &mut R,
    origin: &str,
    destination: &str,
    date: NaiveDate,
) -> Vec<Flight> {
    let count = rng.gen_range(3..=10);
    (0..count).map(|_| generate_flight(rng, origin, destination, date)).collect()
}

fn generate_flight<R: Rng + ?Sized>(rng: &mut R, origin: &str, destination: &str, date: NaiveDate) -> Flight {
    let (code, name) = AIRLINES[rng.gen_range(0..AIRLINES.len())];
    let base: u32 = rng.gen_range(100..900);
    let minutes: u32 = rng.gen_range(60..540);

    let departs = NaiveTime::from_hms_opt(rng.gen_range(0..24), rng.gen_range(0..60), 0)
        .unwrap_or(NaiveTime::MIN);
    let arrives_at = date.and_time(departs) + Duration::minutes(minutes as i64);

    Flight {
        id: format!("fl_{}", Uuid::new_v4().simple()),
        flight_number: format!("{}{}", code, rng.gen_range(1000..10000)),
        airline: Carrier {
            code: code.to_string(),
            name: name.to_string(),
            logo: airline_logo(code),
        },
        aircraft: AIRCRAFT.choose(rng).copied().unwrap_or("Boeing 737").to_string(),
        origin: endpoint(rng, origin),
        destination: endpoint(rng, destination),
        departure: Schedule {
            date,
            time: departs.format("%H:%M").to_string(),
            timezone: "UTC".to_string(),
        },
        arrival: Schedule {
            date: arrives_at.date(),
            time: arrives_at.time().format("%H:%M").to_string(),
            timezone: "UTC".to_string(),
        },
        duration: FlightDuration { total: minutes, formatted: format_duration(minutes) },
        price: ClassPrices {
            economy: base,
            premium: (base as f64 * 1.6).round() as u32,
            business: (base as f64 * 2.8).round() as u32,
            first: (base as f64 * 4.5).round() as u32,
            currency: "USD".to_string(),
        },
        availability: ClassSeats {
            economy: rng.gen_range(20..100),
            premium: rng.gen_range(10..40),
            business: rng.gen_range(5..20),
            first: rng.gen_range(2..10),
        },
        stops: stops(rng, origin, destination),
        amenities: Amenities {
            wifi: rng.gen_bool(0.7),
            entertainment: rng.gen_bool(0.8),
            meals: rng.gen_bool(0.6),
            power_outlets: rng.gen_bool(0.5),
        },
        status: FlightState::Scheduled,
        restrictions: Some(Restrictions {
            baggage_policy: "Standard baggage allowance applies".to_string(),
            cancellation_policy: "24-hour free cancellation".to_string(),
            change_policy: "Changes allowed with fee".to_string(),
        }),
    }
}

fn endpoint<R: Rng + ?Sized>(rng: &mut R, code: &str) -> Endpoint {
    let terminal = rng
        .gen_bool(0.5)
        .then(|| format!("Terminal {}", rng.gen_range(1..=4)));
    let gate = format!("{}{}", (b'A' + rng.gen_range(0..10)) as char, rng.gen_range(1..=50));

    Endpoint {
        code: code.to_string(),
        name: airport_name(code),
        city: city_name(code),
        country: country_name(code),
        terminal,
        gate: Some(gate),
    }
}

fn stops<R: Rng + ?Sized>(rng: &mut R, origin: &str, destination: &str) -> Stops {
    let count: u8 = if rng.gen_bool(0.3) {
        0
    } else if rng.gen_bool(0.2) {
        2
    } else {
        1
    };

    let candidates: Vec<&str> = CONNECTIONS
        .iter()
        .copied()
        .filter(|c| *c != origin && *c != destination)
        .collect();
    let airports: Vec<String> = candidates
        .choose_multiple(rng, count as usize)
        .map(|c| c.to_string())
        .collect();

    Stops {
        count: airports.len() as u8,
        airports,
        duration: if count == 0 { 0 } else { rng.gen_range(45..225) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_flights_stay_in_range() {
        let mut rng = rand::thread_rng();
        let date = NaiveDate::from_ymd_opt(2026, 12, 1).unwrap();

        for _ in 0..50 {
            let flights = generate_flights(&mut rng, "JFK", "LHR", date);
            assert!((3..=10).contains(&flights.len()));

            for f in &flights {
                assert_eq!(f.origin.code, "JFK");
                assert_eq!(f.destination.code, "LHR");
                assert_eq!(f.departure.date, date);
                assert_eq!(f.status, FlightState::Scheduled);
                assert!((100..900).contains(&f.price.economy));
                assert!((60..540).contains(&f.duration.total));
                assert!(f.price.first >= f.price.business && f.price.business >= f.price.premium);
                assert!(f.availability.economy >= 20);
                assert!(f.flight_number.starts_with(&f.airline.code));
                assert_eq!(f.stops.count as usize, f.stops.airports.len());
                assert!(f.stops.count == 0 || f.stops.duration >= 45);
            }
        }
    }

    #[test]
    fn test_connections_skip_route_endpoints() {
        let mut rng = rand::thread_rng();
        let date = NaiveDate::from_ymd_opt(2026, 12, 1).unwrap();
        for _ in 0..50 {
            for f in generate_flights(&mut rng, "ORD", "ATL", date) {
                assert!(f.stops.airports.iter().all(|a| a == "DFW"));
            }
        }
    }
}
