use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{TravelError, TravelResult};
use crate::flight::{CabinClass, Flight, FlightState};
use crate::generator::generate_flights;
use crate::store::TravelStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Price,
    Duration,
    Departure,
    Airline,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<NaiveDate>,
    #[serde(default = "one")]
    pub passengers: u32,
    #[serde(default)]
    pub class_type: CabinClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stops: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub airlines: Vec<String>,
    #[serde(default)]
    pub sort_by: SortBy,
}

impl SearchQuery {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>, departure_date: NaiveDate) -> Self {
        Self {
            origin: origin.into().to_uppercase(),
            destination: destination.into().to_uppercase(),
            departure_date,
            return_date: None,
            passengers: 1,
            class_type: CabinClass::Economy,
            stops: None,
            max_price: None,
            airlines: Vec::new(),
            sort_by: SortBy::Price,
        }
    }

    /// Route, day, status and seat checks plus the optional filters.
    pub fn matches(&self, flight: &Flight) -> bool {
        flight.origin.code == self.origin
            && flight.destination.code == self.destination
            && flight.departure.date == self.departure_date
            && flight.status == FlightState::Scheduled
            && flight.availability.get(self.class_type) >= self.passengers
            && self.stops.map_or(true, |n| flight.stops.count == n)
            && self.max_price.map_or(true, |max| flight.price.get(self.class_type) <= max)
            && (self.airlines.is_empty()
                || self.airlines.iter().any(|a| a.eq_ignore_ascii_case(&flight.airline.code)))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub flights: Vec<Flight>,
    pub total: usize,
}

/// Upstream source of live flight offers.
#[async_trait]
pub trait FlightProvider: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Flight>>;
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    #[serde(default)]
    data: Vec<Flight>,
}

/// JSON flight-offer API reached with a bearer key.
#[derive(Debug, Clone)]
pub struct HttpFlightProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    max_results: usize,
}

impl HttpFlightProvider {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, max_results: usize) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            max_results,
        })
    }
}

#[async_trait]
impl FlightProvider for HttpFlightProvider {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Flight>> {
        let url = format!("{}/flights", self.base_url);
        let mut request = self.http.get(url).query(&[
            ("originLocationCode", query.origin.clone()),
            ("destinationLocationCode", query.destination.clone()),
            ("departureDate", query.departure_date.to_string()),
            ("adults", query.passengers.to_string()),
            ("travelClass", query.class_type.as_str().to_uppercase()),
            ("currencyCode", "USD".to_string()),
            ("max", self.max_results.to_string()),
        ]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await.context("request failed")?;
        if !resp.status().is_success() {
            return Err(anyhow!("flight provider {}: {}", resp.status(), resp.text().await.unwrap_or_default()));
        }

        let body: ProviderResponse = resp.json().await.context("invalid json")?;
        Ok(body.data)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusPoint {
    pub scheduled: String,
    pub estimated: String,
    pub actual: Option<String>,
    pub gate: Option<String>,
    pub terminal: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightStatus {
    pub flight_number: String,
    pub date: NaiveDate,
    pub status: String,
    pub departure: StatusPoint,
    pub arrival: StatusPoint,
    pub aircraft: String,
    pub delay: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceAlert {
    pub route: String,
    pub current_price: u32,
    pub average_price: u32,
    pub lowest_price: u32,
    pub highest_price: u32,
    pub price_history: Vec<PricePoint>,
    pub recommendation: &'static str,
}

/// Summarises a price history, oldest first. Buying is recommended when the
/// latest price is at or below the average.
pub fn summarize_prices(route: String, history: Vec<PricePoint>) -> Option<PriceAlert> {
    let current = history.last()?.price;
    let sum: u64 = history.iter().map(|p| p.price as u64).sum();
    let average = (sum as f64 / history.len() as f64).round() as u32;
    let lowest = history.iter().map(|p| p.price).min()?;
    let highest = history.iter().map(|p| p.price).max()?;

    Some(PriceAlert {
        route,
        current_price: current,
        average_price: average,
        lowest_price: lowest,
        highest_price: highest,
        price_history: history,
        recommendation: if current <= average { "Buy now" } else { "Wait" },
    })
}

pub struct FlightService {
    store: Arc<TravelStore>,
    provider: Option<Arc<dyn FlightProvider>>,
}

impl FlightService {
    pub fn new(store: Arc<TravelStore>) -> Self {
        Self { store, provider: None }
    }

    pub fn with_provider(mut self, provider: Arc<dyn FlightProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn store(&self) -> &Arc<TravelStore> {
        &self.store
    }

    /// Stored flights first, then the upstream provider, then synthetic
    /// flights. Fetched and generated flights are saved so they can be booked.
    pub async fn search(&self, query: &SearchQuery) -> TravelResult<SearchResults> {
        let mut flights = self.store.flights_where(|f| query.matches(f)).await;

        if flights.is_empty() {
            let fresh = match &self.provider {
                Some(provider) => match provider.search(query).await {
                    Ok(found) => found,
                    Err(e) => {
                        tracing::warn!("Flight provider failed, using generated flights: {:#}", e);
                        self.generate(query)
                    }
                },
                None => self.generate(query),
            };

            self.store.save_flights(&fresh).await;
            flights = fresh.into_iter().filter(|f| query.matches(f)).collect();
        }

        sort_flights(&mut flights, query.sort_by, query.class_type);
        tracing::debug!(
            origin = %query.origin,
            destination = %query.destination,
            found = flights.len(),
            "flight search complete"
        );

        Ok(SearchResults { total: flights.len(), flights })
    }

    fn generate(&self, query: &SearchQuery) -> Vec<Flight> {
        let mut rng = rand::thread_rng();
        generate_flights(&mut rng, &query.origin, &query.destination, query.departure_date)
    }

    pub async fn flight(&self, id: &str) -> TravelResult<Flight> {
        self.store.flight(id).await.ok_or(TravelError::FlightNotFound)
    }

    /// Status of a flight number on `date`, read from the stored schedule when
    /// the flight is known.
    pub async fn flight_status(&self, flight_number: &str, date: NaiveDate) -> FlightStatus {
        let number = flight_number.to_uppercase();
        let known = self
            .store
            .flights_where(|f| f.flight_number == number && f.departure.date == date)
            .await
            .into_iter()
            .next();

        match known {
            Some(f) => FlightStatus {
                flight_number: number,
                date,
                status: status_label(f.status).to_string(),
                departure: StatusPoint {
                    scheduled: f.departure.time.clone(),
                    estimated: f.departure.time.clone(),
                    actual: None,
                    gate: f.origin.gate.clone(),
                    terminal: f.origin.terminal.clone(),
                },
                arrival: StatusPoint {
                    scheduled: f.arrival.time.clone(),
                    estimated: f.arrival.time.clone(),
                    actual: None,
                    gate: f.destination.gate.clone(),
                    terminal: f.destination.terminal.clone(),
                },
                aircraft: f.aircraft,
                delay: None,
            },
            None => FlightStatus {
                flight_number: number,
                date,
                status: "On Time".to_string(),
                departure: StatusPoint {
                    scheduled: "10:30".to_string(),
                    estimated: "10:30".to_string(),
                    actual: None,
                    gate: Some("A12".to_string()),
                    terminal: Some("Terminal 1".to_string()),
                },
                arrival: StatusPoint {
                    scheduled: "14:45".to_string(),
                    estimated: "14:45".to_string(),
                    actual: None,
                    gate: Some("B8".to_string()),
                    terminal: Some("Terminal 2".to_string()),
                },
                aircraft: "Boeing 737-800".to_string(),
                delay: None,
            },
        }
    }

    /// Thirty days of prices for a route ending at `today`.
    pub fn price_alerts(&self, origin: &str, destination: &str, today: NaiveDate) -> Option<PriceAlert> {
        let mut rng = rand::thread_rng();
        let history = (0..30)
            .rev()
            .map(|days_ago| PricePoint {
                date: today - Duration::days(days_ago),
                price: rng.gen_range(200..500),
            })
            .collect();

        summarize_prices(format!("{}-{}", origin.to_uppercase(), destination.to_uppercase()), history)
    }
}

fn status_label(state: FlightState) -> &'static str {
    match state {
        FlightState::Scheduled => "On Time",
        FlightState::Delayed => "Delayed",
        FlightState::Cancelled => "Cancelled",
        FlightState::Departed => "Departed",
        FlightState::Arrived => "Arrived",
    }
}

pub fn sort_flights(flights: &mut [Flight], sort_by: SortBy, class: CabinClass) {
    match sort_by {
        SortBy::Price => flights.sort_by_key(|f| f.price.get(class)),
        SortBy::Duration => flights.sort_by_key(|f| f.duration.total),
        SortBy::Departure => flights.sort_by_key(|f| f.departure_at()),
        SortBy::Airline => flights.sort_by(|a, b| a.airline.name.cmp(&b.airline.name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_price_summary() {
        let history = vec![
            PricePoint { date: day(2026, 1, 1), price: 300 },
            PricePoint { date: day(2026, 1, 2), price: 450 },
            PricePoint { date: day(2026, 1, 3), price: 240 },
        ];
        let alert = summarize_prices("JFK-LAX".into(), history).unwrap();

        assert_eq!(alert.current_price, 240);
        assert_eq!(alert.average_price, 330);
        assert_eq!(alert.lowest_price, 240);
        assert_eq!(alert.highest_price, 450);
        assert_eq!(alert.recommendation, "Buy now");

        assert!(summarize_prices("JFK-LAX".into(), Vec::new()).is_none());
    }

    #[test]
    fn test_price_alert_history_window() {
        let service = FlightService::new(Arc::new(TravelStore::new()));
        let today = day(2026, 3, 15);
        let alert = service.price_alerts("jfk", "lax", today).unwrap();

        assert_eq!(alert.route, "JFK-LAX");
        assert_eq!(alert.price_history.len(), 30);
        assert_eq!(alert.price_history.last().unwrap().date, today);
        assert_eq!(alert.price_history[0].date, day(2026, 2, 14));
        assert!(alert.price_history.iter().all(|p| (200..500).contains(&p.price)));
        assert!(alert.lowest_price <= alert.average_price && alert.average_price <= alert.highest_price);
    }
}
