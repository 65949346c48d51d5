use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::booking::Booking;
use crate::error::{TravelError, TravelResult};
use crate::flight::{CabinClass, Flight};

/// In-memory flight and booking tables shared by the flight and booking
/// services.
#[derive(Debug, Default)]
pub struct TravelStore {
    flights: RwLock<HashMap<String, Flight>>,
    pub(crate) bookings: RwLock<HashMap<String, Booking>>,
}

impl TravelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn save_flights(&self, flights: &[Flight]) {
        let mut table = self.flights.write().await;
        for flight in flights {
            table.insert(flight.id.clone(), flight.clone());
        }
    }

    pub async fn flight(&self, id: &str) -> Option<Flight> {
        self.flights.read().await.get(id).cloned()
    }

    pub async fn flights_where<F>(&self, predicate: F) -> Vec<Flight>
    where
        F: Fn(&Flight) -> bool,
    {
        self.flights
            .read()
            .await
            .values()
            .filter(|f| predicate(f))
            .cloned()
            .collect()
    }

    /// Checks and takes `count` seats under one write lock. Returns the flight
    /// as it was before the seats were taken.
    pub async fn reserve_seats(&self, flight_id: &str, class: CabinClass, count: usize) -> TravelResult<Flight> {
        let mut table = self.flights.write().await;
        let flight = table.get_mut(flight_id).ok_or(TravelError::FlightNotFound)?;
        if !flight.is_bookable(class, count) {
            return Err(TravelError::Unavailable { passengers: count, class });
        }
        let snapshot = flight.clone();
        *flight.availability.get_mut(class) -= count as u32;
        Ok(snapshot)
    }

    /// Adds `delta` seats in `class`, clamping at zero. Returns false when the
    /// flight is unknown.
    pub async fn adjust_seats(&self, flight_id: &str, class: CabinClass, delta: i64) -> bool {
        let mut table = self.flights.write().await;
        match table.get_mut(flight_id) {
            Some(flight) => {
                let seats = flight.availability.get_mut(class);
                *seats = (*seats as i64 + delta).max(0) as u32;
                true
            }
            None => false,
        }
    }

    pub async fn booking(&self, id: &str) -> Option<Booking> {
        self.bookings.read().await.get(id).cloned()
    }

    pub async fn bookings_where<F>(&self, predicate: F) -> Vec<Booking>
    where
        F: Fn(&Booking) -> bool,
    {
        self.bookings
            .read()
            .await
            .values()
            .filter(|b| predicate(b))
            .cloned()
            .collect()
    }

    pub async fn put_booking(&self, booking: Booking) {
        self.bookings.write().await.insert(booking.id.clone(), booking);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate_flights;
    use chrono::NaiveDate;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_concurrent_reservations_never_oversell() {
        let store = Arc::new(TravelStore::new());
        let date = NaiveDate::from_ymd_opt(2030, 5, 1).unwrap();
        let mut flight = generate_flights(&mut rand::thread_rng(), "JFK", "LAX", date).remove(0);
        *flight.availability.get_mut(CabinClass::Economy) = 5;
        let id = flight.id.clone();
        store.save_flights(&[flight]).await;

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let id = id.clone();
                tokio::spawn(async move { store.reserve_seats(&id, CabinClass::Economy, 2).await })
            })
            .collect();

        let mut granted = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => granted += 1,
                Err(e) => assert!(matches!(e, TravelError::Unavailable { passengers: 2, .. })),
            }
        }
        assert_eq!(granted, 2);
        let left = store.flight(&id).await.unwrap();
        assert_eq!(left.availability.get(CabinClass::Economy), 1);

        assert!(matches!(
            store.reserve_seats("missing", CabinClass::Economy, 1).await,
            Err(TravelError::FlightNotFound)
        ));
    }
}
