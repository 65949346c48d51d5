use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use travel::search::{FlightStatus, PriceAlert};
use travel::{FlightService, SearchQuery, SearchResults};

/// Flight data the dialogue needs.
#[async_trait]
pub trait FlightSearchPort: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResults>;

    async fn flight_status(&self, flight_number: &str, date: NaiveDate) -> Result<FlightStatus>;

    async fn price_alerts(&self, origin: &str, destination: &str, today: NaiveDate) -> Result<Option<PriceAlert>>;
}

#[async_trait]
impl FlightSearchPort for FlightService {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResults> {
        Ok(FlightService::search(self, query).await?)
    }

    async fn flight_status(&self, flight_number: &str, date: NaiveDate) -> Result<FlightStatus> {
        Ok(FlightService::flight_status(self, flight_number, date).await)
    }

    async fn price_alerts(&self, origin: &str, destination: &str, today: NaiveDate) -> Result<Option<PriceAlert>> {
        Ok(FlightService::price_alerts(self, origin, destination, today))
    }
}

#[async_trait]
impl<T: FlightSearchPort + ?Sized> FlightSearchPort for std::sync::Arc<T> {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResults> {
        (**self).search(query).await
    }

    async fn flight_status(&self, flight_number: &str, date: NaiveDate) -> Result<FlightStatus> {
        (**self).flight_status(flight_number, date).await
    }

    async fn price_alerts(&self, origin: &str, destination: &str, today: NaiveDate) -> Result<Option<PriceAlert>> {
        (**self).price_alerts(origin, destination, today).await
    }
}
