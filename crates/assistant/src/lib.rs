//! Rule-based chat assistant for flight search.
//!
//! Each message is classified with `nlu`, merged with what the session
//! already knows and answered from canned replies or live flight data.

pub mod engine;
pub mod ports;
pub mod reply;
pub mod session;
pub mod transcript;

pub use engine::{Assistant, ChatTurn, TurnMetadata};
pub use ports::FlightSearchPort;
pub use reply::{BotReply, ClientAction, ResponseKind, ERROR_APOLOGY};
pub use session::{DialogueState, Session, SessionData, SessionStore};
pub use transcript::{ChatAnalytics, ChatLog, ChatRecord, ConversationSummary, Owner, Sender, TimeRange};

/// Flight ports for tests and local runs without a flight backend.
pub mod mocks {
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use travel::search::{FlightStatus, PriceAlert};
    use travel::{SearchQuery, SearchResults};

    use super::FlightSearchPort;

    /// Every call fails.
    #[derive(Default)]
    pub struct FailingFlights {
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl FlightSearchPort for FailingFlights {
        async fn search(&self, _query: &SearchQuery) -> Result<SearchResults> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("flight backend unavailable"))
        }

        async fn flight_status(&self, _flight_number: &str, _date: NaiveDate) -> Result<FlightStatus> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("flight backend unavailable"))
        }

        async fn price_alerts(&self, _origin: &str, _destination: &str, _today: NaiveDate) -> Result<Option<PriceAlert>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("flight backend unavailable"))
        }
    }

    /// Searches succeed with no flights; status lookups fail.
    #[derive(Default)]
    pub struct EmptyFlights;

    #[async_trait]
    impl FlightSearchPort for EmptyFlights {
        async fn search(&self, _query: &SearchQuery) -> Result<SearchResults> {
            Ok(SearchResults { flights: Vec::new(), total: 0 })
        }

        async fn flight_status(&self, flight_number: &str, _date: NaiveDate) -> Result<FlightStatus> {
            Err(anyhow!("no status for {}", flight_number))
        }

        async fn price_alerts(&self, _origin: &str, _destination: &str, _today: NaiveDate) -> Result<Option<PriceAlert>> {
            Ok(None)
        }
    }
}
