//! HTTP and WebSocket front-end for the flight assistant.

pub mod auth;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod validation;
pub mod websocket;

use anyhow::Result;
use assistant::{Assistant, ChatLog};
use axum::{middleware, routing::get, Extension, Json, Router};
use protocol::ServerEvent;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use travel::{BookingService, FlightService, HttpFlightProvider, MockPaymentProcessor, TravelStore};

use auth::UserDirectory;
use config::Config;
use rate_limit::Limiters;

/// A socket event fanned out to every connection except `from`.
#[derive(Debug, Clone)]
pub struct Broadcast {
    pub from: String,
    pub event: ServerEvent,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub flights: Arc<FlightService>,
    pub bookings: Arc<BookingService>,
    pub assistant: Arc<Assistant<Arc<FlightService>>>,
    pub users: Arc<RwLock<UserDirectory>>,
    pub limiters: Limiters,
    pub events: broadcast::Sender<Broadcast>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let store = Arc::new(TravelStore::new());

        let mut flights = FlightService::new(store.clone());
        if let Some(url) = &config.flight_api_url {
            let provider =
                HttpFlightProvider::new(url.clone(), config.flight_api_key.clone(), config.max_search_results)?;
            flights = flights.with_provider(Arc::new(provider));
            tracing::info!("Upstream flight provider: {}", url);
        }
        let flights = Arc::new(flights);

        let payments = Arc::new(MockPaymentProcessor::new(config.payment_failure_rate));
        let bookings = Arc::new(BookingService::new(store, payments));
        let assistant = Arc::new(Assistant::new(flights.clone(), Arc::new(ChatLog::new())));
        let (events, _) = broadcast::channel(256);

        Ok(Self {
            limiters: Limiters::new(&config.limits),
            config: Arc::new(config),
            flights,
            bookings,
            assistant,
            users: Arc::new(RwLock::new(UserDirectory::new())),
            events,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let limiters = state.limiters.clone();

    let auth_routes = Router::new()
        .route("/register", axum::routing::post(auth::register))
        .route("/me", get(auth::me))
        .route_layer(middleware::from_fn_with_state(limiters.auth.clone(), rate_limit::enforce));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/flights", routes::flights::router(limiters.search.clone()))
        .nest("/bookings", routes::bookings::router(limiters.booking.clone()))
        .nest("/chat", routes::chat::router(limiters.chat.clone()))
        .route_layer(middleware::from_fn_with_state(limiters.api.clone(), rate_limit::enforce));

    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket::handle_websocket))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "timestamp": chrono::Utc::now().to_rfc3339() }))
}
