use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query},
    middleware,
    routing::get,
    Extension, Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use travel::catalog::{self, AirportFilter};

use super::ok;
use crate::error::ApiError;
use crate::rate_limit::{self, RateLimiter};
use crate::validation::SearchParams;
use crate::AppState;

pub fn router(search_limiter: Arc<RateLimiter>) -> Router {
    Router::new()
        .route(
            "/search",
            get(search).route_layer(middleware::from_fn_with_state(search_limiter, rate_limit::enforce)),
        )
        .route("/popular", get(popular))
        .route("/airports", get(airports))
        .route("/airlines", get(airlines))
        .route("/price-alerts", get(price_alerts))
        .route("/status/:flight_number", get(flight_status))
        .route("/:flight_id", get(flight_details))
}

async fn search(
    Extension(state): Extension<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let query = params.into_query(Utc::now().date_naive())?;

    let results = state.flights.search(&query).await?;
    let message = if results.flights.is_empty() {
        "No flights found for your search criteria".to_string()
    } else {
        format!("Found {} flights", results.flights.len())
    };

    Ok(ok(json!({
        "flights": results.flights,
        "searchParams": query,
        "total": results.total,
        "message": message,
    })))
}

async fn popular() -> Json<Value> {
    ok(json!({ "destinations": catalog::popular_destinations() }))
}

async fn airports(filter: Result<Query<AirportFilter>, QueryRejection>) -> Result<Json<Value>, ApiError> {
    let Query(filter) = filter?;
    Ok(ok(json!({ "airports": catalog::airports(&filter) })))
}

async fn airlines() -> Json<Value> {
    ok(json!({ "airlines": catalog::airlines() }))
}

#[derive(Debug, Deserialize)]
struct RouteParams {
    origin: Option<String>,
    destination: Option<String>,
}

async fn price_alerts(
    Extension(state): Extension<AppState>,
    params: Result<Query<RouteParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let (Some(origin), Some(destination)) = (params.origin, params.destination) else {
        return Err(ApiError::BadRequest("Origin and destination are required".to_string()));
    };

    let alert = state
        .flights
        .price_alerts(&origin.to_uppercase(), &destination.to_uppercase(), Utc::now().date_naive())
        .ok_or_else(|| ApiError::NotFound("No price data for this route".to_string()))?;
    Ok(ok(json!(alert)))
}

#[derive(Debug, Deserialize)]
struct StatusParams {
    date: Option<String>,
}

async fn flight_status(
    Extension(state): Extension<AppState>,
    Path(flight_number): Path<String>,
    params: Result<Query<StatusParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let date = match params.date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| ApiError::BadRequest("Date must be an ISO 8601 date".to_string()))?,
        None => Utc::now().date_naive(),
    };

    let status = state.flights.flight_status(&flight_number, date).await;
    Ok(ok(json!({ "status": status })))
}

async fn flight_details(
    Extension(state): Extension<AppState>,
    Path(flight_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let flight = state.flights.flight(&flight_id).await?;
    Ok(ok(json!({ "flight": flight })))
}
