use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query,
    },
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use travel::{BookingQuery, BookingUpdate, FlightLeg, NewBooking};

use super::{ok, ok_with_message};
use crate::auth::AuthUser;
use crate::error::{ApiError, FieldError};
use crate::rate_limit::{self, RateLimiter};
use crate::validation;
use crate::AppState;

pub fn router(booking_limiter: Arc<RateLimiter>) -> Router {
    Router::new()
        .route(
            "/",
            post(create_booking)
                .route_layer(middleware::from_fn_with_state(booking_limiter, rate_limit::enforce))
                .get(list_bookings),
        )
        .route("/stats", get(booking_stats))
        .route("/view", post(view_booking))
        .route("/reference/:reference", get(booking_by_reference))
        .route("/:id", get(get_booking).put(update_booking).delete(cancel_booking))
        .route("/:id/checkin", post(check_in))
}

async fn create_booking(
    Extension(state): Extension<AppState>,
    AuthUser(user): AuthUser,
    body: Result<Json<NewBooking>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(request) = body?;
    validation::new_booking(&request, Utc::now().date_naive())?;

    let booking = state.bookings.create(&user.id, request).await?;
    Ok((
        StatusCode::CREATED,
        ok_with_message("Booking created successfully", json!({ "booking": booking })),
    ))
}

async fn list_bookings(
    Extension(state): Extension<AppState>,
    AuthUser(user): AuthUser,
    query: Result<Query<BookingQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let page = state.bookings.list(&user.id, &query).await;
    Ok(ok(json!(page)))
}

async fn booking_stats(Extension(state): Extension<AppState>, AuthUser(user): AuthUser) -> Json<Value> {
    let stats = state.bookings.stats(&user.id).await;
    ok(json!({ "stats": stats }))
}

async fn get_booking(
    Extension(state): Extension<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let booking = state.bookings.get_for_user(&id, &user.id).await?;
    Ok(ok(json!({ "booking": booking })))
}

async fn update_booking(
    Extension(state): Extension<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    body: Result<Json<BookingUpdate>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(update) = body?;
    if let Some(contact) = &update.contact_info {
        let mut errors = Vec::new();
        if !validation::is_email(&contact.email) {
            errors.push(FieldError {
                field: "contactInfo.email".to_string(),
                message: "Please provide a valid email".to_string(),
            });
        }
        if !validation::is_phone(&contact.phone) {
            errors.push(FieldError {
                field: "contactInfo.phone".to_string(),
                message: "Please provide a valid phone number".to_string(),
            });
        }
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
    }

    let booking = state.bookings.update(&id, &user.id, update).await?;
    Ok(ok_with_message("Booking updated successfully", json!({ "booking": booking })))
}

#[derive(Debug, Default, Deserialize)]
struct CancelRequest {
    reason: Option<String>,
}

async fn cancel_booking(
    Extension(state): Extension<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    body: Option<Json<CancelRequest>>,
) -> Result<Json<Value>, ApiError> {
    let reason = body.and_then(|Json(b)| b.reason);
    let cancelled = state.bookings.cancel(&id, &user.id, reason).await?;
    Ok(ok_with_message(
        "Booking cancelled successfully",
        json!({ "booking": cancelled.booking, "refundAmount": cancelled.refund_amount }),
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckInRequest {
    #[serde(default)]
    flight_type: FlightLeg,
}

async fn check_in(
    Extension(state): Extension<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    body: Option<Json<CheckInRequest>>,
) -> Result<Json<Value>, ApiError> {
    let leg = body.map(|Json(b)| b.flight_type).unwrap_or_default();
    let checked_in = state.bookings.check_in(&id, &user.id, leg).await?;
    Ok(ok_with_message(
        "Check-in successful",
        json!({ "booking": checked_in.booking, "boardingPass": checked_in.boarding_pass }),
    ))
}

#[derive(Debug, Deserialize)]
struct EmailParam {
    email: Option<String>,
}

async fn booking_by_reference(
    Extension(state): Extension<AppState>,
    Path(reference): Path<String>,
    query: Result<Query<EmailParam>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    validation::booking_reference(&reference)?;
    let Query(query) = query?;
    let email = query
        .email
        .ok_or_else(|| ApiError::BadRequest("Email is required to retrieve booking".to_string()))?;

    let booking = state
        .bookings
        .find_by_reference(&reference, &email)
        .await
        .ok_or_else(|| ApiError::NotFound("Booking not found with the provided reference and email".to_string()))?;
    Ok(ok(json!({ "booking": booking })))
}

#[derive(Debug, Deserialize)]
struct ViewRequest {
    reference: Option<String>,
    email: Option<String>,
}

/// Compact lookup behind the chat widget's "View Booking" modal.
async fn view_booking(
    Extension(state): Extension<AppState>,
    body: Result<Json<ViewRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    let (Some(reference), Some(email)) = (body.reference, body.email) else {
        return Err(ApiError::BadRequest("Booking reference and email are required.".to_string()));
    };

    let booking = state
        .bookings
        .find_by_reference(&reference, &email)
        .await
        .ok_or_else(|| ApiError::NotFound("Booking not found with the provided reference and email.".to_string()))?;

    let flight_number = booking
        .flights
        .first()
        .map(|f| f.flight.flight_number.clone())
        .unwrap_or_default();
    Ok(Json(json!({
        "success": true,
        "booking": {
            "reference": booking.booking_reference,
            "email": booking.contact_info.email,
            "flightNumber": flight_number,
            "status": booking.booking_status,
        },
    })))
}
