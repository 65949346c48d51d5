use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use flight_server::{
    build_router,
    config::{Config, LimitRule},
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_config() -> Config {
    let mut config = Config::default();
    config.payment_failure_rate = 0.0;
    config.limits.api = LimitRule::new(1_000, 60);
    config.limits.booking = LimitRule::new(100, 60);
    config
}

fn app_with(config: Config) -> Router {
    build_router(AppState::new(config).expect("state builds without upstream"))
}

async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}

async fn register(app: &Router, email: &str) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": "Jane Traveller", "email": email })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    body["data"]["token"].as_str().unwrap().to_string()
}

fn date_in(days: i64) -> String {
    (Utc::now().date_naive() + Duration::days(days)).to_string()
}

#[tokio::test]
async fn test_health() {
    let app = app_with(test_config());
    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_auth_token_round_trip() {
    let app = app_with(test_config());
    let token = register(&app, "jane@example.com").await;

    let (status, body) = call(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["email"], "jane@example.com");

    let (status, body) = call(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = call(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": "Jane Again", "email": "JANE@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_search_validation_envelope() {
    let app = app_with(test_config());
    let uri = format!("/api/flights/search?origin=J1K&destination=LAX&departureDate={}&passengers=12", date_in(5));

    let (status, body) = call(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Validation failed");
    let fields: Vec<&str> = body["errors"].as_array().unwrap().iter().map(|e| e["field"].as_str().unwrap()).collect();
    assert_eq!(fields, vec!["origin", "passengers"]);

    let (status, body) = call(&app, "GET", "/api/flights/search?origin=JFK", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"].is_null());
}

#[tokio::test]
async fn test_search_then_fetch_flight() {
    let app = app_with(test_config());
    let uri = format!("/api/flights/search?origin=jfk&destination=lax&departureDate={}", date_in(10));

    let (status, body) = call(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let flights = body["data"]["flights"].as_array().unwrap();
    assert!(!flights.is_empty());
    assert_eq!(body["data"]["searchParams"]["origin"], "JFK");

    let id = flights[0]["id"].as_str().unwrap();
    let (status, body) = call(&app, "GET", &format!("/api/flights/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["flight"]["id"], id);

    let (status, _) = call(&app, "GET", "/api/flights/fl_missing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_catalog_endpoints() {
    let app = app_with(test_config());

    let (status, body) = call(&app, "GET", "/api/flights/airports?search=london", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["airports"].as_array().unwrap().iter().any(|a| a["code"] == "LHR"));

    let (_, body) = call(&app, "GET", "/api/flights/price-alerts?origin=JFK", None, None).await;
    assert_eq!(body["message"], "Origin and destination are required");

    let (status, body) = call(&app, "GET", "/api/flights/status/aa100", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"]["flightNumber"], "AA100");
}

#[tokio::test]
async fn test_booking_lifecycle() {
    let app = app_with(test_config());
    let token = register(&app, "jane@example.com").await;

    let uri = format!("/api/flights/search?origin=JFK&destination=LAX&departureDate={}", date_in(45));
    let (_, body) = call(&app, "GET", &uri, None, None).await;
    let flight_id = body["data"]["flights"][0]["id"].as_str().unwrap().to_string();

    let request = json!({
        "flightId": flight_id,
        "classType": "economy",
        "passengers": [{
            "title": "Ms",
            "firstName": "Jane",
            "lastName": "Traveller",
            "dateOfBirth": "1990-05-01"
        }],
        "contactInfo": { "email": "Jane@Example.com", "phone": "+1 555 123 4567" },
        "paymentMethod": "credit_card"
    });

    let (status, _) = call(&app, "POST", "/api/bookings", None, Some(request.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, "POST", "/api/bookings", Some(&token), Some(request)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    let booking = &body["data"]["booking"];
    assert_eq!(booking["bookingStatus"], "confirmed");
    let id = booking["id"].as_str().unwrap().to_string();
    let reference = booking["bookingReference"].as_str().unwrap().to_string();

    let (_, body) = call(&app, "GET", "/api/bookings", Some(&token), None).await;
    assert_eq!(body["data"]["total"], 1);

    let uri = format!("/api/bookings/reference/{}?email=jane@example.com", reference.to_lowercase());
    let (status, body) = call(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["booking"]["id"], id.as_str());

    let (status, body) = call(
        &app,
        "POST",
        "/api/bookings/view",
        None,
        Some(json!({ "reference": reference, "email": "JANE@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "confirmed");

    // another user cannot see it
    let other = register(&app, "sam@example.com").await;
    let (status, _) = call(&app, "GET", &format!("/api/bookings/{}", id), Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &app,
        "DELETE",
        &format!("/api/bookings/{}", id),
        Some(&token),
        Some(json!({ "reason": "plans changed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["booking"]["bookingStatus"], "cancelled");
    let total = body["data"]["booking"]["totalAmount"].as_f64().unwrap();
    assert_eq!(body["data"]["refundAmount"].as_f64().unwrap(), total);

    let (status, body) = call(&app, "DELETE", &format!("/api/bookings/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "This booking cannot be cancelled");

    let (_, body) = call(&app, "GET", "/api/bookings/stats", Some(&token), None).await;
    assert_eq!(body["data"]["stats"]["cancelledBookings"], 1);
}

#[tokio::test]
async fn test_booking_validation() {
    let app = app_with(test_config());
    let token = register(&app, "jane@example.com").await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/bookings",
        Some(&token),
        Some(json!({
            "flightId": "fl_x",
            "passengers": [{ "title": "Mr", "firstName": "J", "lastName": "Smith", "dateOfBirth": "1990-01-01" }],
            "contactInfo": { "email": "not-an-email", "phone": "+1 555 123 4567" },
            "paymentMethod": "paypal"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["errors"].as_array().unwrap().iter().map(|e| e["field"].as_str().unwrap()).collect();
    assert_eq!(fields, vec!["passengers[0].firstName", "contactInfo.email"]);

    let (status, _) = call(&app, "GET", "/api/bookings/reference/AB1?email=a@b.co", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_over_http() {
    let app = app_with(test_config());
    let session = "6f1c1f1e-8a4b-4c0e-9d1a-2b3c4d5e6f70";

    let (status, body) = call(
        &app,
        "POST",
        "/api/chat/message",
        None,
        Some(json!({ "message": "flights from JFK to LAX tomorrow", "sessionId": session })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let turn = &body["data"]["botResponse"];
    assert_eq!(turn["intent"], "search_flights");
    assert_eq!(turn["state"], "showing_results");
    assert_eq!(turn["responseType"], "list");
    assert_eq!(body["data"]["sessionId"], session);

    let (_, body) = call(&app, "GET", &format!("/api/chat/history?sessionId={}", session), None, None).await;
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["messages"][0]["sender"], "user");

    let (status, body) = call(&app, "GET", &format!("/api/chat/summary/{}", session), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["summary"]["userMessages"], 1);

    let (status, _) = call(&app, "GET", "/api/chat/history", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = call(&app, "DELETE", &format!("/api/chat/history?sessionId={}", session), None, None).await;
    assert_eq!(body["data"]["deletedCount"], 2);

    let (status, _) = call(&app, "GET", &format!("/api/chat/summary/{}", session), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&app, "POST", "/api/chat/message", None, Some(json!({ "message": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "message");
}

#[tokio::test]
async fn test_chat_rate_limit() {
    let mut config = test_config();
    config.limits.chat = LimitRule::new(2, 60);
    let app = app_with(config);

    for _ in 0..2 {
        let (status, _) = call(&app, "POST", "/api/chat/message", None, Some(json!({ "message": "hello" }))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = call(&app, "POST", "/api/chat/message", None, Some(json!({ "message": "hello" }))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["message"], "Too many messages, please slow down.");

    // other endpoints keep their own budget
    let (status, _) = call(&app, "GET", "/api/flights/popular", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

async fn chat_from(app: &Router, forwarded: &str) -> StatusCode {
    let request = Request::builder()
        .method("POST")
        .uri("/api/chat/message")
        .header("content-type", "application/json")
        .header("x-forwarded-for", forwarded)
        .body(Body::from(json!({ "message": "hello" }).to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap().status()
}

#[tokio::test]
async fn test_forwarded_for_does_not_reset_the_window() {
    let mut config = test_config();
    config.limits.chat = LimitRule::new(2, 60);
    let app = app_with(config);

    let mut statuses = Vec::new();
    for i in 0..5 {
        statuses.push(chat_from(&app, &format!("198.51.100.{}", i)).await);
    }
    assert_eq!(statuses[..2], [StatusCode::OK, StatusCode::OK]);
    assert!(statuses[2..].iter().all(|s| *s == StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn test_trusted_proxy_keys_on_forwarded_for() {
    let mut config = test_config();
    config.limits.chat = LimitRule::new(1, 60);
    config.limits.trust_proxy = true;
    let app = app_with(config);

    assert_eq!(chat_from(&app, "198.51.100.1").await, StatusCode::OK);
    assert_eq!(chat_from(&app, "198.51.100.1").await, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(chat_from(&app, "198.51.100.2").await, StatusCode::OK);
}
