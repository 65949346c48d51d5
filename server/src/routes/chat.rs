use std::sync::Arc;

use assistant::{Owner, TimeRange};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query,
    },
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{ok, ok_with_message};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::rate_limit::{self, RateLimiter};
use crate::validation;
use crate::AppState;

const DEFAULT_HISTORY_LIMIT: usize = 20;

pub fn router(chat_limiter: Arc<RateLimiter>) -> Router {
    Router::new()
        .route(
            "/message",
            post(send_message).route_layer(middleware::from_fn_with_state(chat_limiter, rate_limit::enforce)),
        )
        .route("/history", get(history).delete(clear_history))
        .route("/summary/:session_id", get(summary))
        .route("/analytics", get(analytics))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    message: String,
    session_id: Option<String>,
}

async fn send_message(
    Extension(state): Extension<AppState>,
    user: Option<AuthUser>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    validation::chat_message(&body.message, body.session_id.as_deref())?;

    let session_id = body.session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let user_id = user.as_ref().map(|AuthUser(u)| u.id.as_str());

    let turn = state.assistant.process(&session_id, user_id, body.message.trim()).await;
    Ok(ok(json!({
        "userMessage": { "sender": "user", "message": body.message },
        "botResponse": turn,
        "sessionId": session_id,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryParams {
    session_id: Option<String>,
    limit: Option<usize>,
}

fn owner_of<'a>(user: &'a Option<AuthUser>, session_id: Option<&'a str>) -> Result<Owner<'a>, ApiError> {
    match (user, session_id) {
        (Some(AuthUser(u)), _) => Ok(Owner::User(&u.id)),
        (None, Some(sid)) => Ok(Owner::Session(sid)),
        (None, None) => Err(ApiError::BadRequest("Session ID is required for guest users".to_string())),
    }
}

async fn history(
    Extension(state): Extension<AppState>,
    user: Option<AuthUser>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let owner = owner_of(&user, params.session_id.as_deref())?;

    let messages = state
        .assistant
        .transcript()
        .history(owner, params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
        .await;
    Ok(ok(json!({ "total": messages.len(), "messages": messages })))
}

async fn clear_history(
    Extension(state): Extension<AppState>,
    user: Option<AuthUser>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let owner = owner_of(&user, params.session_id.as_deref())?;

    let deleted = state.assistant.transcript().clear(owner).await;
    if let Some(session_id) = params.session_id.as_deref() {
        state.assistant.clear_conversation(session_id).await;
    }
    Ok(ok_with_message(
        format!("Cleared {} messages", deleted),
        json!({ "deletedCount": deleted }),
    ))
}

async fn summary(
    Extension(state): Extension<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let summary = state
        .assistant
        .transcript()
        .summary(&session_id)
        .await
        .ok_or_else(|| ApiError::NotFound("No conversation found".to_string()))?;
    Ok(ok(json!({ "summary": summary })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyticsParams {
    time_range: Option<String>,
}

async fn analytics(
    Extension(state): Extension<AppState>,
    user: Option<AuthUser>,
    params: Result<Query<AnalyticsParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    // unknown ranges fall back to a week
    let range = params
        .time_range
        .and_then(|raw| serde_json::from_value::<TimeRange>(Value::from(raw)).ok())
        .unwrap_or_default();
    let user_id = user.as_ref().map(|AuthUser(u)| u.id.as_str());

    let analytics = state.assistant.transcript().analytics(user_id, range, Utc::now()).await;
    Ok(ok(json!(analytics)))
}
