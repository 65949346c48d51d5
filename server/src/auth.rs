use std::collections::HashMap;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::{validation, AppState};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Registered users and the bearer tokens issued to them.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: HashMap<String, User>,
    tokens: HashMap<String, String>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a user and issues a token. Emails are unique, compared
    /// lower-cased.
    pub fn register(&mut self, name: &str, email: &str, phone: Option<String>) -> Result<(User, String), ApiError> {
        let email = email.trim().to_lowercase();
        if self.users.values().any(|u| u.email == email) {
            return Err(ApiError::Conflict("User already exists".to_string()));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            email,
            phone,
            created_at: Utc::now(),
        };
        let token = Uuid::new_v4().to_string().replace("-", "");

        self.tokens.insert(token.clone(), user.id.clone());
        self.users.insert(user.id.clone(), user.clone());
        Ok((user, token))
    }

    pub fn by_token(&self, token: &str) -> Option<&User> {
        self.tokens.get(token).and_then(|id| self.users.get(id))
    }
}

/// A request carrying a valid `Authorization: Bearer` token. Use
/// `Option<AuthUser>` where signing in is optional.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        let state = parts
            .extensions
            .get::<AppState>()
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("application state missing")))?;

        let users = state.users.read().await;
        users.by_token(token).cloned().map(AuthUser).ok_or(ApiError::Unauthorized)
    }
}

#[derive(Debug, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

pub async fn register(
    Extension(state): Extension<AppState>,
    body: Result<Json<Registration>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    validation::registration(&body.name, &body.email, body.phone.as_deref())?;

    let (user, token) = state.users.write().await.register(&body.name, &body.email, body.phone)?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "data": { "user": user, "token": token },
        })),
    ))
}

pub async fn me(AuthUser(user): AuthUser) -> impl IntoResponse {
    Json(json!({ "success": true, "data": { "user": user } }))
}
