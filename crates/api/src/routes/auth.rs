//! Login, current-user and token verification endpoints.

use std::sync::Arc;

use auth::{AuthError, AuthService};
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use common::User;
use serde::{Deserialize, Serialize};
use store::{SessionRepository, UserRepository};

use super::bearer_token;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub token: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub user: User,
}

// -- Handlers --

/// POST /login — exchanges credentials for a session token.
#[tracing::instrument(skip_all)]
pub async fn login<S>(
    State(auth): State<Arc<AuthService<S>>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError>
where
    S: UserRepository + SessionRepository + 'static,
{
    let Json(req) = payload?;
    let email = req.email.unwrap_or_default();
    let password = req.password.unwrap_or_default();

    let outcome = auth.login(&email, &password).await?;
    Ok(Json(LoginResponse {
        token: outcome.token,
        user: outcome.user,
    }))
}

/// GET /me — the user behind the bearer token.
pub async fn me<S>(
    State(auth): State<Arc<AuthService<S>>>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>, ApiError>
where
    S: UserRepository + SessionRepository + 'static,
{
    let user = auth.authenticate(bearer_token(&headers)?).await?;
    Ok(Json(UserResponse { user }))
}

/// POST /verify — token check for other services.
///
/// `200 {valid: true, user}` or `401 {valid: false, error}`.
pub async fn verify<S>(
    State(auth): State<Arc<AuthService<S>>>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Response, ApiError>
where
    S: UserRepository + SessionRepository + 'static,
{
    let Json(req) = payload?;
    let token = req
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Token is required".to_string()))?;

    match auth.authenticate(&token).await {
        Ok(user) => Ok(Json(VerifyResponse { valid: true, user }).into_response()),
        Err(AuthError::InvalidToken) => Ok((
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "valid": false, "error": "Invalid token" })),
        )
            .into_response()),
        Err(e) => Err(e.into()),
    }
}
