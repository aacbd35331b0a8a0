use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::auth::session_cookie;
use crate::middleware::ApiResponse;
use crate::services::Session;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// POST /api/v1/user/register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let session = state
        .services
        .users
        .register(&req.email, &req.username, &req.password)
        .await?;

    let cookie = cookie_for(&state, &session);
    Ok(([(header::SET_COOKIE, cookie)], ApiResponse::created(session)))
}

/// POST /api/v1/user/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let session = state.services.users.login(&req.email, &req.password).await?;

    let cookie = cookie_for(&state, &session);
    Ok(([(header::SET_COOKIE, cookie)], ApiResponse::success(session)))
}

fn cookie_for(state: &AppState, session: &Session) -> String {
    let security = &state.config.security;
    session_cookie(
        &security.cookie_name,
        &session.token,
        security.jwt_expiry_hours * 3600,
        security.cookie_secure,
    )
}
