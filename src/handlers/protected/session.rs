use axum::{extract::State, http::header, response::IntoResponse, Extension};
use serde_json::json;

use crate::database::models::User;
use crate::middleware::auth::clear_session_cookie;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /api/v1/user/authenticated
pub async fn whoami(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<User> {
    let user = state.services.users.get_user(auth.id).await?;
    Ok(ApiResponse::success(user))
}

/// GET /api/v1/user/logout
///
/// Tokens are stateless; logging out only expires the cookie.
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let cookie = clear_session_cookie(&state.config.security.cookie_name);
    (
        [(header::SET_COOKIE, cookie)],
        ApiResponse::success(json!({ "logged_out": true })),
    )
}
