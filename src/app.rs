use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::state::AppState;

/// Full application router over the given state
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(user_public_routes())
        .merge(protected_routes(state.clone()));

    let router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes))
        .layer(cors_layer(&state.config.security));

    let router = if state.config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

fn user_public_routes() -> Router<AppState> {
    Router::new()
        .route("/user/register", post(public::register))
        .route("/user/login", post(public::login))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(session_routes())
        .merge(form_routes())
        .merge(field_routes())
        .merge(response_routes())
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn session_routes() -> Router<AppState> {
    use protected::session;

    Router::new()
        .route("/user/authenticated", get(session::whoami))
        .route("/user/logout", get(session::logout))
}

fn form_routes() -> Router<AppState> {
    use protected::forms;

    Router::new()
        .route("/form", post(forms::create_form).get(forms::list_forms))
        .route("/form/my-forms", get(forms::my_forms))
        .route("/form/:form_id", get(forms::get_form).delete(forms::delete_form))
}

fn field_routes() -> Router<AppState> {
    use protected::fields;

    Router::new()
        .route("/form/fields", post(fields::create_field))
        .route(
            "/form/fields/:field_id",
            put(fields::update_field).delete(fields::delete_field),
        )
}

fn response_routes() -> Router<AppState> {
    use protected::responses;

    Router::new()
        .route(
            "/form-responses",
            post(responses::submit_response).get(responses::my_responses),
        )
        .route("/form-responses/:form_id", get(responses::form_responses))
        .route(
            "/form-responses/response-fields/:response_id",
            get(responses::response_fields),
        )
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Form Builder API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "health": "/health (public)",
                "user": "/api/v1/user/{register,login} (public), /api/v1/user/{authenticated,logout}",
                "form": "/api/v1/form[/:form_id], /api/v1/form/my-forms, /api/v1/form/fields[/:field_id]",
                "responses": "/api/v1/form-responses[/:form_id], /api/v1/form-responses/response-fields/:response_id",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE"
                })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::config::AppConfig;
    use crate::database::MemoryStore;

    fn test_app() -> Router {
        app(AppState::new(AppConfig::development(), Arc::new(MemoryStore::new())))
    }

    async fn body_json(res: axum::response::Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn root_describes_service() {
        let res = test_app()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["data"]["name"], "Form Builder API");
    }

    #[tokio::test]
    async fn protected_route_without_token_is_unauthenticated() {
        let res = test_app()
            .oneshot(Request::get("/api/v1/form/my-forms").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(res).await["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let mut config = AppConfig::development();
        config.api.max_request_size_bytes = 64;
        let router = app(AppState::new(config, Arc::new(MemoryStore::new())));

        let payload = format!(
            r#"{{"email":"{}@example.com","username":"ada","password":"Secret@1"}}"#,
            "a".repeat(200)
        );
        let res = router
            .oneshot(
                Request::post("/api/v1/user/register")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
