use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::{Form, FormDetail, FormWithOwner};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateFormRequest {
    #[serde(default)]
    pub form_title: String,
    #[serde(default)]
    pub form_description: String,
}

/// POST /api/v1/form
pub async fn create_form(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<CreateFormRequest>, JsonRejection>,
) -> ApiResult<Form> {
    let Json(req) = payload?;
    let form = state
        .services
        .forms
        .create(auth.id, &req.form_title, &req.form_description)
        .await?;
    Ok(ApiResponse::created(form))
}

/// GET /api/v1/form
pub async fn list_forms(State(state): State<AppState>) -> ApiResult<Vec<FormWithOwner>> {
    Ok(ApiResponse::success(state.services.forms.list_all().await?))
}

/// GET /api/v1/form/my-forms
pub async fn my_forms(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Vec<FormWithOwner>> {
    Ok(ApiResponse::success(
        state.services.forms.list_mine(auth.id).await?,
    ))
}

/// GET /api/v1/form/:form_id
pub async fn get_form(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<FormDetail> {
    let Path(form_id) = path?;
    Ok(ApiResponse::success(
        state.services.forms.detail(form_id).await?,
    ))
}

/// DELETE /api/v1/form/:form_id
pub async fn delete_form(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Value> {
    let Path(form_id) = path?;
    state.services.forms.delete(auth.id, form_id).await?;
    Ok(ApiResponse::success(json!({ "deleted": form_id })))
}
