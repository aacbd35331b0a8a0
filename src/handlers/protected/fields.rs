use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Extension, Json,
};
use serde::Deserialize;

use crate::database::models::FormField;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::field_service::DeletedField;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateFieldRequest {
    #[serde(default)]
    pub field_title: String,
    #[serde(default)]
    pub required: bool,
    pub form_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFieldRequest {
    #[serde(default)]
    pub field_title: String,
    #[serde(default)]
    pub required: bool,
}

/// POST /api/v1/form/fields
pub async fn create_field(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<CreateFieldRequest>, JsonRejection>,
) -> ApiResult<FormField> {
    let Json(req) = payload?;
    let field = state
        .services
        .fields
        .create(auth.id, req.form_id, &req.field_title, req.required)
        .await?;
    Ok(ApiResponse::created(field))
}

/// PUT /api/v1/form/fields/:field_id
pub async fn update_field(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateFieldRequest>, JsonRejection>,
) -> ApiResult<FormField> {
    let Path(field_id) = path?;
    let Json(req) = payload?;
    let field = state
        .services
        .fields
        .update(auth.id, field_id, &req.field_title, req.required)
        .await?;
    Ok(ApiResponse::success(field))
}

/// DELETE /api/v1/form/fields/:field_id
pub async fn delete_field(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<DeletedField> {
    let Path(field_id) = path?;
    let deleted = state.services.fields.delete(auth.id, field_id).await?;
    Ok(ApiResponse::success(deleted))
}
