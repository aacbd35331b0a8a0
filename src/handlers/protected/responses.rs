use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Extension, Json,
};
use serde::Deserialize;

use crate::database::models::{
    NewResponseField, ResponseFieldDetail, ResponseWithRespondent, SubmittedResponse,
};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitResponseRequest {
    pub form_id: i64,
    #[serde(default)]
    pub response_fields: Vec<ResponseItem>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseItem {
    pub form_field_id: i64,
    #[serde(default)]
    pub field_value: String,
}

/// POST /api/v1/form-responses
pub async fn submit_response(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<SubmitResponseRequest>, JsonRejection>,
) -> ApiResult<SubmittedResponse> {
    let Json(req) = payload?;
    let items = req
        .response_fields
        .into_iter()
        .map(|item| NewResponseField {
            form_field_id: item.form_field_id,
            field_value: item.field_value,
        })
        .collect();

    let submitted = state
        .services
        .responses
        .submit(auth.id, req.form_id, items)
        .await?;
    Ok(ApiResponse::created(submitted))
}

/// GET /api/v1/form-responses
pub async fn my_responses(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Vec<ResponseWithRespondent>> {
    Ok(ApiResponse::success(
        state.services.responses.list_mine(auth.id).await?,
    ))
}

/// GET /api/v1/form-responses/:form_id
pub async fn form_responses(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Vec<ResponseWithRespondent>> {
    let Path(form_id) = path?;
    Ok(ApiResponse::success(
        state.services.responses.list_for_form(auth.id, form_id).await?,
    ))
}

/// GET /api/v1/form-responses/response-fields/:response_id
pub async fn response_fields(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Vec<ResponseFieldDetail>> {
    let Path(response_id) = path?;
    Ok(ApiResponse::success(
        state
            .services
            .responses
            .response_fields(auth.id, response_id)
            .await?,
    ))
}
