use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::form_field::FormField;
use super::user::User;

/// One submission event. Immutable once inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FormResponse {
    pub id: i64,
    pub form_id: i64,
    pub respondent_id: i64,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ResponseField {
    pub id: i64,
    pub field_value: String,
    pub form_response_id: i64,
    pub form_field_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResponseField {
    pub form_field_id: i64,
    pub field_value: String,
}

/// Response row plus its values, written in one transaction
#[derive(Debug, Clone)]
pub struct NewFormResponse {
    pub form_id: i64,
    pub respondent_id: i64,
    pub fields: Vec<NewResponseField>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmittedResponse {
    pub form_response_id: i64,
    pub response_fields: Vec<ResponseField>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseWithRespondent {
    #[serde(flatten)]
    pub response: FormResponse,
    pub respondent: User,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseFieldDetail {
    #[serde(flatten)]
    pub field: ResponseField,
    pub form_field: FormField,
}
