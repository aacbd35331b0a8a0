use async_trait::async_trait;
use thiserror::Error;

use crate::database::models::{
    Form, FormDetail, FormField, FormResponse, FormWithOwner, NewForm, NewFormField,
    NewFormResponse, NewUser, ResponseFieldDetail, ResponseWithRespondent, SubmittedResponse,
    User,
};

/// Errors from the entity store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A write referenced rows that no longer satisfy its preconditions.
    /// The transaction was rolled back.
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl StoreError {
    /// True for failures caused by the backend being unreachable rather than
    /// by the statement itself
    pub fn is_unavailable(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Sqlx(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Tls(_)
            ),
            _ => false,
        }
    }
}

/// Durable CRUD for users, forms, fields and responses.
///
/// Multi-row writes (`create_field`, `delete_field`, `create_response`) are
/// atomic: either every row is visible afterwards or none is. Field writes
/// recompute the owning form's readiness inside the same unit.
#[async_trait]
pub trait Store: Send + Sync {
    // users
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_users_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Vec<User>, StoreError>;

    // forms
    async fn create_form(&self, form: NewForm) -> Result<Form, StoreError>;
    async fn get_form(&self, form_id: i64) -> Result<Form, StoreError>;
    async fn get_form_detail(&self, form_id: i64) -> Result<FormDetail, StoreError>;
    async fn list_forms(&self) -> Result<Vec<FormWithOwner>, StoreError>;
    async fn list_forms_by_user(&self, user_id: i64) -> Result<Vec<FormWithOwner>, StoreError>;
    async fn delete_form(&self, form_id: i64) -> Result<(), StoreError>;

    // fields
    async fn create_field(&self, field: NewFormField) -> Result<FormField, StoreError>;
    async fn get_field(&self, field_id: i64) -> Result<FormField, StoreError>;
    async fn update_field(
        &self,
        field_id: i64,
        field_title: &str,
        required: bool,
    ) -> Result<FormField, StoreError>;
    /// Deletes the field and returns the owning form's readiness afterwards
    async fn delete_field(&self, field_id: i64) -> Result<bool, StoreError>;
    async fn list_fields_by_form(&self, form_id: i64) -> Result<Vec<FormField>, StoreError>;

    /// Recomputes `is_ready` from the persisted field count. Idempotent.
    async fn recompute_readiness(&self, form_id: i64) -> Result<bool, StoreError>;

    // responses
    async fn create_response(
        &self,
        response: NewFormResponse,
    ) -> Result<SubmittedResponse, StoreError>;
    async fn get_response(&self, response_id: i64) -> Result<FormResponse, StoreError>;
    async fn list_responses_by_form(
        &self,
        form_id: i64,
    ) -> Result<Vec<ResponseWithRespondent>, StoreError>;
    async fn list_responses_by_respondent(
        &self,
        respondent_id: i64,
    ) -> Result<Vec<ResponseWithRespondent>, StoreError>;
    async fn list_response_fields(
        &self,
        response_id: i64,
    ) -> Result<Vec<ResponseFieldDetail>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
