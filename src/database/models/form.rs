use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::form_field::FormField;
use super::user::User;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Form {
    pub id: i64,
    pub form_title: String,
    pub form_description: String,
    /// Derived: true iff the form has at least one field. Never client-writable.
    pub is_ready: bool,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewForm {
    pub form_title: String,
    pub form_description: String,
    pub user_id: i64,
}

/// Form joined with its owner, used by the listings
#[derive(Debug, Clone, Serialize)]
pub struct FormWithOwner {
    #[serde(flatten)]
    pub form: Form,
    pub user: User,
}

/// Form joined with its owner and its fields in creation order
#[derive(Debug, Clone, Serialize)]
pub struct FormDetail {
    #[serde(flatten)]
    pub form: Form,
    pub user: User,
    pub form_fields: Vec<FormField>,
}
