use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FormField {
    pub id: i64,
    pub field_title: String,
    pub required: bool,
    pub form_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewFormField {
    pub field_title: String,
    pub required: bool,
    pub form_id: i64,
}
