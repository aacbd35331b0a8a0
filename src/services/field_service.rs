use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::database::models::{FormField, NewFormField};
use crate::database::Store;
use crate::policy::Action;
use crate::services::validate::require_non_blank;
use crate::services::{AccessPolicy, ServiceError};

/// Outcome of a field deletion, with the owning form's readiness afterwards
#[derive(Debug, Clone, Serialize)]
pub struct DeletedField {
    pub field_id: i64,
    pub form_id: i64,
    pub is_ready: bool,
}

#[derive(Clone)]
pub struct FieldService {
    store: Arc<dyn Store>,
    access: AccessPolicy,
}

impl FieldService {
    pub fn new(store: Arc<dyn Store>, access: AccessPolicy) -> Self {
        Self { store, access }
    }

    pub async fn create(
        &self,
        requester: i64,
        form_id: i64,
        field_title: &str,
        required: bool,
    ) -> Result<FormField, ServiceError> {
        let field_title = require_non_blank(field_title, "field_title")?;
        let form = self.store.get_form(form_id).await?;
        self.access
            .check(requester, Action::ManageFields, &form, ("form", form_id))?;

        let field = self
            .store
            .create_field(NewFormField {
                field_title,
                required,
                form_id,
            })
            .await?;

        debug!("Added field {} to form {}", field.id, form_id);
        Ok(field)
    }

    pub async fn update(
        &self,
        requester: i64,
        field_id: i64,
        field_title: &str,
        required: bool,
    ) -> Result<FormField, ServiceError> {
        let field_title = require_non_blank(field_title, "field_title")?;
        let existing = self.store.get_field(field_id).await?;
        let form = self.store.get_form(existing.form_id).await?;
        self.access
            .check(requester, Action::ManageFields, &form, ("field", field_id))?;

        Ok(self
            .store
            .update_field(field_id, &field_title, required)
            .await?)
    }

    pub async fn delete(&self, requester: i64, field_id: i64) -> Result<DeletedField, ServiceError> {
        let existing = self.store.get_field(field_id).await?;
        let form = self.store.get_form(existing.form_id).await?;
        self.access
            .check(requester, Action::ManageFields, &form, ("field", field_id))?;

        let is_ready = self.store.delete_field(field_id).await?;
        debug!(
            "Removed field {} from form {} (ready: {})",
            field_id, form.id, is_ready
        );

        Ok(DeletedField {
            field_id,
            form_id: form.id,
            is_ready,
        })
    }
}
