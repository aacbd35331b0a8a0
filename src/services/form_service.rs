use std::sync::Arc;

use tracing::info;

use crate::database::models::{Form, FormDetail, FormWithOwner, NewForm};
use crate::database::Store;
use crate::policy::Action;
use crate::services::validate::require_non_blank;
use crate::services::{AccessPolicy, ServiceError};

#[derive(Clone)]
pub struct FormService {
    store: Arc<dyn Store>,
    access: AccessPolicy,
}

impl FormService {
    pub fn new(store: Arc<dyn Store>, access: AccessPolicy) -> Self {
        Self { store, access }
    }

    /// New forms start with no fields and are therefore not ready
    pub async fn create(
        &self,
        requester: i64,
        form_title: &str,
        form_description: &str,
    ) -> Result<Form, ServiceError> {
        let form_title = require_non_blank(form_title, "form_title")?;
        let form_description = require_non_blank(form_description, "form_description")?;

        let form = self
            .store
            .create_form(NewForm {
                form_title,
                form_description,
                user_id: requester,
            })
            .await?;

        info!("User {} created form {}", requester, form.id);
        Ok(form)
    }

    pub async fn list_all(&self) -> Result<Vec<FormWithOwner>, ServiceError> {
        Ok(self.store.list_forms().await?)
    }

    pub async fn list_mine(&self, requester: i64) -> Result<Vec<FormWithOwner>, ServiceError> {
        Ok(self.store.list_forms_by_user(requester).await?)
    }

    pub async fn detail(&self, form_id: i64) -> Result<FormDetail, ServiceError> {
        Ok(self.store.get_form_detail(form_id).await?)
    }

    pub async fn delete(&self, requester: i64, form_id: i64) -> Result<(), ServiceError> {
        let form = self.store.get_form(form_id).await?;
        self.access
            .check(requester, Action::DeleteForm, &form, ("form", form_id))?;

        self.store.delete_form(form_id).await?;
        info!("User {} deleted form {}", requester, form_id);
        Ok(())
    }
}
