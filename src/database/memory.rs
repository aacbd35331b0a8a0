// In-process store used by tests and `serve --memory`.
//
// Every trait method holds the table lock for its whole body, so multi-row
// writes are all-or-nothing exactly like a committed transaction: validation
// happens before the first mutation and nothing is written on the error path.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::database::models::{
    Form, FormDetail, FormField, FormResponse, FormWithOwner, NewForm, NewFormField,
    NewFormResponse, NewUser, ResponseField, ResponseFieldDetail, ResponseWithRespondent,
    SubmittedResponse, User,
};
use crate::database::readiness;
use crate::database::store::{Store, StoreError};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    forms: BTreeMap<i64, Form>,
    fields: BTreeMap<i64, FormField>,
    responses: BTreeMap<i64, FormResponse>,
    response_fields: BTreeMap<i64, ResponseField>,
}

impl Tables {
    // One sequence shared by all tables
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn form(&self, form_id: i64) -> Result<&Form, StoreError> {
        self.forms
            .get(&form_id)
            .ok_or_else(|| StoreError::NotFound(format!("form with id {} not found", form_id)))
    }

    fn user(&self, user_id: i64) -> Result<&User, StoreError> {
        self.users
            .get(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user with id {} not found", user_id)))
    }

    fn fields_of(&self, form_id: i64) -> Vec<FormField> {
        self.fields
            .values()
            .filter(|f| f.form_id == form_id)
            .cloned()
            .collect()
    }

    fn recompute(&mut self, form_id: i64) -> Result<bool, StoreError> {
        let count = self.fields.values().filter(|f| f.form_id == form_id).count();
        let form = self
            .forms
            .get_mut(&form_id)
            .ok_or_else(|| StoreError::NotFound(format!("form with id {} not found", form_id)))?;
        form.is_ready = readiness::derive(count);
        Ok(form.is_ready)
    }

    fn with_owner(&self, form: &Form) -> Result<FormWithOwner, StoreError> {
        Ok(FormWithOwner {
            form: form.clone(),
            user: self.user(form.user_id)?.clone(),
        })
    }

    fn with_respondent(&self, response: &FormResponse) -> Result<ResponseWithRespondent, StoreError> {
        Ok(ResponseWithRespondent {
            response: response.clone(),
            respondent: self.user(response.respondent_id)?.clone(),
        })
    }

    fn remove_response_fields_where(&mut self, predicate: impl Fn(&ResponseField) -> bool) {
        self.response_fields.retain(|_, rf| !predicate(rf));
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted response rows, for assertions in tests
    pub async fn response_count(&self) -> usize {
        self.tables.lock().await.responses.len()
    }

    /// Number of persisted response-field rows, for assertions in tests
    pub async fn response_field_count(&self) -> usize {
        self.tables.lock().await.response_fields.len()
    }
}

fn newest_first(forms: &mut [FormWithOwner]) {
    forms.sort_by(|a, b| {
        b.form
            .created_at
            .cmp(&a.form.created_at)
            .then(b.form.id.cmp(&a.form.id))
    });
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.lock().await;

        let taken = tables
            .users
            .values()
            .any(|u| u.email == user.email || u.username == user.username);
        if taken {
            return Err(StoreError::Conflict("user already exists".to_string()));
        }

        let id = tables.next_id();
        let created = User {
            id,
            email: user.email,
            username: user.username,
            password_hash: user.password_hash,
            created_at: Utc::now(),
            updated_at: None,
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.tables.lock().await.users.get(&user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_users_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .filter(|u| u.email == email || u.username == username)
            .cloned()
            .collect())
    }

    async fn create_form(&self, form: NewForm) -> Result<Form, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.user(form.user_id)?;

        let id = tables.next_id();
        let created = Form {
            id,
            form_title: form.form_title,
            form_description: form.form_description,
            is_ready: false,
            user_id: form.user_id,
            created_at: Utc::now(),
        };
        tables.forms.insert(id, created.clone());
        Ok(created)
    }

    async fn get_form(&self, form_id: i64) -> Result<Form, StoreError> {
        self.tables.lock().await.form(form_id).cloned()
    }

    async fn get_form_detail(&self, form_id: i64) -> Result<FormDetail, StoreError> {
        let tables = self.tables.lock().await;
        let form = tables.form(form_id)?.clone();
        let user = tables.user(form.user_id)?.clone();
        let form_fields = tables.fields_of(form_id);
        Ok(FormDetail { form, user, form_fields })
    }

    async fn list_forms(&self) -> Result<Vec<FormWithOwner>, StoreError> {
        let tables = self.tables.lock().await;
        let mut forms = tables
            .forms
            .values()
            .map(|f| tables.with_owner(f))
            .collect::<Result<Vec<_>, _>>()?;
        newest_first(&mut forms);
        Ok(forms)
    }

    async fn list_forms_by_user(&self, user_id: i64) -> Result<Vec<FormWithOwner>, StoreError> {
        let tables = self.tables.lock().await;
        let mut forms = tables
            .forms
            .values()
            .filter(|f| f.user_id == user_id)
            .map(|f| tables.with_owner(f))
            .collect::<Result<Vec<_>, _>>()?;
        newest_first(&mut forms);
        Ok(forms)
    }

    async fn delete_form(&self, form_id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.forms.remove(&form_id).is_none() {
            return Err(StoreError::NotFound(format!("form with id {} not deleted", form_id)));
        }

        // Mirror ON DELETE CASCADE
        let response_ids: BTreeSet<i64> = tables
            .responses
            .values()
            .filter(|r| r.form_id == form_id)
            .map(|r| r.id)
            .collect();
        tables.responses.retain(|_, r| r.form_id != form_id);
        tables.remove_response_fields_where(|rf| response_ids.contains(&rf.form_response_id));
        tables.fields.retain(|_, f| f.form_id != form_id);
        Ok(())
    }

    async fn create_field(&self, field: NewFormField) -> Result<FormField, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.form(field.form_id)?;

        let id = tables.next_id();
        let created = FormField {
            id,
            field_title: field.field_title,
            required: field.required,
            form_id: field.form_id,
        };
        tables.fields.insert(id, created.clone());
        tables.recompute(field.form_id)?;
        Ok(created)
    }

    async fn get_field(&self, field_id: i64) -> Result<FormField, StoreError> {
        self.tables
            .lock()
            .await
            .fields
            .get(&field_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("field with id {} not found", field_id)))
    }

    async fn update_field(
        &self,
        field_id: i64,
        field_title: &str,
        required: bool,
    ) -> Result<FormField, StoreError> {
        let mut tables = self.tables.lock().await;
        let field = tables
            .fields
            .get_mut(&field_id)
            .ok_or_else(|| StoreError::NotFound(format!("field with id {} not found", field_id)))?;
        field.field_title = field_title.to_string();
        field.required = required;
        Ok(field.clone())
    }

    async fn delete_field(&self, field_id: i64) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        let removed = tables
            .fields
            .remove(&field_id)
            .ok_or_else(|| StoreError::NotFound(format!("field with id {} not deleted", field_id)))?;

        tables.remove_response_fields_where(|rf| rf.form_field_id == field_id);
        tables.recompute(removed.form_id)
    }

    async fn list_fields_by_form(&self, form_id: i64) -> Result<Vec<FormField>, StoreError> {
        Ok(self.tables.lock().await.fields_of(form_id))
    }

    async fn recompute_readiness(&self, form_id: i64) -> Result<bool, StoreError> {
        self.tables.lock().await.recompute(form_id)
    }

    async fn create_response(
        &self,
        response: NewFormResponse,
    ) -> Result<SubmittedResponse, StoreError> {
        let mut tables = self.tables.lock().await;

        if !tables.form(response.form_id)?.is_ready {
            return Err(StoreError::InvalidReference(
                "form is not ready to accept responses".to_string(),
            ));
        }
        tables.user(response.respondent_id)?;
        let valid = response.fields.iter().all(|item| {
            tables
                .fields
                .get(&item.form_field_id)
                .is_some_and(|f| f.form_id == response.form_id)
        });
        if !valid {
            return Err(StoreError::InvalidReference("invalid field id".to_string()));
        }

        let form_response_id = tables.next_id();
        tables.responses.insert(
            form_response_id,
            FormResponse {
                id: form_response_id,
                form_id: response.form_id,
                respondent_id: response.respondent_id,
                submitted_at: Utc::now(),
            },
        );

        let mut response_fields = Vec::with_capacity(response.fields.len());
        for item in response.fields {
            let id = tables.next_id();
            let row = ResponseField {
                id,
                field_value: item.field_value,
                form_response_id,
                form_field_id: item.form_field_id,
            };
            tables.response_fields.insert(id, row.clone());
            response_fields.push(row);
        }

        Ok(SubmittedResponse { form_response_id, response_fields })
    }

    async fn get_response(&self, response_id: i64) -> Result<FormResponse, StoreError> {
        self.tables
            .lock()
            .await
            .responses
            .get(&response_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("response with id {} not found", response_id)))
    }

    async fn list_responses_by_form(
        &self,
        form_id: i64,
    ) -> Result<Vec<ResponseWithRespondent>, StoreError> {
        let tables = self.tables.lock().await;
        tables
            .responses
            .values()
            .filter(|r| r.form_id == form_id)
            .map(|r| tables.with_respondent(r))
            .collect()
    }

    async fn list_responses_by_respondent(
        &self,
        respondent_id: i64,
    ) -> Result<Vec<ResponseWithRespondent>, StoreError> {
        let tables = self.tables.lock().await;
        tables
            .responses
            .values()
            .filter(|r| r.respondent_id == respondent_id)
            .map(|r| tables.with_respondent(r))
            .collect()
    }

    async fn list_response_fields(
        &self,
        response_id: i64,
    ) -> Result<Vec<ResponseFieldDetail>, StoreError> {
        let tables = self.tables.lock().await;
        tables
            .response_fields
            .values()
            .filter(|rf| rf.form_response_id == response_id)
            .map(|rf| {
                let form_field = tables.fields.get(&rf.form_field_id).cloned().ok_or_else(|| {
                    StoreError::NotFound(format!("field with id {} not found", rf.form_field_id))
                })?;
                Ok(ResponseFieldDetail { field: rf.clone(), form_field })
            })
            .collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::NewResponseField;

    async fn seed_form(store: &MemoryStore) -> (User, Form) {
        let user = store
            .create_user(NewUser {
                email: "owner@example.com".to_string(),
                username: "owner".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        let form = store
            .create_form(NewForm {
                form_title: "Survey".to_string(),
                form_description: "Tell us".to_string(),
                user_id: user.id,
            })
            .await
            .unwrap();
        (user, form)
    }

    fn field(form_id: i64, title: &str) -> NewFormField {
        NewFormField {
            field_title: title.to_string(),
            required: false,
            form_id,
        }
    }

    #[tokio::test]
    async fn duplicate_user_is_conflict() {
        let store = MemoryStore::new();
        seed_form(&store).await;

        let err = store
            .create_user(NewUser {
                email: "owner@example.com".to_string(),
                username: "someone-else".to_string(),
                password_hash: "other".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let original = store.find_user_by_email("owner@example.com").await.unwrap().unwrap();
        assert_eq!(original.password_hash, "hash");
    }

    #[tokio::test]
    async fn field_writes_keep_readiness_in_step() {
        let store = MemoryStore::new();
        let (_, form) = seed_form(&store).await;
        assert!(!form.is_ready);

        let a = store.create_field(field(form.id, "A")).await.unwrap();
        assert!(store.get_form(form.id).await.unwrap().is_ready);

        let b = store.create_field(field(form.id, "B")).await.unwrap();
        assert!(store.delete_field(a.id).await.unwrap());
        assert!(!store.delete_field(b.id).await.unwrap());
        assert!(!store.get_form(form.id).await.unwrap().is_ready);
    }

    #[tokio::test]
    async fn delete_missing_rows_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(store.delete_field(99).await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete_form(99).await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.get_response(99).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn recompute_is_idempotent() {
        let store = MemoryStore::new();
        let (_, form) = seed_form(&store).await;
        store.create_field(field(form.id, "A")).await.unwrap();

        assert!(store.recompute_readiness(form.id).await.unwrap());
        assert!(store.recompute_readiness(form.id).await.unwrap());
        assert_eq!(store.list_fields_by_form(form.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejected_response_writes_nothing() {
        let store = MemoryStore::new();
        let (user, form) = seed_form(&store).await;
        let a = store.create_field(field(form.id, "A")).await.unwrap();

        let err = store
            .create_response(NewFormResponse {
                form_id: form.id,
                respondent_id: user.id,
                fields: vec![
                    NewResponseField { form_field_id: a.id, field_value: "ok".to_string() },
                    NewResponseField { form_field_id: 12345, field_value: "bad".to_string() },
                ],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::InvalidReference(_)));
        assert_eq!(store.response_count().await, 0);
        assert_eq!(store.response_field_count().await, 0);
    }

    #[tokio::test]
    async fn deleting_form_cascades() {
        let store = MemoryStore::new();
        let (user, form) = seed_form(&store).await;
        let a = store.create_field(field(form.id, "A")).await.unwrap();
        let submitted = store
            .create_response(NewFormResponse {
                form_id: form.id,
                respondent_id: user.id,
                fields: vec![NewResponseField { form_field_id: a.id, field_value: "x".to_string() }],
            })
            .await
            .unwrap();

        store.delete_form(form.id).await.unwrap();

        assert!(matches!(store.get_field(a.id).await, Err(StoreError::NotFound(_))));
        assert!(matches!(
            store.get_response(submitted.form_response_id).await,
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(store.response_field_count().await, 0);
    }
}
