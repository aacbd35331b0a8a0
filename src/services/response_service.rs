use std::sync::Arc;

use tracing::info;

use crate::database::models::{
    NewFormResponse, NewResponseField, ResponseFieldDetail, ResponseWithRespondent,
    SubmittedResponse,
};
use crate::database::Store;
use crate::policy::Action;
use crate::services::validate::validate_submission;
use crate::services::{AccessPolicy, ServiceError};

#[derive(Clone)]
pub struct ResponseService {
    store: Arc<dyn Store>,
    access: AccessPolicy,
}

impl ResponseService {
    pub fn new(store: Arc<dyn Store>, access: AccessPolicy) -> Self {
        Self { store, access }
    }

    /// Validates the submission against the form's current fields and
    /// persists the response with all of its values, or nothing at all.
    pub async fn submit(
        &self,
        requester: i64,
        form_id: i64,
        items: Vec<NewResponseField>,
    ) -> Result<SubmittedResponse, ServiceError> {
        let form = self.store.get_form(form_id).await?;
        self.access
            .check(requester, Action::Submit, &form, ("form", form_id))?;

        let fields = self.store.list_fields_by_form(form_id).await?;
        validate_submission(&fields, &items)?;

        let submitted = self
            .store
            .create_response(NewFormResponse {
                form_id,
                respondent_id: requester,
                fields: items,
            })
            .await?;

        info!(
            "User {} submitted response {} to form {} ({} values)",
            requester,
            submitted.form_response_id,
            form_id,
            submitted.response_fields.len()
        );
        Ok(submitted)
    }

    pub async fn list_for_form(
        &self,
        requester: i64,
        form_id: i64,
    ) -> Result<Vec<ResponseWithRespondent>, ServiceError> {
        let form = self.store.get_form(form_id).await?;
        self.access
            .check(requester, Action::ReadResponses, &form, ("form", form_id))?;

        Ok(self.store.list_responses_by_form(form_id).await?)
    }

    pub async fn list_mine(
        &self,
        requester: i64,
    ) -> Result<Vec<ResponseWithRespondent>, ServiceError> {
        Ok(self.store.list_responses_by_respondent(requester).await?)
    }

    /// Values of one response, readable by the owner of the response's form
    pub async fn response_fields(
        &self,
        requester: i64,
        response_id: i64,
    ) -> Result<Vec<ResponseFieldDetail>, ServiceError> {
        let response = self.store.get_response(response_id).await?;
        let form = self.store.get_form(response.form_id).await?;
        self.access
            .check(requester, Action::ReadResponses, &form, ("response", response_id))?;

        Ok(self.store.list_response_fields(response_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{NewForm, NewFormField, NewUser};
    use crate::database::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        responses: ResponseService,
        owner: i64,
        respondent: i64,
        form_id: i64,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let mut ids = Vec::new();
        for name in ["owner", "respondent"] {
            let user = store
                .create_user(NewUser {
                    email: format!("{}@example.com", name),
                    username: name.to_string(),
                    password_hash: "x".to_string(),
                })
                .await
                .unwrap();
            ids.push(user.id);
        }
        let form = store
            .create_form(NewForm {
                form_title: "Survey".to_string(),
                form_description: "d".to_string(),
                user_id: ids[0],
            })
            .await
            .unwrap();

        Fixture {
            responses: ResponseService::new(store.clone(), AccessPolicy::default()),
            store,
            owner: ids[0],
            respondent: ids[1],
            form_id: form.id,
        }
    }

    fn item(form_field_id: i64, value: &str) -> NewResponseField {
        NewResponseField {
            form_field_id,
            field_value: value.to_string(),
        }
    }

    async fn add_field(f: &Fixture, form_id: i64, title: &str, required: bool) -> i64 {
        f.store
            .create_field(NewFormField {
                field_title: title.to_string(),
                required,
                form_id,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn round_trip() {
        let f = fixture().await;
        let name = add_field(&f, f.form_id, "Name", true).await;

        let submitted = f
            .responses
            .submit(f.respondent, f.form_id, vec![item(name, "Alice")])
            .await
            .unwrap();
        assert_eq!(submitted.response_fields.len(), 1);

        let values = f
            .responses
            .response_fields(f.owner, submitted.form_response_id)
            .await
            .unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].field.field_value, "Alice");
        assert_eq!(values[0].form_field.field_title, "Name");
    }

    #[tokio::test]
    async fn not_ready_form_rejects_and_writes_nothing() {
        let f = fixture().await;
        let err = f
            .responses
            .submit(f.respondent, f.form_id, vec![item(1, "x")])
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ServiceError::InvalidInput("form is not ready to accept responses".to_string())
        );
        assert_eq!(f.store.response_count().await, 0);
    }

    #[tokio::test]
    async fn foreign_field_rejects_whole_submission() {
        let f = fixture().await;
        let name = add_field(&f, f.form_id, "Name", false).await;
        let other_form = f
            .store
            .create_form(NewForm {
                form_title: "Other".to_string(),
                form_description: "d".to_string(),
                user_id: f.owner,
            })
            .await
            .unwrap();
        let foreign = add_field(&f, other_form.id, "Elsewhere", false).await;

        let err = f
            .responses
            .submit(
                f.respondent,
                f.form_id,
                vec![item(name, "ok"), item(foreign, "nope")],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert_eq!(f.store.response_count().await, 0);
        assert_eq!(f.store.response_field_count().await, 0);
    }

    #[tokio::test]
    async fn only_owner_reads_responses() {
        let f = fixture().await;
        let name = add_field(&f, f.form_id, "Name", false).await;
        let submitted = f
            .responses
            .submit(f.respondent, f.form_id, vec![item(name, "Bob")])
            .await
            .unwrap();

        assert!(matches!(
            f.responses.list_for_form(f.respondent, f.form_id).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            f.responses
                .response_fields(f.respondent, submitted.form_response_id)
                .await,
            Err(ServiceError::Unauthorized(_))
        ));

        let listed = f.responses.list_for_form(f.owner, f.form_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].respondent.id, f.respondent);

        let mine = f.responses.list_mine(f.respondent).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert!(f.responses.list_mine(f.owner).await.unwrap().is_empty());
    }
}
