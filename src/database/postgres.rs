use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::database::manager::DatabaseManager;
use crate::database::models::{
    Form, FormDetail, FormField, FormResponse, FormWithOwner, NewForm, NewFormField,
    NewFormResponse, NewUser, ResponseField, ResponseFieldDetail, ResponseWithRespondent,
    SubmittedResponse, User,
};
use crate::database::readiness;
use crate::database::store::{Store, StoreError};

const USER_COLUMNS: &str = "id, email, username, password_hash, created_at, updated_at";
const FORM_COLUMNS: &str = "id, form_title, form_description, is_ready, user_id, created_at";
const FIELD_COLUMNS: &str = "id, field_title, required, form_id";

// Owner/respondent columns aliased with a `u_` prefix for join-shaped reads
const JOINED_USER_COLUMNS: &str = "u.id AS u_id, u.email AS u_email, u.username AS u_username, \
     u.password_hash AS u_password_hash, u.created_at AS u_created_at, u.updated_at AS u_updated_at";

/// Postgres-backed entity store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn joined_user(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("u_id")?,
        email: row.try_get("u_email")?,
        username: row.try_get("u_username")?,
        password_hash: row.try_get("u_password_hash")?,
        created_at: row.try_get("u_created_at")?,
        updated_at: row.try_get("u_updated_at")?,
    })
}

fn joined_form(row: &PgRow) -> Result<FormWithOwner, sqlx::Error> {
    Ok(FormWithOwner {
        form: Form {
            id: row.try_get("id")?,
            form_title: row.try_get("form_title")?,
            form_description: row.try_get("form_description")?,
            is_ready: row.try_get("is_ready")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
        },
        user: joined_user(row)?,
    })
}

fn joined_response(row: &PgRow) -> Result<ResponseWithRespondent, sqlx::Error> {
    Ok(ResponseWithRespondent {
        response: FormResponse {
            id: row.try_get("id")?,
            form_id: row.try_get("form_id")?,
            respondent_id: row.try_get("respondent_id")?,
            submitted_at: row.try_get("submitted_at")?,
        },
        respondent: joined_user(row)?,
    })
}

/// Unique-constraint violations become Conflict, anything else passes through
fn map_unique_violation(err: sqlx::Error, what: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(format!("{} already exists", what))
        }
        _ => StoreError::Sqlx(err),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            "INSERT INTO users (email, username, password_hash) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );
        let created = sqlx::query_as::<_, User>(&query)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password_hash)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(e, "user"))?;

        tx.commit().await?;
        Ok(created)
    }

    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_users_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Vec<User>, StoreError> {
        let query = format!(
            "SELECT {} FROM users WHERE email = $1 OR username = $2 ORDER BY id",
            USER_COLUMNS
        );
        let users = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .bind(username)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn create_form(&self, form: NewForm) -> Result<Form, StoreError> {
        let query = format!(
            "INSERT INTO forms (form_title, form_description, user_id) VALUES ($1, $2, $3) RETURNING {}",
            FORM_COLUMNS
        );
        let created = sqlx::query_as::<_, Form>(&query)
            .bind(&form.form_title)
            .bind(&form.form_description)
            .bind(form.user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    StoreError::NotFound(format!("user with id {} not found", form.user_id))
                }
                _ => StoreError::Sqlx(e),
            })?;
        Ok(created)
    }

    async fn get_form(&self, form_id: i64) -> Result<Form, StoreError> {
        let query = format!("SELECT {} FROM forms WHERE id = $1", FORM_COLUMNS);
        sqlx::query_as::<_, Form>(&query)
            .bind(form_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("form with id {} not found", form_id)))
    }

    async fn get_form_detail(&self, form_id: i64) -> Result<FormDetail, StoreError> {
        // One snapshot for the form, its owner and its fields
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "SELECT f.id, f.form_title, f.form_description, f.is_ready, f.user_id, f.created_at, {} \
             FROM forms AS f INNER JOIN users AS u ON f.user_id = u.id WHERE f.id = $1",
            JOINED_USER_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(form_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("form with id {} not found", form_id)))?;
        let FormWithOwner { form, user } = joined_form(&row)?;

        let query = format!(
            "SELECT {} FROM form_fields WHERE form_id = $1 ORDER BY id",
            FIELD_COLUMNS
        );
        let form_fields = sqlx::query_as::<_, FormField>(&query)
            .bind(form_id)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(FormDetail { form, user, form_fields })
    }

    async fn list_forms(&self) -> Result<Vec<FormWithOwner>, StoreError> {
        let query = format!(
            "SELECT f.id, f.form_title, f.form_description, f.is_ready, f.user_id, f.created_at, {} \
             FROM forms AS f INNER JOIN users AS u ON f.user_id = u.id \
             ORDER BY f.created_at DESC, f.id DESC",
            JOINED_USER_COLUMNS
        );
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| joined_form(row).map_err(StoreError::from))
            .collect()
    }

    async fn list_forms_by_user(&self, user_id: i64) -> Result<Vec<FormWithOwner>, StoreError> {
        let query = format!(
            "SELECT f.id, f.form_title, f.form_description, f.is_ready, f.user_id, f.created_at, {} \
             FROM forms AS f INNER JOIN users AS u ON f.user_id = u.id \
             WHERE f.user_id = $1 ORDER BY f.created_at DESC, f.id DESC",
            JOINED_USER_COLUMNS
        );
        let rows = sqlx::query(&query).bind(user_id).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| joined_form(row).map_err(StoreError::from))
            .collect()
    }

    async fn delete_form(&self, form_id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM forms WHERE id = $1")
            .bind(form_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() < 1 {
            return Err(StoreError::NotFound(format!("form with id {} not deleted", form_id)));
        }
        Ok(())
    }

    async fn create_field(&self, field: NewFormField) -> Result<FormField, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Serializes field mutations per form so the recompute sees every
        // previously committed insert/delete
        let locked: Option<i64> = sqlx::query_scalar("SELECT id FROM forms WHERE id = $1 FOR UPDATE")
            .bind(field.form_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(StoreError::NotFound(format!("form with id {} not found", field.form_id)));
        }

        let query = format!(
            "INSERT INTO form_fields (field_title, required, form_id) VALUES ($1, $2, $3) RETURNING {}",
            FIELD_COLUMNS
        );
        let created = sqlx::query_as::<_, FormField>(&query)
            .bind(&field.field_title)
            .bind(field.required)
            .bind(field.form_id)
            .fetch_one(&mut *tx)
            .await?;

        readiness::recompute(&mut tx, field.form_id).await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn get_field(&self, field_id: i64) -> Result<FormField, StoreError> {
        let query = format!("SELECT {} FROM form_fields WHERE id = $1", FIELD_COLUMNS);
        sqlx::query_as::<_, FormField>(&query)
            .bind(field_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("field with id {} not found", field_id)))
    }

    async fn update_field(
        &self,
        field_id: i64,
        field_title: &str,
        required: bool,
    ) -> Result<FormField, StoreError> {
        let query = format!(
            "UPDATE form_fields SET field_title = $1, required = $2 WHERE id = $3 RETURNING {}",
            FIELD_COLUMNS
        );
        sqlx::query_as::<_, FormField>(&query)
            .bind(field_title)
            .bind(required)
            .bind(field_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("field with id {} not found", field_id)))
    }

    async fn delete_field(&self, field_id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let form_id: i64 = sqlx::query_scalar("SELECT form_id FROM form_fields WHERE id = $1")
            .bind(field_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("field with id {} not found", field_id)))?;

        sqlx::query("SELECT id FROM forms WHERE id = $1 FOR UPDATE")
            .bind(form_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM form_fields WHERE id = $1")
            .bind(field_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() < 1 {
            // Lost a race with another delete of the same field
            return Err(StoreError::NotFound(format!("field with id {} not deleted", field_id)));
        }

        let is_ready = readiness::recompute(&mut tx, form_id).await?;

        tx.commit().await?;
        Ok(is_ready)
    }

    async fn list_fields_by_form(&self, form_id: i64) -> Result<Vec<FormField>, StoreError> {
        let query = format!(
            "SELECT {} FROM form_fields WHERE form_id = $1 ORDER BY id",
            FIELD_COLUMNS
        );
        let fields = sqlx::query_as::<_, FormField>(&query)
            .bind(form_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(fields)
    }

    async fn recompute_readiness(&self, form_id: i64) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        readiness::recompute(&mut conn, form_id).await
    }

    async fn create_response(
        &self,
        response: NewFormResponse,
    ) -> Result<SubmittedResponse, StoreError> {
        let mut tx = self.pool.begin().await?;

        // FOR SHARE blocks field mutations on this form until we commit
        let is_ready: bool = sqlx::query_scalar("SELECT is_ready FROM forms WHERE id = $1 FOR SHARE")
            .bind(response.form_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("form with id {} not found", response.form_id)))?;
        if !is_ready {
            return Err(StoreError::InvalidReference(
                "form is not ready to accept responses".to_string(),
            ));
        }

        let field_ids: Vec<i64> = response
            .fields
            .iter()
            .map(|f| f.form_field_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let matching: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM form_fields WHERE form_id = $1 AND id = ANY($2)",
        )
        .bind(response.form_id)
        .bind(&field_ids)
        .fetch_one(&mut *tx)
        .await?;
        if matching != field_ids.len() as i64 {
            return Err(StoreError::InvalidReference("invalid field id".to_string()));
        }

        let form_response_id: i64 = sqlx::query_scalar(
            "INSERT INTO form_responses (form_id, respondent_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(response.form_id)
        .bind(response.respondent_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut response_fields = Vec::with_capacity(response.fields.len());
        for item in &response.fields {
            let inserted = sqlx::query_as::<_, ResponseField>(
                "INSERT INTO response_fields (form_response_id, form_field_id, field_value) \
                 VALUES ($1, $2, $3) RETURNING id, field_value, form_response_id, form_field_id",
            )
            .bind(form_response_id)
            .bind(item.form_field_id)
            .bind(&item.field_value)
            .fetch_one(&mut *tx)
            .await?;
            response_fields.push(inserted);
        }

        tx.commit().await?;
        Ok(SubmittedResponse { form_response_id, response_fields })
    }

    async fn get_response(&self, response_id: i64) -> Result<FormResponse, StoreError> {
        sqlx::query_as::<_, FormResponse>(
            "SELECT id, form_id, respondent_id, submitted_at FROM form_responses WHERE id = $1",
        )
        .bind(response_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("response with id {} not found", response_id)))
    }

    async fn list_responses_by_form(
        &self,
        form_id: i64,
    ) -> Result<Vec<ResponseWithRespondent>, StoreError> {
        let query = format!(
            "SELECT fr.id, fr.form_id, fr.respondent_id, fr.submitted_at, {} \
             FROM form_responses AS fr INNER JOIN users AS u ON fr.respondent_id = u.id \
             WHERE fr.form_id = $1 ORDER BY fr.submitted_at, fr.id",
            JOINED_USER_COLUMNS
        );
        let rows = sqlx::query(&query).bind(form_id).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| joined_response(row).map_err(StoreError::from))
            .collect()
    }

    async fn list_responses_by_respondent(
        &self,
        respondent_id: i64,
    ) -> Result<Vec<ResponseWithRespondent>, StoreError> {
        let query = format!(
            "SELECT fr.id, fr.form_id, fr.respondent_id, fr.submitted_at, {} \
             FROM form_responses AS fr INNER JOIN users AS u ON fr.respondent_id = u.id \
             WHERE fr.respondent_id = $1 ORDER BY fr.submitted_at, fr.id",
            JOINED_USER_COLUMNS
        );
        let rows = sqlx::query(&query).bind(respondent_id).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| joined_response(row).map_err(StoreError::from))
            .collect()
    }

    async fn list_response_fields(
        &self,
        response_id: i64,
    ) -> Result<Vec<ResponseFieldDetail>, StoreError> {
        let rows = sqlx::query(
            "SELECT rf.id, rf.field_value, rf.form_response_id, rf.form_field_id, \
                    ff.field_title, ff.required, ff.form_id \
             FROM response_fields AS rf INNER JOIN form_fields AS ff ON rf.form_field_id = ff.id \
             WHERE rf.form_response_id = $1 ORDER BY rf.id",
        )
        .bind(response_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<ResponseFieldDetail, sqlx::Error> {
                let field = ResponseField {
                    id: row.try_get("id")?,
                    field_value: row.try_get("field_value")?,
                    form_response_id: row.try_get("form_response_id")?,
                    form_field_id: row.try_get("form_field_id")?,
                };
                let form_field = FormField {
                    id: field.form_field_id,
                    field_title: row.try_get("field_title")?,
                    required: row.try_get("required")?,
                    form_id: row.try_get("form_id")?,
                };
                Ok(ResponseFieldDetail { field, form_field })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
