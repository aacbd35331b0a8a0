// Readiness coordinator: a form accepts responses iff it has at least one field.
//
// The flag is always derived from the persisted field count at the moment of
// recomputation, never from a caller-supplied delta.

use sqlx::PgConnection;

use crate::database::store::StoreError;

/// Count comparison and update in one statement so a concurrent writer can
/// never slip between the read and the write.
pub const RECOMPUTE_SQL: &str = r#"
    UPDATE forms
    SET is_ready = (SELECT COUNT(*) > 0 FROM form_fields WHERE form_id = $1)
    WHERE id = $1
    RETURNING is_ready
"#;

/// Readiness for a given persisted field count
pub fn derive(field_count: usize) -> bool {
    field_count > 0
}

/// Runs the recompute statement on an open connection or transaction
pub async fn recompute(conn: &mut PgConnection, form_id: i64) -> Result<bool, StoreError> {
    let is_ready: Option<bool> = sqlx::query_scalar(RECOMPUTE_SQL)
        .bind(form_id)
        .fetch_optional(&mut *conn)
        .await?;

    let is_ready = is_ready
        .ok_or_else(|| StoreError::NotFound(format!("form with id {} not found", form_id)))?;

    tracing::debug!("Recomputed readiness for form {}: {}", form_id, is_ready);
    Ok(is_ready)
}
