// Idempotent DDL for the five tables. Statements are separated by `;`.

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS forms (
    id BIGSERIAL PRIMARY KEY,
    form_title TEXT NOT NULL,
    form_description TEXT NOT NULL,
    is_ready BOOLEAN NOT NULL DEFAULT FALSE,
    user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS form_fields (
    id BIGSERIAL PRIMARY KEY,
    field_title TEXT NOT NULL CHECK (length(trim(field_title)) > 0),
    required BOOLEAN NOT NULL DEFAULT FALSE,
    form_id BIGINT NOT NULL REFERENCES forms(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS form_responses (
    id BIGSERIAL PRIMARY KEY,
    form_id BIGINT NOT NULL REFERENCES forms(id) ON DELETE CASCADE,
    respondent_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    submitted_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS response_fields (
    id BIGSERIAL PRIMARY KEY,
    field_value TEXT NOT NULL,
    form_response_id BIGINT NOT NULL REFERENCES form_responses(id) ON DELETE CASCADE,
    form_field_id BIGINT NOT NULL REFERENCES form_fields(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_forms_user_id ON forms(user_id);
CREATE INDEX IF NOT EXISTS idx_form_fields_form_id ON form_fields(form_id);
CREATE INDEX IF NOT EXISTS idx_form_responses_form_id ON form_responses(form_id);
CREATE INDEX IF NOT EXISTS idx_form_responses_respondent_id ON form_responses(respondent_id);
CREATE INDEX IF NOT EXISTS idx_response_fields_response_id ON response_fields(form_response_id)
"#;

/// Non-empty DDL statements in execution order
pub fn statements() -> impl Iterator<Item = &'static str> {
    SCHEMA_SQL.split(';').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_precede_indexes() {
        let all: Vec<_> = statements().collect();
        assert_eq!(all.len(), 10);
        assert!(all[..5].iter().all(|s| s.starts_with("CREATE TABLE IF NOT EXISTS")));
        assert!(all[5..].iter().all(|s| s.starts_with("CREATE INDEX IF NOT EXISTS")));
    }

    #[test]
    fn child_tables_cascade() {
        let fields = statements().find(|s| s.contains("form_fields (")).unwrap();
        assert!(fields.contains("REFERENCES forms(id) ON DELETE CASCADE"));
        let answers = statements().find(|s| s.contains("response_fields (")).unwrap();
        assert!(answers.contains("REFERENCES form_fields(id) ON DELETE CASCADE"));
    }
}
