// Input checks shared by the services. All of them run before any write.

use std::collections::{HashMap, HashSet};

use crate::database::models::{FormField, NewResponseField};
use crate::services::ServiceError;

const PASSWORD_SPECIAL_CHARS: &str = "@#$%&!";

/// Trimmed value, or InvalidInput naming the field when it is blank
pub fn require_non_blank(value: &str, field: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::invalid(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Exactly one `@` with a non-empty local part and a dotted or bare domain
pub fn validate_email_format(email: &str) -> Result<(), ServiceError> {
    let mut parts = email.split('@');
    let valid = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ServiceError::invalid("invalid email address"))
    }
}

pub fn validate_password_strength(password: &str, min_length: usize) -> Result<(), ServiceError> {
    let long_enough = password.chars().count() >= min_length;
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_special = password.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c));

    if long_enough && has_upper && has_special {
        Ok(())
    } else {
        Err(ServiceError::invalid(format!(
            "password must have at least {} characters, one uppercase letter and one of {}",
            min_length, PASSWORD_SPECIAL_CHARS
        )))
    }
}

/// Checks a submission against the form's current fields.
///
/// Rejects the whole submission on an empty item list, a field id that does
/// not belong to the form, a repeated field id, or a required field that is
/// missing or blank.
pub fn validate_submission(
    fields: &[FormField],
    items: &[NewResponseField],
) -> Result<(), ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::invalid("response_fields must not be empty"));
    }

    let by_id: HashMap<i64, &FormField> = fields.iter().map(|f| (f.id, f)).collect();
    let mut seen = HashSet::with_capacity(items.len());

    for item in items {
        let Some(field) = by_id.get(&item.form_field_id) else {
            return Err(ServiceError::invalid("invalid field id"));
        };
        if !seen.insert(item.form_field_id) {
            return Err(ServiceError::invalid(format!(
                "field {} submitted more than once",
                item.form_field_id
            )));
        }
        if field.required && item.field_value.trim().is_empty() {
            return Err(ServiceError::invalid(format!("{} is required", field.field_title)));
        }
    }

    if let Some(missing) = fields.iter().find(|f| f.required && !seen.contains(&f.id)) {
        return Err(ServiceError::invalid(format!("{} is required", missing.field_title)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(id: i64, title: &str, required: bool) -> FormField {
        FormField {
            id,
            field_title: title.to_string(),
            required,
            form_id: 1,
        }
    }

    fn item(form_field_id: i64, value: &str) -> NewResponseField {
        NewResponseField {
            form_field_id,
            field_value: value.to_string(),
        }
    }

    #[test]
    fn email_format() {
        assert!(validate_email_format("ada@example.com").is_ok());
        assert!(validate_email_format("ada@localhost").is_ok());
        assert!(validate_email_format("ada.example.com").is_err());
        assert!(validate_email_format("@example.com").is_err());
        assert!(validate_email_format("ada@").is_err());
        assert!(validate_email_format("a@b@c").is_err());
        assert!(validate_email_format("a da@example.com").is_err());
    }

    #[test]
    fn password_strength() {
        assert!(validate_password_strength("Secret@1", 6).is_ok());
        assert!(validate_password_strength("Se@1", 6).is_err());
        assert!(validate_password_strength("secret@1", 6).is_err());
        assert!(validate_password_strength("Secret11", 6).is_err());
    }

    #[test]
    fn blank_is_rejected_and_value_trimmed() {
        assert_eq!(require_non_blank("  Survey ", "form_title").unwrap(), "Survey");
        assert_eq!(
            require_non_blank("   ", "form_title").unwrap_err(),
            ServiceError::invalid("form_title is required")
        );
    }

    #[test]
    fn submission_accepts_optional_omissions() {
        let fields = [field(1, "Name", true), field(2, "Notes", false)];
        assert!(validate_submission(&fields, &[item(1, "Alice")]).is_ok());
    }

    #[test]
    fn submission_rejections() {
        let fields = [field(1, "Name", true), field(2, "Notes", false)];

        assert!(validate_submission(&fields, &[]).is_err());
        assert_eq!(
            validate_submission(&fields, &[item(1, "Alice"), item(9, "x")]).unwrap_err(),
            ServiceError::invalid("invalid field id")
        );
        assert!(validate_submission(&fields, &[item(1, "Alice"), item(1, "Bob")]).is_err());
        assert!(validate_submission(&fields, &[item(1, "   ")]).is_err());
        assert_eq!(
            validate_submission(&fields, &[item(2, "x")]).unwrap_err(),
            ServiceError::invalid("Name is required")
        );
    }
}
