//! Authorization gates for form-scoped operations.
//!
//! Every gate is a pure function of the requester, the requested action and
//! the form the action targets. Callers resolve the form first, so a missing
//! form is reported before any ownership decision is made.

use crate::database::models::Form;

/// Operations that are gated on a form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create, update or delete one of the form's fields
    ManageFields,
    DeleteForm,
    /// List responses to the form or read one response's values
    ReadResponses,
    /// Submit a response; open to any authenticated user once the form is ready
    Submit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied { reason: String },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

pub fn authorize(requester: i64, action: Action, form: &Form) -> Decision {
    match action {
        Action::ManageFields | Action::DeleteForm | Action::ReadResponses => {
            if form.user_id == requester {
                Decision::Allowed
            } else {
                Decision::Denied {
                    reason: denial_reason(action).to_string(),
                }
            }
        }
        Action::Submit => {
            if form.is_ready {
                Decision::Allowed
            } else {
                Decision::Denied {
                    reason: "form is not ready to accept responses".to_string(),
                }
            }
        }
    }
}

fn denial_reason(action: Action) -> &'static str {
    match action {
        Action::ManageFields => "only the form owner can modify its fields",
        Action::DeleteForm => "only the form owner can delete it",
        Action::ReadResponses => "only the form owner can view its responses",
        Action::Submit => "form is not ready to accept responses",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn form(owner: i64, is_ready: bool) -> Form {
        Form {
            id: 1,
            form_title: "Survey".to_string(),
            form_description: "Quarterly".to_string(),
            is_ready,
            user_id: owner,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn owner_gates() {
        let f = form(10, true);
        for action in [Action::ManageFields, Action::DeleteForm, Action::ReadResponses] {
            assert!(authorize(10, action, &f).is_allowed());
            assert!(!authorize(11, action, &f).is_allowed());
        }
    }

    #[test]
    fn submit_depends_on_readiness_not_ownership() {
        assert!(authorize(99, Action::Submit, &form(10, true)).is_allowed());
        assert!(!authorize(99, Action::Submit, &form(10, false)).is_allowed());
        assert!(!authorize(10, Action::Submit, &form(10, false)).is_allowed());
    }

    #[test]
    fn denial_carries_reason() {
        let decision = authorize(2, Action::DeleteForm, &form(1, false));
        assert_eq!(
            decision,
            Decision::Denied {
                reason: "only the form owner can delete it".to_string()
            }
        );
    }
}
