pub mod error;
pub mod field_service;
pub mod form_service;
pub mod response_service;
pub mod user_service;
pub mod validate;

use std::sync::Arc;

pub use error::ServiceError;
pub use field_service::FieldService;
pub use form_service::FormService;
pub use response_service::ResponseService;
pub use user_service::{Session, UserService};

use crate::config::AppConfig;
use crate::database::models::Form;
use crate::database::Store;
use crate::policy::{self, Action, Decision};

/// How ownership denials are reported to the caller
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy {
    pub conceal_foreign_resources: bool,
}

impl AccessPolicy {
    /// Applies the gate for `action` on an already resolved form.
    ///
    /// `addressed` names the resource the caller asked for, as `(kind, id)`. A
    /// concealed denial reports that resource missing, not its parent form.
    pub fn check(
        &self,
        requester: i64,
        action: Action,
        form: &Form,
        addressed: (&str, i64),
    ) -> Result<(), ServiceError> {
        match policy::authorize(requester, action, form) {
            Decision::Allowed => Ok(()),
            Decision::Denied { reason } => {
                tracing::warn!(
                    "Denied {:?} on form {} for user {}: {}",
                    action,
                    form.id,
                    requester,
                    reason
                );
                match action {
                    Action::Submit => Err(ServiceError::InvalidInput(reason)),
                    _ if self.conceal_foreign_resources => {
                        let (kind, id) = addressed;
                        Err(ServiceError::NotFound(format!("{} with id {} not found", kind, id)))
                    }
                    _ => Err(ServiceError::Unauthorized(reason)),
                }
            }
        }
    }
}

/// All services over one shared store
#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub forms: FormService,
    pub fields: FieldService,
    pub responses: ResponseService,
}

impl Services {
    pub fn new(store: Arc<dyn Store>, config: &AppConfig) -> Self {
        let access = AccessPolicy {
            conceal_foreign_resources: config.security.conceal_foreign_resources,
        };

        Self {
            users: UserService::new(store.clone(), config.security.clone()),
            forms: FormService::new(store.clone(), access),
            fields: FieldService::new(store.clone(), access),
            responses: ResponseService::new(store, access),
        }
    }
}
