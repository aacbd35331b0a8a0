use thiserror::Error;

use crate::database::StoreError;

/// Failure taxonomy shared by every service operation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    /// Authenticated, but not allowed to touch this resource
    #[error("{0}")]
    Unauthorized(String),

    /// No valid identity
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ServiceError::InvalidInput(message.into())
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        if err.is_unavailable() {
            tracing::error!("Store unavailable: {}", err);
            return ServiceError::Unavailable("service temporarily unavailable".to_string());
        }

        match err {
            StoreError::NotFound(msg) => ServiceError::NotFound(msg),
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            StoreError::InvalidReference(msg) => ServiceError::InvalidInput(msg),
            other => {
                tracing::error!("Store error: {}", other);
                ServiceError::Internal("an error occurred while processing your request".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_onto_taxonomy() {
        assert_eq!(
            ServiceError::from(StoreError::InvalidReference("invalid field id".into())),
            ServiceError::InvalidInput("invalid field id".into())
        );
        assert!(matches!(
            ServiceError::from(StoreError::Conflict("dup".into())),
            ServiceError::Conflict(_)
        ));
        assert!(matches!(
            ServiceError::from(StoreError::Sqlx(sqlx::Error::PoolTimedOut)),
            ServiceError::Unavailable(_)
        ));
    }

    #[test]
    fn backend_detail_is_not_exposed() {
        let err = ServiceError::from(StoreError::Sqlx(sqlx::Error::RowNotFound));
        match err {
            ServiceError::Internal(msg) => assert!(!msg.to_lowercase().contains("row")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
