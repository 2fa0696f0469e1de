use thiserror::Error;

use crate::crud::mutation::MutationError;
use crate::hashing::HashError;
use crate::store::StoreError;
use crate::validation::ValidationError;

/// Everything a handler can reply with instead of a value
#[derive(Debug, Error)]
pub enum CrudError {
    /// Access-label mismatch or failed ownership check
    #[error("{0}")]
    Unauthorized(String),

    /// Payload rejected by the validator
    #[error("{0}")]
    Validation(String),

    /// No document with the requested id; surfaced as a bad request
    #[error("{0}")]
    NotFound(String),

    /// Store failure, passed through without retry
    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Hashing(#[from] HashError),
}

pub type CrudResult<T> = Result<T, CrudError>;

impl CrudError {
    pub fn not_found(collection: &str) -> Self {
        CrudError::NotFound(format!("No doc found in {}", collection))
    }
}

impl From<ValidationError> for CrudError {
    fn from(err: ValidationError) -> Self {
        CrudError::Validation(err.message)
    }
}

impl From<MutationError> for CrudError {
    fn from(err: MutationError) -> Self {
        match err {
            MutationError::SecretNotString(_) => CrudError::Validation(err.to_string()),
            MutationError::Hash(e) => CrudError::Hashing(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_collection() {
        let err = CrudError::not_found("users");
        assert_eq!(err.to_string(), "No doc found in users");
    }

    #[test]
    fn secret_type_errors_are_validation_errors() {
        let err = CrudError::from(MutationError::SecretNotString("password".to_string()));
        assert!(matches!(err, CrudError::Validation(ref msg) if msg == "\"password\" must be a string"));
    }
}
