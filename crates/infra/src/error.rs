//! Service-level error: what a store operation reports to its caller.

use thiserror::Error;

use petstore_core::DomainError;

use crate::entity_store::PersistenceError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// A referenced store, employee or customer does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A child entity was addressed through a store it does not belong to.
    #[error("ownership violation: {0}")]
    OwnershipViolation(String),

    /// Malformed input (including unparseable identifiers).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The entity store failed; the transaction was rolled back.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::NotFound(msg) => ServiceError::NotFound(msg),
            DomainError::OwnershipViolation(msg) => ServiceError::OwnershipViolation(msg),
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidId(msg) => ServiceError::Validation(msg),
        }
    }
}

impl ServiceError {
    /// The message without the variant prefix.
    pub fn detail(&self) -> String {
        match self {
            ServiceError::NotFound(msg)
            | ServiceError::OwnershipViolation(msg)
            | ServiceError::Validation(msg) => msg.clone(),
            ServiceError::Persistence(err) => err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_keep_their_message() {
        let err: ServiceError = DomainError::not_found("Store", 7).into();
        assert!(matches!(&err, ServiceError::NotFound(_)));
        assert_eq!(err.to_string(), "Store with id 7 does not exist");
    }

    #[test]
    fn invalid_id_becomes_validation() {
        let err: ServiceError = DomainError::invalid_id("StoreId: abc").into();
        assert!(matches!(err, ServiceError::Validation(ref m) if m == "StoreId: abc"));
    }

    #[test]
    fn persistence_errors_convert_with_question_mark() {
        fn fails() -> Result<(), ServiceError> {
            Err(PersistenceError::ReadOnly)?;
            Ok(())
        }
        assert!(matches!(
            fails(),
            Err(ServiceError::Persistence(PersistenceError::ReadOnly))
        ));
    }
}
