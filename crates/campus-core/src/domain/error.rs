//! Workflow error taxonomy.

use campus_state::StorageError;

use crate::state_machine::TransitionError;
use crate::strategies::StrategyError;

/// Errors raised by workflow orchestrators to their immediate caller.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    #[error("{actor} is not allowed to {action}")]
    Unauthorized { actor: String, action: String },

    #[error("invalid input: {0}")]
    Invalid(#[from] StrategyError),

    #[error("concurrent update on {entity} {id}, reload and retry")]
    Conflict { entity: String, id: String },

    #[error("storage error: {0}")]
    Storage(StorageError),

    #[error("payment error: {0}")]
    Payment(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WorkflowError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::PreconditionViolation(message.into())
    }

    pub fn unauthorized(actor: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Unauthorized {
            actor: actor.into(),
            action: action.into(),
        }
    }
}

impl From<StorageError> for WorkflowError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { collection, id } => Self::NotFound {
                entity: collection,
                id,
            },
            StorageError::Conflict { collection, id, .. } => Self::Conflict {
                entity: collection,
                id,
            },
            StorageError::Serialization(e) => Self::Serialization(e),
            other => Self::Storage(other),
        }
    }
}

/// Result type for workflow operations.
pub type WorkflowResult<T> = std::result::Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_conflict_maps_to_conflict() {
        let err: WorkflowError = StorageError::Conflict {
            collection: "registrations".into(),
            id: "r-1".into(),
            reason: "stale".into(),
        }
        .into();
        assert!(matches!(err, WorkflowError::Conflict { ref id, .. } if id == "r-1"));
    }

    #[test]
    fn test_storage_not_found_maps_to_not_found() {
        let err: WorkflowError = StorageError::NotFound {
            collection: "elections".into(),
            id: "e-9".into(),
        }
        .into();
        assert_eq!(err.to_string(), "elections not found: e-9");
    }

    #[test]
    fn test_backend_error_stays_storage() {
        let err: WorkflowError = StorageError::Backend("socket closed".into()).into();
        assert!(matches!(err, WorkflowError::Storage(_)));
        assert!(err.to_string().contains("socket closed"));
    }

    #[test]
    fn test_unauthorized_display() {
        let err = WorkflowError::unauthorized("u-2", "accept answers on question q-1");
        assert_eq!(
            err.to_string(),
            "u-2 is not allowed to accept answers on question q-1"
        );
    }
}
