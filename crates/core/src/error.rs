use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The store rejected or timed out the operation. Nothing was applied;
    /// the whole operation may be retried.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the caller may safely retry the operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_is_retryable() {
        assert!(CoreError::Unavailable("timeout".into()).is_retryable());
        assert!(!CoreError::Conflict("dup".into()).is_retryable());
        assert!(!CoreError::Internal("gap".into()).is_retryable());
        assert!(!CoreError::NotFound {
            entity: "Category",
            id: 1
        }
        .is_retryable());
    }

    #[test]
    fn not_found_message_names_entity() {
        let err = CoreError::NotFound {
            entity: "Workout",
            id: 42,
        };
        assert_eq!(err.to_string(), "Entity not found: Workout with id 42");
    }
}
