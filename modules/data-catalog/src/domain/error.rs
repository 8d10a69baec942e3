use super::engine::EngineError;
use super::schema::FieldViolation;

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Duplicate key: {message}")]
    DuplicateKey { message: String },

    #[error("Revision conflict: {message}")]
    RevisionConflict { message: String },

    #[error("Relationship endpoint '{field}' cannot be changed")]
    ImmutableEndpoint { field: String },

    #[error("Validation failed with {} violation(s)", violations.len())]
    Validation { violations: Vec<FieldViolation> },

    /// Storage failure outside the translated set, carried unchanged.
    #[error(transparent)]
    Unrecognized(EngineError),
}

impl DomainError {
    pub fn immutable_endpoint(field: impl Into<String>) -> Self {
        Self::ImmutableEndpoint {
            field: field.into(),
        }
    }

    #[must_use]
    pub fn validation(violations: Vec<FieldViolation>) -> Self {
        Self::Validation { violations }
    }

    /// Returns the underlying engine error for `Unrecognized`.
    #[must_use]
    pub fn engine_error(&self) -> Option<&EngineError> {
        match self {
            Self::Unrecognized(err) => Some(err),
            _ => None,
        }
    }
}
