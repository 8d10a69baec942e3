//! Mapping from storage-native error numbers to domain outcomes.

use super::engine::{EngineError, error_num};
use super::error::DomainError;

/// Classifies a storage error.
///
/// Only document-not-found, unique-constraint and write-conflict numbers are
/// recognized. Everything else comes back as [`DomainError::Unrecognized`]
/// holding the original error untouched.
#[must_use]
pub fn translate(err: EngineError) -> DomainError {
    match err.num {
        error_num::DOCUMENT_NOT_FOUND => DomainError::NotFound {
            message: err.message,
        },
        error_num::UNIQUE_CONSTRAINT_VIOLATED => DomainError::DuplicateKey {
            message: err.message,
        },
        error_num::CONFLICT => DomainError::RevisionConflict {
            message: err.message,
        },
        _ => DomainError::Unrecognized(err),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_recognized() {
        let err = translate(EngineError::document_not_found("SurveyArea", "sa1"));
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[test]
    fn unique_violation_is_duplicate_key() {
        let err = translate(EngineError::unique_constraint_violated("Dataset", "ds1"));
        assert!(matches!(err, DomainError::DuplicateKey { .. }));
    }

    #[test]
    fn conflict_is_revision_conflict() {
        let err = translate(EngineError::conflict("Datafile", "df1"));
        assert!(matches!(err, DomainError::RevisionConflict { .. }));
    }

    #[test]
    fn message_is_kept() {
        match translate(EngineError::document_not_found("Dataset", "gone")) {
            DomainError::NotFound { message } => {
                assert_eq!(message, "document not found: Dataset/gone");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn other_numbers_pass_through_unchanged() {
        for original in [
            EngineError::collection_not_found("Nope"),
            EngineError::document_key_bad("a b"),
            EngineError::invalid_edge_attribute("_from"),
            EngineError::internal("disk on fire"),
            EngineError::new(9999, "something new"),
        ] {
            let translated = translate(original.clone());
            assert_eq!(translated.engine_error(), Some(&original));
        }
    }
}
