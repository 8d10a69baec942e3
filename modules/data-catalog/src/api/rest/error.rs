use catalog_errors::{InvalidField, Problem, catalog};

use crate::domain::error::DomainError;
use crate::domain::schema::FieldViolation;

pub type ApiResult<T> = Result<T, Problem>;

fn current_trace_id() -> Option<String> {
    tracing::Span::current()
        .id()
        .map(|id| id.into_u64().to_string())
}

/// Map domain error to RFC9457 Problem using the catalog error definitions
pub fn domain_error_to_problem(e: &DomainError, instance: &str) -> Problem {
    let trace_id = current_trace_id();

    match e {
        DomainError::NotFound { message } => {
            catalog::NOT_FOUND.with_context(message.clone(), instance, trace_id)
        }
        DomainError::DuplicateKey { message } => {
            catalog::DUPLICATE_KEY.with_context(message.clone(), instance, trace_id)
        }
        DomainError::RevisionConflict { message } => {
            catalog::REVISION_CONFLICT.with_context(message.clone(), instance, trace_id)
        }
        DomainError::ImmutableEndpoint { field } => catalog::IMMUTABLE_ENDPOINT
            .with_context(
                format!("'{field}' is set at creation and cannot be changed"),
                instance,
                trace_id,
            )
            .with_errors([InvalidField {
                field: field.clone(),
                message: "endpoint cannot be changed".to_owned(),
                code: Some("immutable".to_owned()),
            }]),
        DomainError::Validation { violations } => {
            validation_problem(violations.clone(), instance)
        }
        DomainError::Unrecognized(source) => {
            tracing::error!(error = %source, num = source.num, "Unrecognized storage error");
            catalog::INTERNAL.with_context("An internal error occurred", instance, trace_id)
        }
    }
}

/// 422 problem listing every field violation.
pub fn validation_problem(violations: Vec<FieldViolation>, instance: &str) -> Problem {
    let detail = match violations.as_slice() {
        [single] => format!("Validation error on '{}': {}", single.field, single.message),
        _ => format!("{} validation errors", violations.len()),
    };
    let errors = violations.into_iter().map(|v| InvalidField {
        field: v.field,
        message: v.message,
        code: Some(v.code.to_owned()),
    });
    catalog::VALIDATION
        .with_context(detail, instance, current_trace_id())
        .with_errors(errors)
}

/// 400 problem for a body that is not valid JSON.
pub fn malformed_body_problem(detail: impl Into<String>, instance: &str) -> Problem {
    catalog::MALFORMED_BODY.with_context(detail, instance, current_trace_id())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::engine::EngineError;
    use crate::domain::schema::codes;
    use http::StatusCode;

    #[test]
    fn store_outcomes_map_to_statuses() {
        let cases = [
            (
                DomainError::NotFound {
                    message: "gone".to_owned(),
                },
                StatusCode::NOT_FOUND,
                "CATALOG_NOT_FOUND",
            ),
            (
                DomainError::DuplicateKey {
                    message: "dup".to_owned(),
                },
                StatusCode::CONFLICT,
                "CATALOG_DUPLICATE_KEY",
            ),
            (
                DomainError::RevisionConflict {
                    message: "stale".to_owned(),
                },
                StatusCode::CONFLICT,
                "CATALOG_REVISION_CONFLICT",
            ),
            (
                DomainError::immutable_endpoint("_from"),
                StatusCode::UNPROCESSABLE_ENTITY,
                "CATALOG_IMMUTABLE_ENDPOINT",
            ),
        ];
        for (err, status, code) in cases {
            let problem = domain_error_to_problem(&err, "/surveyarea/sa1");
            assert_eq!(problem.status, status);
            assert_eq!(problem.code, code);
            assert_eq!(problem.instance, "/surveyarea/sa1");
        }
    }

    #[test]
    fn unrecognized_error_hides_engine_details() {
        let err = DomainError::Unrecognized(EngineError::internal("disk at /var/db failed"));
        let problem = domain_error_to_problem(&err, "/dataset");
        assert_eq!(problem.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!problem.detail.contains("/var/db"));
    }

    #[test]
    fn validation_lists_every_violation() {
        let problem = validation_problem(
            vec![
                FieldViolation::new("name", "attribute is required", codes::REQUIRED),
                FieldViolation::new("tags", "expected array", codes::TYPE),
            ],
            "/dataset",
        );
        assert_eq!(problem.status, StatusCode::UNPROCESSABLE_ENTITY);
        let errors = problem.errors;
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1].code.as_deref(), Some("type"));
    }
}
