//! `application/problem+json` bodies returned by the catalog API (RFC 9457).

use std::fmt;

use http::StatusCode;
use serde::Serialize;

pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

mod status_code {
    use http::StatusCode;
    use serde::Serializer;

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(status: &StatusCode, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u16(status.as_u16())
    }
}

/// Error body of a failed catalog request.
///
/// Built from an [`ErrDef`](crate::ErrDef) entry, then bound to the request
/// path with [`Problem::at`].
#[derive(Debug, Clone, Serialize)]
#[must_use]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_url: String,
    pub title: String,
    #[serde(with = "status_code")]
    pub status: StatusCode,
    pub detail: String,
    /// Request path, e.g. `/dataset/ds1`.
    pub instance: String,
    /// Stable catalog code such as `CATALOG_NOT_FOUND`.
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<InvalidField>,
}

/// One rejected attribute of a document body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidField {
    /// Attribute name, `_from`/`_to` for relationship endpoints.
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Problem {
    /// Binds the problem to the request it answers.
    pub fn at(mut self, instance: impl Into<String>, trace_id: Option<String>) -> Self {
        self.instance = instance.into();
        self.trace_id = trace_id;
        self
    }

    pub fn with_errors(mut self, errors: impl IntoIterator<Item = InvalidField>) -> Self {
        self.errors.extend(errors);
        self
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.status.as_u16(), self.code, self.detail)
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for Problem {
    fn into_response(self) -> axum::response::Response {
        use axum::http::{HeaderValue, header};

        (
            self.status,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
            )],
            axum::Json(self),
        )
            .into_response()
    }
}
