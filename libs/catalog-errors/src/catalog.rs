//! Static error catalog of the data catalog service

use crate::problem::Problem;
use http::StatusCode;

/// Static error definition from catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrDef {
    pub status: u16,
    pub title: &'static str,
    pub code: &'static str,
    pub type_url: &'static str,
}

impl ErrDef {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Problem for this entry, not yet bound to a request.
    pub fn as_problem(&self, detail: impl Into<String>) -> Problem {
        Problem {
            type_url: self.type_url.to_owned(),
            title: self.title.to_owned(),
            status: self.status_code(),
            detail: detail.into(),
            instance: String::new(),
            code: self.code.to_owned(),
            trace_id: None,
            errors: Vec::new(),
        }
    }

    pub fn with_context(
        &self,
        detail: impl Into<String>,
        instance: &str,
        trace_id: Option<String>,
    ) -> Problem {
        self.as_problem(detail).at(instance, trace_id)
    }
}

pub const NOT_FOUND: ErrDef = ErrDef {
    status: 404,
    title: "Not Found",
    code: "CATALOG_NOT_FOUND",
    type_url: "https://errors.data-catalog.dev/CATALOG_NOT_FOUND",
};

pub const DUPLICATE_KEY: ErrDef = ErrDef {
    status: 409,
    title: "Conflict",
    code: "CATALOG_DUPLICATE_KEY",
    type_url: "https://errors.data-catalog.dev/CATALOG_DUPLICATE_KEY",
};

pub const REVISION_CONFLICT: ErrDef = ErrDef {
    status: 409,
    title: "Conflict",
    code: "CATALOG_REVISION_CONFLICT",
    type_url: "https://errors.data-catalog.dev/CATALOG_REVISION_CONFLICT",
};

pub const VALIDATION: ErrDef = ErrDef {
    status: 422,
    title: "Unprocessable Entity",
    code: "CATALOG_VALIDATION",
    type_url: "https://errors.data-catalog.dev/CATALOG_VALIDATION",
};

pub const IMMUTABLE_ENDPOINT: ErrDef = ErrDef {
    status: 422,
    title: "Unprocessable Entity",
    code: "CATALOG_IMMUTABLE_ENDPOINT",
    type_url: "https://errors.data-catalog.dev/CATALOG_IMMUTABLE_ENDPOINT",
};

pub const MALFORMED_BODY: ErrDef = ErrDef {
    status: 400,
    title: "Bad Request",
    code: "CATALOG_MALFORMED_BODY",
    type_url: "https://errors.data-catalog.dev/CATALOG_MALFORMED_BODY",
};

pub const INTERNAL: ErrDef = ErrDef {
    status: 500,
    title: "Internal Server Error",
    code: "CATALOG_INTERNAL",
    type_url: "https://errors.data-catalog.dev/CATALOG_INTERNAL",
};

/// Every entry of the catalog, in declaration order.
pub const ALL: &[ErrDef] = &[
    NOT_FOUND,
    DUPLICATE_KEY,
    REVISION_CONFLICT,
    VALIDATION,
    IMMUTABLE_ENDPOINT,
    MALFORMED_BODY,
    INTERNAL,
];
