//! Attribute contracts for request bodies.
//!
//! Every resource kind declares a flat list of attribute rules. Validation
//! collects all violations instead of stopping at the first one, and lets
//! undeclared attributes through untouched.

use serde_json::Value;

use super::document::{self, Document, FROM, KEY, TO};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl AttrType {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            AttrType::String => "string",
            AttrType::Number => "number",
            AttrType::Integer => "integer",
            AttrType::Boolean => "boolean",
            AttrType::Object => "object",
            AttrType::Array => "array",
        }
    }

    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            AttrType::String => value.is_string(),
            AttrType::Number => value.is_number(),
            AttrType::Integer => value.is_i64() || value.is_u64(),
            AttrType::Boolean => value.is_boolean(),
            AttrType::Object => value.is_object(),
            AttrType::Array => value.is_array(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrRule {
    pub name: &'static str,
    pub ty: AttrType,
    pub required: bool,
}

impl AttrRule {
    #[must_use]
    pub const fn required(name: &'static str, ty: AttrType) -> Self {
        Self {
            name,
            ty,
            required: true,
        }
    }

    #[must_use]
    pub const fn optional(name: &'static str, ty: AttrType) -> Self {
        Self {
            name,
            ty,
            required: false,
        }
    }
}

/// Which write a body is validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Replace,
    Update,
}

/// Violation codes reported in [`FieldViolation::code`].
pub mod codes {
    pub const REQUIRED: &str = "required";
    pub const TYPE: &str = "type";
    pub const FORMAT: &str = "format";
    pub const NOT_ALLOWED: &str = "not_allowed";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
    pub code: &'static str,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub attributes: &'static [AttrRule],
    /// Edge schemas take `_from`/`_to`; vertex schemas reject them.
    pub edge: bool,
}

impl Schema {
    /// Checks `body` for `op` and hands it back as a [`Document`].
    ///
    /// # Errors
    /// Returns every violation found when the body does not satisfy the contract.
    pub fn validate(&self, op: Operation, body: Value) -> Result<Document, Vec<FieldViolation>> {
        let Some(doc) = Document::from_value(body) else {
            return Err(vec![FieldViolation::new(
                "",
                "request body must be a JSON object",
                codes::TYPE,
            )]);
        };

        let mut violations = Vec::new();

        if op == Operation::Create
            && let Some(key) = doc.get(KEY)
        {
            match key.as_str() {
                Some(k) if document::is_valid_key(k) => {}
                Some(_) => violations.push(FieldViolation::new(
                    KEY,
                    "key must be 1-254 characters of letters, digits or _-:.@()+,=;$!*'%",
                    codes::FORMAT,
                )),
                None => violations.push(FieldViolation::new(
                    KEY,
                    "expected string",
                    codes::TYPE,
                )),
            }
        }

        for endpoint in [FROM, TO] {
            self.check_endpoint(op, &doc, endpoint, &mut violations);
        }

        for rule in self.attributes {
            check_attribute(op, &doc, rule, &mut violations);
        }

        if violations.is_empty() {
            Ok(doc)
        } else {
            Err(violations)
        }
    }

    fn check_endpoint(
        &self,
        op: Operation,
        doc: &Document,
        field: &'static str,
        violations: &mut Vec<FieldViolation>,
    ) {
        let value = doc.get(field);
        if !self.edge {
            if value.is_some() {
                violations.push(FieldViolation::new(
                    field,
                    "endpoint attributes are only accepted on relationships",
                    codes::NOT_ALLOWED,
                ));
            }
            return;
        }

        match value {
            None if op == Operation::Create => violations.push(FieldViolation::new(
                field,
                "attribute is required",
                codes::REQUIRED,
            )),
            None => {}
            Some(Value::String(id)) => {
                if document::split_document_id(id).is_none() {
                    violations.push(FieldViolation::new(
                        field,
                        "expected a document id of the form <collection>/<key>",
                        codes::FORMAT,
                    ));
                }
            }
            Some(_) => violations.push(FieldViolation::new(field, "expected string", codes::TYPE)),
        }
    }
}

fn check_attribute(
    op: Operation,
    doc: &Document,
    rule: &AttrRule,
    violations: &mut Vec<FieldViolation>,
) {
    match doc.get(rule.name) {
        None => {
            if rule.required && op != Operation::Update {
                violations.push(FieldViolation::new(
                    rule.name,
                    "attribute is required",
                    codes::REQUIRED,
                ));
            }
        }
        Some(Value::Null) => {
            if rule.required {
                violations.push(FieldViolation::new(
                    rule.name,
                    "attribute must not be null",
                    codes::REQUIRED,
                ));
            }
        }
        Some(value) => {
            if !rule.ty.matches(value) {
                violations.push(FieldViolation::new(
                    rule.name,
                    format!("expected {}", rule.ty.name()),
                    codes::TYPE,
                ));
            }
        }
    }
}

/// Validates a key taken from a request path.
///
/// # Errors
/// Returns a `format` violation on `_key` when the key is malformed.
pub fn validate_key(key: &str) -> Result<(), FieldViolation> {
    if document::is_valid_key(key) {
        Ok(())
    } else {
        Err(FieldViolation::new(
            KEY,
            format!("'{key}' is not a valid document key"),
            codes::FORMAT,
        ))
    }
}
