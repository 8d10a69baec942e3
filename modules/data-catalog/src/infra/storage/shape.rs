//! Body handling shared by the storage engines.

use serde_json::Value;

use crate::domain::document::{self, Document, DocumentMeta, FROM, KEY, TO};
use crate::domain::engine::{EngineError, EngineResult};

/// Removes `_key` from `body` and checks its format.
pub fn take_key(body: &mut Document) -> EngineResult<Option<String>> {
    match body.remove(KEY) {
        None => Ok(None),
        Some(Value::String(key)) if document::is_valid_key(&key) => Ok(Some(key)),
        Some(Value::String(key)) => Err(EngineError::document_key_bad(&key)),
        Some(other) => Err(EngineError::document_key_bad(&other.to_string())),
    }
}

/// Validates one endpoint handle of the form `<collection>/<key>`.
pub fn check_handle(field: &str, value: Option<&Value>) -> EngineResult<String> {
    match value.and_then(Value::as_str) {
        Some(id) if document::split_document_id(id).is_some() => Ok(id.to_owned()),
        _ => Err(EngineError::invalid_edge_attribute(field)),
    }
}

/// Reads both endpoints of an edge body.
pub fn endpoints(body: &Document) -> EngineResult<(String, String)> {
    Ok((
        check_handle(FROM, body.get(FROM))?,
        check_handle(TO, body.get(TO))?,
    ))
}

/// Writes meta and endpoints into a body that is about to be stored.
pub fn stamp(body: &mut Document, meta: &DocumentMeta, edge: Option<(&str, &str)>) {
    body.apply_meta(meta);
    if let Some((from, to)) = edge {
        body.insert(FROM, from);
        body.insert(TO, to);
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::engine::error_num;
    use serde_json::json;

    #[test]
    fn take_key_validates_format() {
        let mut body = Document::from_value(json!({"_key": "ok-1"})).unwrap();
        assert_eq!(take_key(&mut body).unwrap().as_deref(), Some("ok-1"));
        assert!(!body.contains(KEY));

        let mut body = Document::from_value(json!({"_key": "no good"})).unwrap();
        assert_eq!(
            take_key(&mut body).unwrap_err().num,
            error_num::DOCUMENT_KEY_BAD
        );

        let mut body = Document::from_value(json!({"_key": 12})).unwrap();
        assert!(take_key(&mut body).is_err());
    }

    #[test]
    fn endpoints_must_be_document_handles() {
        let body =
            Document::from_value(json!({"_from": "SurveyArea/a", "_to": "Dataset/b"})).unwrap();
        assert_eq!(
            endpoints(&body).unwrap(),
            ("SurveyArea/a".to_owned(), "Dataset/b".to_owned())
        );

        let body = Document::from_value(json!({"_from": "SurveyArea/a"})).unwrap();
        assert_eq!(
            endpoints(&body).unwrap_err().num,
            error_num::INVALID_EDGE_ATTRIBUTE
        );
    }
}
