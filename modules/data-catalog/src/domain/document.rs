//! Catalog documents and their system attributes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unique key of a document within its collection.
pub const KEY: &str = "_key";
/// Fully qualified identifier, `<collection>/<key>`.
pub const ID: &str = "_id";
/// Revision token, replaced on every successful write.
pub const REV: &str = "_rev";
/// Source endpoint of a relationship.
pub const FROM: &str = "_from";
/// Target endpoint of a relationship.
pub const TO: &str = "_to";

/// Attributes owned by the store and never taken from a replace/update body.
pub const STORE_MANAGED: [&str; 3] = [KEY, ID, REV];

const MAX_KEY_LEN: usize = 254;

/// A JSON object stored in one collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

/// Meta attributes assigned by the storage engine on a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(rename = "_rev")]
    pub rev: String,
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Returns `None` unless `value` is a JSON object.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    fn str_field(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.str_field(KEY)
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.str_field(ID)
    }

    #[must_use]
    pub fn rev(&self) -> Option<&str> {
        self.str_field(REV)
    }

    #[must_use]
    pub fn from_endpoint(&self) -> Option<&str> {
        self.str_field(FROM)
    }

    #[must_use]
    pub fn to_endpoint(&self) -> Option<&str> {
        self.str_field(TO)
    }

    /// Overwrites `_id`, `_key` and `_rev` with the engine-assigned values.
    pub fn apply_meta(&mut self, meta: &DocumentMeta) {
        self.insert(ID, meta.id.clone());
        self.insert(KEY, meta.key.clone());
        self.insert(REV, meta.rev.clone());
    }

    /// Shallow merge: every top-level field of `patch` replaces the field of
    /// the same name, all other fields are kept.
    pub fn merge(&mut self, patch: Document) {
        for (field, value) in patch.0 {
            self.0.insert(field, value);
        }
    }

    /// Drops `_key`, `_id` and `_rev`.
    #[must_use]
    pub fn without_store_managed(mut self) -> Self {
        for field in STORE_MANAGED {
            self.0.remove(field);
        }
        self
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Object(doc.0)
    }
}

impl DocumentMeta {
    #[must_use]
    pub fn new(collection: &str, key: impl Into<String>, rev: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            id: document_id(collection, &key),
            key,
            rev: rev.into(),
        }
    }
}

/// Builds the fully qualified `<collection>/<key>` identifier.
#[must_use]
pub fn document_id(collection: &str, key: &str) -> String {
    format!("{collection}/{key}")
}

/// Checks the document key format: 1 to 254 characters out of letters,
/// digits and `_-:.@()+,=;$!*'%`.
#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key.chars().all(|c| {
            c.is_ascii_alphanumeric()
                || matches!(
                    c,
                    '_' | '-' | ':' | '.' | '@' | '(' | ')' | '+' | ',' | '=' | ';' | '$' | '!'
                        | '*' | '\'' | '%'
                )
        })
}

/// Splits a `<collection>/<key>` identifier, validating the key part.
#[must_use]
pub fn split_document_id(id: &str) -> Option<(&str, &str)> {
    let (collection, key) = id.split_once('/')?;
    if collection.is_empty() || !is_valid_key(key) {
        return None;
    }
    Some((collection, key))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::from_value(value).unwrap()
    }

    #[test]
    fn merge_is_shallow() {
        let mut stored = doc(json!({
            "name": "Basin-7",
            "geometry": {"type": "Point", "coordinates": [1, 2]},
            "region": "north"
        }));
        stored.merge(doc(json!({"name": "Basin-7b", "geometry": {"type": "Polygon"}})));

        assert_eq!(stored.get("name"), Some(&json!("Basin-7b")));
        assert_eq!(stored.get("geometry"), Some(&json!({"type": "Polygon"})));
        assert_eq!(stored.get("region"), Some(&json!("north")));
    }

    #[test]
    fn apply_meta_overwrites_system_fields() {
        let mut d = doc(json!({"_rev": "stale", "name": "x"}));
        d.apply_meta(&DocumentMeta::new("Dataset", "ds1", "r2"));

        assert_eq!(d.key(), Some("ds1"));
        assert_eq!(d.id(), Some("Dataset/ds1"));
        assert_eq!(d.rev(), Some("r2"));
        assert_eq!(d.get("name"), Some(&json!("x")));
    }

    #[test]
    fn without_store_managed_keeps_endpoints() {
        let d = doc(json!({
            "_key": "c1", "_id": "contains/c1", "_rev": "r1",
            "_from": "SurveyArea/sa1", "_to": "Dataset/ds1"
        }))
        .without_store_managed();

        assert!(!d.contains(KEY) && !d.contains(ID) && !d.contains(REV));
        assert_eq!(d.from_endpoint(), Some("SurveyArea/sa1"));
        assert_eq!(d.to_endpoint(), Some("Dataset/ds1"));
    }

    #[test]
    fn from_value_rejects_non_objects() {
        assert!(Document::from_value(json!([1, 2])).is_none());
        assert!(Document::from_value(json!("x")).is_none());
        assert!(Document::from_value(json!({})).is_some());
    }

    #[test]
    fn key_format() {
        assert!(is_valid_key("sa1"));
        assert!(is_valid_key("a-b_c:d.e@f(g)+h,i=j;k$l!m*n'o%p"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("with space"));
        assert!(!is_valid_key("slash/inside"));
        assert!(!is_valid_key(&"k".repeat(255)));
        assert!(is_valid_key(&"k".repeat(254)));
    }

    #[test]
    fn document_id_split() {
        assert_eq!(split_document_id("SurveyArea/sa1"), Some(("SurveyArea", "sa1")));
        assert_eq!(split_document_id("SurveyArea"), None);
        assert_eq!(split_document_id("/sa1"), None);
        assert_eq!(split_document_id("SurveyArea/"), None);
    }
}
