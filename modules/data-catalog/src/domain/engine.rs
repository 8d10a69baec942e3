//! Storage port: the document/edge API the stores are written against.
//!
//! Implementations live in `infra::storage`. Failures are reported with the
//! storage-native numeric codes in [`error_num`]; turning those into domain
//! outcomes is the job of [`crate::domain::translate`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::document::{Document, DocumentMeta};

/// Storage-native error numbers.
pub mod error_num {
    pub const INTERNAL: i32 = 4;
    pub const CONFLICT: i32 = 1200;
    pub const DOCUMENT_NOT_FOUND: i32 = 1202;
    pub const COLLECTION_NOT_FOUND: i32 = 1203;
    pub const UNIQUE_CONSTRAINT_VIOLATED: i32 = 1210;
    pub const COLLECTION_TYPE_INVALID: i32 = 1218;
    pub const DOCUMENT_KEY_BAD: i32 = 1221;
    pub const INVALID_EDGE_ATTRIBUTE: i32 = 1233;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Document,
    Edge,
}

impl CollectionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CollectionKind::Document => "document",
            CollectionKind::Edge => "edge",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "document" => Some(CollectionKind::Document),
            "edge" => Some(CollectionKind::Edge),
            _ => None,
        }
    }
}

/// Error raised by a storage engine, identified by its native number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("storage error {num}: {message}")]
pub struct EngineError {
    pub num: i32,
    pub message: String,
}

impl EngineError {
    pub fn new(num: i32, message: impl Into<String>) -> Self {
        Self {
            num,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn document_not_found(collection: &str, key: &str) -> Self {
        Self::new(
            error_num::DOCUMENT_NOT_FOUND,
            format!("document not found: {collection}/{key}"),
        )
    }

    #[must_use]
    pub fn unique_constraint_violated(collection: &str, key: &str) -> Self {
        Self::new(
            error_num::UNIQUE_CONSTRAINT_VIOLATED,
            format!("unique constraint violated: {collection}/{key} already exists"),
        )
    }

    #[must_use]
    pub fn conflict(collection: &str, key: &str) -> Self {
        Self::new(
            error_num::CONFLICT,
            format!("write conflict: {collection}/{key} was modified concurrently"),
        )
    }

    #[must_use]
    pub fn collection_not_found(collection: &str) -> Self {
        Self::new(
            error_num::COLLECTION_NOT_FOUND,
            format!("collection or view not found: {collection}"),
        )
    }

    #[must_use]
    pub fn collection_type_invalid(collection: &str, expected: CollectionKind) -> Self {
        Self::new(
            error_num::COLLECTION_TYPE_INVALID,
            format!(
                "collection type invalid: {collection} is not a {} collection",
                expected.as_str()
            ),
        )
    }

    #[must_use]
    pub fn document_key_bad(key: &str) -> Self {
        Self::new(
            error_num::DOCUMENT_KEY_BAD,
            format!("illegal document key: '{key}'"),
        )
    }

    #[must_use]
    pub fn invalid_edge_attribute(attribute: &str) -> Self {
        Self::new(
            error_num::INVALID_EDGE_ATTRIBUTE,
            format!("edge attribute missing or invalid: {attribute}"),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(error_num::INTERNAL, message)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Single-document operations of a document/graph store.
///
/// Every call is atomic for the one document it touches. Returned documents
/// always carry `_key`, `_id` and `_rev`, and `_from`/`_to` for edges.
#[async_trait]
pub trait DocumentEngine: Send + Sync {
    /// Creates the collection if missing. Fails with `COLLECTION_TYPE_INVALID`
    /// when it exists with the other kind.
    async fn ensure_collection(&self, name: &str, kind: CollectionKind) -> EngineResult<()>;

    async fn all(&self, collection: &str) -> EngineResult<Vec<Document>>;

    /// Inserts into a document collection; the key comes from `_key` or is generated.
    async fn save(&self, collection: &str, body: Document) -> EngineResult<DocumentMeta>;

    /// Inserts into an edge collection with the given endpoints.
    async fn save_edge(
        &self,
        collection: &str,
        from: &str,
        to: &str,
        body: Document,
    ) -> EngineResult<DocumentMeta>;

    async fn document(&self, collection: &str, key: &str) -> EngineResult<Document>;

    /// Overwrites the document. When `if_match` is set, the stored revision must
    /// equal it. Edge endpoints absent from `body` are kept.
    async fn replace(
        &self,
        collection: &str,
        key: &str,
        body: Document,
        if_match: Option<&str>,
    ) -> EngineResult<DocumentMeta>;

    /// Shallow-merges `patch` into the document.
    async fn update(
        &self,
        collection: &str,
        key: &str,
        patch: Document,
        if_match: Option<&str>,
    ) -> EngineResult<DocumentMeta>;

    async fn remove(&self, collection: &str, key: &str) -> EngineResult<()>;
}
