//! Resource stores: one per catalog kind, written against [`DocumentEngine`].
//!
//! [`ResourceStore`] serves vertex collections. [`RelationshipStore`] wraps it
//! for edge collections and owns the endpoint rules. Both run every storage
//! failure through [`translate`] and never retry.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::document::{Document, FROM, TO};
use super::engine::DocumentEngine;
use super::error::DomainError;
use super::resource::ResourceSpec;
use super::schema::{FieldViolation, codes};
use super::translate::translate;

/// Uniform CRUD contract shared by every resource kind.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn spec(&self) -> &'static ResourceSpec;

    async fn list_all(&self) -> Result<Vec<Document>, DomainError>;

    /// Inserts `body` and returns it merged with `_id`, `_key` and `_rev`.
    async fn create(&self, body: Document) -> Result<Document, DomainError>;

    async fn get_by_key(&self, key: &str) -> Result<Document, DomainError>;

    /// Overwrites the stored document. `precondition` is the revision the
    /// caller expects to be current.
    async fn replace(
        &self,
        key: &str,
        body: Document,
        precondition: Option<&str>,
    ) -> Result<Document, DomainError>;

    /// Shallow-merges `patch` and returns the full stored document.
    async fn update(
        &self,
        key: &str,
        patch: Document,
        precondition: Option<&str>,
    ) -> Result<Document, DomainError>;

    async fn delete(&self, key: &str) -> Result<(), DomainError>;
}

/// Store for a vertex collection.
#[derive(Clone)]
pub struct ResourceStore {
    spec: &'static ResourceSpec,
    engine: Arc<dyn DocumentEngine>,
}

impl ResourceStore {
    #[must_use]
    pub fn new(spec: &'static ResourceSpec, engine: Arc<dyn DocumentEngine>) -> Self {
        Self { spec, engine }
    }

    fn collection(&self) -> &'static str {
        self.spec.collection
    }
}

#[async_trait]
impl DocumentStore for ResourceStore {
    fn spec(&self) -> &'static ResourceSpec {
        self.spec
    }

    #[instrument(skip(self), fields(collection = self.spec.collection))]
    async fn list_all(&self) -> Result<Vec<Document>, DomainError> {
        let docs = self
            .engine
            .all(self.collection())
            .await
            .map_err(translate)?;
        debug!(count = docs.len(), "Listed documents");
        Ok(docs)
    }

    #[instrument(skip(self, body), fields(collection = self.spec.collection))]
    async fn create(&self, mut body: Document) -> Result<Document, DomainError> {
        let meta = self
            .engine
            .save(self.collection(), body.clone())
            .await
            .map_err(translate)?;
        info!(key = %meta.key, rev = %meta.rev, "Created document");
        body.apply_meta(&meta);
        Ok(body)
    }

    #[instrument(skip(self), fields(collection = self.spec.collection))]
    async fn get_by_key(&self, key: &str) -> Result<Document, DomainError> {
        self.engine
            .document(self.collection(), key)
            .await
            .map_err(translate)
    }

    #[instrument(skip(self, body), fields(collection = self.spec.collection))]
    async fn replace(
        &self,
        key: &str,
        body: Document,
        precondition: Option<&str>,
    ) -> Result<Document, DomainError> {
        let mut body = body.without_store_managed();
        let meta = self
            .engine
            .replace(self.collection(), key, body.clone(), precondition)
            .await
            .map_err(translate)?;
        debug!(rev = %meta.rev, "Replaced document");
        body.apply_meta(&meta);
        Ok(body)
    }

    #[instrument(skip(self, patch), fields(collection = self.spec.collection))]
    async fn update(
        &self,
        key: &str,
        patch: Document,
        precondition: Option<&str>,
    ) -> Result<Document, DomainError> {
        let meta = self
            .engine
            .update(
                self.collection(),
                key,
                patch.without_store_managed(),
                precondition,
            )
            .await
            .map_err(translate)?;
        debug!(rev = %meta.rev, "Updated document");
        self.engine
            .document(self.collection(), &meta.key)
            .await
            .map_err(translate)
    }

    #[instrument(skip(self), fields(collection = self.spec.collection))]
    async fn delete(&self, key: &str) -> Result<(), DomainError> {
        self.engine
            .remove(self.collection(), key)
            .await
            .map_err(translate)?;
        info!("Deleted document");
        Ok(())
    }
}

/// Store for an edge collection.
///
/// Same contract as [`ResourceStore`]. `create` requires `_from` and `_to`;
/// after creation the endpoints can be restated but never changed.
#[derive(Clone)]
pub struct RelationshipStore {
    inner: ResourceStore,
}

impl RelationshipStore {
    #[must_use]
    pub fn new(spec: &'static ResourceSpec, engine: Arc<dyn DocumentEngine>) -> Self {
        Self {
            inner: ResourceStore::new(spec, engine),
        }
    }

    fn endpoints(body: &Document) -> Result<(String, String), DomainError> {
        let mut violations = Vec::new();
        let mut endpoint = |field: &str| match body.get(field) {
            Some(Value::String(id)) => Some(id.clone()),
            Some(_) => {
                violations.push(FieldViolation::new(field, "expected string", codes::TYPE));
                None
            }
            None => {
                violations.push(FieldViolation::new(
                    field,
                    "attribute is required",
                    codes::REQUIRED,
                ));
                None
            }
        };
        let from = endpoint(FROM);
        let to = endpoint(TO);
        match (from, to) {
            (Some(from), Some(to)) => Ok((from, to)),
            _ => Err(DomainError::validation(violations)),
        }
    }

    /// Compares the endpoints in `body` with the stored ones. Omitted
    /// endpoints are filled in; restated ones must be identical.
    fn pin_endpoints(stored: &Document, body: &mut Document) -> Result<(), DomainError> {
        for field in [FROM, TO] {
            let current = stored.get(field).cloned().unwrap_or(Value::Null);
            match body.get(field) {
                None => {
                    body.insert(field, current);
                }
                Some(value) if *value == current => {}
                Some(_) => return Err(DomainError::immutable_endpoint(field)),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for RelationshipStore {
    fn spec(&self) -> &'static ResourceSpec {
        self.inner.spec
    }

    async fn list_all(&self) -> Result<Vec<Document>, DomainError> {
        self.inner.list_all().await
    }

    #[instrument(skip(self, body), fields(collection = self.inner.spec.collection))]
    async fn create(&self, mut body: Document) -> Result<Document, DomainError> {
        let (from, to) = Self::endpoints(&body)?;
        let meta = self
            .inner
            .engine
            .save_edge(self.inner.collection(), &from, &to, body.clone())
            .await
            .map_err(translate)?;
        info!(key = %meta.key, from = %from, to = %to, "Created relationship");
        body.apply_meta(&meta);
        Ok(body)
    }

    async fn get_by_key(&self, key: &str) -> Result<Document, DomainError> {
        self.inner.get_by_key(key).await
    }

    async fn replace(
        &self,
        key: &str,
        body: Document,
        precondition: Option<&str>,
    ) -> Result<Document, DomainError> {
        let mut body = body.without_store_managed();
        let stored = self.inner.get_by_key(key).await?;
        Self::pin_endpoints(&stored, &mut body)?;
        self.inner.replace(key, body, precondition).await
    }

    async fn update(
        &self,
        key: &str,
        mut patch: Document,
        precondition: Option<&str>,
    ) -> Result<Document, DomainError> {
        if patch.contains(FROM) || patch.contains(TO) {
            let stored = self.inner.get_by_key(key).await?;
            Self::pin_endpoints(&stored, &mut patch)?;
            patch.remove(FROM);
            patch.remove(TO);
        }
        self.inner.update(key, patch, precondition).await
    }

    async fn delete(&self, key: &str) -> Result<(), DomainError> {
        self.inner.delete(key).await
    }
}

/// Builds the store matching the collection kind of `spec`.
#[must_use]
pub fn store_for(
    spec: &'static ResourceSpec,
    engine: Arc<dyn DocumentEngine>,
) -> Arc<dyn DocumentStore> {
    if spec.is_edge() {
        Arc::new(RelationshipStore::new(spec, engine))
    } else {
        Arc::new(ResourceStore::new(spec, engine))
    }
}
