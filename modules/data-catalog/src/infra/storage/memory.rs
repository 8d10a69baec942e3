//! In-process storage engine.
//!
//! Collections live in a [`DashMap`]; each collection guards its documents
//! with one reader/writer lock, which makes every single-document operation
//! atomic. Nothing is persisted.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;

use super::shape;
use crate::domain::document::{Document, DocumentMeta, FROM, TO};
use crate::domain::engine::{CollectionKind, DocumentEngine, EngineError, EngineResult};

struct MemCollection {
    kind: CollectionKind,
    docs: RwLock<HashMap<String, Document>>,
}

#[derive(Default)]
pub struct InMemoryEngine {
    collections: DashMap<String, Arc<MemCollection>>,
    ticker: AtomicU64,
}

impl InMemoryEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn collection(&self, name: &str) -> EngineResult<Arc<MemCollection>> {
        self.collections
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| EngineError::collection_not_found(name))
    }

    fn tick(&self) -> u64 {
        self.ticker.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Revisions come from the same counter as keys, so they are never reused.
    fn next_rev(&self) -> String {
        format!("_{:x}", self.tick())
    }

    fn next_key(&self, docs: &HashMap<String, Document>) -> String {
        loop {
            let key = self.tick().to_string();
            if !docs.contains_key(&key) {
                return key;
            }
        }
    }

    fn insert(
        &self,
        collection: &str,
        coll: &MemCollection,
        mut body: Document,
        edge: Option<(&str, &str)>,
    ) -> EngineResult<DocumentMeta> {
        let key = shape::take_key(&mut body)?;
        let mut body = body.without_store_managed();

        let mut docs = coll.docs.write();
        let key = match key {
            Some(key) if docs.contains_key(&key) => {
                return Err(EngineError::unique_constraint_violated(collection, &key));
            }
            Some(key) => key,
            None => self.next_key(&docs),
        };
        let meta = DocumentMeta::new(collection, key, self.next_rev());
        shape::stamp(&mut body, &meta, edge);
        docs.insert(meta.key.clone(), body);
        Ok(meta)
    }

    /// Endpoints for a write to `coll`: taken from `body` when present,
    /// otherwise from `current`.
    fn resolve_endpoints(
        coll: &MemCollection,
        body: &Document,
        current: &Document,
    ) -> EngineResult<Option<(String, String)>> {
        if coll.kind != CollectionKind::Edge {
            return Ok(None);
        }
        let pick = |field: &str| {
            shape::check_handle(field, body.get(field).or_else(|| current.get(field)))
        };
        Ok(Some((pick(FROM)?, pick(TO)?)))
    }
}

#[async_trait]
impl DocumentEngine for InMemoryEngine {
    async fn ensure_collection(&self, name: &str, kind: CollectionKind) -> EngineResult<()> {
        let entry = self
            .collections
            .entry(name.to_owned())
            .or_insert_with(|| {
                Arc::new(MemCollection {
                    kind,
                    docs: RwLock::new(HashMap::new()),
                })
            });
        if entry.kind == kind {
            Ok(())
        } else {
            Err(EngineError::collection_type_invalid(name, kind))
        }
    }

    async fn all(&self, collection: &str) -> EngineResult<Vec<Document>> {
        let coll = self.collection(collection)?;
        let docs = coll.docs.read();
        Ok(docs.values().cloned().collect())
    }

    async fn save(&self, collection: &str, body: Document) -> EngineResult<DocumentMeta> {
        let coll = self.collection(collection)?;
        match coll.kind {
            CollectionKind::Document => self.insert(collection, &coll, body, None),
            CollectionKind::Edge => {
                let (from, to) = shape::endpoints(&body)?;
                self.insert(collection, &coll, body, Some((&from, &to)))
            }
        }
    }

    async fn save_edge(
        &self,
        collection: &str,
        from: &str,
        to: &str,
        body: Document,
    ) -> EngineResult<DocumentMeta> {
        let coll = self.collection(collection)?;
        if coll.kind != CollectionKind::Edge {
            return Err(EngineError::collection_type_invalid(
                collection,
                CollectionKind::Edge,
            ));
        }
        let from = shape::check_handle(FROM, Some(&Value::from(from)))?;
        let to = shape::check_handle(TO, Some(&Value::from(to)))?;
        self.insert(collection, &coll, body, Some((&from, &to)))
    }

    async fn document(&self, collection: &str, key: &str) -> EngineResult<Document> {
        let coll = self.collection(collection)?;
        let docs = coll.docs.read();
        docs.get(key)
            .cloned()
            .ok_or_else(|| EngineError::document_not_found(collection, key))
    }

    async fn replace(
        &self,
        collection: &str,
        key: &str,
        body: Document,
        if_match: Option<&str>,
    ) -> EngineResult<DocumentMeta> {
        let coll = self.collection(collection)?;
        let mut body = body.without_store_managed();

        let mut docs = coll.docs.write();
        let current = docs
            .get(key)
            .ok_or_else(|| EngineError::document_not_found(collection, key))?;
        if let Some(expected) = if_match
            && current.rev() != Some(expected)
        {
            return Err(EngineError::conflict(collection, key));
        }
        let edge = Self::resolve_endpoints(&coll, &body, current)?;

        let meta = DocumentMeta::new(collection, key, self.next_rev());
        shape::stamp(
            &mut body,
            &meta,
            edge.as_ref().map(|(f, t)| (f.as_str(), t.as_str())),
        );
        docs.insert(meta.key.clone(), body);
        Ok(meta)
    }

    async fn update(
        &self,
        collection: &str,
        key: &str,
        patch: Document,
        if_match: Option<&str>,
    ) -> EngineResult<DocumentMeta> {
        let coll = self.collection(collection)?;
        let patch = patch.without_store_managed();

        let mut docs = coll.docs.write();
        let current = docs
            .get(key)
            .ok_or_else(|| EngineError::document_not_found(collection, key))?;
        if let Some(expected) = if_match
            && current.rev() != Some(expected)
        {
            return Err(EngineError::conflict(collection, key));
        }
        let edge = Self::resolve_endpoints(&coll, &patch, current)?;

        let mut merged = current.clone();
        merged.merge(patch);
        let meta = DocumentMeta::new(collection, key, self.next_rev());
        shape::stamp(
            &mut merged,
            &meta,
            edge.as_ref().map(|(f, t)| (f.as_str(), t.as_str())),
        );
        docs.insert(meta.key.clone(), merged);
        Ok(meta)
    }

    async fn remove(&self, collection: &str, key: &str) -> EngineResult<()> {
        let coll = self.collection(collection)?;
        coll.docs
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| EngineError::document_not_found(collection, key))
    }
}
