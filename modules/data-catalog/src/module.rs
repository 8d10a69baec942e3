use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use tracing::{debug, info};

use crate::api::rest::routes;
use crate::config::DataCatalogConfig;
use crate::domain::engine::{DocumentEngine, EngineError};
use crate::domain::resource::ResourceKind;
use crate::domain::store::{DocumentStore, store_for};
use crate::infra::storage::{self, StorageInitError};

#[derive(Debug, thiserror::Error)]
pub enum CatalogInitError {
    #[error(transparent)]
    Storage(#[from] StorageInitError),

    #[error("failed to prepare collection '{collection}': {source}")]
    Collection {
        collection: &'static str,
        #[source]
        source: EngineError,
    },
}

/// The data catalog: one store per resource kind over a shared engine.
pub struct Catalog {
    stores: HashMap<ResourceKind, Arc<dyn DocumentStore>>,
}

impl Catalog {
    /// Opens the configured storage backend and bootstraps the catalog on it.
    ///
    /// # Errors
    /// Fails when storage cannot be opened or a collection cannot be prepared.
    pub async fn from_config(config: &DataCatalogConfig) -> Result<Self, CatalogInitError> {
        let engine = storage::connect(&config.storage).await?;
        Self::bootstrap(engine).await
    }

    /// Ensures every collection exists and builds the stores.
    ///
    /// # Errors
    /// Fails when a collection exists with the wrong kind or storage is unavailable.
    pub async fn bootstrap(engine: Arc<dyn DocumentEngine>) -> Result<Self, CatalogInitError> {
        info!("Initializing data catalog");

        let mut stores = HashMap::new();
        for kind in ResourceKind::ALL {
            let spec = kind.spec();
            engine
                .ensure_collection(spec.collection, spec.collection_kind())
                .await
                .map_err(|source| CatalogInitError::Collection {
                    collection: spec.collection,
                    source,
                })?;
            debug!(collection = spec.collection, edge = spec.is_edge(), "Collection ready");
            stores.insert(kind, store_for(spec, Arc::clone(&engine)));
        }

        info!(collections = stores.len(), "Data catalog initialized");
        Ok(Self { stores })
    }

    #[must_use]
    pub fn store(&self, kind: ResourceKind) -> Option<Arc<dyn DocumentStore>> {
        self.stores.get(&kind).cloned()
    }

    /// Stores in registry order.
    pub fn stores(&self) -> impl Iterator<Item = Arc<dyn DocumentStore>> + '_ {
        ResourceKind::ALL
            .into_iter()
            .filter_map(|kind| self.store(kind))
    }

    /// REST routes of every resource kind plus `/openapi.json`.
    #[must_use]
    pub fn router(&self) -> Router {
        routes::catalog_router(self)
    }
}
