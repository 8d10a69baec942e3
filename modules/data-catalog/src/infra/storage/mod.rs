//! Storage engines behind the [`DocumentEngine`] port.

use std::sync::Arc;

use crate::config::StorageConfig;
use crate::domain::engine::DocumentEngine;

pub mod entity;
pub mod memory;
pub mod migrations;
pub mod sea_orm_engine;
mod shape;

pub use memory::InMemoryEngine;
pub use sea_orm_engine::SeaOrmEngine;

#[derive(Debug, thiserror::Error)]
pub enum StorageInitError {
    #[error("failed to open catalog database: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Opens the engine selected by `config`.
///
/// # Errors
/// Fails when the relational backend cannot be reached or migrated.
pub async fn connect(config: &StorageConfig) -> Result<Arc<dyn DocumentEngine>, StorageInitError> {
    match config {
        StorageConfig::Memory => {
            tracing::info!("Using in-memory catalog storage");
            Ok(Arc::new(InMemoryEngine::new()))
        }
        StorageConfig::Database {
            dsn,
            max_connections,
        } => Ok(Arc::new(SeaOrmEngine::connect(dsn, *max_connections).await?)),
    }
}
