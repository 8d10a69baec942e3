//! Data catalog: survey areas, datasets and datafiles linked by `contains`
//! and `produces` relationships, served over a uniform CRUD REST surface.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod config;
pub mod domain;
pub mod infra;
pub mod module;

pub use config::{DataCatalogConfig, StorageConfig};
pub use module::{Catalog, CatalogInitError};
