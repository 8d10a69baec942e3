pub mod document;
pub mod engine;
pub mod error;
pub mod resource;
pub mod schema;
pub mod store;
pub mod translate;
