use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use super::handlers::{self, ResourceState};
use super::openapi;
use crate::domain::store::DocumentStore;
use crate::module::Catalog;

/// Routes of one resource kind, rooted at its path segment.
pub fn resource_router(store: Arc<dyn DocumentStore>) -> Router {
    let base = store.spec().base_path();
    Router::new()
        .route(&base, get(handlers::list).post(handlers::create))
        .route(
            &format!("{base}/{{key}}"),
            get(handlers::get)
                .put(handlers::replace)
                .patch(handlers::update)
                .delete(handlers::delete),
        )
        .with_state(ResourceState::new(store))
}

/// Routes of every catalog resource plus `/openapi.json`.
pub fn catalog_router(catalog: &Catalog) -> Router {
    let mut router = Router::new();
    for store in catalog.stores() {
        info!(path = %store.spec().base_path(), "Registering catalog routes");
        router = router.merge(resource_router(store));
    }

    let doc = Arc::new(openapi::build_openapi(
        catalog.stores().map(|store| store.spec()),
    ));
    router.route(
        "/openapi.json",
        get(move || {
            let doc = Arc::clone(&doc);
            async move { Json(doc.as_ref().clone()) }
        }),
    )
}
