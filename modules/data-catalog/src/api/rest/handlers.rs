use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header::{ETAG, IF_MATCH, LOCATION};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use super::error::{ApiResult, domain_error_to_problem, malformed_body_problem, validation_problem};
use crate::domain::document::Document;
use crate::domain::schema::{self, Operation};
use crate::domain::store::DocumentStore;

/// Router state of one resource kind.
#[derive(Clone)]
pub struct ResourceState {
    pub store: Arc<dyn DocumentStore>,
}

impl ResourceState {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn validate(&self, op: Operation, body: Value, instance: &str) -> ApiResult<Document> {
        self.store
            .spec()
            .schema
            .validate(op, body)
            .map_err(|violations| validation_problem(violations, instance))
    }
}

pub async fn list(State(state): State<ResourceState>, uri: Uri) -> ApiResult<Json<Vec<Document>>> {
    let docs = state
        .store
        .list_all()
        .await
        .map_err(|e| domain_error_to_problem(&e, uri.path()))?;
    Ok(Json(docs))
}

pub async fn create(
    State(state): State<ResourceState>,
    uri: Uri,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let instance = uri.path();
    let body = read_body(body, instance)?;
    let doc = state.validate(Operation::Create, body, instance)?;

    let created = state
        .store
        .create(doc)
        .await
        .map_err(|e| domain_error_to_problem(&e, instance))?;
    let location = created.key().map(|key| {
        format!(
            "{}/{}",
            instance.trim_end_matches('/'),
            urlencoding::encode(key)
        )
    });
    Ok(document_response(StatusCode::CREATED, created, location))
}

pub async fn get(
    State(state): State<ResourceState>,
    Path(key): Path<String>,
    uri: Uri,
) -> ApiResult<Response> {
    let instance = uri.path();
    check_key(&key, instance)?;
    let doc = state
        .store
        .get_by_key(&key)
        .await
        .map_err(|e| domain_error_to_problem(&e, instance))?;
    Ok(document_response(StatusCode::OK, doc, None))
}

pub async fn replace(
    State(state): State<ResourceState>,
    Path(key): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let instance = uri.path();
    check_key(&key, instance)?;
    let body = read_body(body, instance)?;
    let doc = state.validate(Operation::Replace, body, instance)?;

    let replaced = state
        .store
        .replace(&key, doc, precondition(&headers).as_deref())
        .await
        .map_err(|e| domain_error_to_problem(&e, instance))?;
    Ok(document_response(StatusCode::OK, replaced, None))
}

pub async fn update(
    State(state): State<ResourceState>,
    Path(key): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Response> {
    let instance = uri.path();
    check_key(&key, instance)?;
    let body = read_body(body, instance)?;
    let patch = state.validate(Operation::Update, body, instance)?;

    let updated = state
        .store
        .update(&key, patch, precondition(&headers).as_deref())
        .await
        .map_err(|e| domain_error_to_problem(&e, instance))?;
    Ok(document_response(StatusCode::OK, updated, None))
}

pub async fn delete(
    State(state): State<ResourceState>,
    Path(key): Path<String>,
    uri: Uri,
) -> ApiResult<StatusCode> {
    let instance = uri.path();
    check_key(&key, instance)?;
    state
        .store
        .delete(&key)
        .await
        .map_err(|e| domain_error_to_problem(&e, instance))?;
    Ok(StatusCode::OK)
}

fn read_body(body: Result<Json<Value>, JsonRejection>, instance: &str) -> ApiResult<Value> {
    body.map(|Json(value)| value)
        .map_err(|rejection| malformed_body_problem(rejection.body_text(), instance))
}

fn check_key(key: &str, instance: &str) -> ApiResult<()> {
    schema::validate_key(key).map_err(|violation| validation_problem(vec![violation], instance))
}

/// Revision expected by an `If-Match` header. Quotes and a weak prefix are
/// accepted; `*` means no precondition.
fn precondition(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(IF_MATCH)?.to_str().ok()?.trim();
    let raw = raw.strip_prefix("W/").unwrap_or(raw);
    let rev = raw
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .unwrap_or(raw);
    if rev.is_empty() || rev == "*" {
        None
    } else {
        Some(rev.to_owned())
    }
}

fn document_response(status: StatusCode, doc: Document, location: Option<String>) -> Response {
    let mut headers = HeaderMap::new();
    if let Some(rev) = doc.rev()
        && let Ok(etag) = HeaderValue::from_str(&format!("\"{rev}\""))
    {
        headers.insert(ETAG, etag);
    }
    if let Some(location) = location
        && let Ok(location) = HeaderValue::from_str(&location)
    {
        headers.insert(LOCATION, location);
    }
    (status, headers, Json(doc)).into_response()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::resource::SURVEY_AREA;
    use crate::domain::store::ResourceStore;
    use crate::infra::storage::InMemoryEngine;
    use axum::Router;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::{get as get_route, post};
    use tower::ServiceExt as _;

    fn if_match(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(IF_MATCH, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn precondition_parsing() {
        assert_eq!(precondition(&HeaderMap::new()), None);
        assert_eq!(precondition(&if_match("\"_a1\"")).as_deref(), Some("_a1"));
        assert_eq!(precondition(&if_match("_a1")).as_deref(), Some("_a1"));
        assert_eq!(precondition(&if_match("W/\"_a1\"")).as_deref(), Some("_a1"));
        assert_eq!(precondition(&if_match("*")), None);
    }

    async fn create_test_router() -> Router {
        use crate::domain::engine::DocumentEngine;

        let engine = Arc::new(InMemoryEngine::new());
        engine
            .ensure_collection(SURVEY_AREA.collection, SURVEY_AREA.collection_kind())
            .await
            .unwrap();
        let state = ResourceState::new(Arc::new(ResourceStore::new(&SURVEY_AREA, engine)));
        Router::new()
            .route("/surveyarea", post(create).get(list))
            .route("/surveyarea/{key}", get_route(get).delete(delete))
            .with_state(state)
    }

    #[tokio::test]
    async fn test_create_handler_sets_location_and_etag() {
        let app = create_test_router().await;

        let request = Request::builder()
            .method("POST")
            .uri("/surveyarea")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"_key":"sa1","name":"Basin-7"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[LOCATION], "/surveyarea/sa1");
        assert!(response.headers().contains_key(ETAG));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["_id"], "SurveyArea/sa1");
        assert_eq!(json["name"], "Basin-7");
    }

    #[tokio::test]
    async fn test_location_escapes_reserved_key_characters() {
        let app = create_test_router().await;

        let request = Request::builder()
            .method("POST")
            .uri("/surveyarea")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"_key":"a%b'c","name":"Basin-7"}"#))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let location = response.headers()[LOCATION].to_str().unwrap().to_owned();
        assert_eq!(location, "/surveyarea/a%25b%27c");

        let request = Request::builder()
            .method("GET")
            .uri(location)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["_key"], "a%b'c");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = create_test_router().await;

        let request = Request::builder()
            .method("POST")
            .uri("/surveyarea")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_path_key_is_unprocessable() {
        let app = create_test_router().await;

        let request = Request::builder()
            .method("GET")
            .uri("/surveyarea/a%20b")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_delete_returns_empty_ok() {
        let app = create_test_router().await;

        let create_req = Request::builder()
            .method("POST")
            .uri("/surveyarea")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"_key":"sa1","name":"Basin-7"}"#))
            .unwrap();
        app.clone().oneshot(create_req).await.unwrap();

        let request = Request::builder()
            .method("DELETE")
            .uri("/surveyarea/sa1")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.is_empty());
    }
}
