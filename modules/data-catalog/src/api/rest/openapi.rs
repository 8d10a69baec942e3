//! OpenAPI document for the catalog routes, generated from the resource registry.

use utoipa::openapi::{
    OpenApi, OpenApiBuilder, RefOr, Required,
    content::ContentBuilder,
    info::InfoBuilder,
    path::{HttpMethod, OperationBuilder, ParameterBuilder, ParameterIn, PathItemBuilder, PathsBuilder},
    request_body::RequestBodyBuilder,
    response::{Response, ResponseBuilder},
    schema::{ArrayBuilder, ObjectBuilder, Schema, SchemaType, Type},
};

use catalog_errors::APPLICATION_PROBLEM_JSON;

use crate::domain::document::{FROM, ID, KEY, REV, TO};
use crate::domain::resource::ResourceSpec;
use crate::domain::schema::{AttrType, Operation};

const APPLICATION_JSON: &str = "application/json";

fn typed(ty: Type) -> Schema {
    Schema::Object(ObjectBuilder::new().schema_type(SchemaType::Type(ty)).build())
}

fn attr_schema(ty: AttrType) -> Schema {
    match ty {
        AttrType::String => typed(Type::String),
        AttrType::Number => typed(Type::Number),
        AttrType::Integer => typed(Type::Integer),
        AttrType::Boolean => typed(Type::Boolean),
        AttrType::Object => typed(Type::Object),
        AttrType::Array => typed(Type::Array),
    }
}

/// Object schema of one resource kind, either as returned by the store or as
/// accepted by one of the writing operations.
fn document_schema(spec: &ResourceSpec, shape: Option<Operation>) -> Schema {
    let mut obj = ObjectBuilder::new().schema_type(SchemaType::Type(Type::Object));
    match shape {
        None => {
            for system in [KEY, ID, REV] {
                obj = obj.property(system, typed(Type::String)).required(system);
            }
        }
        Some(Operation::Create) => obj = obj.property(KEY, typed(Type::String)),
        Some(_) => {}
    }
    if spec.is_edge() {
        let endpoints_required = matches!(shape, None | Some(Operation::Create));
        for endpoint in [FROM, TO] {
            obj = obj.property(endpoint, typed(Type::String));
            if endpoints_required {
                obj = obj.required(endpoint);
            }
        }
    }
    for rule in spec.schema.attributes {
        obj = obj.property(rule.name, attr_schema(rule.ty));
        if rule.required && shape != Some(Operation::Update) {
            obj = obj.required(rule.name);
        }
    }
    Schema::Object(obj.build())
}

fn json_response(description: &str, schema: Schema) -> Response {
    ResponseBuilder::new()
        .description(description)
        .content(
            APPLICATION_JSON,
            ContentBuilder::new().schema(Some(schema)).build(),
        )
        .build()
}

fn problem_response(description: &str) -> Response {
    ResponseBuilder::new()
        .description(description)
        .content(
            APPLICATION_PROBLEM_JSON,
            ContentBuilder::new().schema(Some(typed(Type::Object))).build(),
        )
        .build()
}

fn json_body(
    spec: &ResourceSpec,
    op: Operation,
    description: &str,
) -> utoipa::openapi::request_body::RequestBody {
    RequestBodyBuilder::new()
        .description(Some(description))
        .content(
            APPLICATION_JSON,
            ContentBuilder::new()
                .schema(Some(document_schema(spec, Some(op))))
                .build(),
        )
        .required(Some(Required::True))
        .build()
}

fn operation(spec: &ResourceSpec, id: &str, summary: String, description: String) -> OperationBuilder {
    OperationBuilder::new()
        .operation_id(Some(format!("{}.{id}", spec.segment)))
        .summary(Some(summary))
        .description(Some(description))
        .tag(spec.tag)
}

fn key_param(spec: &ResourceSpec) -> utoipa::openapi::path::Parameter {
    ParameterBuilder::new()
        .name("key")
        .parameter_in(ParameterIn::Path)
        .required(Required::True)
        .description(Some(format!("Key of the {}", spec.singular)))
        .schema(Some(typed(Type::String)))
        .build()
}

fn if_match_param() -> utoipa::openapi::path::Parameter {
    ParameterBuilder::new()
        .name("If-Match")
        .parameter_in(ParameterIn::Header)
        .required(Required::False)
        .description(Some("Expected current revision of the document"))
        .schema(Some(typed(Type::String)))
        .build()
}

fn collection_item(spec: &ResourceSpec) -> utoipa::openapi::path::PathItem {
    let list = operation(
        spec,
        "list",
        format!("List {}", spec.plural),
        format!("Returns every {} in the catalog, unordered.", spec.singular),
    )
    .response(
        "200",
        json_response(
            "All documents",
            Schema::Array(
                ArrayBuilder::new()
                    .items(RefOr::T(document_schema(spec, None)))
                    .build(),
            ),
        ),
    )
    .response("500", problem_response("Storage failure"));

    let create_description = if spec.is_edge() {
        format!(
            "Creates a {} between the documents named by `_from` and `_to`. The endpoints are not checked for existence.",
            spec.singular
        )
    } else {
        format!(
            "Creates a {}. A key is generated unless `_key` is supplied.",
            spec.singular
        )
    };
    let create = operation(
        spec,
        "create",
        format!("Create a {}", spec.singular),
        create_description,
    )
    .request_body(Some(json_body(spec, Operation::Create, "Document to store")))
    .response(
        "201",
        json_response("Created document with its meta attributes", document_schema(spec, None)),
    )
    .response("400", problem_response("Malformed JSON body"))
    .response("409", problem_response("A document with this key already exists"))
    .response("422", problem_response("Body violates the attribute contract"));

    PathItemBuilder::new()
        .operation(HttpMethod::Get, list.build())
        .operation(HttpMethod::Post, create.build())
        .build()
}

fn document_item(spec: &ResourceSpec) -> utoipa::openapi::path::PathItem {
    let stored = || document_schema(spec, None);

    let get = operation(
        spec,
        "get",
        format!("Get a {}", spec.singular),
        format!("Returns the {} stored under `key`.", spec.singular),
    )
    .parameter(key_param(spec))
    .response("200", json_response("Stored document", stored()))
    .response("404", problem_response("No document with this key"));

    let replace = operation(
        spec,
        "replace",
        format!("Replace a {}", spec.singular),
        "Overwrites every attribute of the document and issues a new revision.".to_owned(),
    )
    .parameter(key_param(spec))
    .parameter(if_match_param())
    .request_body(Some(json_body(spec, Operation::Replace, "Full replacement document")))
    .response("200", json_response("Replaced document", stored()))
    .response("404", problem_response("No document with this key"))
    .response("409", problem_response("Revision precondition failed"))
    .response("422", problem_response("Body violates the attribute contract"));

    let update = operation(
        spec,
        "update",
        format!("Update a {}", spec.singular),
        "Merges the top-level attributes of the body into the document and returns the result."
            .to_owned(),
    )
    .parameter(key_param(spec))
    .parameter(if_match_param())
    .request_body(Some(json_body(spec, Operation::Update, "Attributes to merge")))
    .response("200", json_response("Merged document", stored()))
    .response("404", problem_response("No document with this key"))
    .response("409", problem_response("Revision precondition failed"))
    .response("422", problem_response("Body violates the attribute contract"));

    let delete = operation(
        spec,
        "delete",
        format!("Delete a {}", spec.singular),
        format!("Removes the {}. The key may be reused afterwards.", spec.singular),
    )
    .parameter(key_param(spec))
    .response("200", Response::new("Document removed"))
    .response("404", problem_response("No document with this key"));

    PathItemBuilder::new()
        .operation(HttpMethod::Get, get.build())
        .operation(HttpMethod::Put, replace.build())
        .operation(HttpMethod::Patch, update.build())
        .operation(HttpMethod::Delete, delete.build())
        .build()
}

/// Builds the document for the given resource kinds.
pub fn build_openapi<'a>(specs: impl IntoIterator<Item = &'a ResourceSpec>) -> OpenApi {
    let mut paths = PathsBuilder::new();
    let mut op_count = 0;
    for spec in specs {
        let base = spec.base_path();
        paths = paths
            .path(base.clone(), collection_item(spec))
            .path(format!("{base}/{{key}}"), document_item(spec));
        op_count += 6;
    }
    tracing::debug!(op_count, "Built catalog OpenAPI document");

    let info = InfoBuilder::new()
        .title("Data Catalog API")
        .version(env!("CARGO_PKG_VERSION"))
        .description(Some(
            "CRUD access to survey areas, datasets, datafiles and their relationships",
        ))
        .build();

    OpenApiBuilder::new().info(info).paths(paths.build()).build()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::resource::ResourceKind;

    #[test]
    fn every_route_is_documented() {
        let doc = build_openapi(ResourceKind::ALL.iter().map(|k| k.spec()));
        let json = serde_json::to_value(&doc).unwrap();
        let paths = json["paths"].as_object().unwrap();
        assert_eq!(paths.len(), 10);

        let item = &paths["/contains/{key}"];
        for method in ["get", "put", "patch", "delete"] {
            assert!(item[method]["summary"].is_string(), "{method}");
            assert!(item[method]["description"].is_string(), "{method}");
        }
        assert!(paths["/surveyarea"]["post"]["responses"]["201"].is_object());
    }

    #[test]
    fn edge_schemas_require_endpoints() {
        let doc = build_openapi([ResourceKind::Produces.spec()]);
        let json = serde_json::to_value(&doc).unwrap();
        let required = &json["paths"]["/produces"]["post"]["requestBody"]["content"]
            ["application/json"]["schema"]["required"];
        let required: Vec<_> = required.as_array().unwrap().iter().collect();
        assert!(required.contains(&&serde_json::json!("_from")));
        assert!(required.contains(&&serde_json::json!("_to")));

        let patch = &json["paths"]["/produces/{key}"]["patch"]["requestBody"]["content"]
            ["application/json"]["schema"];
        assert!(patch["properties"]["_from"].is_object());
        assert!(patch.get("required").is_none_or(|r| r.as_array().is_some_and(Vec::is_empty)));
    }

    #[test]
    fn list_response_is_an_array_of_stored_documents() {
        let doc = build_openapi([ResourceKind::Dataset.spec()]);
        let json = serde_json::to_value(&doc).unwrap();
        let schema = &json["paths"]["/dataset"]["get"]["responses"]["200"]["content"]
            ["application/json"]["schema"];
        assert_eq!(schema["type"], "array");

        let required: Vec<_> = schema["items"]["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(serde_json::Value::as_str)
            .collect();
        for meta in [KEY, ID, REV] {
            assert!(required.contains(&meta), "{meta}");
        }
    }
}
