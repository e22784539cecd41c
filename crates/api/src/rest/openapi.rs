//! `OpenAPI` path items written by the REST transport.
//!
//! Query parameters are generated from the declared query and options schemas and always go
//! through [`filter_internal_parameters`] before reaching the document.

use crate::api::schema_component_name;
use crate::error::{ApiError, Result};
use crate::options::filter_internal_parameters;
use crate::transport::PipelineRegistration;
use openapiv3::{Parameter, PathItem, ReferenceOr};
use pipeline_api_pipeline::schema::ID_PROPERTY;
use pipeline_api_pipeline::{Operation, OperationSchemas, SchemaSet};
use serde_json::{Map, Value, json};

/// Path items of one resource: `(collection, item)`. `None` when no operation applies.
pub(crate) struct ResourcePaths {
    pub collection: Option<PathItem>,
    pub item: Option<PathItem>,
}

pub(crate) fn resource_paths(registration: &PipelineRegistration) -> Result<ResourcePaths> {
    let schemas = registration.pipeline().schemas();
    let singular = schema_component_name(registration.name());
    let plural = schema_component_name(registration.plural_name());
    let tag = registration.plural_name();
    let model_ref = json!({ "$ref": format!("#/components/schemas/{singular}") });

    let mut collection = Map::new();
    if let Some(read) = &schemas.read {
        collection.insert(
            "get".to_string(),
            json!({
                "operationId": format!("find{plural}"),
                "summary": format!("List {}", registration.plural_name()),
                "tags": [tag],
                "parameters": query_parameters(read, false)?,
                "responses": {
                    "200": json_response(
                        "Matching resources",
                        &json!({
                            "type": "object",
                            "properties": {
                                "data": { "type": "array", "items": model_ref },
                                "meta": { "type": "object" },
                            },
                        }),
                    ),
                    "400": error_response("Invalid query or options"),
                },
            }),
        );
    }
    if let Some(create) = &schemas.create {
        let values = create.values.clone().unwrap_or_else(|| model_ref.clone());
        collection.insert(
            "post".to_string(),
            json!({
                "operationId": format!("create{singular}"),
                "summary": format!("Create one or many {}", registration.plural_name()),
                "tags": [tag],
                "parameters": query_parameters(create, false)?,
                "requestBody": {
                    "required": true,
                    "content": {
                        "application/json": {
                            "schema": { "oneOf": [values, { "type": "array", "items": values }] },
                        },
                    },
                },
                "responses": {
                    "201": json_response(
                        "Created resources",
                        &json!({ "oneOf": [model_ref, { "type": "array", "items": model_ref }] }),
                    ),
                    "400": error_response("Invalid values or options"),
                    "409": error_response("Conflicting resource"),
                },
            }),
        );
    }

    let mut item = Map::new();
    let item_ops = [
        (Operation::Read, "get", "get", "Get"),
        (Operation::Update, "put", "replace", "Replace"),
        (Operation::Patch, "patch", "patch", "Patch"),
        (Operation::Delete, "delete", "delete", "Delete"),
    ];
    for (op, method, verb, summary_verb) in item_ops {
        let Some(op_schemas) = schemas.operation(op) else {
            continue;
        };
        let mut operation = json!({
            "operationId": format!("{verb}{singular}"),
            "summary": format!("{summary_verb} one {}", registration.name()),
            "tags": [tag],
            "parameters": query_parameters(op_schemas, true)?,
            "responses": {
                "200": json_response("The resource", &model_ref),
                "400": error_response("Invalid identifier, values or options"),
                "404": error_response("No such resource"),
            },
        });
        if let Some(values) = &op_schemas.values {
            operation["requestBody"] = json!({
                "required": true,
                "content": { "application/json": { "schema": values } },
            });
        }
        item.insert(method.to_string(), operation);
    }
    if !item.is_empty() {
        item.insert(
            "parameters".to_string(),
            json!([{
                "in": "path",
                "name": ID_PROPERTY,
                "required": true,
                "schema": id_schema(schemas),
            }]),
        );
    }

    Ok(ResourcePaths {
        collection: to_path_item(registration, collection)?,
        item: to_path_item(registration, item)?,
    })
}

fn id_schema(schemas: &SchemaSet) -> Value {
    schemas
        .id_schema()
        .cloned()
        .unwrap_or_else(|| json!({ "type": "string" }))
}

/// Query parameters of one operation, internal options excluded.
fn query_parameters(schemas: &OperationSchemas, item_route: bool) -> Result<Value> {
    let mut declared = Vec::new();
    if let Some(props) = schemas
        .query
        .as_ref()
        .and_then(|q| q.get("properties"))
        .and_then(Value::as_object)
    {
        for (name, schema) in props {
            if item_route && name == ID_PROPERTY {
                continue;
            }
            declared.push(parameter(name, schema)?);
        }
    }
    if let Some(props) = schemas.options.get("properties").and_then(Value::as_object) {
        for (name, schema) in props {
            declared.push(parameter(name, schema)?);
        }
    }
    Ok(serde_json::to_value(filter_internal_parameters(&declared))?)
}

fn parameter(name: &str, schema: &Value) -> Result<ReferenceOr<Parameter>> {
    serde_json::from_value(json!({
        "in": "query",
        "name": name,
        "required": false,
        "schema": schema,
    }))
    .map_err(|e| ApiError::Schema(format!("query parameter '{name}': {e}")))
}

fn json_response(description: &str, schema: &Value) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } },
    })
}

fn error_response(description: &str) -> Value {
    json_response(
        description,
        &json!({
            "type": "object",
            "properties": {
                "code": { "type": "string" },
                "message": { "type": "string" },
            },
        }),
    )
}

fn to_path_item(
    registration: &PipelineRegistration,
    operations: Map<String, Value>,
) -> Result<Option<PathItem>> {
    if operations.is_empty() {
        return Ok(None);
    }
    serde_json::from_value(Value::Object(operations))
        .map(Some)
        .map_err(|e| {
            ApiError::Schema(format!(
                "cannot describe resource '{}' in OpenAPI: {e}",
                registration.name()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_api_pipeline::MemoryPipeline;
    use std::sync::Arc;

    fn registration(schemas: SchemaSet) -> PipelineRegistration {
        PipelineRegistration::new(
            Arc::new(MemoryPipeline::with_schemas(schemas)),
            "test",
            "tests",
        )
    }

    fn model() -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "maxLength": 2 },
                "value": { "type": "string" },
            },
            "required": ["id", "value"],
        })
    }

    fn param_names(op: &Value) -> Vec<String> {
        op["parameters"]
            .as_array()
            .map(|ps| {
                ps.iter()
                    .filter_map(|p| p["name"].as_str().map(str::to_string))
                    .collect::<Vec<_>>()
            })
            .map(|mut names| {
                names.sort();
                names
            })
            .unwrap_or_default()
    }

    #[test]
    fn describes_every_supported_operation() {
        let paths = resource_paths(&registration(SchemaSet::from_model(model()))).expect("paths");
        let collection = serde_json::to_value(paths.collection.expect("collection")).expect("json");
        let item = serde_json::to_value(paths.item.expect("item")).expect("json");

        assert_eq!(collection["get"]["operationId"], json!("findTests"));
        assert_eq!(collection["post"]["operationId"], json!("createTest"));
        assert_eq!(item["get"]["operationId"], json!("getTest"));
        assert_eq!(item["put"]["operationId"], json!("replaceTest"));
        assert_eq!(item["patch"]["operationId"], json!("patchTest"));
        assert_eq!(item["delete"]["operationId"], json!("deleteTest"));
        assert_eq!(item["parameters"][0]["in"], json!("path"));
        assert_eq!(item["parameters"][0]["schema"]["maxLength"], json!(2));

        assert_eq!(
            param_names(&collection["get"]),
            vec!["id", "limit", "offset", "value"]
        );
        assert_eq!(param_names(&item["get"]), vec!["limit", "offset", "value"]);
    }

    #[test]
    fn internal_options_are_not_documented() {
        let schemas = SchemaSet::from_model(model()).with_options(
            Operation::Read,
            json!({
                "type": "object",
                "properties": {
                    "okOption": { "type": "integer" },
                    "_internalOption": { "type": "string" },
                },
            }),
        );
        let paths = resource_paths(&registration(schemas)).expect("paths");
        let collection = serde_json::to_value(paths.collection.expect("collection")).expect("json");

        let names = param_names(&collection["get"]);
        assert!(names.contains(&"okOption".to_string()));
        assert!(!names.iter().any(|n| n.starts_with('_')));
    }

    #[test]
    fn unsupported_operations_are_omitted() {
        let schemas = SchemaSet::from_model(model())
            .without(Operation::Create)
            .without(Operation::Update)
            .without(Operation::Patch)
            .without(Operation::Delete)
            .without(Operation::Read);
        let paths = resource_paths(&registration(schemas)).expect("paths");
        assert!(paths.collection.is_none());
        assert!(paths.item.is_none());
    }
}
