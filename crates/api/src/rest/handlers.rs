//! Request handlers of the REST transport.
//!
//! One [`RestResource`] is built per registered pipeline; it holds the compiled schemas of every
//! supported operation and is the axum state of that resource's routes.

use super::error::RestError;
use super::request::{RawQuery, SplitQuery, coerce, split_query};
use super::validation::SchemaValidator;
use crate::error::Result;
use crate::transport::PipelineRegistration;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use pipeline_api_pipeline::schema::ID_PROPERTY;
use pipeline_api_pipeline::{JsonObject, Operation, OperationSchemas, Pipeline, ReadResult};
use serde_json::Value;
use std::sync::Arc;

pub(crate) struct CompiledOperation {
    query: Option<SchemaValidator>,
    values: Option<SchemaValidator>,
    options: SchemaValidator,
}

impl CompiledOperation {
    fn compile(op: Operation, schemas: &OperationSchemas) -> Result<Self> {
        Ok(Self {
            query: schemas
                .query
                .as_ref()
                .map(|s| SchemaValidator::compile(&format!("{op} query"), s))
                .transpose()?,
            values: schemas
                .values
                .as_ref()
                .map(|s| SchemaValidator::compile(&format!("{op} values"), s))
                .transpose()?,
            options: SchemaValidator::compile(&format!("{op} options"), &schemas.options)?,
        })
    }

    fn split(&self, raw: RawQuery) -> SplitQuery {
        split_query(raw, self.query.as_ref(), &self.options)
    }

    fn check_query(&self, query: &JsonObject) -> std::result::Result<(), RestError> {
        match &self.query {
            Some(v) => check(v, "query", &Value::Object(query.clone())),
            None if query.is_empty() => Ok(()),
            None => Err(RestError::BadRequest(format!(
                "unexpected query parameters: {}",
                query.keys().cloned().collect::<Vec<_>>().join(", ")
            ))),
        }
    }

    fn check_values(&self, what: &str, values: &JsonObject) -> std::result::Result<(), RestError> {
        match &self.values {
            Some(v) => check(v, what, &Value::Object(values.clone())),
            None => Ok(()),
        }
    }

    fn check_options(&self, options: &JsonObject) -> std::result::Result<(), RestError> {
        check(&self.options, "options", &Value::Object(options.clone()))
    }
}

fn check(
    validator: &SchemaValidator,
    what: &str,
    instance: &Value,
) -> std::result::Result<(), RestError> {
    let violations = validator.violations(instance);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(RestError::Validation {
            message: format!("invalid {what}"),
            violations,
        })
    }
}

pub(crate) struct RestResource {
    name: String,
    pipeline: Arc<dyn Pipeline>,
    id: Option<SchemaValidator>,
    read: Option<CompiledOperation>,
    create: Option<CompiledOperation>,
    update: Option<CompiledOperation>,
    patch: Option<CompiledOperation>,
    delete: Option<CompiledOperation>,
}

impl RestResource {
    pub(crate) fn compile(registration: &PipelineRegistration) -> Result<Self> {
        let schemas = registration.pipeline().schemas();
        let compile = |op: Operation| {
            schemas
                .operation(op)
                .map(|s| CompiledOperation::compile(op, s))
                .transpose()
        };
        Ok(Self {
            name: registration.name().to_string(),
            pipeline: Arc::clone(registration.pipeline()),
            id: schemas
                .id_schema()
                .map(|s| SchemaValidator::compile("id", s))
                .transpose()?,
            read: compile(Operation::Read)?,
            create: compile(Operation::Create)?,
            update: compile(Operation::Update)?,
            patch: compile(Operation::Patch)?,
            delete: compile(Operation::Delete)?,
        })
    }

    pub(crate) fn supports(&self, op: Operation) -> bool {
        self.operation(op).is_ok()
    }

    fn operation(&self, op: Operation) -> std::result::Result<&CompiledOperation, RestError> {
        let compiled = match op {
            Operation::Read => self.read.as_ref(),
            Operation::Create => self.create.as_ref(),
            Operation::Update => self.update.as_ref(),
            Operation::Patch => self.patch.as_ref(),
            Operation::Delete => self.delete.as_ref(),
        };
        compiled.ok_or(RestError::Pipeline(
            pipeline_api_pipeline::PipelineError::Unsupported(op),
        ))
    }

    /// Path identifier, typed and validated against the model's `id` property.
    fn check_id(&self, id: &str) -> std::result::Result<Value, RestError> {
        let raw = Value::String(id.to_string());
        let Some(validator) = &self.id else {
            return Ok(raw);
        };
        let value = coerce(raw, Some(validator.schema()));
        check(validator, "id", &value)?;
        Ok(value)
    }

    fn not_found(&self, id: &str) -> RestError {
        RestError::NotFound {
            resource: self.name.clone(),
            id: id.to_string(),
        }
    }
}

fn object_body(body: Value) -> std::result::Result<JsonObject, RestError> {
    match body {
        Value::Object(o) => Ok(o),
        other => Err(RestError::BadRequest(format!(
            "request body must be a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub(crate) async fn find(
    State(resource): State<Arc<RestResource>>,
    Query(raw): Query<RawQuery>,
) -> std::result::Result<Json<ReadResult>, RestError> {
    let op = resource.operation(Operation::Read)?;
    let SplitQuery { query, options } = op.split(raw);
    op.check_query(&query)?;
    op.check_options(&options)?;
    Ok(Json(resource.pipeline.read(query, options).await?))
}

pub(crate) async fn get_one(
    State(resource): State<Arc<RestResource>>,
    Path(id): Path<String>,
    Query(raw): Query<RawQuery>,
) -> std::result::Result<Json<Value>, RestError> {
    let op = resource.operation(Operation::Read)?;
    let id_value = resource.check_id(&id)?;
    let SplitQuery { mut query, options } = op.split(raw);
    query.insert(ID_PROPERTY.to_string(), id_value);
    op.check_query(&query)?;
    op.check_options(&options)?;

    let result = resource.pipeline.read(query, options).await?;
    result
        .data
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| resource.not_found(&id))
}

pub(crate) async fn create(
    State(resource): State<Arc<RestResource>>,
    Query(raw): Query<RawQuery>,
    Json(body): Json<Value>,
) -> std::result::Result<(StatusCode, Json<Value>), RestError> {
    let op = resource.operation(Operation::Create)?;
    let SplitQuery { query, options } = op.split(raw);
    op.check_query(&query)?;
    op.check_options(&options)?;

    let (items, single) = match body {
        Value::Array(values) => (
            values
                .into_iter()
                .map(object_body)
                .collect::<std::result::Result<Vec<_>, _>>()?,
            false,
        ),
        other => (vec![object_body(other)?], true),
    };
    for (i, item) in items.iter().enumerate() {
        let what = if single {
            "values".to_string()
        } else {
            format!("values[{i}]")
        };
        op.check_values(&what, item)?;
    }

    let created = resource.pipeline.create(items, options).await?;
    let body = if single {
        created.into_iter().next().unwrap_or(Value::Null)
    } else {
        Value::Array(created)
    };
    Ok((StatusCode::CREATED, Json(body)))
}

pub(crate) async fn replace(
    State(resource): State<Arc<RestResource>>,
    Path(id): Path<String>,
    Query(raw): Query<RawQuery>,
    Json(body): Json<Value>,
) -> std::result::Result<Json<Value>, RestError> {
    let op = resource.operation(Operation::Update)?;
    let id_value = resource.check_id(&id)?;
    let SplitQuery { query, options } = op.split(raw);
    op.check_query(&query)?;
    op.check_options(&options)?;
    let values = object_body(body)?;
    op.check_values("values", &values)?;

    resource
        .pipeline
        .update(&id_value, values, options)
        .await?
        .map(Json)
        .ok_or_else(|| resource.not_found(&id))
}

pub(crate) async fn patch(
    State(resource): State<Arc<RestResource>>,
    Path(id): Path<String>,
    Query(raw): Query<RawQuery>,
    Json(body): Json<Value>,
) -> std::result::Result<Json<Value>, RestError> {
    let op = resource.operation(Operation::Patch)?;
    let id_value = resource.check_id(&id)?;
    let SplitQuery { mut query, options } = op.split(raw);
    query.insert(ID_PROPERTY.to_string(), id_value);
    op.check_query(&query)?;
    op.check_options(&options)?;
    let values = object_body(body)?;
    op.check_values("values", &values)?;

    let patched = resource.pipeline.patch(query, values, options).await?;
    patched
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| resource.not_found(&id))
}

pub(crate) async fn remove(
    State(resource): State<Arc<RestResource>>,
    Path(id): Path<String>,
    Query(raw): Query<RawQuery>,
) -> std::result::Result<Json<Value>, RestError> {
    let op = resource.operation(Operation::Delete)?;
    let id_value = resource.check_id(&id)?;
    let SplitQuery { mut query, options } = op.split(raw);
    query.insert(ID_PROPERTY.to_string(), id_value);
    op.check_query(&query)?;
    op.check_options(&options)?;

    let deleted = resource.pipeline.delete(query, options).await?;
    deleted
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| resource.not_found(&id))
}
