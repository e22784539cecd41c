//! Pipeline contract shared by `pipeline-api` transports.
//!
//! A pipeline is a CRUD-style resource handler that declares JSON schemas for the inputs of each
//! operation it supports. Transports never look inside a pipeline: they route requests, validate
//! inputs against the declared schemas and forward the call.
//!
//! This crate intentionally contains **no** HTTP or `OpenAPI` logic.

pub mod error;
pub mod memory;
pub mod schema;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use error::{PipelineError, Result};
pub use memory::MemoryPipeline;
pub use schema::{Operation, OperationSchemas, SchemaSet};

/// String-keyed JSON object used for queries, values and options.
pub type JsonObject = serde_json::Map<String, Value>;

/// Result of a `read` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadResult {
    pub data: Vec<Value>,
    #[serde(default)]
    pub meta: JsonObject,
}

/// A CRUD-style resource handler.
///
/// Operations a pipeline does not implement keep the default body, which fails with
/// [`PipelineError::Unsupported`]. Transports only expose the operations listed by
/// [`SchemaSet::operations`], so the default is reached only through direct calls.
#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Declared validation schemas; also the pipeline's capability set.
    fn schemas(&self) -> &SchemaSet;

    async fn read(&self, _query: JsonObject, _options: JsonObject) -> Result<ReadResult> {
        Err(PipelineError::Unsupported(Operation::Read))
    }

    async fn create(&self, _values: Vec<JsonObject>, _options: JsonObject) -> Result<Vec<Value>> {
        Err(PipelineError::Unsupported(Operation::Create))
    }

    /// Replace the resource identified by `id` (typed like the model's `id` property).
    /// `Ok(None)` when it does not exist.
    async fn update(
        &self,
        _id: &Value,
        _values: JsonObject,
        _options: JsonObject,
    ) -> Result<Option<Value>> {
        Err(PipelineError::Unsupported(Operation::Update))
    }

    async fn patch(
        &self,
        _query: JsonObject,
        _values: JsonObject,
        _options: JsonObject,
    ) -> Result<Vec<Value>> {
        Err(PipelineError::Unsupported(Operation::Patch))
    }

    async fn delete(&self, _query: JsonObject, _options: JsonObject) -> Result<Vec<Value>> {
        Err(PipelineError::Unsupported(Operation::Delete))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct ReadOnly {
        schemas: SchemaSet,
    }

    #[async_trait]
    impl Pipeline for ReadOnly {
        fn schemas(&self) -> &SchemaSet {
            &self.schemas
        }

        async fn read(&self, _query: JsonObject, _options: JsonObject) -> Result<ReadResult> {
            Ok(ReadResult {
                data: vec![json!({"id": "a"})],
                meta: JsonObject::new(),
            })
        }
    }

    #[tokio::test]
    async fn unimplemented_operations_report_unsupported() {
        let p = ReadOnly {
            schemas: SchemaSet::from_model(json!({"type": "object", "properties": {}})),
        };

        let read = p.read(JsonObject::new(), JsonObject::new()).await.expect("read");
        assert_eq!(read.data.len(), 1);

        let err = p
            .delete(JsonObject::new(), JsonObject::new())
            .await
            .expect_err("delete is not implemented");
        assert!(matches!(err, PipelineError::Unsupported(Operation::Delete)));
    }
}
