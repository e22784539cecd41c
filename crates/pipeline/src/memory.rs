//! In-memory pipeline.
//!
//! Backs the demo resources of the server binary and the transport tests. Query semantics:
//! every query key must match; a scalar matches by equality, an array matches when the item's
//! value equals any element.

use crate::error::{PipelineError, Result};
use crate::schema::{ID_PROPERTY, SchemaSet};
use crate::{JsonObject, Pipeline, ReadResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Value, json};

pub struct MemoryPipeline {
    schemas: SchemaSet,
    items: RwLock<Vec<JsonObject>>,
}

impl MemoryPipeline {
    /// Pipeline with the default schemas derived from `model`.
    #[must_use]
    pub fn new(model: Value) -> Self {
        Self::with_schemas(SchemaSet::from_model(model))
    }

    #[must_use]
    pub fn with_schemas(schemas: SchemaSet) -> Self {
        Self {
            schemas,
            items: RwLock::new(Vec::new()),
        }
    }

    /// Seed the store. Items are stored as given (no id generation).
    #[must_use]
    pub fn with_items(self, items: impl IntoIterator<Item = JsonObject>) -> Self {
        self.items.write().extend(items);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

fn matches(item: &JsonObject, query: &JsonObject) -> bool {
    query.iter().all(|(k, q)| {
        let v = item.get(k);
        match q {
            Value::Array(alternatives) => alternatives.iter().any(|a| Some(a) == v),
            other => Some(other) == v,
        }
    })
}

fn option_usize(options: &JsonObject, key: &str) -> Option<usize> {
    options
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
}

#[async_trait]
impl Pipeline for MemoryPipeline {
    fn schemas(&self) -> &SchemaSet {
        &self.schemas
    }

    async fn read(&self, query: JsonObject, options: JsonObject) -> Result<ReadResult> {
        let items = self.items.read();
        let matched: Vec<&JsonObject> = items.iter().filter(|i| matches(i, &query)).collect();
        let total = matched.len();

        let offset = option_usize(&options, "offset").unwrap_or(0);
        let limit = option_usize(&options, "limit").unwrap_or(usize::MAX);
        let data = matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|i| Value::Object(i.clone()))
            .collect();

        let mut meta = JsonObject::new();
        meta.insert("total".to_string(), json!(total));
        Ok(ReadResult { data, meta })
    }

    async fn create(&self, values: Vec<JsonObject>, _options: JsonObject) -> Result<Vec<Value>> {
        let generates_ids = self.schemas.generates_ids();
        let mut items = self.items.write();
        let mut created = Vec::with_capacity(values.len());
        for mut v in values {
            let id = match v.get(ID_PROPERTY) {
                Some(id) => id.clone(),
                None if !generates_ids => {
                    return Err(PipelineError::Validation(format!(
                        "'{ID_PROPERTY}' is required: generated ids do not fit its schema"
                    )));
                }
                None => {
                    let id = Value::String(uuid::Uuid::new_v4().to_string());
                    v.insert(ID_PROPERTY.to_string(), id.clone());
                    id
                }
            };
            if items.iter().any(|i| i.get(ID_PROPERTY) == Some(&id)) {
                return Err(PipelineError::Conflict(format!("id {id} already exists")));
            }
            created.push(Value::Object(v.clone()));
            items.push(v);
        }
        tracing::debug!(count = created.len(), "memory pipeline created items");
        Ok(created)
    }

    async fn update(
        &self,
        id: &Value,
        mut values: JsonObject,
        _options: JsonObject,
    ) -> Result<Option<Value>> {
        let mut items = self.items.write();
        let Some(item) = items.iter_mut().find(|i| i.get(ID_PROPERTY) == Some(id)) else {
            return Ok(None);
        };
        if let Some(existing_id) = item.get(ID_PROPERTY) {
            values.insert(ID_PROPERTY.to_string(), existing_id.clone());
        }
        *item = values;
        Ok(Some(Value::Object(item.clone())))
    }

    async fn patch(
        &self,
        query: JsonObject,
        values: JsonObject,
        _options: JsonObject,
    ) -> Result<Vec<Value>> {
        let mut items = self.items.write();
        let mut patched = Vec::new();
        for item in items.iter_mut().filter(|i| matches(i, &query)) {
            for (k, v) in &values {
                if k != ID_PROPERTY {
                    item.insert(k.clone(), v.clone());
                }
            }
            patched.push(Value::Object(item.clone()));
        }
        Ok(patched)
    }

    async fn delete(&self, query: JsonObject, _options: JsonObject) -> Result<Vec<Value>> {
        let mut items = self.items.write();
        let mut deleted = Vec::new();
        items.retain(|i| {
            if matches(i, &query) {
                deleted.push(Value::Object(i.clone()));
                false
            } else {
                true
            }
        });
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(v: Value) -> JsonObject {
        match v {
            Value::Object(o) => o,
            other => panic!("expected object, got {other}"),
        }
    }

    fn pipeline() -> MemoryPipeline {
        MemoryPipeline::new(json!({
            "type": "object",
            "properties": {
                "id": { "type": "string" },
                "color": { "type": "string" },
            },
        }))
        .with_items([
            obj(json!({"id": "a", "color": "red"})),
            obj(json!({"id": "b", "color": "blue"})),
            obj(json!({"id": "c", "color": "red"})),
        ])
    }

    #[tokio::test]
    async fn read_filters_and_pages() {
        let p = pipeline();
        let res = p
            .read(obj(json!({"color": "red"})), obj(json!({"offset": 1})))
            .await
            .expect("read");
        assert_eq!(res.data, vec![json!({"id": "c", "color": "red"})]);
        assert_eq!(res.meta.get("total"), Some(&json!(2)));

        let res = p
            .read(obj(json!({"id": ["a", "b"]})), obj(json!({"limit": 1})))
            .await
            .expect("read");
        assert_eq!(res.data, vec![json!({"id": "a", "color": "red"})]);
        assert_eq!(res.meta.get("total"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn create_generates_ids_and_rejects_duplicates() {
        let p = pipeline();
        let created = p
            .create(vec![obj(json!({"color": "green"}))], JsonObject::new())
            .await
            .expect("create");
        assert!(created[0].get("id").and_then(Value::as_str).is_some());
        assert_eq!(p.len(), 4);

        let err = p
            .create(vec![obj(json!({"id": "a"}))], JsonObject::new())
            .await
            .expect_err("duplicate id");
        assert!(matches!(err, PipelineError::Conflict(_)));
    }

    #[tokio::test]
    async fn ids_are_not_generated_when_the_schema_cannot_hold_them() {
        let p = MemoryPipeline::new(json!({
            "type": "object",
            "properties": {
                "id": { "type": "integer" },
                "color": { "type": "string" },
            },
        }));
        let err = p
            .create(vec![obj(json!({"color": "green"}))], JsonObject::new())
            .await
            .expect_err("integer ids are not generated");
        assert!(matches!(err, PipelineError::Validation(_)));
        assert!(p.is_empty());

        p.create(vec![obj(json!({"id": 7, "color": "green"}))], JsonObject::new())
            .await
            .expect("explicit id");
        let updated = p
            .update(&json!(7), obj(json!({"color": "blue"})), JsonObject::new())
            .await
            .expect("update");
        assert_eq!(updated, Some(json!({"id": 7, "color": "blue"})));
    }

    #[tokio::test]
    async fn update_patch_delete() {
        let p = pipeline();

        let updated = p
            .update(&json!("b"), obj(json!({"color": "black"})), JsonObject::new())
            .await
            .expect("update");
        assert_eq!(updated, Some(json!({"id": "b", "color": "black"})));
        assert_eq!(
            p.update(&json!("zz"), JsonObject::new(), JsonObject::new())
                .await
                .expect("update missing"),
            None
        );

        let patched = p
            .patch(
                obj(json!({"color": "red"})),
                obj(json!({"color": "pink", "id": "ignored"})),
                JsonObject::new(),
            )
            .await
            .expect("patch");
        assert_eq!(patched.len(), 2);
        assert_eq!(patched[0], json!({"id": "a", "color": "pink"}));

        let deleted = p
            .delete(obj(json!({"id": "a"})), JsonObject::new())
            .await
            .expect("delete");
        assert_eq!(deleted, vec![json!({"id": "a", "color": "pink"})]);
        assert_eq!(p.len(), 2);
    }
}
