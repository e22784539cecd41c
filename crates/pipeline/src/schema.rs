//! Declared validation schemas and the capability set they imply.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

/// Name of the model property that identifies a single resource.
pub const ID_PROPERTY: &str = "id";

/// A CRUD operation a pipeline may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Create,
    Update,
    Patch,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Read,
        Operation::Create,
        Operation::Update,
        Operation::Patch,
        Operation::Delete,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Patch => "patch",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input schemas of one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationSchemas {
    /// Schema of the query selecting resources (read/patch/delete).
    pub query: Option<Value>,
    /// Schema of the values written (create/update/patch). For create this is the schema of a
    /// single item.
    pub values: Option<Value>,
    /// Schema of the options object. Always present, possibly an empty object schema.
    pub options: Value,
}

/// JSON schemas declared by a pipeline.
///
/// An operation is part of the pipeline's capability set iff its entry is `Some`.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaSet {
    pub model: Value,
    pub read: Option<OperationSchemas>,
    pub create: Option<OperationSchemas>,
    pub update: Option<OperationSchemas>,
    pub patch: Option<OperationSchemas>,
    pub delete: Option<OperationSchemas>,
}

impl SchemaSet {
    /// Derive the default schemas of every operation from an object model schema.
    ///
    /// - queries: every model property optional, each accepting one value or an array of values
    /// - create values: the model, with `id` no longer required when a generated id fits its
    ///   schema (see [`accepts_generated_id`])
    /// - update values: the model without `id`
    /// - patch values: every non-`id` property, all optional
    /// - options: empty objects, except read which accepts `offset` and `limit`
    #[must_use]
    pub fn from_model(model: Value) -> Self {
        let properties = model
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let declared_required: Vec<String> = model
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();
        let required: Vec<String> = declared_required
            .iter()
            .filter(|k| *k != ID_PROPERTY)
            .cloned()
            .collect();
        let id_generated = accepts_generated_id(properties.get(ID_PROPERTY));
        let create_required = if id_generated {
            required.clone()
        } else {
            declared_required
        };

        let mut query_properties = serde_json::Map::new();
        for (k, p) in &properties {
            query_properties.insert(
                k.clone(),
                json!({ "anyOf": [p, { "type": "array", "items": p }] }),
            );
        }
        let query = json!({
            "type": "object",
            "properties": query_properties,
            "additionalProperties": false,
        });

        let mut create_values = model.clone();
        if let Some(obj) = create_values.as_object_mut() {
            obj.insert("required".to_string(), json!(create_required));
        }

        let mut value_properties = properties.clone();
        value_properties.remove(ID_PROPERTY);
        let update_values = json!({
            "type": "object",
            "properties": value_properties,
            "required": required,
            "additionalProperties": false,
        });
        let patch_values = json!({
            "type": "object",
            "properties": value_properties,
            "additionalProperties": false,
        });

        let read_options = json!({
            "type": "object",
            "properties": {
                "offset": { "type": "integer", "minimum": 0 },
                "limit": { "type": "integer", "minimum": 1 },
            },
        });

        Self {
            read: Some(OperationSchemas {
                query: Some(query.clone()),
                values: None,
                options: read_options,
            }),
            create: Some(OperationSchemas {
                query: None,
                values: Some(create_values),
                options: empty_object(),
            }),
            update: Some(OperationSchemas {
                query: None,
                values: Some(update_values),
                options: empty_object(),
            }),
            patch: Some(OperationSchemas {
                query: Some(query.clone()),
                values: Some(patch_values),
                options: empty_object(),
            }),
            delete: Some(OperationSchemas {
                query: Some(query),
                values: None,
                options: empty_object(),
            }),
            model,
        }
    }

    #[must_use]
    pub fn operation(&self, op: Operation) -> Option<&OperationSchemas> {
        match op {
            Operation::Read => self.read.as_ref(),
            Operation::Create => self.create.as_ref(),
            Operation::Update => self.update.as_ref(),
            Operation::Patch => self.patch.as_ref(),
            Operation::Delete => self.delete.as_ref(),
        }
    }

    fn operation_mut(&mut self, op: Operation) -> &mut Option<OperationSchemas> {
        match op {
            Operation::Read => &mut self.read,
            Operation::Create => &mut self.create,
            Operation::Update => &mut self.update,
            Operation::Patch => &mut self.patch,
            Operation::Delete => &mut self.delete,
        }
    }

    #[must_use]
    pub fn supports(&self, op: Operation) -> bool {
        self.operation(op).is_some()
    }

    /// Capability set, in [`Operation::ALL`] order.
    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        Operation::ALL
            .into_iter()
            .filter(|op| self.supports(*op))
            .collect()
    }

    /// Remove `op` from the capability set.
    #[must_use]
    pub fn without(mut self, op: Operation) -> Self {
        *self.operation_mut(op) = None;
        self
    }

    /// Replace the options schema of `op`. No-op when `op` is not supported.
    #[must_use]
    pub fn with_options(mut self, op: Operation, options: Value) -> Self {
        if let Some(schemas) = self.operation_mut(op) {
            schemas.options = options;
        }
        self
    }

    /// Schema of the model's `id` property, if declared.
    #[must_use]
    pub fn id_schema(&self) -> Option<&Value> {
        self.model.get("properties")?.get(ID_PROPERTY)
    }

    /// Whether a store may fill in a missing `id` with a generated one.
    #[must_use]
    pub fn generates_ids(&self) -> bool {
        accepts_generated_id(self.id_schema())
    }
}

/// Length of a hyphenated uuid, the form generated ids take.
pub const GENERATED_ID_LEN: u64 = 36;

/// `true` when every generated id (a uuid v4 string) is valid against `id_schema`.
///
/// Conservative: any keyword that could reject a uuid string (`pattern`, `enum`, `const`, a
/// non-`uuid` `format`, non-string types, tight length bounds) rules generation out.
#[must_use]
pub fn accepts_generated_id(id_schema: Option<&Value>) -> bool {
    let Some(schema) = id_schema else {
        return true;
    };
    let Some(schema) = schema.as_object() else {
        return schema.as_bool().unwrap_or(false);
    };
    let string_type = match schema.get("type") {
        None => true,
        Some(Value::String(t)) => t == "string",
        Some(Value::Array(ts)) => ts.iter().any(|t| t == "string"),
        Some(_) => false,
    };
    let fits_max = schema
        .get("maxLength")
        .and_then(Value::as_u64)
        .is_none_or(|max| max >= GENERATED_ID_LEN);
    let fits_min = schema
        .get("minLength")
        .and_then(Value::as_u64)
        .is_none_or(|min| min <= GENERATED_ID_LEN);
    let format_ok = schema
        .get("format")
        .is_none_or(|f| f.as_str() == Some("uuid"));
    let restricted = ["pattern", "enum", "const", "anyOf", "oneOf", "allOf", "not", "$ref"]
        .iter()
        .any(|k| schema.contains_key(*k));
    string_type && fits_max && fits_min && format_ok && !restricted
}

fn empty_object() -> Value {
    json!({ "type": "object", "properties": {} })
}
