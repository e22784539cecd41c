//! Compiled JSON Schemas of a pipeline's operation inputs.

use crate::error::{ApiError, Result};
use serde_json::{Map, Value, json};

pub(crate) struct SchemaValidator {
    schema: Value,
    validator: jsonschema::Validator,
}

impl SchemaValidator {
    pub(crate) fn compile(what: &str, schema: &Value) -> Result<Self> {
        let validator = jsonschema::validator_for(schema)
            .map_err(|e| ApiError::Schema(format!("invalid {what} schema: {e}")))?;
        Ok(Self {
            schema: schema.clone(),
            validator,
        })
    }

    /// Violations of `instance`, in the shape returned to clients.
    pub(crate) fn violations(&self, instance: &Value) -> Vec<Value> {
        self.validator
            .iter_errors(instance)
            .map(|e| {
                json!({
                    "message": e.to_string(),
                    "instancePath": e.instance_path().to_string(),
                })
            })
            .collect()
    }

    pub(crate) fn schema(&self) -> &Value {
        &self.schema
    }

    pub(crate) fn properties(&self) -> Option<&Map<String, Value>> {
        self.schema.get("properties").and_then(Value::as_object)
    }

    pub(crate) fn property(&self, key: &str) -> Option<&Value> {
        self.properties()?.get(key)
    }

    pub(crate) fn declares(&self, key: &str) -> bool {
        self.property(key).is_some()
    }
}
