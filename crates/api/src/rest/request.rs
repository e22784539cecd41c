//! Query-string handling: grouping, option/query split and type coercion.

use super::validation::SchemaValidator;
use crate::options::{filter_internal_options, is_internal_option};
use pipeline_api_pipeline::JsonObject;
use serde_json::{Number, Value};

/// Raw query pairs as decoded by axum, in request order.
pub(crate) type RawQuery = Vec<(String, String)>;

#[derive(Debug, Default, PartialEq)]
pub(crate) struct SplitQuery {
    pub query: JsonObject,
    pub options: JsonObject,
}

/// Split raw pairs into the pipeline query and options.
///
/// Keys declared by the options schema, and keys carrying the internal-option marker, are
/// options; everything else is query. Internal options are then dropped: clients cannot set
/// them. Repeated keys become arrays.
pub(crate) fn split_query(
    raw: RawQuery,
    query_schema: Option<&SchemaValidator>,
    options_schema: &SchemaValidator,
) -> SplitQuery {
    let mut grouped: Vec<(String, Value)> = Vec::new();
    for (k, v) in raw {
        match grouped.iter_mut().find(|(key, _)| *key == k) {
            Some((_, Value::Array(values))) => values.push(Value::String(v)),
            Some((_, existing)) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(v)]);
            }
            None => grouped.push((k, Value::String(v))),
        }
    }

    let mut split = SplitQuery::default();
    let mut options = JsonObject::new();
    for (k, v) in grouped {
        if options_schema.declares(&k) || is_internal_option(&k) {
            let v = coerce(v, options_schema.property(&k));
            options.insert(k, v);
        } else {
            let v = coerce(v, query_schema.and_then(|q| q.property(&k)));
            split.query.insert(k, v);
        }
    }

    split.options = filter_internal_options(&options);
    if split.options.len() != options.len() {
        tracing::debug!(
            dropped = options.len() - split.options.len(),
            "ignored client-supplied internal options"
        );
    }
    split
}

/// Convert query-string text to the JSON type `schema` expects.
///
/// Values stay strings when the schema accepts strings, declares no type, or the text does not
/// parse; validation reports the mismatch afterwards.
pub(crate) fn coerce(raw: Value, schema: Option<&Value>) -> Value {
    let Some(schema) = schema else {
        return raw;
    };
    let mut types = Vec::new();
    scalar_types(schema, &mut types);
    match raw {
        Value::String(s) => coerce_str(s, &types),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|i| match i {
                    Value::String(s) => coerce_str(s, &types),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}

fn scalar_types<'a>(schema: &'a Value, out: &mut Vec<&'a str>) {
    match schema.get("type") {
        Some(Value::String(t)) => out.push(t),
        Some(Value::Array(ts)) => out.extend(ts.iter().filter_map(Value::as_str)),
        _ => {}
    }
    for key in ["anyOf", "oneOf", "allOf"] {
        if let Some(alternatives) = schema.get(key).and_then(Value::as_array) {
            for a in alternatives {
                scalar_types(a, out);
            }
        }
    }
    if let Some(items) = schema.get("items") {
        scalar_types(items, out);
    }
}

fn coerce_str(s: String, types: &[&str]) -> Value {
    let accepts = |t: &str| types.contains(&t);
    if types.is_empty() || accepts("string") {
        return Value::String(s);
    }
    if accepts("integer")
        && let Ok(n) = s.parse::<i64>()
    {
        return Value::Number(n.into());
    }
    if accepts("number")
        && let Some(n) = s.parse::<f64>().ok().and_then(Number::from_f64)
    {
        return Value::Number(n);
    }
    if accepts("boolean") {
        match s.as_str() {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        }
    }
    Value::String(s)
}
