//! Internal-option filtering policy.
//!
//! Pipelines may declare options meant only for server-side bookkeeping (transactions, audit
//! context, ...). Such options are marked by a leading [`INTERNAL_OPTION_MARKER`] and never
//! reach anything a client can see or set: generated `OpenAPI` parameter lists and the option
//! objects a transport builds from a request are both filtered here.
//!
//! All functions are pure and total; inputs are never mutated.

use openapiv3::{Parameter, ReferenceOr};
use serde_json::{Map, Value};

/// Leading character of internal option keys.
pub const INTERNAL_OPTION_MARKER: char = '_';

/// `true` iff `key` is an internal option.
#[must_use]
pub fn is_internal_option(key: &str) -> bool {
    key.starts_with(INTERNAL_OPTION_MARKER)
}

#[must_use]
pub fn is_not_an_internal_option(key: &str) -> bool {
    !is_internal_option(key)
}

/// Copy of `options` without internal keys. Kept entries keep their value and relative order.
#[must_use]
pub fn filter_internal_options(options: &Map<String, Value>) -> Map<String, Value> {
    options
        .iter()
        .filter(|(k, _)| is_not_an_internal_option(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Copy of `parameters` without descriptors named like internal options.
///
/// `$ref` entries carry no name and are kept.
#[must_use]
pub fn filter_internal_parameters(
    parameters: &[ReferenceOr<Parameter>],
) -> Vec<ReferenceOr<Parameter>> {
    parameters
        .iter()
        .filter(|p| match p {
            ReferenceOr::Reference { .. } => true,
            ReferenceOr::Item(p) => is_not_an_internal_option(parameter_name(p)),
        })
        .cloned()
        .collect()
}

pub(crate) fn parameter_name(p: &Parameter) -> &str {
    match p {
        Parameter::Query { parameter_data, .. }
        | Parameter::Header { parameter_data, .. }
        | Parameter::Path { parameter_data, .. }
        | Parameter::Cookie { parameter_data, .. } => &parameter_data.name,
    }
}
