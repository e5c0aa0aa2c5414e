//! Parameter mappings shared by models, jobs and estimators.
//!
//! Hyperparameters and estimator properties are free-form mappings read from
//! the descriptor. They keep declaration order, and every level of the
//! descriptor produces its own mapping: merging never writes through to the
//! level it inherits from.

use serde_json::{Map, Value};

use crate::descriptor_error;
use crate::errors::DescriptorError;

/// Ordered mapping from parameter name to its raw value.
pub type Parameters = Map<String, Value>;

/// Overlay `overlay` on top of `base`, returning a new mapping.
///
/// Keys present in both take the overlay's value; keys only in `base` are
/// inherited unchanged.
pub fn merge_parameters(base: &Parameters, overlay: &Parameters) -> Parameters {
    let mut merged = base.clone();
    merged.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Read an optional mapping section of `data`.
///
/// Absent and `null` sections both read as empty.
pub fn parameters_section(
    data: &Parameters,
    key: &str,
    owner: &str,
) -> Result<Parameters, DescriptorError> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(Parameters::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(other) => Err(descriptor_error!(
            "\"{}\" of {} must be a mapping, found {}",
            key,
            owner,
            value_kind(other)
        )),
    }
}

/// Read an optional string field of `data`.
pub fn string_field(
    data: &Parameters,
    key: &str,
    owner: &str,
) -> Result<Option<String>, DescriptorError> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(descriptor_error!(
            "\"{}\" of {} must be a string, found {}",
            key,
            owner,
            value_kind(other)
        )),
    }
}

/// Render a value the way it reads in the descriptor: strings are not quoted.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Short name of a value's YAML/JSON kind, for error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
