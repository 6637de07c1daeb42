//! Projecting a parsed value collection onto a serde record.
//!
//! The binder assembles a JSON object field-by-field from a binding spec,
//! then deserializes the whole object in one step. A failure anywhere
//! leaves the caller with an error and no partially-written record.

use glob::Pattern;
use serde_json::{Map, Value};
use tracing::trace;

use param_stack_core::error::{ParameterError, Result};
use param_stack_core::parsed::ParsedParameters;
use param_stack_core::value::ParameterValue;

use crate::spec::{BindingSpec, FieldBinding, FileFacet, ParameterRecord};

/// Binds a record type that declares its own spec.
pub fn bind<T: ParameterRecord>(parsed: &ParsedParameters) -> Result<T> {
    bind_with_spec(&T::binding_spec()?, parsed)
}

/// Binds any deserializable record against an explicit spec.
///
/// Fields whose parameter is absent are left to the record's serde
/// defaults, so optional fields want `Option` or `#[serde(default)]`.
pub fn bind_with_spec<T: serde::de::DeserializeOwned>(
    spec: &BindingSpec,
    parsed: &ParsedParameters,
) -> Result<T> {
    let object = assemble(spec, parsed)?;
    serde_json::from_value(Value::Object(object))
        .map_err(|e| ParameterError::binding("<record>", e.to_string()))
}

fn assemble(spec: &BindingSpec, parsed: &ParsedParameters) -> Result<Map<String, Value>> {
    let mut object = Map::new();
    for binding in spec.iter() {
        if let Some(nested) = &binding.nested {
            object.insert(
                binding.field.clone(),
                Value::Object(assemble(nested, parsed)?),
            );
            continue;
        }
        if binding.is_wildcard() {
            object.insert(binding.field.clone(), wildcard_object(binding, parsed)?);
            continue;
        }
        if let Some(value) = parsed.get_value(&binding.pattern) {
            trace!(field = %binding.field, parameter = %binding.pattern, "binding field");
            object.insert(binding.field.clone(), field_json(binding, value)?);
        }
    }
    Ok(object)
}

/// Every parameter name matching the glob lands in the map, and
/// nothing else.
fn wildcard_object(binding: &FieldBinding, parsed: &ParsedParameters) -> Result<Value> {
    let pattern = Pattern::new(&binding.pattern)
        .map_err(|e| ParameterError::binding(&binding.field, e.to_string()))?;
    let mut object = Map::new();
    for (name, parameter) in parsed.iter() {
        if pattern.matches(name) {
            object.insert(name.clone(), parameter.value.to_json());
        }
    }
    Ok(Value::Object(object))
}

fn field_json(binding: &FieldBinding, value: &ParameterValue) -> Result<Value> {
    if binding.from_json {
        return embedded_json(binding, value);
    }
    match binding.facet {
        FileFacet::Whole => Ok(value.to_json()),
        FileFacet::Content => match value {
            ParameterValue::File(fd) => Ok(Value::String(fd.content.clone())),
            ParameterValue::FileList(files) => Ok(Value::Array(
                files
                    .iter()
                    .map(|fd| Value::String(fd.content.clone()))
                    .collect(),
            )),
            _ => Err(facet_mismatch(binding, "content")),
        },
        FileFacet::Raw => match value {
            ParameterValue::File(fd) => to_json_value(binding, &fd.raw_content),
            ParameterValue::FileList(files) => Ok(Value::Array(
                files
                    .iter()
                    .map(|fd| to_json_value(binding, &fd.raw_content))
                    .collect::<Result<_>>()?,
            )),
            _ => Err(facet_mismatch(binding, "raw")),
        },
        FileFacet::Parsed => match value {
            ParameterValue::File(fd) => Ok(fd.parsed_content.clone().unwrap_or(Value::Null)),
            ParameterValue::FileList(files) => Ok(Value::Array(
                files
                    .iter()
                    .map(|fd| fd.parsed_content.clone().unwrap_or(Value::Null))
                    .collect(),
            )),
            _ => Err(facet_mismatch(binding, "parsed")),
        },
    }
}

/// `from_json`: strings parse as JSON text, file values parse their
/// raw bytes, anything else passes through its JSON widening.
fn embedded_json(binding: &FieldBinding, value: &ParameterValue) -> Result<Value> {
    match value {
        ParameterValue::String(s) => serde_json::from_str(s)
            .map_err(|e| ParameterError::binding(&binding.field, format!("embedded JSON: {e}"))),
        ParameterValue::File(fd) => serde_json::from_slice(&fd.raw_content).map_err(|e| {
            ParameterError::binding(
                &binding.field,
                format!("embedded JSON in {}: {e}", fd.path),
            )
        }),
        other => Ok(other.to_json()),
    }
}

fn to_json_value<T: serde::Serialize>(binding: &FieldBinding, value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| ParameterError::binding(&binding.field, e.to_string()))
}

fn facet_mismatch(binding: &FieldBinding, facet: &str) -> ParameterError {
    ParameterError::binding(
        &binding.field,
        format!("{facet} facet requires a file value for {}", binding.pattern),
    )
}
