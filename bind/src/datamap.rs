//! The inverse of binding: reading a record back into a flat
//! name→value map, for capture and command re-invocation.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use param_stack_core::definition::ParameterDefinitions;
use param_stack_core::error::{ParameterError, Result};

use crate::spec::BindingSpec;

/// Reads a record's tagged fields into a flat map keyed by parameter
/// name. Wildcard map fields expand into one entry per key; null
/// fields are skipped.
pub fn to_datamap<T: Serialize>(spec: &BindingSpec, record: &T) -> Result<IndexMap<String, Value>> {
    let json = serde_json::to_value(record)?;
    let Value::Object(object) = json else {
        return Err(ParameterError::binding(
            "<record>",
            "record did not serialize to an object",
        ));
    };
    let mut map = IndexMap::new();
    collect(spec, &object, &mut map)?;
    Ok(map)
}

fn collect(
    spec: &BindingSpec,
    object: &serde_json::Map<String, Value>,
    map: &mut IndexMap<String, Value>,
) -> Result<()> {
    for binding in spec.iter() {
        let Some(field_value) = object.get(&binding.field) else {
            continue;
        };
        if let Some(nested) = &binding.nested {
            let Value::Object(nested_object) = field_value else {
                return Err(ParameterError::binding(
                    &binding.field,
                    "nested binding field is not an object",
                ));
            };
            collect(nested, nested_object, map)?;
            continue;
        }
        if binding.is_wildcard() {
            let Value::Object(entries) = field_value else {
                return Err(ParameterError::binding(
                    &binding.field,
                    "wildcard binding field is not a map",
                ));
            };
            for (name, value) in entries {
                map.insert(name.clone(), value.clone());
            }
            continue;
        }
        if !field_value.is_null() {
            map.insert(binding.pattern.clone(), field_value.clone());
        }
    }
    Ok(())
}

/// Populates definition defaults from a record's current field
/// values. Definitions without a corresponding record field keep
/// their declared default.
pub fn seed_defaults_from_record<T: Serialize>(
    spec: &BindingSpec,
    record: &T,
    definitions: &ParameterDefinitions,
) -> Result<ParameterDefinitions> {
    let datamap = to_datamap(spec, record)?;
    let mut seeded = definitions.clone();
    for (name, value) in datamap {
        if let Some(definition) = definitions.get(&name) {
            seeded.add(definition.as_ref().clone().with_default(value));
        }
    }
    seeded.validate()?;
    Ok(seeded)
}
