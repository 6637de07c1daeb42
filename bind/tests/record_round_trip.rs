//! Binding a record and flattening it back should reproduce the
//! original values.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use param_stack_bind::{BindingSpec, ParameterRecord, bind, to_datamap};
use param_stack_core::{
    ParameterDefinition, ParameterKind, ParameterValue, ParsedParameters, Result,
};

#[derive(Debug, Serialize, Deserialize)]
struct Settings {
    limit: i64,
    #[serde(default)]
    tags: Vec<String>,
    api_keys: HashMap<String, String>,
}

impl ParameterRecord for Settings {
    fn binding_spec() -> Result<BindingSpec> {
        BindingSpec::new()
            .field("limit", "limit")?
            .field("tags", "tags")?
            .field("api_keys", "*_api_key")
    }
}

fn parsed() -> ParsedParameters {
    let mut parsed = ParsedParameters::new();
    let entries = [
        (
            "limit",
            ParameterKind::Integer,
            ParameterValue::Integer(9),
        ),
        (
            "tags",
            ParameterKind::StringList,
            ParameterValue::StringList(vec!["a".into(), "b".into()]),
        ),
        (
            "openai_api_key",
            ParameterKind::Secret,
            ParameterValue::String("sk-1".into()),
        ),
    ];
    for (name, kind, value) in entries {
        parsed
            .update_value(
                name,
                Arc::new(ParameterDefinition::new(name, kind)),
                value,
                "test",
                &[],
            )
            .unwrap();
    }
    parsed
}

#[test]
fn test_bind_then_datamap_reproduces_values() {
    let settings: Settings = bind(&parsed()).unwrap();
    assert_eq!(settings.limit, 9);
    assert_eq!(settings.tags, vec!["a", "b"]);
    assert_eq!(settings.api_keys["openai_api_key"], "sk-1");

    let map = to_datamap(&Settings::binding_spec().unwrap(), &settings).unwrap();
    assert_eq!(map["limit"], json!(9));
    assert_eq!(map["tags"], json!(["a", "b"]));
    assert_eq!(map["openai_api_key"], json!("sk-1"));
}
