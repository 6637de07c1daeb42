//! The list-of-strings parser: one flag occurrence's tokens to a value.
//!
//! This is the workhorse every flat source (argv, env, maps of raw
//! strings) routes through. Scalar kinds take exactly one token, list
//! kinds consume the whole slice, and the `*FromFile*` kinds treat
//! tokens as paths (`-` reads standard input).

use std::collections::BTreeMap;
use std::io::Read;

use chrono::{DateTime, Utc};
use serde_json::Value;

use param_stack_core::date::parse_date_with_reference;
use param_stack_core::definition::ParameterDefinition;
use param_stack_core::error::{ParameterError, Result};
use param_stack_core::file::{FileData, FileType, parse_structured, yaml_to_json};
use param_stack_core::kind::ParameterKind;
use param_stack_core::value::{ParameterValue, parse_bool_token};

/// Parses a flag occurrence's string tokens into a typed value,
/// validating choice membership.
///
/// # Examples
///
/// ```
/// use param_stack_core::{ParameterDefinition, ParameterKind, ParameterValue};
/// use param_stack_sources::strings::parse_tokens;
///
/// let d = ParameterDefinition::new("limit", ParameterKind::Integer);
/// let v = parse_tokens(&d, &["42".to_string()]).unwrap();
/// assert_eq!(v, ParameterValue::Integer(42));
/// ```
pub fn parse_tokens(definition: &ParameterDefinition, tokens: &[String]) -> Result<ParameterValue> {
    parse_tokens_with_reference(definition, tokens, Utc::now())
}

/// Like [`parse_tokens`], with an explicit reference time for relative
/// date expressions.
pub fn parse_tokens_with_reference(
    definition: &ParameterDefinition,
    tokens: &[String],
    reference: DateTime<Utc>,
) -> Result<ParameterValue> {
    let name = definition.name.as_str();
    let value = match definition.kind {
        ParameterKind::String | ParameterKind::Secret | ParameterKind::Choice => {
            ParameterValue::String(single_token(name, tokens)?.to_string())
        }
        ParameterKind::Integer => {
            let token = single_token(name, tokens)?;
            ParameterValue::Integer(parse_integer(name, token)?)
        }
        ParameterKind::Float => {
            let token = single_token(name, tokens)?;
            ParameterValue::Float(parse_float(name, token)?)
        }
        ParameterKind::Bool => {
            let token = single_token(name, tokens)?;
            let b = parse_bool_token(token)
                .ok_or_else(|| ParameterError::coercion(name, format!("not a boolean: {token}")))?;
            ParameterValue::Bool(b)
        }
        ParameterKind::Date => {
            let token = single_token(name, tokens)?;
            ParameterValue::Date(parse_date_with_reference(token, reference).map_err(
                |_| ParameterError::coercion(name, format!("not a date: {token}")),
            )?)
        }
        ParameterKind::StringList | ParameterKind::ChoiceList => {
            ParameterValue::StringList(tokens.to_vec())
        }
        ParameterKind::IntegerList => ParameterValue::IntegerList(
            tokens
                .iter()
                .map(|t| parse_integer(name, t))
                .collect::<Result<_>>()?,
        ),
        ParameterKind::FloatList => ParameterValue::FloatList(
            tokens
                .iter()
                .map(|t| parse_float(name, t))
                .collect::<Result<_>>()?,
        ),
        ParameterKind::KeyValue => parse_key_value(name, tokens)?,
        ParameterKind::File => {
            let token = single_token(name, tokens)?;
            ParameterValue::File(FileData::load(token)?)
        }
        ParameterKind::FileList => ParameterValue::FileList(
            tokens.iter().map(|t| FileData::load(t)).collect::<Result<_>>()?,
        ),
        ParameterKind::StringFromFile => {
            let token = single_token(name, tokens)?;
            ParameterValue::String(read_path(token)?)
        }
        ParameterKind::StringFromFiles => {
            let mut joined = String::new();
            for token in tokens {
                joined.push_str(&read_path(token)?);
            }
            ParameterValue::String(joined)
        }
        ParameterKind::StringListFromFile => {
            let token = single_token(name, tokens)?;
            ParameterValue::StringList(string_list_from_path(name, token)?)
        }
        ParameterKind::StringListFromFiles => {
            let mut items = Vec::new();
            for token in tokens {
                items.extend(string_list_from_path(name, token)?);
            }
            ParameterValue::StringList(items)
        }
        ParameterKind::ObjectFromFile => {
            let token = single_token(name, tokens)?;
            ParameterValue::Object(object_from_path(name, token)?)
        }
        ParameterKind::ObjectListFromFile => {
            let token = single_token(name, tokens)?;
            ParameterValue::ObjectList(object_list_from_path(name, token)?)
        }
        ParameterKind::ObjectListFromFiles => {
            let mut items = Vec::new();
            for token in tokens {
                items.extend(object_list_from_path(name, token)?);
            }
            ParameterValue::ObjectList(items)
        }
    };
    definition.check_choices(&value)?;
    Ok(value)
}

fn single_token<'a>(name: &str, tokens: &'a [String]) -> Result<&'a str> {
    match tokens {
        [token] => Ok(token.as_str()),
        [] => Err(ParameterError::coercion(name, "expected a value")),
        _ => Err(ParameterError::coercion(
            name,
            format!("expected a single value, got {}", tokens.len()),
        )),
    }
}

fn parse_integer(name: &str, token: &str) -> Result<i64> {
    token
        .trim()
        .parse()
        .map_err(|_| ParameterError::coercion(name, format!("not an integer: {token}")))
}

fn parse_float(name: &str, token: &str) -> Result<f64> {
    token
        .trim()
        .parse()
        .map_err(|_| ParameterError::coercion(name, format!("not a number: {token}")))
}

/// `k:v` tokens, or a single `@path` token loading a whole map from a
/// JSON/YAML file.
fn parse_key_value(name: &str, tokens: &[String]) -> Result<ParameterValue> {
    if let [token] = tokens {
        if let Some(path) = token.strip_prefix('@') {
            return key_value_from_path(name, path);
        }
    }
    let mut map = BTreeMap::new();
    for token in tokens {
        let (k, v) = token.split_once(':').ok_or_else(|| {
            ParameterError::coercion(name, format!("expected key:value, got {token}"))
        })?;
        map.insert(k.to_string(), v.to_string());
    }
    Ok(ParameterValue::KeyValue(map))
}

fn key_value_from_path(name: &str, path: &str) -> Result<ParameterValue> {
    let content = read_path(path)?;
    let parsed = match FileType::from_path(path) {
        FileType::Yaml => yaml_to_json(serde_yaml::from_str(&content)?),
        _ => serde_json::from_str(&content)?,
    };
    let Value::Object(obj) = parsed else {
        return Err(ParameterError::coercion(
            name,
            format!("{path} does not contain a map"),
        ));
    };
    let mut map = BTreeMap::new();
    for (k, v) in obj {
        map.insert(k, stringify_scalar(name, &v)?);
    }
    Ok(ParameterValue::KeyValue(map))
}

fn stringify_scalar(name: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(ParameterError::coercion(
            name,
            format!("key-value entries must be scalar, got {other}"),
        )),
    }
}

/// Reads a path's contents; `-` reads standard input.
pub fn read_path(path: &str) -> Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| ParameterError::SourceIo {
                path: "-".to_string(),
                source: e,
            })?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).map_err(|e| ParameterError::SourceIo {
        path: path.to_string(),
        source: e,
    })
}

/// JSON/YAML files decode a list of strings; anything else splits into
/// lines, dropping a trailing empty line.
fn string_list_from_path(name: &str, path: &str) -> Result<Vec<String>> {
    let content = read_path(path)?;
    match FileType::from_path(path) {
        file_type @ (FileType::Json | FileType::Yaml) => {
            let parsed = parse_structured(file_type, &content)?.unwrap_or(Value::Null);
            let Value::Array(items) = parsed else {
                return Err(ParameterError::coercion(
                    name,
                    format!("{path} does not contain a list"),
                ));
            };
            items
                .iter()
                .map(|item| stringify_scalar(name, item))
                .collect()
        }
        _ => Ok(content.lines().map(String::from).collect()),
    }
}

fn object_from_path(name: &str, path: &str) -> Result<Value> {
    let file_type = FileType::from_path(path);
    let content = read_path(path)?;
    let parsed = parse_structured(file_type, &content)?.ok_or_else(|| {
        ParameterError::coercion(name, format!("{path} is not a structured file"))
    })?;
    match parsed {
        obj @ Value::Object(_) => Ok(obj),
        other => Err(ParameterError::coercion(
            name,
            format!("{path} does not contain an object, got {other}"),
        )),
    }
}

/// A list of objects; a single JSON/YAML object is wrapped into a
/// one-element list.
fn object_list_from_path(name: &str, path: &str) -> Result<Vec<Value>> {
    let file_type = FileType::from_path(path);
    let content = read_path(path)?;
    let parsed = parse_structured(file_type, &content)?.ok_or_else(|| {
        ParameterError::coercion(name, format!("{path} is not a structured file"))
    })?;
    match parsed {
        Value::Array(items) => Ok(items),
        obj @ Value::Object(_) => Ok(vec![obj]),
        other => Err(ParameterError::coercion(
            name,
            format!("{path} does not contain objects, got {other}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use param_stack_core::value::ParameterValue;

    fn def(name: &str, kind: ParameterKind) -> ParameterDefinition {
        ParameterDefinition::new(name, kind)
    }

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_scalar_rejects_multiple_tokens() {
        let d = def("limit", ParameterKind::Integer);
        assert!(parse_tokens(&d, &tokens(&["1", "2"])).is_err());
    }

    #[test]
    fn test_bool_accepts_on_off() {
        let d = def("verbose", ParameterKind::Bool);
        assert_eq!(
            parse_tokens(&d, &tokens(&["on"])).unwrap(),
            ParameterValue::Bool(true)
        );
        assert_eq!(
            parse_tokens(&d, &tokens(&["OFF"])).unwrap(),
            ParameterValue::Bool(false)
        );
    }

    #[test]
    fn test_choice_validated_after_parse() {
        let d = def("format", ParameterKind::Choice).with_choices(["json", "yaml"]);
        assert!(parse_tokens(&d, &tokens(&["json"])).is_ok());
        assert!(matches!(
            parse_tokens(&d, &tokens(&["toml"])),
            Err(ParameterError::InvalidChoice { .. })
        ));
    }

    #[test]
    fn test_date_relative_against_reference() {
        let reference = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let d = def("since", ParameterKind::Date);
        let v = parse_tokens_with_reference(&d, &tokens(&["2 days ago"]), reference).unwrap();
        assert_eq!(
            v,
            ParameterValue::Date(Utc.with_ymd_and_hms(2024, 5, 8, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_key_value_tokens() {
        let d = def("labels", ParameterKind::KeyValue);
        let v = parse_tokens(&d, &tokens(&["env:prod", "tier:db"])).unwrap();
        let ParameterValue::KeyValue(map) = v else {
            panic!("expected key-value")
        };
        assert_eq!(map["env"], "prod");
        assert_eq!(map["tier"], "db");
    }

    #[test]
    fn test_key_value_from_yaml_file() {
        let f = temp_file(".yaml", "env: prod\nreplicas: 3\n");
        let d = def("labels", ParameterKind::KeyValue);
        let arg = format!("@{}", f.path().display());
        let v = parse_tokens(&d, &tokens(&[&arg])).unwrap();
        let ParameterValue::KeyValue(map) = v else {
            panic!("expected key-value")
        };
        assert_eq!(map["replicas"], "3");
    }

    #[test]
    fn test_string_list_from_text_file_splits_lines() {
        let f = temp_file(".txt", "alpha\nbeta\n");
        let d = def("names", ParameterKind::StringListFromFile);
        let v = parse_tokens(&d, &tokens(&[&f.path().display().to_string()])).unwrap();
        assert_eq!(
            v,
            ParameterValue::StringList(vec!["alpha".into(), "beta".into()])
        );
    }

    #[test]
    fn test_object_list_single_object_fallback() {
        let f = temp_file(".json", "{\"a\": 1}");
        let d = def("rows", ParameterKind::ObjectListFromFile);
        let v = parse_tokens(&d, &tokens(&[&f.path().display().to_string()])).unwrap();
        let ParameterValue::ObjectList(items) = v else {
            panic!("expected object list")
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["a"], 1);
    }

    #[test]
    fn test_object_list_from_csv() {
        let f = temp_file(".csv", "name,age\nalice,30\nbob,25\n");
        let d = def("rows", ParameterKind::ObjectListFromFile);
        let v = parse_tokens(&d, &tokens(&[&f.path().display().to_string()])).unwrap();
        let ParameterValue::ObjectList(items) = v else {
            panic!("expected object list")
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["name"], "alice");
        assert_eq!(items[1]["age"], "25");
    }

    #[test]
    fn test_string_from_files_concatenates() {
        let a = temp_file(".txt", "one ");
        let b = temp_file(".txt", "two");
        let d = def("body", ParameterKind::StringFromFiles);
        let v = parse_tokens(
            &d,
            &tokens(&[
                &a.path().display().to_string(),
                &b.path().display().to_string(),
            ]),
        )
        .unwrap();
        assert_eq!(v, ParameterValue::String("one two".into()));
    }
}
