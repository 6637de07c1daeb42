//! Parameter values as a tagged variant keyed by semantic shape.
//!
//! The original design carried values as opaque `any`; here every value
//! is a [`ParameterValue`] variant so consumers dispatch on the tag
//! rather than on runtime type. Coercion from loosely-typed JSON shapes
//! (config files, maps, profiles) lives on [`ParameterKind`].

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::date::parse_date;
use crate::error::{ParameterError, Result};
use crate::file::FileData;
use crate::kind::ParameterKind;

/// A concrete parameter value.
///
/// The variant must always satisfy its definition's
/// [`ParameterKind`]; constructors go through
/// [`ParameterKind::coerce`] or the parsers to guarantee it.
///
/// # Examples
///
/// ```
/// use param_stack_core::{ParameterKind, ParameterValue};
///
/// let v = ParameterKind::Integer.coerce(&serde_json::json!("42"), "answer").unwrap();
/// assert_eq!(v, ParameterValue::Integer(42));
/// assert!(v.matches_kind(ParameterKind::Integer));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    String(String),
    Bool(bool),
    Integer(i64),
    Float(f64),
    Date(DateTime<Utc>),
    StringList(Vec<String>),
    IntegerList(Vec<i64>),
    FloatList(Vec<f64>),
    KeyValue(BTreeMap<String, String>),
    Object(Value),
    ObjectList(Vec<Value>),
    File(FileData),
    FileList(Vec<FileData>),
}

impl ParameterValue {
    /// Returns true if the value's shape satisfies the given kind.
    /// Choice kinds share the string shapes, file-derived string kinds
    /// share the plain string/list shapes.
    pub fn matches_kind(&self, kind: ParameterKind) -> bool {
        use ParameterKind as K;
        match self {
            Self::String(_) => matches!(
                kind,
                K::String | K::Secret | K::Choice | K::StringFromFile | K::StringFromFiles
            ),
            Self::Bool(_) => matches!(kind, K::Bool),
            Self::Integer(_) => matches!(kind, K::Integer),
            Self::Float(_) => matches!(kind, K::Float),
            Self::Date(_) => matches!(kind, K::Date),
            Self::StringList(_) => matches!(
                kind,
                K::StringList | K::ChoiceList | K::StringListFromFile | K::StringListFromFiles
            ),
            Self::IntegerList(_) => matches!(kind, K::IntegerList),
            Self::FloatList(_) => matches!(kind, K::FloatList),
            Self::KeyValue(_) => matches!(kind, K::KeyValue),
            Self::Object(_) => matches!(kind, K::ObjectFromFile),
            Self::ObjectList(_) => matches!(kind, K::ObjectListFromFile | K::ObjectListFromFiles),
            Self::File(_) => matches!(kind, K::File),
            Self::FileList(_) => matches!(kind, K::FileList),
        }
    }

    /// Widens the value to a plain JSON shape for serialization,
    /// provenance logs, and binding. Dates become RFC 3339 strings,
    /// files become their serialized object form.
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Bool(b) => Value::Bool(*b),
            Self::Integer(i) => Value::from(*i),
            Self::Float(f) => Value::from(*f),
            Self::Date(d) => Value::String(d.to_rfc3339_opts(SecondsFormat::Secs, true)),
            Self::StringList(l) => Value::Array(l.iter().cloned().map(Value::String).collect()),
            Self::IntegerList(l) => Value::Array(l.iter().map(|i| Value::from(*i)).collect()),
            Self::FloatList(l) => Value::Array(l.iter().map(|f| Value::from(*f)).collect()),
            Self::KeyValue(m) => Value::Object(
                m.iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
            Self::Object(o) => o.clone(),
            Self::ObjectList(l) => Value::Array(l.clone()),
            Self::File(fd) => serde_json::to_value(fd).unwrap_or(Value::Null),
            Self::FileList(fds) => Value::Array(
                fds.iter()
                    .map(|fd| serde_json::to_value(fd).unwrap_or(Value::Null))
                    .collect(),
            ),
        }
    }

    /// Returns the string payload when the value carries one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl Serialize for ParameterValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl ParameterKind {
    /// Validates and coerces a loosely-typed JSON value into the
    /// canonical [`ParameterValue`] for this kind.
    ///
    /// Accepted conversions: values already of the target shape,
    /// strict numeric cross-conversions (sign and range checked, no
    /// fractional truncation), decimal string→number, the string
    /// boolean tokens `on|off|true|false|1|0` (case-insensitive),
    /// stringified `map<string, any>` for `keyValue`, and FileData
    /// object shapes for the `file*` kinds. Choice membership is
    /// enforced by the definition's `coerce_value`, not here.
    pub fn coerce(&self, raw: &Value, name: &str) -> Result<ParameterValue> {
        use ParameterKind as K;
        match self {
            K::String | K::Secret | K::Choice | K::StringFromFile | K::StringFromFiles => {
                match raw {
                    Value::String(s) => Ok(ParameterValue::String(s.clone())),
                    other => Err(ParameterError::coercion(
                        name,
                        format!("expected string, got {}", json_type_name(other)),
                    )),
                }
            }
            K::Bool => coerce_bool(raw, name),
            K::Integer => json_to_i64(raw)
                .map(ParameterValue::Integer)
                .ok_or_else(|| {
                    ParameterError::coercion(
                        name,
                        format!("expected integer, got {}", json_type_name(raw)),
                    )
                }),
            K::Float => json_to_f64(raw).map(ParameterValue::Float).ok_or_else(|| {
                ParameterError::coercion(
                    name,
                    format!("expected float, got {}", json_type_name(raw)),
                )
            }),
            K::Date => coerce_date(raw, name),
            K::StringList | K::ChoiceList | K::StringListFromFile | K::StringListFromFiles => {
                let items = expect_array(raw, name)?;
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => out.push(s.clone()),
                        other => {
                            return Err(ParameterError::coercion(
                                name,
                                format!(
                                    "expected string list element, got {}",
                                    json_type_name(other)
                                ),
                            ));
                        }
                    }
                }
                Ok(ParameterValue::StringList(out))
            }
            K::IntegerList => {
                let items = expect_array(raw, name)?;
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(json_to_i64(item).ok_or_else(|| {
                        ParameterError::coercion(
                            name,
                            format!("expected integer list element, got {}", json_type_name(item)),
                        )
                    })?);
                }
                Ok(ParameterValue::IntegerList(out))
            }
            K::FloatList => {
                let items = expect_array(raw, name)?;
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(json_to_f64(item).ok_or_else(|| {
                        ParameterError::coercion(
                            name,
                            format!("expected float list element, got {}", json_type_name(item)),
                        )
                    })?);
                }
                Ok(ParameterValue::FloatList(out))
            }
            K::KeyValue => match raw {
                Value::Object(map) => {
                    let mut out = BTreeMap::new();
                    for (k, v) in map {
                        out.insert(k.clone(), stringify_scalar(v));
                    }
                    Ok(ParameterValue::KeyValue(out))
                }
                other => Err(ParameterError::coercion(
                    name,
                    format!("expected string map, got {}", json_type_name(other)),
                )),
            },
            K::ObjectFromFile => match raw {
                Value::Object(_) => Ok(ParameterValue::Object(raw.clone())),
                other => Err(ParameterError::coercion(
                    name,
                    format!("expected object, got {}", json_type_name(other)),
                )),
            },
            K::ObjectListFromFile | K::ObjectListFromFiles => match raw {
                Value::Array(items) => Ok(ParameterValue::ObjectList(items.clone())),
                other => Err(ParameterError::coercion(
                    name,
                    format!("expected object list, got {}", json_type_name(other)),
                )),
            },
            K::File => serde_json::from_value::<FileData>(raw.clone())
                .map(ParameterValue::File)
                .map_err(|e| {
                    ParameterError::coercion(name, format!("expected file data object: {e}"))
                }),
            K::FileList => serde_json::from_value::<Vec<FileData>>(raw.clone())
                .map(ParameterValue::FileList)
                .map_err(|e| {
                    ParameterError::coercion(name, format!("expected file data list: {e}"))
                }),
        }
    }

    /// Produces the kind's zero semantic value: empty collections for
    /// list/map kinds, the zero time for `date`, an empty [`FileData`]
    /// for `file`.
    pub fn empty_value(&self) -> ParameterValue {
        use ParameterKind as K;
        match self {
            K::String | K::Secret | K::Choice | K::StringFromFile | K::StringFromFiles => {
                ParameterValue::String(String::new())
            }
            K::Bool => ParameterValue::Bool(false),
            K::Integer => ParameterValue::Integer(0),
            K::Float => ParameterValue::Float(0.0),
            K::Date => ParameterValue::Date(DateTime::<Utc>::UNIX_EPOCH),
            K::StringList | K::ChoiceList | K::StringListFromFile | K::StringListFromFiles => {
                ParameterValue::StringList(Vec::new())
            }
            K::IntegerList => ParameterValue::IntegerList(Vec::new()),
            K::FloatList => ParameterValue::FloatList(Vec::new()),
            K::KeyValue => ParameterValue::KeyValue(BTreeMap::new()),
            K::ObjectFromFile => ParameterValue::Object(Value::Object(serde_json::Map::new())),
            K::ObjectListFromFile | K::ObjectListFromFiles => {
                ParameterValue::ObjectList(Vec::new())
            }
            K::File => ParameterValue::File(FileData::default()),
            K::FileList => ParameterValue::FileList(Vec::new()),
        }
    }
}

fn expect_array<'a>(raw: &'a Value, name: &str) -> Result<&'a Vec<Value>> {
    match raw {
        Value::Array(items) => Ok(items),
        other => Err(ParameterError::coercion(
            name,
            format!("expected list, got {}", json_type_name(other)),
        )),
    }
}

fn coerce_bool(raw: &Value, name: &str) -> Result<ParameterValue> {
    match raw {
        Value::Bool(b) => Ok(ParameterValue::Bool(*b)),
        Value::String(s) => parse_bool_token(s).map(ParameterValue::Bool).ok_or_else(|| {
            ParameterError::coercion(name, format!("could not parse {s:?} as bool"))
        }),
        Value::Number(n) if n.as_i64() == Some(0) => Ok(ParameterValue::Bool(false)),
        Value::Number(n) if n.as_i64() == Some(1) => Ok(ParameterValue::Bool(true)),
        other => Err(ParameterError::coercion(
            name,
            format!("expected bool, got {}", json_type_name(other)),
        )),
    }
}

/// Parses the accepted boolean tokens: `on|off|true|false|1|0`,
/// case-insensitive.
pub fn parse_bool_token(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Some(true),
        "off" | "false" | "0" => Some(false),
        _ => None,
    }
}

fn coerce_date(raw: &Value, name: &str) -> Result<ParameterValue> {
    match raw {
        Value::String(s) => parse_date(s).map(ParameterValue::Date).map_err(|e| {
            ParameterError::coercion(name, e.to_string())
        }),
        Value::Number(n) => n
            .as_i64()
            .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
            .map(ParameterValue::Date)
            .ok_or_else(|| ParameterError::coercion(name, "invalid epoch timestamp")),
        other => Err(ParameterError::coercion(
            name,
            format!("expected date string, got {}", json_type_name(other)),
        )),
    }
}

/// Strict numeric conversion to `i64`: integers pass through, unsigned
/// values must fit, floats must be integral and in range, strings parse
/// as decimal.
fn json_to_i64(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i)
            } else if let Some(u) = n.as_u64() {
                i64::try_from(u).ok()
            } else {
                let f = n.as_f64()?;
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                    Some(f as i64)
                } else {
                    None
                }
            }
        }
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Numeric conversion to `f64`: any JSON number widens, strings parse
/// as decimal.
fn json_to_f64(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn stringify_scalar(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
