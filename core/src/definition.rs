//! Parameter definitions and their ordered collections.
//!
//! A [`ParameterDefinition`] is the declarative descriptor of one
//! parameter: name, kind, help, optional default, optional short form,
//! choices, and whether it is a flag or a positional argument.
//! [`ParameterDefinitions`] keeps them in insertion order; iteration
//! order is observable and affects help rendering, positional indexing,
//! and merge tie-breaking.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ParameterError, Result};
use crate::kind::ParameterKind;
use crate::value::ParameterValue;

/// Declarative descriptor of one command-line parameter.
///
/// Use [`ParameterDefinition::new`] and the `with_*` builder methods:
///
/// ```
/// use param_stack_core::{ParameterDefinition, ParameterKind};
///
/// let limit = ParameterDefinition::new("limit", ParameterKind::Integer)
///     .with_help("Maximum number of rows")
///     .with_short_flag("l")
///     .with_default(serde_json::json!(100));
/// assert_eq!(limit.name, "limit");
/// assert!(!limit.required);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDefinition {
    /// Parameter name, unique within its section.
    pub name: String,
    /// Value kind.
    #[serde(rename = "type")]
    pub kind: ParameterKind,
    /// Help text shown in usage output.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub help: String,
    /// Declared default. `None` means "no default" and is distinct
    /// from a default that happens to be the kind's zero value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Single-character short form, without the leading dash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_flag: Option<String>,
    /// Legal tokens for the choice kinds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    /// Whether the parameter must be provided by some source.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    /// Whether the parameter is a positional argument rather than a
    /// flag.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_argument: bool,
}

impl ParameterDefinition {
    /// Creates a definition with the given name and kind.
    pub fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            help: String::new(),
            default: None,
            short_flag: None,
            choices: Vec::new(),
            required: false,
            is_argument: false,
        }
    }

    /// Adds help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// Adds a short flag form (without the dash).
    pub fn with_short_flag(mut self, short: impl Into<String>) -> Self {
        self.short_flag = Some(short.into());
        self
    }

    /// Sets the declared default from a JSON shape. The value is
    /// validated against the kind by [`validate`](Self::validate).
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Sets the declared default from an already-typed value.
    pub fn with_default_value(mut self, default: &ParameterValue) -> Self {
        self.default = Some(default.to_json());
        self
    }

    /// Sets the choice set for choice kinds.
    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the parameter as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the parameter as a positional argument.
    pub fn as_argument(mut self) -> Self {
        self.is_argument = true;
        self
    }

    /// Validates and coerces a raw JSON shape into this definition's
    /// value, enforcing choice membership after coercion.
    pub fn coerce_value(&self, raw: &Value) -> Result<ParameterValue> {
        let value = self.kind.coerce(raw, &self.name)?;
        self.check_choices(&value)?;
        Ok(value)
    }

    /// Enforces choice membership for the choice kinds.
    pub fn check_choices(&self, value: &ParameterValue) -> Result<()> {
        if !self.kind.needs_choices() {
            return Ok(());
        }
        let check = |token: &str| -> Result<()> {
            if self.choices.iter().any(|c| c == token) {
                Ok(())
            } else {
                Err(ParameterError::InvalidChoice {
                    name: self.name.clone(),
                    value: token.to_string(),
                    choices: self.choices.clone(),
                })
            }
        };
        match value {
            ParameterValue::String(s) => check(s),
            ParameterValue::StringList(items) => {
                for item in items {
                    check(item)?;
                }
                Ok(())
            }
            _ => Err(ParameterError::coercion(
                &self.name,
                "choice parameter holds a non-string value",
            )),
        }
    }

    /// Returns the coerced default value, or `None` when no default is
    /// declared.
    pub fn default_value(&self) -> Result<Option<ParameterValue>> {
        match &self.default {
            None => Ok(None),
            Some(raw) => self.coerce_value(raw).map(Some),
        }
    }

    /// Checks structural validity of this definition: choice kinds
    /// need choices, short flags are dashless single characters, and the
    /// declared default must coerce cleanly.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ParameterError::definition("<unnamed>", "empty name"));
        }
        if self.kind.needs_choices() && self.choices.is_empty() {
            return Err(ParameterError::definition(
                &self.name,
                "choice parameter has no choices",
            ));
        }
        if let Some(short) = &self.short_flag {
            if short.chars().count() != 1 || short.starts_with('-') {
                return Err(ParameterError::definition(
                    &self.name,
                    format!("short flag {short:?} is not a single character"),
                ));
            }
        }
        if self.is_argument && self.short_flag.is_some() {
            return Err(ParameterError::definition(
                &self.name,
                "positional argument cannot have a short flag",
            ));
        }
        self.default_value().map_err(|e| {
            ParameterError::definition(&self.name, format!("invalid default: {e}"))
        })?;
        Ok(())
    }
}

impl std::fmt::Display for ParameterDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{} - {}}}", self.name, self.kind)
    }
}

/// Insertion-ordered collection of parameter definitions.
///
/// Definitions are shared read-only across parsed values, so the
/// collection hands out [`Arc`] references.
///
/// # Examples
///
/// ```
/// use param_stack_core::{ParameterDefinition, ParameterDefinitions, ParameterKind};
///
/// let mut defs = ParameterDefinitions::new();
/// defs.add(ParameterDefinition::new("verbose", ParameterKind::Bool));
/// defs.add(ParameterDefinition::new("file", ParameterKind::String).as_argument());
///
/// assert_eq!(defs.len(), 2);
/// assert_eq!(defs.flags().count(), 1);
/// assert_eq!(defs.arguments().count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ParameterDefinitions {
    inner: IndexMap<String, Arc<ParameterDefinition>>,
}

impl ParameterDefinitions {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection from an iterator of definitions.
    pub fn from_definitions<I>(definitions: I) -> Self
    where
        I: IntoIterator<Item = ParameterDefinition>,
    {
        let mut ret = Self::new();
        for d in definitions {
            ret.add(d);
        }
        ret
    }

    /// Adds a definition, replacing any existing one with the same
    /// name (order of first insertion is kept).
    pub fn add(&mut self, definition: ParameterDefinition) {
        self.inner
            .insert(definition.name.clone(), Arc::new(definition));
    }

    /// Looks up a definition by name.
    pub fn get(&self, name: &str) -> Option<&Arc<ParameterDefinition>> {
        self.inner.get(name)
    }

    /// Looks up a definition by its short flag form.
    pub fn get_by_short_flag(&self, short: &str) -> Option<&Arc<ParameterDefinition>> {
        self.inner
            .values()
            .find(|d| d.short_flag.as_deref() == Some(short))
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates definitions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ParameterDefinition>> {
        self.inner.values()
    }

    /// Iterates only flag definitions, in insertion order.
    pub fn flags(&self) -> impl Iterator<Item = &Arc<ParameterDefinition>> {
        self.iter().filter(|d| !d.is_argument)
    }

    /// Iterates only positional argument definitions, in insertion
    /// order.
    pub fn arguments(&self) -> impl Iterator<Item = &Arc<ParameterDefinition>> {
        self.iter().filter(|d| d.is_argument)
    }

    /// Merges another collection into this one. Incoming definitions
    /// are cloned, so later mutation of either collection does not
    /// leak into the other.
    pub fn merge(&mut self, other: &ParameterDefinitions) {
        for d in other.iter() {
            self.add(d.as_ref().clone());
        }
    }

    /// Validates every definition plus the cross-definition invariants:
    /// no duplicate short flags, at most one list positional (and only
    /// in last position), and required positionals before optional
    /// ones.
    pub fn validate(&self) -> Result<()> {
        let mut seen_shorts: Vec<&str> = Vec::new();
        for d in self.iter() {
            d.validate()?;
            if let Some(short) = d.short_flag.as_deref() {
                if seen_shorts.contains(&short) {
                    return Err(ParameterError::definition(
                        &d.name,
                        format!("duplicate short flag -{short}"),
                    ));
                }
                seen_shorts.push(short);
            }
        }

        let arguments: Vec<_> = self.arguments().collect();
        let mut seen_optional = false;
        for (i, arg) in arguments.iter().enumerate() {
            if arg.kind.is_list() && i != arguments.len() - 1 {
                return Err(ParameterError::definition(
                    &arg.name,
                    "list positional must be the last argument",
                ));
            }
            if arg.required && seen_optional {
                return Err(ParameterError::definition(
                    &arg.name,
                    "required positional after an optional one",
                ));
            }
            if !arg.required {
                seen_optional = true;
            }
        }
        Ok(())
    }

    /// Parses a YAML list of definitions, checking default validity on
    /// load.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let definitions: Vec<ParameterDefinition> = serde_yaml::from_str(yaml)?;
        let ret = Self::from_definitions(definitions);
        ret.validate()?;
        Ok(ret)
    }

    /// Serializes the definitions back to a YAML list, preserving
    /// insertion order.
    pub fn to_yaml(&self) -> Result<String> {
        let list: Vec<&ParameterDefinition> = self.iter().map(|d| d.as_ref()).collect();
        Ok(serde_yaml::to_string(&list)?)
    }
}

// On the wire a collection is a plain list of definitions; the map
// keying by name is an in-memory detail.
impl Serialize for ParameterDefinitions {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.iter().map(|d| d.as_ref()))
    }
}

impl<'de> Deserialize<'de> for ParameterDefinitions {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let list = Vec::<ParameterDefinition>::deserialize(deserializer)?;
        Ok(Self::from_definitions(list))
    }
}

impl<'a> IntoIterator for &'a ParameterDefinitions {
    type Item = &'a Arc<ParameterDefinition>;
    type IntoIter = indexmap::map::Values<'a, String, Arc<ParameterDefinition>>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_chain() {
        let d = ParameterDefinition::new("format", ParameterKind::Choice)
            .with_help("Output format")
            .with_choices(["json", "yaml"])
            .with_default(json!("json"));
        assert_eq!(d.choices.len(), 2);
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_choice_default_must_be_member() {
        let d = ParameterDefinition::new("format", ParameterKind::Choice)
            .with_choices(["json", "yaml"])
            .with_default(json!("toml"));
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_choice_without_choices_is_invalid() {
        let d = ParameterDefinition::new("format", ParameterKind::Choice);
        assert!(matches!(
            d.validate(),
            Err(ParameterError::Definition { .. })
        ));
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let defs = ParameterDefinitions::from_definitions([
            ParameterDefinition::new("b", ParameterKind::String),
            ParameterDefinition::new("a", ParameterKind::String),
            ParameterDefinition::new("c", ParameterKind::String),
        ]);
        let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_merge_clones_definitions() {
        let mut left = ParameterDefinitions::new();
        left.add(ParameterDefinition::new("a", ParameterKind::String));
        let mut right = ParameterDefinitions::new();
        right.add(ParameterDefinition::new("b", ParameterKind::Integer).with_default(json!(1)));

        left.merge(&right);
        assert_eq!(left.len(), 2);

        // mutating the source afterwards must not affect the merged copy
        right.add(ParameterDefinition::new("b", ParameterKind::Integer).with_default(json!(2)));
        assert_eq!(left.get("b").unwrap().default, Some(json!(1)));
    }

    #[test]
    fn test_list_positional_must_be_last() {
        let defs = ParameterDefinitions::from_definitions([
            ParameterDefinition::new("files", ParameterKind::StringList).as_argument(),
            ParameterDefinition::new("out", ParameterKind::String).as_argument(),
        ]);
        assert!(defs.validate().is_err());
    }

    #[test]
    fn test_required_positional_after_optional_rejected() {
        let defs = ParameterDefinitions::from_definitions([
            ParameterDefinition::new("a", ParameterKind::String).as_argument(),
            ParameterDefinition::new("b", ParameterKind::String).as_argument().required(),
        ]);
        assert!(defs.validate().is_err());
    }

    #[test]
    fn test_multi_character_short_flag_rejected() {
        let def = ParameterDefinition::new("verbose", ParameterKind::Bool).with_short_flag("vv");
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_duplicate_short_flag_rejected() {
        let defs = ParameterDefinitions::from_definitions([
            ParameterDefinition::new("verbose", ParameterKind::Bool).with_short_flag("v"),
            ParameterDefinition::new("version", ParameterKind::Bool).with_short_flag("v"),
        ]);
        assert!(defs.validate().is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let yaml = r#"
- name: limit
  type: int
  help: Max rows
  default: 10
  shortFlag: l
- name: tags
  type: stringList
"#;
        let defs = ParameterDefinitions::from_yaml(yaml).unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs.get("limit").unwrap().kind, ParameterKind::Integer);
        assert_eq!(defs.get("limit").unwrap().short_flag.as_deref(), Some("l"));

        let rendered = defs.to_yaml().unwrap();
        let back = ParameterDefinitions::from_yaml(&rendered).unwrap();
        assert_eq!(back.get("limit").unwrap().default, Some(json!(10)));
    }
}
