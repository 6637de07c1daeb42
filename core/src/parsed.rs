//! Parsed values with per-value provenance logs.
//!
//! Every source that touches a parameter appends a [`ParseStep`] to its
//! log, so the final value can always be explained: which sources
//! contributed, in what order, and with what origin metadata. Metadata
//! maps are copied into each step — mutating a map after recording a
//! step never changes history.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::definition::{ParameterDefinition, ParameterDefinitions};
use crate::error::Result;
use crate::value::ParameterValue;

/// Source label used by the defaults stage.
pub const SOURCE_DEFAULTS: &str = "defaults";
/// Source label used when one parsed collection is merged into another.
pub const SOURCE_MERGE: &str = "merge";

/// One entry in a value's provenance log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseStep {
    /// Identifies the producer (`defaults`, `env`, `argv`, a config
    /// path, …).
    pub source: String,
    /// The value recorded at this step, widened to JSON.
    pub value: Value,
    /// Origin metadata (derived env key, config nesting path, exact
    /// flag token, …).
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, Value>,
}

/// Options applied when recording a parse step.
///
/// Metadata maps are cloned into the step, so several steps built from
/// the same options share no state.
#[derive(Debug, Clone)]
pub enum ParseStepOption {
    /// Overrides the step's source label.
    Source(String),
    /// Merges entries into the step's metadata map. Multiple metadata
    /// options accumulate into the same step.
    Metadata(serde_json::Map<String, Value>),
}

/// Builds a source-override option.
pub fn with_source(source: impl Into<String>) -> ParseStepOption {
    ParseStepOption::Source(source.into())
}

/// Builds a metadata option from key/value pairs.
pub fn with_metadata<I, K>(entries: I) -> ParseStepOption
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    ParseStepOption::Metadata(
        entries
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect(),
    )
}

fn build_step(source: &str, value: Value, options: &[ParseStepOption]) -> ParseStep {
    let mut step = ParseStep {
        source: source.to_string(),
        value,
        metadata: serde_json::Map::new(),
    };
    for option in options {
        match option {
            ParseStepOption::Source(s) => step.source = s.clone(),
            ParseStepOption::Metadata(m) => {
                for (k, v) in m {
                    step.metadata.insert(k.clone(), v.clone());
                }
            }
        }
    }
    step
}

/// A parsed value, its definition back-reference, and its provenance
/// log.
///
/// The last log entry always records the current value. The embedded
/// definition is shared, non-owning; serialization omits it (the
/// collection key identifies the parameter).
#[derive(Debug, Clone, Serialize)]
pub struct ParsedParameter {
    #[serde(skip)]
    pub definition: Arc<ParameterDefinition>,
    pub value: ParameterValue,
    pub log: Vec<ParseStep>,
}

impl ParsedParameter {
    /// Creates a parsed parameter with an initial value and one log
    /// entry for it.
    pub fn new(
        definition: Arc<ParameterDefinition>,
        value: ParameterValue,
        source: &str,
        options: &[ParseStepOption],
    ) -> Self {
        let step = build_step(source, value.to_json(), options);
        Self {
            definition,
            value,
            log: vec![step],
        }
    }

    /// Replaces the value with an already-coerced one and appends a
    /// step. Choice membership is still enforced.
    pub fn update(
        &mut self,
        value: ParameterValue,
        source: &str,
        options: &[ParseStepOption],
    ) -> Result<()> {
        self.definition.check_choices(&value)?;
        self.log.push(build_step(source, value.to_json(), options));
        self.value = value;
        Ok(())
    }

    /// Coerces a raw JSON shape through the definition, then updates.
    pub fn update_from_json(
        &mut self,
        raw: &Value,
        source: &str,
        options: &[ParseStepOption],
    ) -> Result<()> {
        let value = self.definition.coerce_value(raw)?;
        self.log.push(build_step(source, value.to_json(), options));
        self.value = value;
        Ok(())
    }

    /// Overwrites the value and the entire log. Used when provenance
    /// is reconstructed from a serialized program.
    pub fn set(&mut self, value: ParameterValue, log: Vec<ParseStep>) {
        self.value = value;
        self.log = log;
    }

    /// Replaces this value with another's, appending a merge step and
    /// then splicing in the other's log for traceability.
    pub fn merge(&mut self, other: &ParsedParameter, options: &[ParseStepOption]) {
        self.log
            .push(build_step(SOURCE_MERGE, other.value.to_json(), options));
        self.log.extend(other.log.iter().cloned());
        self.value = other.value.clone();
    }
}

/// Insertion-ordered collection of parsed parameters, keyed by name.
///
/// Parallels [`ParameterDefinitions`]; iteration order equals first
/// insertion order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsedParameters {
    #[serde(flatten)]
    inner: IndexMap<String, ParsedParameter>,
}

impl ParsedParameters {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Materializes a defaults-only collection: one entry per
    /// definition with a declared default. Definitions without a
    /// default are skipped entirely (a missing default is not the
    /// zero value).
    pub fn from_defaults(
        definitions: &ParameterDefinitions,
        options: &[ParseStepOption],
    ) -> Result<Self> {
        let mut ret = Self::new();
        for definition in definitions.iter() {
            if let Some(value) = definition.default_value()? {
                ret.set(
                    &definition.name,
                    ParsedParameter::new(definition.clone(), value, SOURCE_DEFAULTS, options),
                );
            }
        }
        Ok(ret)
    }

    /// Looks up a parsed parameter.
    pub fn get(&self, name: &str) -> Option<&ParsedParameter> {
        self.inner.get(name)
    }

    /// Looks up only the value.
    pub fn get_value(&self, name: &str) -> Option<&ParameterValue> {
        self.inner.get(name).map(|p| &p.value)
    }

    /// Inserts or replaces a parsed parameter under the given name.
    pub fn set(&mut self, name: &str, parameter: ParsedParameter) {
        self.inner.insert(name.to_string(), parameter);
    }

    /// Updates an entry, creating it when absent.
    pub fn update_value(
        &mut self,
        name: &str,
        definition: Arc<ParameterDefinition>,
        value: ParameterValue,
        source: &str,
        options: &[ParseStepOption],
    ) -> Result<()> {
        match self.inner.get_mut(name) {
            Some(existing) => existing.update(value, source, options),
            None => {
                self.set(
                    name,
                    ParsedParameter::new(definition, value, source, options),
                );
                Ok(())
            }
        }
    }

    /// Sets a value only when the name has no entry yet. Used by the
    /// defaults stage so that defaults never override provided values.
    pub fn set_as_default(
        &mut self,
        name: &str,
        definition: Arc<ParameterDefinition>,
        value: ParameterValue,
        options: &[ParseStepOption],
    ) {
        if !self.inner.contains_key(name) {
            self.set(
                name,
                ParsedParameter::new(definition, value, SOURCE_DEFAULTS, options),
            );
        }
    }

    /// Merges another collection into this one; the other side wins.
    /// Existing entries merge value and provenance, new entries are
    /// inserted as-is.
    pub fn merge(&mut self, other: &ParsedParameters, options: &[ParseStepOption]) {
        for (name, parameter) in &other.inner {
            match self.inner.get_mut(name) {
                Some(existing) => existing.merge(parameter, options),
                None => {
                    self.inner.insert(name.clone(), parameter.clone());
                }
            }
        }
    }

    /// Merges another collection, but only for names not yet present.
    pub fn merge_as_default(&mut self, other: &ParsedParameters) {
        for (name, parameter) in &other.inner {
            if !self.inner.contains_key(name) {
                self.inner.insert(name.clone(), parameter.clone());
            }
        }
    }

    /// Widens every value to JSON, keyed by name, in insertion order.
    pub fn to_map(&self) -> IndexMap<String, Value> {
        self.inner
            .iter()
            .map(|(name, p)| (name.clone(), p.value.to_json()))
            .collect()
    }

    /// Iterates `(name, parameter)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParsedParameter)> {
        self.inner.iter()
    }

    /// Number of parsed parameters.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when nothing has been parsed.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ParameterKind;
    use serde_json::json;

    fn def(name: &str, kind: ParameterKind) -> Arc<ParameterDefinition> {
        Arc::new(ParameterDefinition::new(name, kind))
    }

    #[test]
    fn test_update_appends_step_with_current_value() {
        let d = def("limit", ParameterKind::Integer);
        let mut p = ParsedParameter::new(d, ParameterValue::Integer(10), SOURCE_DEFAULTS, &[]);
        p.update(ParameterValue::Integer(20), "env", &[]).unwrap();

        assert_eq!(p.value, ParameterValue::Integer(20));
        assert_eq!(p.log.len(), 2);
        assert_eq!(p.log[1].source, "env");
        assert_eq!(p.log.last().unwrap().value, json!(20));
    }

    #[test]
    fn test_merge_appends_merge_step_then_splices_other_log() {
        let d = def("host", ParameterKind::String);
        let mut base = ParsedParameter::new(
            d.clone(),
            ParameterValue::String("a".into()),
            SOURCE_DEFAULTS,
            &[],
        );
        let other = ParsedParameter::new(d, ParameterValue::String("b".into()), "argv", &[]);

        base.merge(&other, &[]);
        assert_eq!(base.value, ParameterValue::String("b".into()));
        let sources: Vec<_> = base.log.iter().map(|s| s.source.as_str()).collect();
        assert_eq!(sources, vec!["defaults", "merge", "argv"]);
        assert_eq!(base.log.last().unwrap().value, json!("b"));
    }

    #[test]
    fn test_metadata_is_isolated_per_step() {
        let d = def("x", ParameterKind::String);
        let meta = with_metadata([("origin", json!("first"))]);
        let mut p = ParsedParameter::new(
            d,
            ParameterValue::String("1".into()),
            "argv",
            std::slice::from_ref(&meta),
        );
        // reusing the same option for a second step must not alias maps
        p.update(
            ParameterValue::String("2".into()),
            "argv",
            std::slice::from_ref(&meta),
        )
        .unwrap();
        p.log[1]
            .metadata
            .insert("origin".to_string(), json!("mutated"));

        assert_eq!(p.log[0].metadata["origin"], json!("first"));
        assert_eq!(p.log[1].metadata["origin"], json!("mutated"));
    }

    #[test]
    fn test_multiple_metadata_options_accumulate() {
        let d = def("x", ParameterKind::String);
        let p = ParsedParameter::new(
            d,
            ParameterValue::String("1".into()),
            "argv",
            &[
                with_metadata([("a", json!(1))]),
                with_metadata([("b", json!(2))]),
            ],
        );
        assert_eq!(p.log[0].metadata.len(), 2);
    }

    #[test]
    fn test_from_defaults_skips_missing_defaults() {
        let defs = ParameterDefinitions::from_definitions([
            ParameterDefinition::new("a", ParameterKind::Integer).with_default(json!(5)),
            ParameterDefinition::new("b", ParameterKind::Integer),
        ]);
        let parsed = ParsedParameters::from_defaults(&defs, &[]).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.get_value("a"), Some(&ParameterValue::Integer(5)));
        assert!(parsed.get("b").is_none());
    }

    #[test]
    fn test_set_as_default_does_not_override() {
        let d = def("a", ParameterKind::String);
        let mut parsed = ParsedParameters::new();
        parsed
            .update_value(
                "a",
                d.clone(),
                ParameterValue::String("explicit".into()),
                "argv",
                &[],
            )
            .unwrap();
        parsed.set_as_default("a", d, ParameterValue::String("default".into()), &[]);
        assert_eq!(
            parsed.get_value("a"),
            Some(&ParameterValue::String("explicit".into()))
        );
    }

    #[test]
    fn test_serialization_omits_definition() {
        let d = def("a", ParameterKind::Integer);
        let mut parsed = ParsedParameters::new();
        parsed
            .update_value("a", d, ParameterValue::Integer(3), "argv", &[])
            .unwrap();
        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["a"]["value"], json!(3));
        assert!(json["a"].get("definition").is_none());
        assert_eq!(json["a"]["log"][0]["source"], "argv");
    }
}
