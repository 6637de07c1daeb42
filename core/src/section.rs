//! Named groups of parameter definitions.
//!
//! A schema is an ordered map of sections keyed by slug; the
//! well-known `default` section carries top-level parameters. Each
//! section may declare a key prefix used when its parameters are
//! flattened into a shared namespace (environment variables, argv
//! long flags).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::definition::{ParameterDefinition, ParameterDefinitions};
use crate::error::{ParameterError, Result};
use crate::parsed::{ParseStepOption, ParsedParameters};
use crate::value::ParameterValue;

/// Slug of the section holding top-level parameters.
pub const DEFAULT_SECTION_SLUG: &str = "default";

/// A named collection of parameter definitions.
///
/// # Examples
///
/// ```
/// use param_stack_core::section::ParameterSection;
/// use param_stack_core::definition::ParameterDefinition;
/// use param_stack_core::kind::ParameterKind;
///
/// let section = ParameterSection::new("Database", "db")
///     .with_prefix("db_")
///     .with_definition(ParameterDefinition::new("host", ParameterKind::String));
/// assert_eq!(section.prefixed_name("host"), "db_host");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSection {
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefix: String,
    #[serde(default, skip_serializing_if = "ParameterDefinitions::is_empty")]
    pub definitions: ParameterDefinitions,
}

impl ParameterSection {
    /// Creates an empty section.
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            ..Self::default()
        }
    }

    /// Creates the well-known `default` section.
    pub fn default_section() -> Self {
        Self::new("Default", DEFAULT_SECTION_SLUG)
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the flattening prefix. A non-empty prefix also suppresses
    /// short-form flags for this section's parameters.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Adds a definition.
    pub fn with_definition(mut self, definition: ParameterDefinition) -> Self {
        self.definitions.add(definition);
        self
    }

    /// Adds several definitions.
    pub fn with_definitions<I>(mut self, definitions: I) -> Self
    where
        I: IntoIterator<Item = ParameterDefinition>,
    {
        for definition in definitions {
            self.definitions.add(definition);
        }
        self
    }

    /// The flat-namespace name of a parameter in this section.
    pub fn prefixed_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Validates the slug and every definition.
    pub fn validate(&self) -> Result<()> {
        if self.slug.is_empty() {
            return Err(ParameterError::definition(
                &self.name,
                "section slug must not be empty",
            ));
        }
        self.definitions.validate()
    }
}

/// Ordered map of sections keyed by slug.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParameterSections {
    #[serde(flatten)]
    inner: IndexMap<String, ParameterSection>,
}

impl ParameterSections {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a schema from sections, keyed by slug, keeping order.
    pub fn from_sections<I>(sections: I) -> Self
    where
        I: IntoIterator<Item = ParameterSection>,
    {
        let mut ret = Self::new();
        for section in sections {
            ret.add(section);
        }
        ret
    }

    /// Inserts or replaces a section under its slug.
    pub fn add(&mut self, section: ParameterSection) {
        self.inner.insert(section.slug.clone(), section);
    }

    /// Looks up a section by slug.
    pub fn get(&self, slug: &str) -> Option<&ParameterSection> {
        self.inner.get(slug)
    }

    /// The `default` section, when present.
    pub fn default_section(&self) -> Option<&ParameterSection> {
        self.get(DEFAULT_SECTION_SLUG)
    }

    /// Returns a schema containing only the named slugs, in this
    /// schema's order. Unknown slugs are ignored.
    pub fn subset(&self, slugs: &[&str]) -> Self {
        Self {
            inner: self
                .inner
                .iter()
                .filter(|(slug, _)| slugs.contains(&slug.as_str()))
                .map(|(slug, section)| (slug.clone(), section.clone()))
                .collect(),
        }
    }

    /// Iterates sections in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ParameterSection> {
        self.inner.values()
    }

    /// Number of sections.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when no section is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Validates each section and rejects prefixed-name collisions
    /// across sections.
    pub fn validate(&self) -> Result<()> {
        let mut seen: IndexMap<String, &str> = IndexMap::new();
        for section in self.iter() {
            section.validate()?;
            for definition in section.definitions.iter() {
                let flat = section.prefixed_name(&definition.name);
                if let Some(other) = seen.insert(flat.clone(), &section.slug) {
                    return Err(ParameterError::definition(
                        &definition.name,
                        format!(
                            "flattened name '{flat}' collides across sections '{other}' and '{}'",
                            section.slug
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ParameterSections {
    type Item = &'a ParameterSection;
    type IntoIter = indexmap::map::Values<'a, String, ParameterSection>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.values()
    }
}

/// Parsed values for one section.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsedSection {
    pub slug: String,
    pub parameters: ParsedParameters,
}

impl ParsedSection {
    /// Creates an empty parsed section.
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            parameters: ParsedParameters::new(),
        }
    }
}

/// Parsed values for a whole schema, keyed by section slug.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsedSections {
    #[serde(flatten)]
    inner: IndexMap<String, ParsedSection>,
}

impl ParsedSections {
    /// Creates an empty result set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up one section's parsed values.
    pub fn get(&self, slug: &str) -> Option<&ParsedSection> {
        self.inner.get(slug)
    }

    /// Mutable lookup, inserting an empty section when absent.
    pub fn get_or_create(&mut self, slug: &str) -> &mut ParsedSection {
        self.inner
            .entry(slug.to_string())
            .or_insert_with(|| ParsedSection::new(slug))
    }

    /// Looks up a value by section slug and parameter name.
    pub fn get_value(&self, slug: &str, name: &str) -> Option<&ParameterValue> {
        self.inner.get(slug).and_then(|s| s.parameters.get_value(name))
    }

    /// Parsed values of the `default` section, when present.
    pub fn default_parameters(&self) -> Option<&ParsedParameters> {
        self.inner.get(DEFAULT_SECTION_SLUG).map(|s| &s.parameters)
    }

    /// Merges another result set; the other side wins per parameter.
    pub fn merge(&mut self, other: &ParsedSections, options: &[ParseStepOption]) {
        for (slug, section) in &other.inner {
            self.get_or_create(slug)
                .parameters
                .merge(&section.parameters, options);
        }
    }

    /// Iterates `(slug, section)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParsedSection)> {
        self.inner.iter()
    }

    /// Flattens all sections into one JSON map using prefixed names.
    /// The schema supplies each section's prefix.
    pub fn to_flat_map(&self, sections: &ParameterSections) -> IndexMap<String, serde_json::Value> {
        let mut ret = IndexMap::new();
        for (slug, parsed) in &self.inner {
            let prefix = sections.get(slug).map(|s| s.prefix.as_str()).unwrap_or("");
            for (name, parameter) in parsed.parameters.iter() {
                ret.insert(format!("{prefix}{name}"), parameter.value.to_json());
            }
        }
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ParameterKind;

    fn schema() -> ParameterSections {
        ParameterSections::from_sections([
            ParameterSection::default_section()
                .with_definition(ParameterDefinition::new("verbose", ParameterKind::Bool)),
            ParameterSection::new("Database", "db")
                .with_prefix("db_")
                .with_definition(ParameterDefinition::new("host", ParameterKind::String)),
        ])
    }

    #[test]
    fn test_sections_keep_insertion_order() {
        let slugs: Vec<_> = schema().iter().map(|s| s.slug.clone()).collect();
        assert_eq!(slugs, vec!["default", "db"]);
    }

    #[test]
    fn test_subset_keeps_only_named_slugs() {
        let subset = schema().subset(&["db", "missing"]);
        assert_eq!(subset.len(), 1);
        assert!(subset.get("db").is_some());
    }

    #[test]
    fn test_prefixed_name_collision_is_rejected() {
        let sections = ParameterSections::from_sections([
            ParameterSection::default_section()
                .with_definition(ParameterDefinition::new("db_host", ParameterKind::String)),
            ParameterSection::new("Database", "db")
                .with_prefix("db_")
                .with_definition(ParameterDefinition::new("host", ParameterKind::String)),
        ]);
        assert!(sections.validate().is_err());
    }

    #[test]
    fn test_flat_map_applies_prefixes() {
        use crate::value::ParameterValue;
        use std::sync::Arc;

        let sections = schema();
        let mut parsed = ParsedSections::new();
        let def = Arc::new(ParameterDefinition::new("host", ParameterKind::String));
        parsed
            .get_or_create("db")
            .parameters
            .update_value(
                "host",
                def,
                ParameterValue::String("localhost".into()),
                "argv",
                &[],
            )
            .unwrap();

        let flat = parsed.to_flat_map(&sections);
        assert_eq!(flat["db_host"], serde_json::json!("localhost"));
    }
}
