//! Key-indexed map sources: caller-supplied values for one section.
//!
//! Hosts embedding the pipeline (scripted invocations, command
//! re-invocation, test fixtures) supply values as a name→JSON map.
//! String raws route through the list-of-strings parser; anything else
//! is coerced directly.

use indexmap::IndexMap;
use serde_json::Value;

use param_stack_core::definition::ParameterDefinitions;
use param_stack_core::error::{ParameterError, Result};
use param_stack_core::parsed::{ParsedParameters, SOURCE_DEFAULTS};
use param_stack_core::section::{ParameterSections, ParsedSections};

use crate::pipeline::{Source, SourceContext, SourceError};
use crate::strings::parse_tokens;

/// Stage label recorded in parse steps produced by map sources.
pub const SOURCE_MAP: &str = "map";

/// Behavior switches for [`parse_map`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MapOptions {
    /// Fill absent names from definition defaults.
    pub use_defaults: bool,
    /// Fail when a required definition has neither a map entry nor a
    /// default.
    pub check_required: bool,
}

/// Parses a name-indexed map against one section's definitions.
/// Lookup is by name first, then by short form.
pub fn parse_map(
    definitions: &ParameterDefinitions,
    values: &IndexMap<String, Value>,
    options: MapOptions,
    source: &str,
) -> Result<ParsedParameters> {
    let mut parsed = ParsedParameters::new();
    for definition in definitions.iter() {
        let raw = values.get(&definition.name).or_else(|| {
            definition
                .short_flag
                .as_deref()
                .and_then(|short| values.get(short))
        });
        match raw {
            Some(Value::String(s)) => {
                let value = parse_tokens(definition, &[s.clone()])?;
                parsed.update_value(&definition.name, definition.clone(), value, source, &[])?;
            }
            Some(other) => {
                let value = definition.coerce_value(other)?;
                parsed.update_value(&definition.name, definition.clone(), value, source, &[])?;
            }
            None => {
                if options.use_defaults {
                    if let Some(value) = definition.default_value()? {
                        parsed.set_as_default(&definition.name, definition.clone(), value, &[]);
                        continue;
                    }
                }
                if options.check_required && definition.required {
                    return Err(ParameterError::MissingRequired {
                        name: definition.name.clone(),
                    });
                }
            }
        }
    }
    Ok(parsed)
}

/// A pipeline stage applying one section's map values as overrides.
pub struct MapSource {
    slug: String,
    values: IndexMap<String, Value>,
    as_default: bool,
}

impl MapSource {
    /// Values override anything parsed earlier.
    pub fn new<I, K>(slug: &str, values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            slug: slug.to_string(),
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            as_default: false,
        }
    }

    /// Values apply only where nothing was parsed yet.
    pub fn as_default<I, K>(slug: &str, values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut ret = Self::new(slug, values);
        ret.as_default = true;
        ret
    }
}

impl Source for MapSource {
    fn name(&self) -> &str {
        SOURCE_MAP
    }

    fn apply(
        &self,
        sections: &ParameterSections,
        parsed: &mut ParsedSections,
        ctx: &SourceContext,
    ) -> std::result::Result<(), SourceError> {
        ctx.check()
            .map_err(|e| SourceError::new(SOURCE_MAP, &self.slug, "", e))?;
        let Some(section) = sections.get(&self.slug) else {
            return Ok(());
        };
        let incoming = parse_map(
            &section.definitions,
            &self.values,
            MapOptions::default(),
            if self.as_default { SOURCE_DEFAULTS } else { SOURCE_MAP },
        )
        .map_err(|e| SourceError::new(SOURCE_MAP, &self.slug, "", e))?;

        let target = &mut parsed.get_or_create(&self.slug).parameters;
        if self.as_default {
            target.merge_as_default(&incoming);
        } else {
            target.merge(&incoming, &[]);
        }
        Ok(())
    }
}
