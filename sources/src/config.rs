//! Configuration-file source: nested YAML or JSON documents.
//!
//! Top-level keys matching a section slug hold that section's values;
//! top-level keys matching a default-section definition are consumed
//! leaf-qualified. Keys matching nothing are left alone, so one
//! document can feed several commands.

use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tracing::debug;

use param_stack_core::error::{ParameterError, Result};
use param_stack_core::file::yaml_to_json;
use param_stack_core::parsed::with_metadata;
use param_stack_core::section::{
    DEFAULT_SECTION_SLUG, ParameterSection, ParameterSections, ParsedSections,
};

use crate::pipeline::{Source, SourceContext, SourceError};

/// Stage label recorded in parse steps produced by this source.
pub const SOURCE_CONFIG: &str = "config";

/// Top-level section carrying pipeline settings such as the active
/// profile.
pub const PROFILE_SETTINGS_KEY: &str = "profile-settings";

/// Loads a YAML or JSON config document as JSON. Returns `None` when
/// the file does not exist; a present but unreadable or malformed file
/// is an error.
pub fn load_config_document(path: &Path) -> Result<Option<Value>> {
    let display = path.display().to_string();
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ParameterError::SourceIo {
                path: display,
                source: e,
            });
        }
    };
    let parsed = if display.ends_with(".json") {
        serde_json::from_str(&content)?
    } else {
        yaml_to_json(serde_yaml::from_str(&content)?)
    };
    match parsed {
        obj @ Value::Object(_) => Ok(Some(obj)),
        Value::Null => Ok(Some(Value::Object(serde_json::Map::new()))),
        _ => Err(ParameterError::FileFormat {
            path: display,
            message: "config document must be a mapping".to_string(),
        }),
    }
}

/// Applies one section's sub-map of a document onto the parsed set.
pub(crate) fn apply_section_map(
    section: &ParameterSection,
    map: &serde_json::Map<String, Value>,
    parsed: &mut ParsedSections,
    source: &str,
    file: &str,
    path_prefix: &str,
) -> std::result::Result<(), SourceError> {
    for definition in section.definitions.iter() {
        let Some(raw) = map.get(&definition.name) else {
            continue;
        };
        let fail = |e| SourceError::new(source, &section.slug, &definition.name, e);
        let value = definition.coerce_value(raw).map_err(fail)?;
        parsed
            .get_or_create(&section.slug)
            .parameters
            .update_value(
                &definition.name,
                definition.clone(),
                value,
                source,
                &[with_metadata([
                    ("file", json!(file)),
                    ("path", json!(format!("{path_prefix}{}", definition.name))),
                ])],
            )
            .map_err(fail)?;
    }
    Ok(())
}

/// One configuration file as a pipeline stage. A missing file
/// contributes nothing.
pub struct ConfigFileSource {
    path: PathBuf,
}

impl ConfigFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Source for ConfigFileSource {
    fn name(&self) -> &str {
        SOURCE_CONFIG
    }

    fn apply(
        &self,
        sections: &ParameterSections,
        parsed: &mut ParsedSections,
        ctx: &SourceContext,
    ) -> std::result::Result<(), SourceError> {
        ctx.check()
            .map_err(|e| SourceError::new(SOURCE_CONFIG, "", "", e))?;
        let file = self.path.display().to_string();
        let Some(doc) = load_config_document(&self.path)
            .map_err(|e| SourceError::new(SOURCE_CONFIG, "", "", e))?
        else {
            debug!(file = %file, "config file absent, skipping");
            return Ok(());
        };
        let doc = doc.as_object().cloned().unwrap_or_default();

        for section in sections.iter() {
            if let Some(Value::Object(map)) = doc.get(&section.slug) {
                apply_section_map(
                    section,
                    map,
                    parsed,
                    SOURCE_CONFIG,
                    &file,
                    &format!("{}.", section.slug),
                )?;
            }
        }
        // leaf-qualified top-level keys feed the default section
        if let Some(section) = sections.default_section() {
            let leaves: serde_json::Map<String, Value> = doc
                .iter()
                .filter(|(k, _)| {
                    sections.get(k).is_none()
                        && *k != PROFILE_SETTINGS_KEY
                        && section.definitions.get(k).is_some()
                })
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            apply_section_map(section, &leaves, parsed, SOURCE_CONFIG, &file, "")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use param_stack_core::definition::ParameterDefinition;
    use param_stack_core::kind::ParameterKind;
    use param_stack_core::value::ParameterValue;
    use std::io::Write;

    fn schema() -> ParameterSections {
        ParameterSections::from_sections([
            ParameterSection::default_section()
                .with_definition(ParameterDefinition::new("limit", ParameterKind::Integer)),
            ParameterSection::new("Database", "db")
                .with_prefix("db_")
                .with_definition(ParameterDefinition::new("host", ParameterKind::String)),
        ])
    }

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_section_and_leaf_qualified_keys() {
        let f = write_config("limit: 5\ndb:\n  host: config.example\nunknown: ignored\n");
        let mut parsed = ParsedSections::new();
        ConfigFileSource::new(f.path())
            .apply(&schema(), &mut parsed, &SourceContext::new())
            .unwrap();

        assert_eq!(
            parsed.get_value("default", "limit"),
            Some(&ParameterValue::Integer(5))
        );
        assert_eq!(
            parsed.get_value("db", "host"),
            Some(&ParameterValue::String("config.example".into()))
        );
        let step = &parsed.get("db").unwrap().parameters.get("host").unwrap().log[0];
        assert_eq!(step.metadata["path"], "db.host");
    }

    #[test]
    fn test_missing_file_contributes_nothing() {
        let mut parsed = ParsedSections::new();
        ConfigFileSource::new("/nonexistent/config.yaml")
            .apply(&schema(), &mut parsed, &SourceContext::new())
            .unwrap();
        assert!(parsed.get("default").is_none());
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let f = write_config("- just\n- a\n- list\n");
        let mut parsed = ParsedSections::new();
        let err = ConfigFileSource::new(f.path())
            .apply(&schema(), &mut parsed, &SourceContext::new())
            .unwrap_err();
        assert!(matches!(
            err.into_inner(),
            ParameterError::FileFormat { .. }
        ));
    }
}
