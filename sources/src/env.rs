//! Environment-variable source.
//!
//! Keys derive from the fully-prefixed parameter name: uppercased,
//! with `-` and `.` rewritten to `_`, under an optional
//! application-wide prefix. Absent keys contribute nothing.

use std::collections::HashMap;

use serde_json::json;
use tracing::debug;

use param_stack_core::parsed::with_metadata;
use param_stack_core::section::{ParameterSection, ParameterSections, ParsedSections};

use crate::pipeline::{Source, SourceContext, SourceError};
use crate::strings::parse_tokens;

/// Stage label recorded in parse steps produced by this source.
pub const SOURCE_ENV: &str = "env";

/// Derives the environment key for a parameter.
///
/// # Examples
///
/// ```
/// use param_stack_core::ParameterSection;
/// use param_stack_sources::env::derive_env_key;
///
/// let section = ParameterSection::new("Database", "db").with_prefix("db_");
/// assert_eq!(derive_env_key(Some("APP"), &section, "host-name"), "APP_DB_HOST_NAME");
/// ```
pub fn derive_env_key(app_prefix: Option<&str>, section: &ParameterSection, name: &str) -> String {
    let full = section.prefixed_name(name);
    let mut key = String::new();
    if let Some(prefix) = app_prefix {
        if !prefix.is_empty() {
            key.push_str(prefix);
            key.push('_');
        }
    }
    for c in full.chars() {
        match c {
            '-' | '.' => key.push('_'),
            other => key.extend(other.to_uppercase()),
        }
    }
    key
}

/// The environment stage. Reads from the process environment by
/// default; tests inject a map.
pub struct EnvSource {
    app_prefix: Option<String>,
    overrides: Option<HashMap<String, String>>,
}

impl EnvSource {
    /// Creates a source reading the process environment.
    pub fn new(app_prefix: Option<&str>) -> Self {
        Self {
            app_prefix: app_prefix.map(String::from),
            overrides: None,
        }
    }

    /// Creates a source reading from a fixed map instead of the
    /// process environment.
    pub fn from_map<I, K, V>(app_prefix: Option<&str>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            app_prefix: app_prefix.map(String::from),
            overrides: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    fn lookup(&self, key: &str) -> Option<String> {
        match &self.overrides {
            Some(map) => map.get(key).cloned(),
            None => std::env::var(key).ok(),
        }
    }
}

impl Source for EnvSource {
    fn name(&self) -> &str {
        SOURCE_ENV
    }

    fn apply(
        &self,
        sections: &ParameterSections,
        parsed: &mut ParsedSections,
        ctx: &SourceContext,
    ) -> std::result::Result<(), SourceError> {
        ctx.check()
            .map_err(|e| SourceError::new(SOURCE_ENV, "", "", e))?;
        for section in sections.iter() {
            for definition in section.definitions.flags() {
                let key = derive_env_key(self.app_prefix.as_deref(), section, &definition.name);
                let Some(raw) = self.lookup(&key) else {
                    continue;
                };
                debug!(key = %key, name = %definition.name, "parsing environment value");
                let fail =
                    |e| SourceError::new(SOURCE_ENV, &section.slug, &definition.name, e);
                let value = parse_tokens(definition, &[raw]).map_err(fail)?;
                parsed
                    .get_or_create(&section.slug)
                    .parameters
                    .update_value(
                        &definition.name,
                        definition.clone(),
                        value,
                        SOURCE_ENV,
                        &[with_metadata([("key", json!(key))])],
                    )
                    .map_err(fail)?;
            }
        }
        Ok(())
    }
}
