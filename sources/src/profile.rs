//! Profile files: named bundles of section-structured values.
//!
//! A profile document is keyed by profile name, each profile holding
//! section-slug children. The active profile name resolves from, in
//! order: an explicit `--profile` argv flag, an environment variable,
//! the `profile-settings` section of any config file, and finally the
//! compiled-in `default`.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use param_stack_core::error::{ParameterError, Result};
use param_stack_core::section::{ParameterSections, ParsedSections};

use crate::config::{PROFILE_SETTINGS_KEY, apply_section_map, load_config_document};
use crate::pipeline::{Source, SourceContext, SourceError};

/// Stage label recorded in parse steps produced by this source.
pub const SOURCE_PROFILE: &str = "profile";

/// Name of the compiled-in fallback profile.
pub const DEFAULT_PROFILE: &str = "default";

/// Inputs for resolving the active profile name.
#[derive(Debug, Clone, Default)]
pub struct ProfileSelection {
    /// Explicit override, wins over everything.
    pub profile: Option<String>,
    /// Environment variable holding the profile name.
    pub env_var: Option<String>,
    /// Config files whose `profile-settings.profile` key is consulted,
    /// in order; the first hit wins.
    pub config_files: Vec<PathBuf>,
}

/// Finds the `--profile` flag in raw argv tokens.
pub fn profile_from_argv(args: &[String]) -> Option<String> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--" {
            return None;
        }
        if arg == "--profile" {
            return iter.next().cloned();
        }
        if let Some(name) = arg.strip_prefix("--profile=") {
            return Some(name.to_string());
        }
    }
    None
}

/// Resolves the active profile name.
pub fn resolve_profile(selection: &ProfileSelection) -> Result<String> {
    if let Some(name) = &selection.profile {
        return Ok(name.clone());
    }
    if let Some(var) = &selection.env_var {
        if let Ok(name) = std::env::var(var) {
            if !name.is_empty() {
                return Ok(name);
            }
        }
    }
    for path in &selection.config_files {
        if let Some(doc) = load_config_document(path)? {
            if let Some(name) = doc
                .get(PROFILE_SETTINGS_KEY)
                .and_then(|s| s.get("profile"))
                .and_then(Value::as_str)
            {
                return Ok(name.to_string());
            }
        }
    }
    Ok(DEFAULT_PROFILE.to_string())
}

/// One profile applied from a profile document as a pipeline stage.
pub struct ProfileSource {
    file: PathBuf,
    profile: String,
    /// When set, a missing file or missing profile entry is an error.
    /// The implicit default-profile stage leaves this off.
    required: bool,
}

impl ProfileSource {
    pub fn new(file: impl Into<PathBuf>, profile: impl Into<String>, required: bool) -> Self {
        Self {
            file: file.into(),
            profile: profile.into(),
            required,
        }
    }

    fn missing(&self, what: &str) -> SourceError {
        SourceError::new(
            SOURCE_PROFILE,
            "",
            &self.profile,
            ParameterError::FileFormat {
                path: self.file.display().to_string(),
                message: format!("{what} for profile {:?}", self.profile),
            },
        )
    }
}

impl Source for ProfileSource {
    fn name(&self) -> &str {
        SOURCE_PROFILE
    }

    fn apply(
        &self,
        sections: &ParameterSections,
        parsed: &mut ParsedSections,
        ctx: &SourceContext,
    ) -> std::result::Result<(), SourceError> {
        ctx.check()
            .map_err(|e| SourceError::new(SOURCE_PROFILE, "", "", e))?;
        let Some(doc) = load_config_document(&self.file)
            .map_err(|e| SourceError::new(SOURCE_PROFILE, "", "", e))?
        else {
            if self.required {
                return Err(self.missing("profile file not found"));
            }
            debug!(file = %self.file.display(), "profile file absent, skipping");
            return Ok(());
        };

        let Some(Value::Object(profile)) = doc.get(&self.profile) else {
            if self.required {
                return Err(self.missing("no such profile"));
            }
            return Ok(());
        };

        let file = self.file.display().to_string();
        for section in sections.iter() {
            if let Some(Value::Object(map)) = profile.get(&section.slug) {
                apply_section_map(
                    section,
                    map,
                    parsed,
                    SOURCE_PROFILE,
                    &file,
                    &format!("{}.{}.", self.profile, section.slug),
                )?;
            }
        }
        Ok(())
    }
}

/// Applies a profile document directly without a file, for embedded
/// hosts that carry profiles in memory.
pub fn apply_profile_map(
    sections: &ParameterSections,
    profile_map: &serde_json::Map<String, Value>,
    parsed: &mut ParsedSections,
    origin: &str,
) -> std::result::Result<(), SourceError> {
    for section in sections.iter() {
        if let Some(Value::Object(map)) = profile_map.get(&section.slug) {
            apply_section_map(section, map, parsed, SOURCE_PROFILE, origin, "")?;
        }
    }
    Ok(())
}
