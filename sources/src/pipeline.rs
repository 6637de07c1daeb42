//! The ordered merge pipeline.
//!
//! Sources run lowest precedence first; each later source overrides
//! what earlier ones parsed, while every override is recorded in the
//! value's provenance log. The default composition is
//! `defaults → config files → default profile → named profile →
//! env → argv`.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::debug;

use param_stack_core::error::ParameterError;
use param_stack_core::parsed::SOURCE_DEFAULTS;
use param_stack_core::section::{ParameterSections, ParsedSections};

use crate::argv::ArgvSource;
use crate::config::ConfigFileSource;
use crate::env::EnvSource;
use crate::profile::{
    DEFAULT_PROFILE, ProfileSelection, ProfileSource, profile_from_argv, resolve_profile,
};

/// A pipeline error annotated with where it happened.
#[derive(Debug, Error)]
#[error("stage {stage} ({source_name}) failed for {section}/{name}: {inner}")]
pub struct SourceError {
    /// Source label (`argv`, `env`, `config`, …).
    pub source_name: String,
    /// Section slug, empty when not tied to one section.
    pub section: String,
    /// Parameter name, empty when not tied to one parameter.
    pub name: String,
    /// Zero-based position in the pipeline; filled in by the pipeline.
    pub stage: usize,
    #[source]
    pub inner: ParameterError,
}

impl SourceError {
    pub fn new(source_name: &str, section: &str, name: &str, inner: ParameterError) -> Self {
        Self {
            source_name: source_name.to_string(),
            section: section.to_string(),
            name: name.to_string(),
            stage: 0,
            inner,
        }
    }

    fn at_stage(mut self, stage: usize) -> Self {
        self.stage = stage;
        self
    }

    /// Unwraps the underlying parameter error.
    pub fn into_inner(self) -> ParameterError {
        self.inner
    }
}

/// Cooperative cancellation shared between a host and the pipeline.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; sources observe it before their next I/O
    /// boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Per-run context threaded through every source.
#[derive(Debug, Clone, Default)]
pub struct SourceContext {
    cancellation: CancellationToken,
}

impl SourceContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self { cancellation: token }
    }

    /// Fails with [`ParameterError::Cancelled`] once cancellation was
    /// requested. Sources call this before each I/O boundary.
    pub fn check(&self) -> Result<(), ParameterError> {
        if self.cancellation.is_cancelled() {
            Err(ParameterError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// One stage of the merge pipeline.
pub trait Source {
    /// Label recorded as the `source` of every parse step this stage
    /// writes.
    fn name(&self) -> &str;

    /// Parses this stage's presentation of the schema into `parsed`,
    /// overriding earlier values.
    fn apply(
        &self,
        sections: &ParameterSections,
        parsed: &mut ParsedSections,
        ctx: &SourceContext,
    ) -> Result<(), SourceError>;
}

/// The declared-defaults stage. Lowest precedence; never overrides.
pub struct DefaultsSource;

impl Source for DefaultsSource {
    fn name(&self) -> &str {
        SOURCE_DEFAULTS
    }

    fn apply(
        &self,
        sections: &ParameterSections,
        parsed: &mut ParsedSections,
        ctx: &SourceContext,
    ) -> Result<(), SourceError> {
        ctx.check()
            .map_err(|e| SourceError::new(SOURCE_DEFAULTS, "", "", e))?;
        for section in sections.iter() {
            for definition in section.definitions.iter() {
                let value = definition.default_value().map_err(|e| {
                    SourceError::new(SOURCE_DEFAULTS, &section.slug, &definition.name, e)
                })?;
                if let Some(value) = value {
                    parsed
                        .get_or_create(&section.slug)
                        .parameters
                        .set_as_default(&definition.name, definition.clone(), value, &[]);
                }
            }
        }
        Ok(())
    }
}

/// Options for the profile stages of [`Pipeline::with_profile`].
#[derive(Debug, Clone, Default)]
pub struct ProfileOptions {
    /// The profile document. No stages are added without one.
    pub file: Option<PathBuf>,
    /// Explicit profile name, overriding resolution.
    pub profile: Option<String>,
    /// Environment variable consulted for the profile name.
    pub env_var: Option<String>,
    /// Config files consulted for a `profile-settings` entry.
    pub config_files: Vec<PathBuf>,
    /// Argv tokens scanned for `--profile`.
    pub args: Vec<String>,
}

/// Ordered list of sources, built lowest precedence first.
///
/// # Examples
///
/// ```no_run
/// use param_stack_core::ParameterSections;
/// use param_stack_sources::pipeline::{Pipeline, SourceContext};
///
/// let sections = ParameterSections::new();
/// let args: Vec<String> = std::env::args().skip(1).collect();
/// let parsed = Pipeline::new()
///     .with_defaults()
///     .with_config_files(["/etc/myapp/config.yaml"])
///     .with_env(Some("MYAPP"))
///     .with_argv(&args)
///     .run(&sections, &SourceContext::new())?;
/// # Ok::<(), param_stack_sources::pipeline::SourceError>(())
/// ```
#[derive(Default)]
pub struct Pipeline {
    sources: Vec<Box<dyn Source>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends any source as the next (higher-precedence) stage.
    pub fn with_source(mut self, source: impl Source + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Appends the declared-defaults stage.
    pub fn with_defaults(self) -> Self {
        self.with_source(DefaultsSource)
    }

    /// Appends one stage per config file, in the given order; later
    /// files win.
    pub fn with_config_files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for path in paths {
            self = self.with_source(ConfigFileSource::new(path));
        }
        self
    }

    /// Appends the default-profile stage and, when the resolved
    /// profile differs, a named-profile stage above it. Resolution
    /// errors surface when the pipeline runs.
    pub fn with_profile(mut self, options: ProfileOptions) -> Self {
        let Some(file) = options.file else {
            return self;
        };
        let selection = ProfileSelection {
            profile: options.profile.or_else(|| profile_from_argv(&options.args)),
            env_var: options.env_var,
            config_files: options.config_files,
        };
        self = self.with_source(ProfileSource::new(&file, DEFAULT_PROFILE, false));
        match resolve_profile(&selection) {
            Ok(name) if name != DEFAULT_PROFILE => {
                self.with_source(ProfileSource::new(&file, name, true))
            }
            Ok(_) => self,
            Err(e) => self.with_source(FailedSource(Some(e))),
        }
    }

    /// Appends the environment stage.
    pub fn with_env(self, app_prefix: Option<&str>) -> Self {
        self.with_source(EnvSource::new(app_prefix))
    }

    /// Appends the argv stage. Highest precedence in the default
    /// composition.
    pub fn with_argv(self, args: &[String]) -> Self {
        self.with_source(ArgvSource::new(args.iter().cloned()))
    }

    /// Runs every source in order. The first error aborts the run;
    /// later sources are not attempted.
    pub fn run(
        &self,
        sections: &ParameterSections,
        ctx: &SourceContext,
    ) -> Result<ParsedSections, SourceError> {
        sections
            .validate()
            .map_err(|e| SourceError::new("schema", "", "", e))?;
        let mut parsed = ParsedSections::new();
        for (stage, source) in self.sources.iter().enumerate() {
            debug!(stage, source = source.name(), "running pipeline stage");
            source
                .apply(sections, &mut parsed, ctx)
                .map_err(|e| e.at_stage(stage))?;
        }
        Ok(parsed)
    }
}

/// Carries a deferred error into the run, so builder methods stay
/// infallible.
struct FailedSource(Option<ParameterError>);

impl Source for FailedSource {
    fn name(&self) -> &str {
        "deferred-error"
    }

    fn apply(
        &self,
        _sections: &ParameterSections,
        _parsed: &mut ParsedSections,
        _ctx: &SourceContext,
    ) -> Result<(), SourceError> {
        let message = self
            .0
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "deferred pipeline error".to_string());
        Err(SourceError::new(
            self.name(),
            "",
            "",
            ParameterError::definition("profile", message),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use param_stack_core::definition::ParameterDefinition;
    use param_stack_core::kind::ParameterKind;
    use param_stack_core::section::ParameterSection;
    use param_stack_core::value::ParameterValue;
    use serde_json::json;

    fn schema() -> ParameterSections {
        ParameterSections::from_sections([ParameterSection::default_section().with_definition(
            ParameterDefinition::new("limit", ParameterKind::Integer).with_default(json!(10)),
        )])
    }

    #[test]
    fn test_defaults_then_argv_override() {
        let args: Vec<String> = vec!["--limit".into(), "20".into()];
        let parsed = Pipeline::new()
            .with_defaults()
            .with_argv(&args)
            .run(&schema(), &SourceContext::new())
            .unwrap();

        assert_eq!(
            parsed.get_value("default", "limit"),
            Some(&ParameterValue::Integer(20))
        );
        let log = &parsed
            .get("default")
            .unwrap()
            .parameters
            .get("limit")
            .unwrap()
            .log;
        let sources: Vec<_> = log.iter().map(|s| s.source.as_str()).collect();
        assert_eq!(sources, vec!["defaults", "argv"]);
    }

    #[test]
    fn test_cancellation_aborts_before_parsing() {
        let token = CancellationToken::new();
        token.cancel();
        let args: Vec<String> = vec!["--limit".into(), "20".into()];
        let err = Pipeline::new()
            .with_defaults()
            .with_argv(&args)
            .run(&schema(), &SourceContext::with_cancellation(token))
            .unwrap_err();
        assert!(matches!(err.into_inner(), ParameterError::Cancelled));
    }

    #[test]
    fn test_first_error_aborts_pipeline() {
        let args: Vec<String> = vec!["--limit".into(), "nope".into()];
        let err = Pipeline::new()
            .with_defaults()
            .with_argv(&args)
            .run(&schema(), &SourceContext::new())
            .unwrap_err();
        assert_eq!(err.stage, 1);
        assert_eq!(err.source_name, "argv");
        assert_eq!(err.name, "limit");
    }
}
