//! Parameter sources and the ordered merge pipeline.
//!
//! Each source parses one presentation of a parameter schema — argv
//! tokens, environment variables, config files, profile files, or
//! caller-supplied maps — and the [`pipeline::Pipeline`] composes them
//! lowest precedence first:
//!
//! `defaults → config files → default profile → named profile → env →
//! argv`
//!
//! Every value a source contributes carries a provenance step, so the
//! final merged set can explain where each value came from. The
//! [`capture`] module inverts the whole affair, rebuilding a
//! replayable argv line from a parsed invocation.
//!
//! # Example
//!
//! ```
//! use param_stack_core::*;
//! use param_stack_sources::pipeline::{Pipeline, SourceContext};
//!
//! let sections = ParameterSections::from_sections([
//!     ParameterSection::default_section().with_definition(
//!         ParameterDefinition::new("limit", ParameterKind::Integer)
//!             .with_default(serde_json::json!(100)),
//!     ),
//! ]);
//!
//! let args = vec!["--limit".to_string(), "25".to_string()];
//! let parsed = Pipeline::new()
//!     .with_defaults()
//!     .with_argv(&args)
//!     .run(&sections, &SourceContext::new())
//!     .unwrap();
//!
//! assert_eq!(
//!     parsed.get_value("default", "limit"),
//!     Some(&ParameterValue::Integer(25))
//! );
//! ```

pub mod argv;
pub mod capture;
pub mod config;
pub mod env;
pub mod map;
pub mod pipeline;
pub mod profile;
pub mod strings;

pub use argv::{ArgvSource, split_value_token};
pub use capture::{Program, ProgramParameter};
pub use config::ConfigFileSource;
pub use env::EnvSource;
pub use map::{MapOptions, MapSource, parse_map};
pub use pipeline::{
    CancellationToken, DefaultsSource, Pipeline, ProfileOptions, Source, SourceContext,
    SourceError,
};
pub use profile::{ProfileSelection, ProfileSource, resolve_profile};
pub use strings::{parse_tokens, parse_tokens_with_reference};
