//! Core types of a declarative command-line parameter framework.
//!
//! Commands describe their inputs as typed [`ParameterDefinition`]s
//! grouped into [`ParameterSection`]s; parsing sources produce
//! [`ParsedParameters`] whose every value carries a provenance log of
//! [`ParseStep`]s. This crate holds the type system and coercion
//! rules, the definition and section models, parsed-value provenance,
//! file loading for `*FromFile*` kinds, date parsing, and value
//! rendering.
//!
//! # Example
//!
//! ```
//! use param_stack_core::*;
//!
//! let section = ParameterSection::default_section()
//!     .with_definition(
//!         ParameterDefinition::new("limit", ParameterKind::Integer)
//!             .with_help("Maximum number of rows")
//!             .with_default(serde_json::json!(100)),
//!     )
//!     .with_definition(
//!         ParameterDefinition::new("format", ParameterKind::Choice)
//!             .with_choices(["json", "yaml"])
//!             .with_default(serde_json::json!("json")),
//!     );
//! section.validate().unwrap();
//!
//! let parsed = ParsedParameters::from_defaults(&section.definitions, &[]).unwrap();
//! assert_eq!(parsed.get_value("limit"), Some(&ParameterValue::Integer(100)));
//! assert_eq!(parsed.get("limit").unwrap().log[0].source, "defaults");
//! ```

pub mod date;
pub mod definition;
pub mod error;
pub mod file;
pub mod kind;
pub mod parsed;
pub mod render;
pub mod section;
pub mod value;

pub use date::{parse_date, parse_date_with_reference};
pub use definition::{ParameterDefinition, ParameterDefinitions};
pub use error::{ParameterError, Result};
pub use file::{FileData, FileType};
pub use kind::ParameterKind;
pub use parsed::{
    ParseStep, ParseStepOption, ParsedParameter, ParsedParameters, SOURCE_DEFAULTS, SOURCE_MERGE,
    with_metadata, with_source,
};
pub use render::{mask_secret, render_value};
pub use section::{
    DEFAULT_SECTION_SLUG, ParameterSection, ParameterSections, ParsedSection, ParsedSections,
};
pub use value::{ParameterValue, parse_bool_token};
