//! Binding parsed parameter values onto application records.
//!
//! A [`spec::BindingSpec`] maps parameter names (including glob
//! wildcards and embedded-JSON fields) to the fields of a serde
//! record; [`binder::bind_with_spec`] assembles the record in one
//! transactional step. The [`datamap`] module runs the other way,
//! flattening a record back into a name→value map for capture and
//! re-invocation.
//!
//! # Example
//!
//! ```
//! use param_stack_bind::{BindingSpec, ParameterRecord, bind};
//! use param_stack_core::{
//!     ParameterDefinition, ParameterKind, ParameterValue, ParsedParameters, Result,
//! };
//! use std::sync::Arc;
//!
//! #[derive(serde::Deserialize)]
//! struct Settings {
//!     limit: i64,
//! }
//!
//! impl ParameterRecord for Settings {
//!     fn binding_spec() -> Result<BindingSpec> {
//!         BindingSpec::new().field("limit", "limit")
//!     }
//! }
//!
//! let mut parsed = ParsedParameters::new();
//! parsed.update_value(
//!     "limit",
//!     Arc::new(ParameterDefinition::new("limit", ParameterKind::Integer)),
//!     ParameterValue::Integer(42),
//!     "argv",
//!     &[],
//! ).unwrap();
//!
//! let settings: Settings = bind(&parsed).unwrap();
//! assert_eq!(settings.limit, 42);
//! ```

pub mod binder;
pub mod datamap;
pub mod spec;

pub use binder::{bind, bind_with_spec};
pub use datamap::{seed_defaults_from_record, to_datamap};
pub use spec::{BindingSpec, FieldBinding, FileFacet, ParameterRecord};
