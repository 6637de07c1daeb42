//! The binding spec: which parameter feeds which record field.
//!
//! Each field carries a tag `"<name>[, from_json][, <facet>]"` where
//! `<name>` may contain `*` or `?` glob metacharacters. Wildcard tags
//! bind a map field to every matching parameter; `from_json` parses a
//! string (or a file's raw bytes) as embedded JSON; the file facets
//! `content`, `raw`, and `parsed` select one facet of a file value
//! instead of the whole object.

use glob::Pattern;
use serde::de::DeserializeOwned;

use param_stack_core::error::{ParameterError, Result};

/// Which part of a file value a field receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFacet {
    /// The whole file object.
    #[default]
    Whole,
    /// The UTF-8 content string.
    Content,
    /// The raw bytes.
    Raw,
    /// The structured parse.
    Parsed,
}

/// One field's binding, parsed from its tag.
#[derive(Debug, Clone)]
pub struct FieldBinding {
    /// The record field name, as serde will see it.
    pub field: String,
    /// Parameter name or glob pattern.
    pub pattern: String,
    /// Parse the value's string or raw file bytes as JSON.
    pub from_json: bool,
    /// File facet selection for `file*` values.
    pub facet: FileFacet,
    /// Nested record fields recurse with the same value collection.
    pub nested: Option<BindingSpec>,
}

impl FieldBinding {
    /// Parses a field tag.
    ///
    /// # Examples
    ///
    /// ```
    /// use param_stack_bind::spec::FieldBinding;
    ///
    /// let b = FieldBinding::parse("config", "config, from_json").unwrap();
    /// assert!(b.from_json);
    /// let b = FieldBinding::parse("keys", "*_api_key").unwrap();
    /// assert!(b.is_wildcard());
    /// ```
    pub fn parse(field: &str, tag: &str) -> Result<Self> {
        let mut parts = tag.split(',').map(str::trim);
        let pattern = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ParameterError::binding(field, "empty binding tag"))?;
        let mut binding = Self {
            field: field.to_string(),
            pattern: pattern.to_string(),
            from_json: false,
            facet: FileFacet::default(),
            nested: None,
        };
        for modifier in parts {
            match modifier {
                "from_json" => binding.from_json = true,
                "content" => binding.facet = FileFacet::Content,
                "raw" => binding.facet = FileFacet::Raw,
                "parsed" => binding.facet = FileFacet::Parsed,
                other => {
                    return Err(ParameterError::binding(
                        field,
                        format!("unknown binding modifier {other:?}"),
                    ));
                }
            }
        }
        if binding.is_wildcard() {
            // validate the pattern eagerly so bind-time can't fail on it
            Pattern::new(&binding.pattern)
                .map_err(|e| ParameterError::binding(field, e.to_string()))?;
        }
        Ok(binding)
    }

    /// True when the pattern contains glob metacharacters.
    pub fn is_wildcard(&self) -> bool {
        self.pattern.contains(['*', '?', '['])
    }
}

/// Ordered list of field bindings for one record type.
#[derive(Debug, Clone, Default)]
pub struct BindingSpec {
    fields: Vec<FieldBinding>,
}

impl BindingSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field with its tag.
    pub fn field(mut self, field: &str, tag: &str) -> Result<Self> {
        self.fields.push(FieldBinding::parse(field, tag)?);
        Ok(self)
    }

    /// Adds a nested record field; its spec binds against the same
    /// value collection.
    pub fn nested(mut self, field: &str, spec: BindingSpec) -> Self {
        self.fields.push(FieldBinding {
            field: field.to_string(),
            pattern: String::new(),
            from_json: false,
            facet: FileFacet::default(),
            nested: Some(spec),
        });
        self
    }

    /// Iterates field bindings in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldBinding> {
        self.fields.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A record type that declares how its fields bind to parameters.
///
/// Implementations pair a serde `Deserialize` record with the binding
/// spec the binder drives:
///
/// ```
/// use param_stack_bind::spec::{BindingSpec, ParameterRecord};
/// use param_stack_core::Result;
///
/// #[derive(serde::Deserialize, Default)]
/// struct Settings {
///     limit: i64,
///     #[serde(default)]
///     verbose: bool,
/// }
///
/// impl ParameterRecord for Settings {
///     fn binding_spec() -> Result<BindingSpec> {
///         BindingSpec::new()
///             .field("limit", "limit")?
///             .field("verbose", "verbose")
///     }
/// }
/// ```
pub trait ParameterRecord: DeserializeOwned {
    fn binding_spec() -> Result<BindingSpec>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_with_facet_modifier() {
        let b = FieldBinding::parse("body", "request, content").unwrap();
        assert_eq!(b.facet, FileFacet::Content);
        assert!(!b.from_json);
    }

    #[test]
    fn test_unknown_modifier_rejected() {
        assert!(FieldBinding::parse("x", "name, shouty").is_err());
    }

    #[test]
    fn test_invalid_glob_rejected_at_parse_time() {
        assert!(FieldBinding::parse("keys", "[unclosed").is_err());
    }
}
