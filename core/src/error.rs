//! Error taxonomy for the parameter subsystem.
//!
//! Provides a unified error type covering all failure modes: malformed
//! schemas, value coercion, choice membership, missing required
//! parameters, file I/O inside file-loading parsers, binding, and
//! cancellation.

use thiserror::Error;

/// Errors that can occur while defining, parsing, or binding parameters.
#[derive(Debug, Error)]
pub enum ParameterError {
    /// Malformed schema: duplicate name, bad positional layout, choice
    /// kind without choices, or an invalid declared default.
    ///
    /// Definition errors are programmer bugs rather than user input
    /// errors.
    #[error("invalid definition for parameter {name}: {message}")]
    Definition { name: String, message: String },

    /// A value does not fit the parameter's kind or numeric range.
    #[error("could not coerce value for parameter {name}: {message}")]
    Coercion { name: String, message: String },

    /// A value is not a member of the declared choice set.
    #[error("invalid choice {value:?} for parameter {name}, expected one of {choices:?}")]
    InvalidChoice {
        name: String,
        value: String,
        choices: Vec<String>,
    },

    /// A required parameter was absent after all sources ran.
    #[error("required parameter {name} not provided")]
    MissingRequired { name: String },

    /// File or path failure inside a file-loading parser or a
    /// config/profile load.
    #[error("could not read {path}: {source}")]
    SourceIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Content of a loaded file could not be parsed.
    #[error("could not parse {path}: {message}")]
    FileFormat { path: String, message: String },

    /// A flag token that matches no known definition.
    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    /// A flag that needs a value appeared as the last token.
    #[error("missing value for flag: {0}")]
    MissingFlagValue(String),

    /// More positional arguments than the schema allows.
    #[error("too many arguments")]
    TooManyArguments,

    /// Target shape incompatible with the value during binding.
    #[error("binding error for {name}: {message}")]
    Binding { name: String, message: String },

    /// The invocation was cancelled before completion.
    #[error("operation cancelled")]
    Cancelled,

    /// JSON serialization or parsing failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization or parsing failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ParameterError {
    /// Shorthand for a coercion failure on a named parameter.
    pub fn coercion(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Coercion {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a definition failure on a named parameter.
    pub fn definition(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Definition {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a binding failure on a named field.
    pub fn binding(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Binding {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias for results with [`ParameterError`].
pub type Result<T> = std::result::Result<T, ParameterError>;
