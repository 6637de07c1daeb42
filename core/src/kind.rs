//! The closed set of parameter kinds.
//!
//! Every parameter definition carries a [`ParameterKind`] that fixes the
//! semantic type of its value and drives parsing, coercion, rendering,
//! and help formatting. The wire tokens (`stringList`, `keyValue`, …)
//! are stable and round-trip through YAML/JSON schemas.

use serde::{Deserialize, Serialize};

/// Value kind for a parameter definition.
///
/// Scalar kinds parse from a single token, list kinds consume every
/// token given for the flag, `keyValue` parses `k:v` tokens (or a file
/// when the token starts with `@`), and the `*FromFile*` kinds load and
/// parse file contents.
///
/// # Examples
///
/// ```
/// use param_stack_core::ParameterKind;
///
/// assert!(ParameterKind::StringList.is_list());
/// assert!(!ParameterKind::String.is_list());
/// assert!(ParameterKind::KeyValue.needs_file_content("@values.yaml"));
/// assert!(!ParameterKind::KeyValue.needs_file_content("a:b"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ParameterKind {
    /// Free-form string (the default).
    #[default]
    #[serde(rename = "string")]
    String,
    /// String whose rendered form is masked.
    #[serde(rename = "secret")]
    Secret,
    /// Signed integer.
    #[serde(rename = "int")]
    Integer,
    /// Double-precision float.
    #[serde(rename = "float")]
    Float,
    /// Boolean; accepts `on`/`off` in addition to the usual tokens.
    #[serde(rename = "bool")]
    Bool,
    /// Timestamp parsed from strict formats or relative natural language.
    #[serde(rename = "date")]
    Date,
    /// One of an enumerated set of string tokens.
    #[serde(rename = "choice")]
    Choice,
    /// List of strings.
    #[serde(rename = "stringList")]
    StringList,
    /// List of integers.
    #[serde(rename = "intList")]
    IntegerList,
    /// List of floats.
    #[serde(rename = "floatList")]
    FloatList,
    /// List of choice tokens, each validated against the choice set.
    #[serde(rename = "choiceList")]
    ChoiceList,
    /// String-to-string mapping from `k:v` tokens or an `@file`.
    #[serde(rename = "keyValue")]
    KeyValue,
    /// A single file loaded into a [`FileData`](crate::FileData).
    #[serde(rename = "file")]
    File,
    /// Multiple files, each loaded into a [`FileData`](crate::FileData).
    #[serde(rename = "fileList")]
    FileList,
    /// Contents of one file as a string.
    #[serde(rename = "stringFromFile")]
    StringFromFile,
    /// Concatenated contents of several files as one string.
    #[serde(rename = "stringFromFiles")]
    StringFromFiles,
    /// Lines (or decoded string list) of one file.
    #[serde(rename = "stringListFromFile")]
    StringListFromFile,
    /// Concatenated string lists from several files.
    #[serde(rename = "stringListFromFiles")]
    StringListFromFiles,
    /// A single structured object decoded from a file.
    #[serde(rename = "objectFromFile")]
    ObjectFromFile,
    /// A list of structured objects decoded from one file.
    #[serde(rename = "objectListFromFile")]
    ObjectListFromFile,
    /// A list of structured objects concatenated across several files.
    #[serde(rename = "objectListFromFiles")]
    ObjectListFromFiles,
}

impl ParameterKind {
    /// Returns true if the kind parses from a list of tokens rather
    /// than a single token. Note this describes parsing shape, not
    /// whether the final value is a list (`keyValue` parses from a
    /// list of `k:v` tokens).
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            Self::StringList
                | Self::IntegerList
                | Self::FloatList
                | Self::ChoiceList
                | Self::KeyValue
                | Self::FileList
                | Self::StringFromFiles
                | Self::StringListFromFile
                | Self::StringListFromFiles
                | Self::ObjectListFromFile
                | Self::ObjectListFromFiles
        )
    }

    /// Returns true if the kind yields structured objects.
    pub fn is_object(&self) -> bool {
        matches!(
            self,
            Self::ObjectFromFile | Self::ObjectListFromFile | Self::ObjectListFromFiles
        )
    }

    /// Returns true if the kind yields an object list.
    pub fn is_object_list(&self) -> bool {
        matches!(self, Self::ObjectListFromFile | Self::ObjectListFromFiles)
    }

    /// Returns true for the `keyValue` kind.
    pub fn is_key_value(&self) -> bool {
        matches!(self, Self::KeyValue)
    }

    /// Returns true if the kind carries [`FileData`](crate::FileData)
    /// values directly.
    pub fn is_file_kind(&self) -> bool {
        matches!(self, Self::File | Self::FileList)
    }

    /// Returns true if the kind is a choice kind and must carry a
    /// declared choice set.
    pub fn needs_choices(&self) -> bool {
        matches!(self, Self::Choice | Self::ChoiceList)
    }

    /// Returns true if parsing the given raw token requires reading a
    /// file. `keyValue` loads a file only when the token starts with
    /// `@`.
    pub fn needs_file_content(&self, raw: &str) -> bool {
        match self {
            Self::File
            | Self::FileList
            | Self::StringFromFile
            | Self::StringFromFiles
            | Self::StringListFromFile
            | Self::StringListFromFiles
            | Self::ObjectFromFile
            | Self::ObjectListFromFile
            | Self::ObjectListFromFiles => true,
            Self::KeyValue => raw.starts_with('@'),
            _ => false,
        }
    }

    /// Returns true if the kind reads several files and concatenates
    /// their contents.
    pub fn needs_multiple_file_contents(&self) -> bool {
        matches!(
            self,
            Self::FileList
                | Self::StringFromFiles
                | Self::StringListFromFiles
                | Self::ObjectListFromFiles
        )
    }

    /// Stable wire token for this kind, as used in YAML schemas and
    /// help text (e.g. `stringList`).
    pub fn token(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Secret => "secret",
            Self::Integer => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Date => "date",
            Self::Choice => "choice",
            Self::StringList => "stringList",
            Self::IntegerList => "intList",
            Self::FloatList => "floatList",
            Self::ChoiceList => "choiceList",
            Self::KeyValue => "keyValue",
            Self::File => "file",
            Self::FileList => "fileList",
            Self::StringFromFile => "stringFromFile",
            Self::StringFromFiles => "stringFromFiles",
            Self::StringListFromFile => "stringListFromFile",
            Self::StringListFromFiles => "stringListFromFiles",
            Self::ObjectFromFile => "objectFromFile",
            Self::ObjectListFromFile => "objectListFromFile",
            Self::ObjectListFromFiles => "objectListFromFiles",
        }
    }
}

impl std::fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}
