//! The three-facet file object produced for file-typed parameters.
//!
//! A [`FileData`] carries the path, the raw bytes, and (when the file
//! extension is recognized) a parsed structured representation. File
//! type is inferred from the extension; CSV/TSV files are decoded as a
//! header row plus string-keyed row objects, NDJSON as one JSON value
//! per line.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ParameterError, Result};

/// Detected file type, inferred from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Json,
    Yaml,
    Csv,
    Tsv,
    Ndjson,
    /// Anything without a recognized extension.
    #[default]
    Text,
}

impl FileType {
    /// Infers the file type from a path's extension. `-` (stdin) is
    /// treated as JSON, matching the convention that piped structured
    /// data is JSON.
    pub fn from_path(path: &str) -> Self {
        if path == "-" {
            return Self::Json;
        }
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".json") {
            Self::Json
        } else if lower.ends_with(".yaml") || lower.ends_with(".yml") {
            Self::Yaml
        } else if lower.ends_with(".csv") {
            Self::Csv
        } else if lower.ends_with(".tsv") {
            Self::Tsv
        } else if lower.ends_with(".ndjson") || lower.ends_with(".jsonl") {
            Self::Ndjson
        } else {
            Self::Text
        }
    }

    /// Conventional media type, when one exists.
    pub fn media_type(&self) -> Option<&'static str> {
        match self {
            Self::Json => Some("application/json"),
            Self::Yaml => Some("application/yaml"),
            Self::Csv => Some("text/csv"),
            Self::Tsv => Some("text/tab-separated-values"),
            Self::Ndjson => Some("application/x-ndjson"),
            Self::Text => None,
        }
    }
}

/// File contents with path, raw bytes, and optional parsed structure.
///
/// Produced by the file-loading parameter kinds. The parsed content is
/// `None` for plain text files and for files whose structured parse
/// failed (the raw facets stay available either way).
///
/// # Examples
///
/// ```
/// use param_stack_core::{FileData, FileType};
///
/// let fd = FileData::from_bytes("rows.json", b"[{\"a\": 1}]".to_vec());
/// assert_eq!(fd.file_type, FileType::Json);
/// assert!(fd.is_list);
/// assert!(fd.parsed_content.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    /// Path as given by the caller.
    pub path: String,
    /// Absolute form of the path (`stdin` for `-`).
    pub absolute_path: String,
    /// Final path component.
    pub base_name: String,
    /// Lowercased extension including the dot, or empty.
    pub extension: String,
    /// File contents decoded as UTF-8 (lossy).
    pub content: String,
    /// Raw byte contents.
    #[serde(default)]
    pub raw_content: Vec<u8>,
    /// Structured parse of the contents, when the file type supports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_content: Option<Value>,
    /// Inferred file type.
    pub file_type: FileType,
    /// Conventional media type for the file type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Size of the raw contents in bytes.
    pub size: u64,
    /// True when the parsed content is a list.
    pub is_list: bool,
    /// True when the parsed content is an object.
    pub is_object: bool,
}

impl FileData {
    /// Loads a file from disk. A path of `-` reads standard input.
    pub fn load(path: &str) -> Result<Self> {
        if path == "-" {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|e| ParameterError::SourceIo {
                    path: "-".to_string(),
                    source: e,
                })?;
            let mut fd = Self::from_bytes("-", buf);
            fd.absolute_path = "stdin".to_string();
            fd.base_name = "stdin".to_string();
            return Ok(fd);
        }

        let bytes = std::fs::read(path).map_err(|e| ParameterError::SourceIo {
            path: path.to_string(),
            source: e,
        })?;
        let mut fd = Self::from_bytes(path, bytes);
        fd.absolute_path = std::fs::canonicalize(path)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| path.to_string());
        Ok(fd)
    }

    /// Builds a [`FileData`] from in-memory bytes, inferring the file
    /// type from the path and attempting a structured parse.
    pub fn from_bytes(path: &str, bytes: Vec<u8>) -> Self {
        let content = String::from_utf8_lossy(&bytes).into_owned();
        let file_type = FileType::from_path(path);
        let parsed_content = parse_structured(file_type, &content).ok().flatten();

        let (is_list, is_object) = match &parsed_content {
            Some(Value::Array(_)) => (true, false),
            Some(Value::Object(_)) => (false, true),
            _ => (false, false),
        };

        let p = Path::new(path);
        let base_name = p
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());
        let extension = p
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_ascii_lowercase()))
            .unwrap_or_default();

        Self {
            path: path.to_string(),
            absolute_path: path.to_string(),
            base_name,
            extension,
            size: bytes.len() as u64,
            content,
            raw_content: bytes,
            parsed_content,
            file_type,
            media_type: file_type.media_type().map(String::from),
            is_list,
            is_object,
        }
    }
}

/// Parses content according to a file type. Returns `None` for plain
/// text, which has no structured form.
pub fn parse_structured(file_type: FileType, content: &str) -> Result<Option<Value>> {
    match file_type {
        FileType::Json => Ok(Some(serde_json::from_str(content)?)),
        FileType::Yaml => {
            let v: serde_yaml::Value = serde_yaml::from_str(content)?;
            Ok(Some(yaml_to_json(v)))
        }
        FileType::Ndjson => {
            let values = parse_ndjson(content)?;
            Ok(Some(Value::Array(values)))
        }
        FileType::Csv => Ok(Some(Value::Array(
            parse_delimited(content, ',', "<memory>")?,
        ))),
        FileType::Tsv => Ok(Some(Value::Array(
            parse_delimited(content, '\t', "<memory>")?,
        ))),
        FileType::Text => Ok(None),
    }
}

/// Decodes NDJSON content: one JSON value per non-empty line.
pub fn parse_ndjson(content: &str) -> Result<Vec<Value>> {
    let mut values = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        values.push(serde_json::from_str(line)?);
    }
    Ok(values)
}

/// Decodes CSV/TSV content as a header row followed by data rows, each
/// row becoming a string-keyed object. Quoted fields (RFC 4180 style
/// double quotes with `""` escapes) are supported; leading whitespace
/// in unquoted fields is trimmed.
pub fn parse_delimited(content: &str, delimiter: char, origin: &str) -> Result<Vec<Value>> {
    let records = read_delimited_records(content, delimiter);
    if records.is_empty() {
        return Ok(Vec::new());
    }
    if records.len() < 2 {
        return Err(ParameterError::FileFormat {
            path: origin.to_string(),
            message: "missing header line or data rows".to_string(),
        });
    }

    let headers = &records[0];
    if headers.is_empty() {
        return Err(ParameterError::FileFormat {
            path: origin.to_string(),
            message: "missing header line".to_string(),
        });
    }

    let mut rows = Vec::with_capacity(records.len() - 1);
    for record in &records[1..] {
        if record.len() != headers.len() {
            return Err(ParameterError::FileFormat {
                path: origin.to_string(),
                message: format!(
                    "row has {} columns, header has {}",
                    record.len(),
                    headers.len()
                ),
            });
        }
        let mut obj = serde_json::Map::with_capacity(headers.len());
        for (header, field) in headers.iter().zip(record.iter()) {
            obj.insert(header.clone(), Value::String(field.clone()));
        }
        rows.push(Value::Object(obj));
    }
    Ok(rows)
}

fn read_delimited_records(content: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut field_started = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else if c == '"' && !field_started {
            in_quotes = true;
            field_started = true;
        } else if c == delimiter {
            record.push(std::mem::take(&mut field));
            field_started = false;
        } else if c == '\n' {
            if field.ends_with('\r') {
                field.pop();
            }
            record.push(std::mem::take(&mut field));
            field_started = false;
            if !(record.len() == 1 && record[0].is_empty()) {
                records.push(std::mem::take(&mut record));
            } else {
                record.clear();
            }
        } else if c == ' ' && !field_started {
            // trim leading whitespace in unquoted fields
            continue;
        } else {
            field_started = true;
            field.push(c);
        }
    }

    if field_started || !field.is_empty() || !record.is_empty() {
        if field.ends_with('\r') {
            field.pop();
        }
        record.push(field);
        if !(record.len() == 1 && record[0].is_empty()) {
            records.push(record);
        }
    }

    records
}

/// Converts a YAML value into JSON, stringifying non-string map keys.
/// YAML decoders commonly produce heterogeneous-keyed maps that JSON
/// cannot represent, so keys are rewritten with default formatting.
pub fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64().map(Value::from).unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => {
            Value::Array(seq.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(map) => {
            let mut obj = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s,
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Null => "null".to_string(),
                    other => serde_yaml::to_string(&other)
                        .map(|s| s.trim().to_string())
                        .unwrap_or_default(),
                };
                obj.insert(key, yaml_to_json(v));
            }
            Value::Object(obj)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_inference() {
        assert_eq!(FileType::from_path("a.json"), FileType::Json);
        assert_eq!(FileType::from_path("a.YML"), FileType::Yaml);
        assert_eq!(FileType::from_path("rows.tsv"), FileType::Tsv);
        assert_eq!(FileType::from_path("log.jsonl"), FileType::Ndjson);
        assert_eq!(FileType::from_path("notes.txt"), FileType::Text);
        assert_eq!(FileType::from_path("-"), FileType::Json);
    }

    #[test]
    fn test_from_bytes_parses_json_object() {
        let fd = FileData::from_bytes("conf.json", b"{\"a\": 1}".to_vec());
        assert!(fd.is_object);
        assert!(!fd.is_list);
        assert_eq!(fd.extension, ".json");
        assert_eq!(fd.media_type.as_deref(), Some("application/json"));
        assert_eq!(fd.parsed_content.unwrap()["a"], 1);
    }

    #[test]
    fn test_from_bytes_keeps_raw_on_parse_failure() {
        let fd = FileData::from_bytes("broken.json", b"{not json".to_vec());
        assert!(fd.parsed_content.is_none());
        assert_eq!(fd.content, "{not json");
        assert_eq!(fd.size, 9);
    }

    #[test]
    fn test_csv_rows_become_string_keyed_objects() {
        let rows = parse_delimited("name,type\nfoo,int\nbar,string\n", ',', "t.csv").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "foo");
        assert_eq!(rows[1]["type"], "string");
    }

    #[test]
    fn test_csv_quoted_fields_and_escapes() {
        let rows = parse_delimited("a,b\n\"x,y\",\"he said \"\"hi\"\"\"\n", ',', "t.csv").unwrap();
        assert_eq!(rows[0]["a"], "x,y");
        assert_eq!(rows[0]["b"], "he said \"hi\"");
    }

    #[test]
    fn test_csv_column_count_mismatch_is_an_error() {
        let err = parse_delimited("a,b\n1\n", ',', "t.csv").unwrap_err();
        assert!(matches!(err, ParameterError::FileFormat { .. }));
    }

    #[test]
    fn test_tsv_uses_tab_delimiter() {
        let rows = parse_delimited("name\ttype\nfoo\tint\n", '\t', "t.tsv").unwrap();
        assert_eq!(rows[0]["name"], "foo");
    }

    #[test]
    fn test_ndjson_one_value_per_line() {
        let values = parse_ndjson("{\"a\":1}\n\n{\"a\":2}\n").unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[1]["a"], 2);
    }

    #[test]
    fn test_yaml_to_json_stringifies_non_string_keys() {
        let v: serde_yaml::Value = serde_yaml::from_str("1: one\ntrue: 2\nname: x").unwrap();
        let json = yaml_to_json(v);
        assert_eq!(json["1"], "one");
        assert_eq!(json["true"], 2);
        assert_eq!(json["name"], "x");
    }
}
