//! Capturing an invocation as a replayable program document.
//!
//! The inverse of parsing: given a definition collection and the
//! parsed values, build a `Program` recording only what differs from
//! the declared defaults, and render it back to a real argv line. The
//! document carries golden-test fields so captured invocations double
//! as regression fixtures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use param_stack_core::definition::ParameterDefinitions;
use param_stack_core::error::Result;
use param_stack_core::kind::ParameterKind;
use param_stack_core::parsed::{ParseStep, ParsedParameters};
use param_stack_core::render::render_value;

/// One captured flag or positional argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramParameter {
    pub name: String,
    /// The long command-line token (`--limit`); empty for positionals.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub flag: String,
    /// The short form (`-l`), preferred at render time when present.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub short: String,
    #[serde(rename = "type")]
    pub kind: ParameterKind,
    pub value: Value,
    /// The rendered argv token for the value.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw: String,
    /// True for boolean flags, which carry no value token.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub no_value: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_argument: bool,
    /// Provenance carried over from parsing, for forensics.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub log: Vec<ParseStep>,
}

/// A replayable invocation document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub name: String,
    /// Binary path, when it differs from the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Subcommand words preceding the flags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verbs: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<ProgramParameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<ProgramParameter>,
    /// Extra tokens appended verbatim after the captured flags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raw_flags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_status_code: Option<i32>,
    /// Expected file contents keyed by path, for golden tests.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub expected_files: BTreeMap<String, String>,
}

impl Program {
    /// Captures a parsed invocation. Flags equal to their declared
    /// default (deep equality on the JSON widening) are skipped;
    /// ordering mirrors definition order; short forms are preferred.
    pub fn from_parsed(
        name: &str,
        definitions: &ParameterDefinitions,
        parsed: &ParsedParameters,
    ) -> Result<Self> {
        let mut program = Program {
            name: name.to_string(),
            ..Self::default()
        };
        for definition in definitions.iter() {
            let Some(parameter) = parsed.get(&definition.name) else {
                continue;
            };
            let value_json = parameter.value.to_json();

            if definition.is_argument {
                program.args.push(ProgramParameter {
                    name: definition.name.clone(),
                    flag: String::new(),
                    short: String::new(),
                    kind: definition.kind,
                    raw: render_value(definition.kind, &parameter.value),
                    value: value_json,
                    no_value: false,
                    is_argument: true,
                    log: parameter.log.clone(),
                });
                continue;
            }

            let default_json = definition
                .default_value()?
                .map(|v| v.to_json())
                .unwrap_or(Value::Null);
            if value_json == default_json {
                continue;
            }
            program.flags.push(ProgramParameter {
                name: definition.name.clone(),
                flag: format!("--{}", definition.name),
                short: definition
                    .short_flag
                    .as_deref()
                    .map(|s| format!("-{s}"))
                    .unwrap_or_default(),
                kind: definition.kind,
                raw: render_value(definition.kind, &parameter.value),
                value: value_json,
                no_value: definition.kind == ParameterKind::Bool,
                is_argument: false,
                log: parameter.log.clone(),
            });
        }
        Ok(program)
    }

    /// Renders the program back to argv tokens (excluding the binary
    /// name itself).
    pub fn render_to_argv(&self) -> Vec<String> {
        let mut argv: Vec<String> = self.verbs.clone();
        for flag in &self.flags {
            let token = if flag.short.is_empty() {
                &flag.flag
            } else {
                &flag.short
            };
            if flag.no_value {
                if flag.value == Value::Bool(true) {
                    argv.push(token.clone());
                } else {
                    argv.push(format!("{token}=false"));
                }
                continue;
            }
            argv.push(token.clone());
            argv.push(flag.raw.clone());
        }
        argv.extend(self.raw_flags.iter().cloned());
        for arg in &self.args {
            argv.push(arg.raw.clone());
        }
        argv
    }

    /// Parses a program document from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Serializes the program document to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
