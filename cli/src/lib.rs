//! clap integration: dynamic command generation from parameter
//! schemas and gathering of matches back into parsed values.
//!
//! The generated `clap::Command` carries one flag per non-positional
//! definition (long form is the prefixed name with `_` rewritten to
//! `-`), positionals in declaration order, and a help line annotated
//! with the kind token and any choices. Matches are bridged back
//! through the list-of-strings parser, so clap input follows the same
//! coercion rules as every other source.

use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::debug;

use param_stack_core::definition::{ParameterDefinition, ParameterDefinitions};
use param_stack_core::error::Result;
use param_stack_core::kind::ParameterKind;
use param_stack_core::parsed::with_metadata;
use param_stack_core::section::{ParameterSection, ParameterSections, ParsedSections};
use param_stack_sources::argv::split_value_token;
use param_stack_sources::strings::parse_tokens;

/// Stage label recorded in parse steps produced by the matches bridge.
pub const SOURCE_CLAP: &str = "clap";

/// Renders the positional-argument part of a usage line:
/// `<required> [optional] [list...]`.
pub fn use_string(name: &str, definitions: &ParameterDefinitions) -> String {
    let mut out = name.to_string();
    for definition in definitions.arguments() {
        let ellipsis = if definition.kind.is_list() { "..." } else { "" };
        if definition.required {
            out.push_str(&format!(" <{}{}>", definition.name, ellipsis));
        } else {
            out.push_str(&format!(" [{}{}]", definition.name, ellipsis));
        }
    }
    out
}

fn flag_help(definition: &ParameterDefinition) -> String {
    let mut help = definition.help.clone();
    if !help.is_empty() {
        help.push(' ');
    }
    help.push_str(&format!("<{}>", definition.kind.token()));
    if !definition.choices.is_empty() {
        help.push_str(&format!(" (one of: {})", definition.choices.join(", ")));
    }
    help
}

fn flag_arg(section: &ParameterSection, definition: &ParameterDefinition) -> Arg {
    let id = section.prefixed_name(&definition.name);
    let long = id.replace('_', "-");
    let mut arg = Arg::new(id).long(long).help(flag_help(definition));

    // prefixes suppress short forms to avoid cross-section collisions
    if section.prefix.is_empty() {
        if let Some(short) = definition.short_flag.as_deref().and_then(|s| s.chars().next()) {
            arg = arg.short(short);
        }
    }
    arg = match definition.kind {
        ParameterKind::Bool => arg.action(ArgAction::SetTrue),
        kind if kind.is_list() => arg.action(ArgAction::Append),
        _ => arg.action(ArgAction::Set),
    };
    arg
}

fn positional_arg(definition: &ParameterDefinition, index: usize) -> Arg {
    let mut arg = Arg::new(definition.name.clone())
        .index(index)
        .help(flag_help(definition))
        .required(definition.required);
    if definition.kind.is_list() {
        arg = arg.num_args(0..);
    }
    arg
}

/// Builds a `clap::Command` carrying every section's flags and the
/// positional arguments of the whole schema, validated first.
pub fn command_from_sections(name: &str, sections: &ParameterSections) -> Result<Command> {
    sections.validate()?;
    let mut command = Command::new(name.to_string());
    let mut index = 0;
    for section in sections.iter() {
        for definition in section.definitions.iter() {
            if definition.is_argument {
                index += 1;
                command = command.arg(positional_arg(definition, index));
            } else {
                command = command.arg(flag_arg(section, definition));
            }
        }
    }
    Ok(command)
}

/// Gathers matches back into parsed values, routing raw strings
/// through the list-of-strings parser.
pub fn parse_matches(
    sections: &ParameterSections,
    matches: &ArgMatches,
) -> Result<ParsedSections> {
    let mut parsed = ParsedSections::new();
    for section in sections.iter() {
        for definition in section.definitions.iter() {
            let id = if definition.is_argument {
                definition.name.clone()
            } else {
                section.prefixed_name(&definition.name)
            };
            let tokens: Vec<String> = if definition.kind == ParameterKind::Bool {
                if matches.get_flag(&id) {
                    vec!["true".to_string()]
                } else {
                    continue;
                }
            } else {
                match matches.get_many::<String>(&id) {
                    // no clap delimiter is set, so each flag occurrence
                    // arrives whole and splits like an argv token;
                    // positional tokens are taken as-is
                    Some(values) if !definition.is_argument => values
                        .flat_map(|v| split_value_token(definition.kind, v.clone()))
                        .collect(),
                    Some(values) => values.cloned().collect(),
                    None => continue,
                }
            };
            if tokens.is_empty() {
                continue;
            }
            debug!(id = %id, name = %definition.name, "gathering clap match");
            let value = parse_tokens(definition, &tokens)?;
            parsed
                .get_or_create(&section.slug)
                .parameters
                .update_value(
                    &definition.name,
                    definition.clone(),
                    value,
                    SOURCE_CLAP,
                    &[with_metadata([("flag", serde_json::json!(format!("--{id}")))])],
                )?;
        }
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use param_stack_core::value::ParameterValue;
    use serde_json::json;

    fn schema() -> ParameterSections {
        ParameterSections::from_sections([
            ParameterSection::default_section()
                .with_definition(
                    ParameterDefinition::new("verbose", ParameterKind::Bool).with_short_flag("v"),
                )
                .with_definition(
                    ParameterDefinition::new("format", ParameterKind::Choice)
                        .with_choices(["json", "yaml"])
                        .with_default(json!("json")),
                )
                .with_definition(ParameterDefinition::new("tags", ParameterKind::StringList))
                .with_definition(ParameterDefinition::new("labels", ParameterKind::KeyValue))
                .with_definition(
                    ParameterDefinition::new("input", ParameterKind::String)
                        .as_argument()
                        .required(),
                )
                .with_definition(
                    ParameterDefinition::new("extra", ParameterKind::StringList).as_argument(),
                ),
            ParameterSection::new("Database", "db")
                .with_prefix("db_")
                .with_definition(
                    ParameterDefinition::new("host_name", ParameterKind::String)
                        .with_short_flag("h"),
                ),
        ])
    }

    #[test]
    fn test_use_string_cardinality_markers() {
        let sections = schema();
        let defs = sections.default_section().unwrap().definitions.clone();
        assert_eq!(use_string("tool", &defs), "tool <input> [extra...]");
    }

    #[test]
    fn test_generated_command_parses_and_bridges() {
        let sections = schema();
        let command = command_from_sections("tool", &sections).unwrap();
        let matches = command
            .try_get_matches_from([
                "tool",
                "--verbose",
                "--db-host-name",
                "localhost",
                "--tags",
                "a",
                "--tags",
                "b",
                "in.txt",
            ])
            .unwrap();
        let parsed = parse_matches(&sections, &matches).unwrap();

        assert_eq!(
            parsed.get_value("default", "verbose"),
            Some(&ParameterValue::Bool(true))
        );
        assert_eq!(
            parsed.get_value("db", "host_name"),
            Some(&ParameterValue::String("localhost".into()))
        );
        assert_eq!(
            parsed.get_value("default", "tags"),
            Some(&ParameterValue::StringList(vec!["a".into(), "b".into()]))
        );
        assert_eq!(
            parsed.get_value("default", "input"),
            Some(&ParameterValue::String("in.txt".into()))
        );
    }

    #[test]
    fn test_key_value_occurrence_splits_into_pairs() {
        let sections = schema();
        let command = command_from_sections("tool", &sections).unwrap();
        let matches = command
            .try_get_matches_from(["tool", "--labels", "env:prod,tier:db", "in.txt"])
            .unwrap();
        let parsed = parse_matches(&sections, &matches).unwrap();
        let mut expected = std::collections::BTreeMap::new();
        expected.insert("env".to_string(), "prod".to_string());
        expected.insert("tier".to_string(), "db".to_string());
        assert_eq!(
            parsed.get_value("default", "labels"),
            Some(&ParameterValue::KeyValue(expected))
        );
    }

    #[test]
    fn test_prefixed_sections_have_no_short_flags() {
        let sections = schema();
        let command = command_from_sections("tool", &sections).unwrap();
        let arg = command
            .get_arguments()
            .find(|a| a.get_id() == "db_host_name")
            .unwrap();
        assert!(arg.get_short().is_none());
        let arg = command
            .get_arguments()
            .find(|a| a.get_id() == "verbose")
            .unwrap();
        assert_eq!(arg.get_short(), Some('v'));
    }

    #[test]
    fn test_choice_validation_happens_in_bridge() {
        let sections = schema();
        let command = command_from_sections("tool", &sections).unwrap();
        let matches = command
            .try_get_matches_from(["tool", "--format", "toml", "in.txt"])
            .unwrap();
        assert!(parse_matches(&sections, &matches).is_err());
    }
}
