//! End to end: generate a clap command, parse a command line, bridge
//! the matches, and capture the invocation back to argv.

use serde_json::json;

use param_stack_cli::{command_from_sections, parse_matches, use_string};
use param_stack_core::{
    ParameterDefinition, ParameterKind, ParameterSections, ParameterSection, ParameterValue,
};
use param_stack_sources::Program;

fn schema() -> ParameterSections {
    ParameterSections::from_sections([ParameterSection::default_section()
        .with_definition(
            ParameterDefinition::new("limit", ParameterKind::Integer)
                .with_short_flag("l")
                .with_default(json!(100)),
        )
        .with_definition(
            ParameterDefinition::new("verbose", ParameterKind::Bool).with_default(json!(false)),
        )
        .with_definition(
            ParameterDefinition::new("input", ParameterKind::String)
                .as_argument()
                .required(),
        )])
}

#[test]
fn test_clap_parse_then_capture_round_trip() {
    let sections = schema();
    let command = command_from_sections("tool", &sections).unwrap();
    let matches = command
        .try_get_matches_from(["tool", "--limit", "20", "--verbose", "data.csv"])
        .unwrap();
    let parsed = parse_matches(&sections, &matches).unwrap();

    assert_eq!(
        parsed.get_value("default", "limit"),
        Some(&ParameterValue::Integer(20))
    );

    let section = sections.default_section().unwrap();
    let program = Program::from_parsed(
        "tool",
        &section.definitions,
        &parsed.get("default").unwrap().parameters,
    )
    .unwrap();

    // limit differs from its default, verbose does too, input is an arg
    assert_eq!(
        program.render_to_argv(),
        vec!["-l", "20", "--verbose", "data.csv"]
    );
    assert_eq!(use_string("tool", &section.definitions), "tool <input>");
}
