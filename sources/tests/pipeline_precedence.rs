//! End-to-end precedence ordering across the full default pipeline
//! composition.

use std::io::Write;

use serde_json::json;

use param_stack_core::{
    ParameterDefinition, ParameterKind, ParameterSection, ParameterSections, ParameterValue,
};
use param_stack_sources::pipeline::{Pipeline, ProfileOptions, SourceContext};
use param_stack_sources::{EnvSource, MapSource};

fn schema() -> ParameterSections {
    ParameterSections::from_sections([
        ParameterSection::default_section()
            .with_definition(
                ParameterDefinition::new("limit", ParameterKind::Integer).with_default(json!(100)),
            )
            .with_definition(
                ParameterDefinition::new("labels", ParameterKind::KeyValue)
                    .with_default(json!({"env": "dev"})),
            ),
        ParameterSection::new("Database", "db")
            .with_prefix("db_")
            .with_definition(ParameterDefinition::new("host", ParameterKind::String))
            .with_definition(
                ParameterDefinition::new("port", ParameterKind::Integer).with_default(json!(5432)),
            ),
    ])
}

fn write_yaml(content: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f
}

#[test]
fn test_every_stage_overrides_the_previous() {
    let config = write_yaml("limit: 20\ndb:\n  host: config.example\n");
    let profiles = write_yaml(
        "default:\n  db:\n    host: default-profile.example\n\
         prod:\n  db:\n    host: prod.example\n  default:\n    limit: 30\n",
    );

    let args: Vec<String> = vec!["--limit".into(), "50".into()];
    let parsed = Pipeline::new()
        .with_defaults()
        .with_config_files([config.path()])
        .with_profile(ProfileOptions {
            file: Some(profiles.path().to_path_buf()),
            profile: Some("prod".to_string()),
            ..ProfileOptions::default()
        })
        .with_source(EnvSource::from_map(Some("APP"), [("APP_DB_HOST", "env.example")]))
        .with_argv(&args)
        .run(&schema(), &SourceContext::new())
        .unwrap();

    // argv beats the profile's limit, which beat the config's
    assert_eq!(
        parsed.get_value("default", "limit"),
        Some(&ParameterValue::Integer(50))
    );
    // env beats both profiles, which beat the config file
    assert_eq!(
        parsed.get_value("db", "host"),
        Some(&ParameterValue::String("env.example".into()))
    );
    // untouched beyond its declared default
    assert_eq!(
        parsed.get_value("db", "port"),
        Some(&ParameterValue::Integer(5432))
    );

    // provenance shows every contributing stage, in order, with merge
    // markers from the override machinery excluded by construction
    let log = &parsed
        .get("db")
        .unwrap()
        .parameters
        .get("host")
        .unwrap()
        .log;
    let sources: Vec<_> = log.iter().map(|s| s.source.as_str()).collect();
    assert_eq!(sources, vec!["config", "profile", "profile", "env"]);
    assert_eq!(log[0].value, json!("config.example"));
    assert_eq!(log[1].value, json!("default-profile.example"));
    assert_eq!(log[2].value, json!("prod.example"));
    assert_eq!(log[3].value, json!("env.example"));
}

#[test]
fn test_key_value_maps_replace_wholesale() {
    let config = write_yaml("labels:\n  env: prod\n  tier: db\n");
    let parsed = Pipeline::new()
        .with_defaults()
        .with_config_files([config.path()])
        .run(&schema(), &SourceContext::new())
        .unwrap();

    let Some(ParameterValue::KeyValue(map)) = parsed.get_value("default", "labels") else {
        panic!("expected key-value")
    };
    // no per-key union with the default map
    assert_eq!(map.len(), 2);
    assert_eq!(map["env"], "prod");
    assert_eq!(map["tier"], "db");
}

#[test]
fn test_trailing_list_positional_keeps_default_when_unfilled() {
    let sections = ParameterSections::from_sections([ParameterSection::default_section()
        .with_definition(
            ParameterDefinition::new("alpha", ParameterKind::Integer)
                .as_argument()
                .required(),
        )
        .with_definition(
            ParameterDefinition::new("beta", ParameterKind::Integer)
                .as_argument()
                .required(),
        )
        .with_definition(
            ParameterDefinition::new("gamma", ParameterKind::Integer)
                .as_argument()
                .required(),
        )
        .with_definition(
            ParameterDefinition::new("rest", ParameterKind::IntegerList)
                .as_argument()
                .with_default(json!([5, 6, 7])),
        )]);

    let args: Vec<String> = vec!["1".into(), "2".into(), "3".into()];
    let parsed = Pipeline::new()
        .with_defaults()
        .with_argv(&args)
        .run(&sections, &SourceContext::new())
        .unwrap();

    assert_eq!(
        parsed.get_value("default", "alpha"),
        Some(&ParameterValue::Integer(1))
    );
    assert_eq!(
        parsed.get_value("default", "beta"),
        Some(&ParameterValue::Integer(2))
    );
    assert_eq!(
        parsed.get_value("default", "gamma"),
        Some(&ParameterValue::Integer(3))
    );
    // every token went to the required scalars; the list holds its
    // declared default and its log shows only the defaults stage
    assert_eq!(
        parsed.get_value("default", "rest"),
        Some(&ParameterValue::IntegerList(vec![5, 6, 7]))
    );
    let log = &parsed
        .get("default")
        .unwrap()
        .parameters
        .get("rest")
        .unwrap()
        .log;
    let sources: Vec<_> = log.iter().map(|s| s.source.as_str()).collect();
    assert_eq!(sources, vec!["defaults"]);
}

#[test]
fn test_map_source_as_default_yields_to_parsed_values() {
    let args: Vec<String> = vec!["--limit".into(), "7".into()];
    let parsed = Pipeline::new()
        .with_argv(&args)
        .with_source(MapSource::as_default(
            "default",
            [("limit", json!(1)), ("labels", json!({"a": "b"}))],
        ))
        .run(&schema(), &SourceContext::new())
        .unwrap();

    assert_eq!(
        parsed.get_value("default", "limit"),
        Some(&ParameterValue::Integer(7))
    );
    let Some(ParameterValue::KeyValue(map)) = parsed.get_value("default", "labels") else {
        panic!("expected key-value")
    };
    assert_eq!(map["a"], "b");
}
