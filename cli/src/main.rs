//! Demo binary: declares a small schema, resolves it through the full
//! pipeline, and prints the merged values with their provenance.
//!
//! ```text
//! param-stack --limit 20 --format yaml --db-host localhost
//! PARAM_STACK_LIMIT=5 param-stack --print-provenance
//! param-stack --config ./config.yaml --profile prod
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use serde_json::json;

use param_stack_core::{
    ParameterDefinition, ParameterKind, ParameterSection, ParameterSections,
};
use param_stack_sources::pipeline::{Pipeline, ProfileOptions, SourceContext};

const ENV_PREFIX: &str = "PARAM_STACK";

fn schema() -> ParameterSections {
    ParameterSections::from_sections([
        ParameterSection::default_section()
            .with_definition(
                ParameterDefinition::new("limit", ParameterKind::Integer)
                    .with_help("Maximum number of rows")
                    .with_short_flag("l")
                    .with_default(json!(100)),
            )
            .with_definition(
                ParameterDefinition::new("format", ParameterKind::Choice)
                    .with_help("Output format")
                    .with_choices(["json", "yaml"])
                    .with_default(json!("yaml")),
            )
            .with_definition(
                ParameterDefinition::new("tags", ParameterKind::StringList)
                    .with_help("Labels applied to the run"),
            )
            .with_definition(
                ParameterDefinition::new("verbose", ParameterKind::Bool)
                    .with_short_flag("v")
                    .with_default(json!(false)),
            ),
        ParameterSection::new("Database", "db")
            .with_description("Connection settings")
            .with_prefix("db_")
            .with_definition(
                ParameterDefinition::new("host", ParameterKind::String)
                    .with_default(json!("localhost")),
            )
            .with_definition(
                ParameterDefinition::new("port", ParameterKind::Integer).with_default(json!(5432)),
            ),
    ])
}

/// Splits framework flags (`--config`, `--profile`,
/// `--print-provenance`) from the schema's own argv tokens.
fn split_framework_flags(args: Vec<String>) -> (Vec<String>, Vec<PathBuf>, bool) {
    let mut rest = Vec::new();
    let mut configs = Vec::new();
    let mut provenance = false;
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                if let Some(path) = iter.next() {
                    configs.push(PathBuf::from(path));
                }
            }
            "--print-provenance" => provenance = true,
            _ => rest.push(arg),
        }
    }
    (rest, configs, provenance)
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (args, config_files, print_provenance) = split_framework_flags(args);
    let sections = schema();

    let profile_file = std::env::var("PARAM_STACK_PROFILES").ok().map(PathBuf::from);
    let parsed = Pipeline::new()
        .with_defaults()
        .with_config_files(config_files.clone())
        .with_profile(ProfileOptions {
            file: profile_file,
            env_var: Some(format!("{ENV_PREFIX}_PROFILE")),
            config_files,
            args: args.clone(),
            ..ProfileOptions::default()
        })
        .with_env(Some(ENV_PREFIX))
        .with_argv(&strip_profile_flag(args))
        .run(&sections, &SourceContext::new())?;

    if print_provenance {
        println!("{}", serde_yaml::to_string(&parsed)?);
        return Ok(());
    }
    for (slug, section) in parsed.iter() {
        println!("{slug}:");
        for (name, value) in section.parameters.to_map() {
            println!("  {name}: {value}");
        }
    }
    Ok(())
}

/// `--profile` belongs to the framework, not the schema; the argv
/// stage would reject it as unknown.
fn strip_profile_flag(args: Vec<String>) -> Vec<String> {
    let mut rest = Vec::new();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if arg == "--profile" {
            let _ = iter.next();
            continue;
        }
        if arg.starts_with("--profile=") {
            continue;
        }
        rest.push(arg);
    }
    rest
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
