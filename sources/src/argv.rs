//! Argv walker: flags and positional arguments in one linear pass.
//!
//! Recognizes `--long`, `--long=value`, `--long value`, `-s`,
//! `-s=value`, and `-s value`. Boolean flags consume no value, list
//! flags accumulate across occurrences, and a bare `--` switches the
//! remainder to positional.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use param_stack_core::definition::ParameterDefinition;
use param_stack_core::error::{ParameterError, Result};
use param_stack_core::kind::ParameterKind;
use param_stack_core::parsed::with_metadata;
use param_stack_core::section::{ParameterSections, ParsedSections};

use crate::pipeline::{Source, SourceContext, SourceError};
use crate::strings::parse_tokens;

/// Stage label recorded in parse steps produced by this source.
pub const SOURCE_ARGV: &str = "argv";

struct FlagEntry {
    slug: String,
    definition: Arc<ParameterDefinition>,
}

/// Lookup tables from long and short flag forms to definitions.
///
/// Long forms are the fully-prefixed names, plus a dashed alias when
/// the name contains underscores. Short forms are registered only for
/// sections without a prefix. Registration rejects duplicates.
struct FlagRegistry {
    long: HashMap<String, FlagEntry>,
    short: HashMap<String, FlagEntry>,
    positionals: Vec<(String, Arc<ParameterDefinition>)>,
}

impl FlagRegistry {
    fn build(sections: &ParameterSections) -> Result<Self> {
        let mut registry = Self {
            long: HashMap::new(),
            short: HashMap::new(),
            positionals: Vec::new(),
        };
        for section in sections.iter() {
            for definition in section.definitions.iter() {
                if definition.is_argument {
                    registry
                        .positionals
                        .push((section.slug.clone(), definition.clone()));
                    continue;
                }
                let name = section.prefixed_name(&definition.name);
                registry.register_long(&name, &section.slug, definition)?;
                let dashed = name.replace('_', "-");
                if dashed != name {
                    registry.register_long(&dashed, &section.slug, definition)?;
                }
                // prefixes suppress short forms to avoid collisions
                // across sections
                if section.prefix.is_empty() {
                    if let Some(short) = &definition.short_flag {
                        registry.register_short(short, &section.slug, definition)?;
                    }
                }
            }
        }
        Ok(registry)
    }

    fn register_long(
        &mut self,
        name: &str,
        slug: &str,
        definition: &Arc<ParameterDefinition>,
    ) -> Result<()> {
        let entry = FlagEntry {
            slug: slug.to_string(),
            definition: definition.clone(),
        };
        if self.long.insert(name.to_string(), entry).is_some() {
            return Err(ParameterError::definition(
                &definition.name,
                format!("duplicate flag --{name}"),
            ));
        }
        Ok(())
    }

    fn register_short(
        &mut self,
        short: &str,
        slug: &str,
        definition: &Arc<ParameterDefinition>,
    ) -> Result<()> {
        let entry = FlagEntry {
            slug: slug.to_string(),
            definition: definition.clone(),
        };
        if self.short.insert(short.to_string(), entry).is_some() {
            return Err(ParameterError::definition(
                &definition.name,
                format!("duplicate short flag -{short}"),
            ));
        }
        Ok(())
    }
}

/// One flag's accumulated occurrence tokens plus the exact flag token
/// that introduced it.
struct Occurrence {
    slug: String,
    definition: Arc<ParameterDefinition>,
    tokens: Vec<String>,
    flag_token: String,
}

/// Splits a list value token on commas after trimming surrounding
/// brackets.
fn split_list_token(token: &str) -> Vec<String> {
    let trimmed = token
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .unwrap_or(token);
    trimmed.split(',').map(|s| s.trim().to_string()).collect()
}

/// Splits one flag occurrence's value into parse tokens. List-shaped
/// kinds comma-split; keyValue included, so `k1:v1,k2:v2` yields two
/// pairs. A keyValue `@file` token carries a path and stays whole.
pub fn split_value_token(kind: ParameterKind, value: String) -> Vec<String> {
    if kind.is_list() && !(kind.is_key_value() && value.starts_with('@')) {
        split_list_token(&value)
    } else {
        vec![value]
    }
}

/// Parses argv tokens into per-flag occurrences and a positional list.
fn walk(
    registry: &FlagRegistry,
    args: &[String],
) -> Result<(Vec<Occurrence>, Vec<String>)> {
    // keyed by (slug, name); keeps first-seen order
    let mut occurrences: Vec<Occurrence> = Vec::new();
    let mut positionals: Vec<String> = Vec::new();
    let mut rest_positional = false;
    let mut iter = args.iter().peekable();

    let mut record =
        |entry: &FlagEntry, flag_token: &str, tokens: Vec<String>| {
            let existing = occurrences.iter_mut().find(|o| {
                o.slug == entry.slug && o.definition.name == entry.definition.name
            });
            match existing {
                Some(o) if entry.definition.kind.is_list() => o.tokens.extend(tokens),
                Some(o) => {
                    o.tokens = tokens;
                    o.flag_token = flag_token.to_string();
                }
                None => occurrences.push(Occurrence {
                    slug: entry.slug.clone(),
                    definition: entry.definition.clone(),
                    tokens,
                    flag_token: flag_token.to_string(),
                }),
            }
        };

    while let Some(arg) = iter.next() {
        if rest_positional {
            positionals.push(arg.clone());
            continue;
        }
        if arg == "--" {
            rest_positional = true;
            continue;
        }

        let (form, is_long) = if let Some(rest) = arg.strip_prefix("--") {
            (rest, true)
        } else if let Some(rest) = arg.strip_prefix('-') {
            if rest.is_empty() || rest.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                // `-` (stdin) and negative numbers are positional
                positionals.push(arg.clone());
                continue;
            }
            (rest, false)
        } else {
            positionals.push(arg.clone());
            continue;
        };

        let (name, inline_value) = match form.split_once('=') {
            Some((n, v)) => (n, Some(v.to_string())),
            None => (form, None),
        };
        let entry = if is_long {
            self_lookup_long(registry, name)
        } else {
            registry.short.get(name)
        }
        .ok_or_else(|| ParameterError::UnknownFlag(arg.clone()))?;

        let kind = entry.definition.kind;
        let value = match inline_value {
            Some(v) => v,
            None if kind == ParameterKind::Bool => "true".to_string(),
            None => match iter.next() {
                Some(v) => v.clone(),
                None => return Err(ParameterError::MissingFlagValue(arg.clone())),
            },
        };
        record(entry, arg, split_value_token(kind, value));
    }

    Ok((occurrences, positionals))
}

fn self_lookup_long<'a>(registry: &'a FlagRegistry, name: &str) -> Option<&'a FlagEntry> {
    registry
        .long
        .get(name)
        .or_else(|| registry.long.get(&name.replace('-', "_")))
}

/// Assigns positional tokens to positional definitions in declaration
/// order; a trailing list positional consumes every remaining token.
fn assign_positionals(
    registry: &FlagRegistry,
    tokens: &[String],
) -> Result<Vec<(String, Arc<ParameterDefinition>, Vec<String>)>> {
    let mut assigned = Vec::new();
    let mut index = 0;
    for (i, (slug, definition)) in registry.positionals.iter().enumerate() {
        let is_last = i == registry.positionals.len() - 1;
        if definition.kind.is_list() && is_last {
            if index < tokens.len() {
                assigned.push((slug.clone(), definition.clone(), tokens[index..].to_vec()));
                index = tokens.len();
            }
            continue;
        }
        if index < tokens.len() {
            assigned.push((slug.clone(), definition.clone(), vec![tokens[index].clone()]));
            index += 1;
        } else if definition.required {
            return Err(ParameterError::MissingRequired {
                name: definition.name.clone(),
            });
        }
    }
    if index < tokens.len() {
        return Err(ParameterError::TooManyArguments);
    }
    Ok(assigned)
}

/// The argv stage of the pipeline. Highest default precedence.
pub struct ArgvSource {
    args: Vec<String>,
}

impl ArgvSource {
    /// Creates the source from already-split argv tokens, without the
    /// program name.
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl Source for ArgvSource {
    fn name(&self) -> &str {
        SOURCE_ARGV
    }

    fn apply(
        &self,
        sections: &ParameterSections,
        parsed: &mut ParsedSections,
        ctx: &SourceContext,
    ) -> std::result::Result<(), SourceError> {
        ctx.check()
            .map_err(|e| SourceError::new(SOURCE_ARGV, "", "", e))?;
        let registry = FlagRegistry::build(sections)
            .map_err(|e| SourceError::new(SOURCE_ARGV, "", "", e))?;
        let (occurrences, positional_tokens) = walk(&registry, &self.args)
            .map_err(|e| SourceError::new(SOURCE_ARGV, "", "", e))?;

        for occurrence in &occurrences {
            debug!(
                flag = %occurrence.flag_token,
                name = %occurrence.definition.name,
                "parsing argv flag"
            );
            let fail = |e| {
                SourceError::new(
                    SOURCE_ARGV,
                    &occurrence.slug,
                    &occurrence.definition.name,
                    e,
                )
            };
            let value = parse_tokens(&occurrence.definition, &occurrence.tokens).map_err(fail)?;
            parsed
                .get_or_create(&occurrence.slug)
                .parameters
                .update_value(
                    &occurrence.definition.name,
                    occurrence.definition.clone(),
                    value,
                    SOURCE_ARGV,
                    &[with_metadata([("flag", json!(occurrence.flag_token))])],
                )
                .map_err(fail)?;
        }

        let assigned = assign_positionals(&registry, &positional_tokens)
            .map_err(|e| SourceError::new(SOURCE_ARGV, "", "", e))?;
        for (slug, definition, tokens) in assigned {
            let fail = |e| SourceError::new(SOURCE_ARGV, &slug, &definition.name, e);
            let value = parse_tokens(&definition, &tokens).map_err(fail)?;
            parsed
                .get_or_create(&slug)
                .parameters
                .update_value(
                    &definition.name,
                    definition.clone(),
                    value,
                    SOURCE_ARGV,
                    &[with_metadata([("argument", json!(definition.name))])],
                )
                .map_err(fail)?;
        }
        Ok(())
    }
}
