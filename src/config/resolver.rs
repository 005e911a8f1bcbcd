//! Source resolution for global options
//!
//! Computes the effective value of every registered option from the parsed
//! argument matches and an environment snapshot. Precedence is strict and
//! total: an explicitly-supplied flag wins over a well-formed environment
//! variable, which wins over the compiled-in default. The winning source is
//! recorded per option so downstream consumers (the invocation auditor in
//! particular) never have to walk parser internals.

use crate::config::registry::{OptionDefinition, OptionKind, OptionRegistry, OptionValue};
use crate::error::{QuarryError, Result};
use clap::parser::ArgMatches;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Origin of an option's effective value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    Flag,
    Environment,
    Default,
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSource::Flag => write!(f, "flag"),
            ValueSource::Environment => write!(f, "environment"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// An option's effective value together with the source that supplied it.
#[derive(Debug, Clone)]
pub struct ResolvedOption {
    pub value: OptionValue,
    pub source: ValueSource,
}

/// The effective configuration for one invocation. Read-only once built;
/// options keep their registry definition order.
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    options: Vec<(String, ResolvedOption)>,
}

impl ResolvedConfig {
    pub fn get(&self, name: &str) -> Option<&ResolvedOption> {
        self.options
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, o)| o)
    }

    pub fn source(&self, name: &str) -> Option<ValueSource> {
        self.get(name).map(|o| o.source)
    }

    pub fn get_bool(&self, name: &str) -> Result<bool> {
        self.get(name)
            .and_then(|o| o.value.as_bool())
            .ok_or_else(|| QuarryError::config(format!("missing bool option '{name}'")))
    }

    pub fn get_int(&self, name: &str) -> Result<i64> {
        self.get(name)
            .and_then(|o| o.value.as_int())
            .ok_or_else(|| QuarryError::config(format!("missing int option '{name}'")))
    }

    pub fn get_string(&self, name: &str) -> Result<String> {
        self.get(name)
            .and_then(|o| o.value.as_str())
            .map(str::to_string)
            .ok_or_else(|| QuarryError::config(format!("missing string option '{name}'")))
    }

    /// All options, in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResolvedOption)> {
        self.options.iter().map(|(n, o)| (n.as_str(), o))
    }

    /// Options whose value did not come from the compiled-in default, in
    /// registry order. This is the auditor's query surface.
    pub fn explicitly_set(&self) -> impl Iterator<Item = (&str, &ResolvedOption)> {
        self.iter().filter(|(_, o)| o.source != ValueSource::Default)
    }
}

/// Resolve every registered option against the parsed matches and the given
/// environment snapshot. Resolution of one option never depends on another;
/// derived defaults are applied later, by the consuming hook.
pub fn resolve(
    registry: &OptionRegistry,
    matches: &ArgMatches,
    environ: &HashMap<String, String>,
) -> Result<ResolvedConfig> {
    let mut config = ResolvedConfig::default();
    let chain = matches_chain(matches);

    for definition in registry.iter() {
        let resolved = if let Some(supplied) = flag_matches(&chain, definition.name) {
            ResolvedOption {
                value: flag_value(definition, supplied)?,
                source: ValueSource::Flag,
            }
        } else if let Some(raw) = env_value(definition, environ) {
            ResolvedOption {
                value: parse_env_value(definition, raw)?,
                source: ValueSource::Environment,
            }
        } else {
            ResolvedOption {
                value: definition.default.clone(),
                source: ValueSource::Default,
            }
        };

        config
            .options
            .push((definition.name.to_string(), resolved));
    }

    Ok(config)
}

/// Matches from the root command down to the invoked subcommand. Global
/// options may be supplied at any level.
fn matches_chain(matches: &ArgMatches) -> Vec<&ArgMatches> {
    let mut chain = vec![matches];
    let mut current = matches;
    while let Some((_, sub_matches)) = current.subcommand() {
        chain.push(sub_matches);
        current = sub_matches;
    }
    chain
}

/// Presence on the command line is what counts: a flag supplied at its
/// default value is still flag-sourced.
fn flag_matches<'a>(chain: &[&'a ArgMatches], name: &str) -> Option<&'a ArgMatches> {
    chain
        .iter()
        .find(|m| m.value_source(name) == Some(clap::parser::ValueSource::CommandLine))
        .copied()
}

fn flag_value(definition: &OptionDefinition, matches: &ArgMatches) -> Result<OptionValue> {
    let value = match definition.kind() {
        OptionKind::Bool => matches
            .get_one::<bool>(definition.name)
            .copied()
            .map(OptionValue::Bool),
        OptionKind::Int => matches
            .get_one::<i64>(definition.name)
            .copied()
            .map(OptionValue::Int),
        OptionKind::String => matches
            .get_one::<String>(definition.name)
            .cloned()
            .map(OptionValue::String),
    };
    value.ok_or_else(|| {
        QuarryError::config(format!(
            "flag '--{}' was supplied but has no value",
            definition.name
        ))
    })
}

/// Only the derived `QUARRY_*` key is consulted, case-sensitively. Variables
/// outside the prefix can never bind to an option.
fn env_value<'a>(
    definition: &OptionDefinition,
    environ: &'a HashMap<String, String>,
) -> Option<&'a String> {
    if !definition.env_bound {
        return None;
    }
    environ.get(&definition.env_key())
}

fn parse_env_value(definition: &OptionDefinition, raw: &str) -> Result<OptionValue> {
    let source = format!("environment variable {}", definition.env_key());
    match definition.kind() {
        OptionKind::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(OptionValue::Bool(true)),
            "false" | "0" => Ok(OptionValue::Bool(false)),
            _ => Err(QuarryError::parse(
                definition.name.to_string(),
                source,
                format!("expected a boolean, got '{raw}'"),
            )),
        },
        OptionKind::Int => raw
            .parse::<i64>()
            .map(OptionValue::Int)
            .map_err(|e| QuarryError::parse(definition.name.to_string(), source, e.to_string())),
        OptionKind::String => Ok(OptionValue::String(raw.to_string())),
    }
}
