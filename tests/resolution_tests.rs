//! End-to-end tests for option resolution and invocation auditing
//!
//! These drive the registry, the clap command, the resolver, and the audit
//! record together the way `main` wires them.

use quarry::cli;
use quarry::config::registry::global_options;
use quarry::config::resolver::{resolve, ResolvedConfig, ValueSource};
use quarry::config::OptionValue;
use quarry::startup::{InvocationRecord, REDACTION_MARKER};
use quarry::QuarryError;
use std::collections::HashMap;

fn resolve_invocation(
    argv: &[&str],
    env: &[(&str, &str)],
) -> Result<(ResolvedConfig, InvocationRecord), QuarryError> {
    let registry = global_options().unwrap();
    let command = cli::command(&registry);
    let matches = command
        .clone()
        .try_get_matches_from(argv.iter().copied())
        .unwrap();
    let parsed = <cli::Cli as clap::FromArgMatches>::from_arg_matches(&matches).unwrap();
    let environ: HashMap<String, String> = env
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let resolved = resolve(&registry, &matches, &environ)?;
    let record = InvocationRecord::new(
        "0.0.0-test",
        &resolved,
        cli::local_options(&registry, &command, &matches),
        &parsed.command.path(),
        parsed.command.positional_args(),
    );
    Ok((resolved, record))
}

#[test]
fn test_explicit_verbose_flag_scenario() {
    // quarry --verbose=true sync, empty environment
    let (resolved, record) =
        resolve_invocation(&["quarry", "--verbose=true", "sync"], &[]).unwrap();

    let verbose = resolved.get("verbose").unwrap();
    assert_eq!(verbose.value, OptionValue::Bool(true));
    assert_eq!(verbose.source, ValueSource::Flag);

    assert!(record
        .global_options
        .contains(&("verbose".to_string(), "true".to_string())));
    assert_eq!(record.command, "quarry sync");
}

#[test]
fn test_environment_data_dir_scenario() {
    // QUARRY_DATA_DIR=/var/data, no --data-dir flag
    let (resolved, _) =
        resolve_invocation(&["quarry", "sync"], &[("QUARRY_DATA_DIR", "/var/data")]).unwrap();

    let data_dir = resolved.get("data-dir").unwrap();
    assert_eq!(data_dir.value, OptionValue::String("/var/data".to_string()));
    assert_eq!(data_dir.source, ValueSource::Environment);
}

#[test]
fn test_dsn_never_reaches_the_record() {
    let (_, record) = resolve_invocation(
        &["quarry", "--dsn=postgres://u:p@h/db", "sync"],
        &[],
    )
    .unwrap();

    assert!(record
        .global_options
        .contains(&("dsn".to_string(), REDACTION_MARKER.to_string())));
    let json = serde_json::to_string(&record).unwrap();
    assert!(!json.contains("postgres://u:p@h/db"));
}

#[test]
fn test_flag_wins_even_at_default_value() {
    let (resolved, record) = resolve_invocation(
        &["quarry", "--enable-console-log=false", "sync"],
        &[("QUARRY_ENABLE_CONSOLE_LOG", "true")],
    )
    .unwrap();

    let option = resolved.get("enable-console-log").unwrap();
    assert_eq!(option.value, OptionValue::Bool(false));
    assert_eq!(option.source, ValueSource::Flag);
    // supplied-at-default still counts as explicitly set
    assert!(record
        .global_options
        .contains(&("enable-console-log".to_string(), "false".to_string())));
}

#[test]
fn test_malformed_environment_value_fails_resolution() {
    let err = resolve_invocation(&["quarry", "sync"], &[("QUARRY_NO_VERIFY", "maybe")])
        .unwrap_err();
    match err {
        QuarryError::ParseError { option, origin: source, .. } => {
            assert_eq!(option, "no-verify");
            assert!(source.contains("QUARRY_NO_VERIFY"));
        }
        other => panic!("expected ParseError, got {other:?}"),
    }
}

#[test]
fn test_command_local_flags_are_scoped() {
    let (_, record) = resolve_invocation(
        &["quarry", "--verbose=true", "sync", "--dry-run", "aws"],
        &[],
    )
    .unwrap();

    assert!(record
        .global_options
        .contains(&("verbose".to_string(), "true".to_string())));
    assert_eq!(
        record.command_options,
        vec![("dry-run".to_string(), "true".to_string())]
    );
    assert_eq!(record.args, vec!["aws".to_string()]);
}

#[test]
fn test_nested_command_path_in_record() {
    let (_, record) =
        resolve_invocation(&["quarry", "policy", "run", "cost-checks"], &[]).unwrap();
    assert_eq!(record.command, "quarry policy run");
    assert_eq!(record.args, vec!["cost-checks".to_string()]);
}

#[test]
fn test_hidden_options_are_hidden_in_help_only() {
    let registry = global_options().unwrap();
    let command = cli::command(&registry);

    let plugin_dir = command
        .get_arguments()
        .find(|a| a.get_id() == "plugin-dir")
        .unwrap();
    assert!(plugin_dir.is_hide_set());

    // still resolvable when supplied explicitly
    let matches = cli::command(&registry)
        .try_get_matches_from(["quarry", "--plugin-dir", "/opt/plugins", "sync"])
        .unwrap();
    let resolved = resolve(&registry, &matches, &HashMap::new()).unwrap();
    assert_eq!(resolved.source("plugin-dir"), Some(ValueSource::Flag));
}

#[test]
fn test_visible_listing_excludes_derived_options() {
    let registry = global_options().unwrap();
    let visible: Vec<&str> = registry.visible().map(|d| d.name).collect();
    assert!(visible.contains(&"dsn"));
    assert!(!visible.contains(&"plugin-dir"));
    assert!(!visible.contains(&"policy-dir"));
}
