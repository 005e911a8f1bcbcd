//! CLI commands and argument parsing
//!
//! The subcommand tree is defined with clap derive; the persistent global
//! options are generated from the option registry so that help text, source
//! resolution, and audit logging all share one declaration per option.

use crate::config::registry::{OptionDefinition, OptionKind, OptionRegistry};
use crate::config::Settings;
use crate::error::{QuarryError, Result};
use clap::builder::ArgAction;
use clap::parser::ArgMatches;
use clap::{Arg, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Full version string with build information
pub fn version() -> &'static str {
    env!("VERSION_WITH_GIT")
}

#[derive(Parser)]
#[command(name = "quarry")]
#[command(about = "Sync external resource data into a database and evaluate policies against it")]
#[command(version = version(), author)]
#[command(after_help = "Use 'quarry options' for a list of global CLI options.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sync resources from configured sources into the database
    Sync {
        /// Source names to sync (defaults to every source in the config file)
        sources: Vec<String>,
        /// Verify configuration and plugins without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Generate a starter configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
    /// Manage and run policies
    Policy {
        #[command(subcommand)]
        command: PolicyCommands,
    },
    /// List global CLI options
    Options,
    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum PolicyCommands {
    /// Run a policy against synced data
    Run {
        /// Policy to execute: a path, or a name under the policy directory
        source: String,
    },
}

impl Commands {
    /// Full command path as invoked, e.g. "quarry policy run".
    pub fn path(&self) -> String {
        let tail = match self {
            Commands::Sync { .. } => "sync",
            Commands::Init { .. } => "init",
            Commands::Policy {
                command: PolicyCommands::Run { .. },
            } => "policy run",
            Commands::Options => "options",
            Commands::Completion { .. } => "completion",
        };
        format!("quarry {tail}")
    }

    /// Completion output is consumed by the shell; logging setup is skipped
    /// for these invocations so no log record can pollute it.
    pub fn is_completion(&self) -> bool {
        matches!(self, Commands::Completion { .. })
    }

    /// Positional arguments of the invoked command, for the audit record.
    pub fn positional_args(&self) -> Vec<String> {
        match self {
            Commands::Sync { sources, .. } => sources.clone(),
            Commands::Policy {
                command: PolicyCommands::Run { source },
            } => vec![source.clone()],
            Commands::Completion { shell } => vec![shell.to_string()],
            _ => Vec::new(),
        }
    }
}

/// Build the full command: derive-defined subcommands plus one global `Arg`
/// per registry entry.
pub fn command(registry: &OptionRegistry) -> clap::Command {
    let mut cmd = Cli::command();
    for definition in registry.iter() {
        cmd = cmd.arg(global_arg(definition));
    }
    cmd
}

fn global_arg(definition: &OptionDefinition) -> Arg {
    let help = if definition.env_bound {
        format!("{} (env: {})", definition.help, definition.env_key())
    } else {
        definition.help.to_string()
    };

    let arg = Arg::new(definition.name)
        .long(definition.name)
        .global(true)
        .hide(definition.hidden)
        .help(help)
        .default_value(definition.default.to_string());

    match definition.kind() {
        // Accept both `--verbose` and `--verbose=false`
        OptionKind::Bool => arg
            .value_parser(clap::value_parser!(bool))
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true"),
        OptionKind::Int => arg
            .action(ArgAction::Set)
            .value_parser(clap::value_parser!(i64))
            .value_name("N"),
        OptionKind::String => arg.action(ArgAction::Set),
    }
}

/// Explicitly-set command-local flags of the invoked subcommand, as
/// (name, value) pairs. Global options propagate into subcommand matches and
/// are filtered out here; positionals are reported separately as args.
pub fn local_options(
    registry: &OptionRegistry,
    command: &clap::Command,
    matches: &ArgMatches,
) -> Vec<(String, String)> {
    let mut cmd = command;
    let mut current = matches;
    let mut depth = 0;
    while let Some((name, sub_matches)) = current.subcommand() {
        match cmd.find_subcommand(name) {
            Some(sub_cmd) => {
                cmd = sub_cmd;
                current = sub_matches;
                depth += 1;
            }
            None => return Vec::new(),
        }
    }
    if depth == 0 {
        return Vec::new();
    }

    let positionals: Vec<&str> = cmd
        .get_positionals()
        .map(|a| a.get_id().as_str())
        .collect();

    let mut options = Vec::new();
    for id in current.ids() {
        let name = id.as_str();
        if registry.get(name).is_some() || positionals.contains(&name) {
            continue;
        }
        if current.value_source(name) != Some(clap::parser::ValueSource::CommandLine) {
            continue;
        }
        let value = match current.get_raw(name) {
            Some(raw) => {
                let joined = raw
                    .map(|v| v.to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join(",");
                if joined.is_empty() {
                    // presence-only flags carry no raw value
                    "true".to_string()
                } else {
                    joined
                }
            }
            None => "true".to_string(),
        };
        options.push((name.replace('_', "-"), value));
    }
    options
}

impl Cli {
    pub async fn execute(self, registry: &OptionRegistry, settings: &Settings) -> Result<()> {
        match self.command {
            Commands::Sync { sources, dry_run } => run_sync(settings, &sources, dry_run).await,
            Commands::Init { force } => run_init(settings, force).await,
            Commands::Policy {
                command: PolicyCommands::Run { source },
            } => run_policy(settings, &source).await,
            Commands::Options => {
                print_options(registry);
                Ok(())
            }
            Commands::Completion { shell } => {
                generate_completions(registry, shell);
                Ok(())
            }
        }
    }
}

/// Declared sources from the configuration file written by `quarry init`.
#[derive(Debug, Deserialize)]
struct SourceConfig {
    #[serde(default)]
    sources: Vec<SourceSpec>,
}

#[derive(Debug, Deserialize)]
struct SourceSpec {
    name: String,
    #[serde(default)]
    version: Option<String>,
}

async fn load_source_config(settings: &Settings) -> Result<SourceConfig> {
    if !settings.config_path.exists() {
        return Err(QuarryError::config(format!(
            "configuration file not found at {}; generate one with 'quarry init'",
            settings.config_path.display()
        )));
    }
    let contents = tokio::fs::read_to_string(&settings.config_path).await?;
    toml::from_str(&contents).map_err(|e| {
        QuarryError::config(format!(
            "failed to parse {}: {e}",
            settings.config_path.display()
        ))
    })
}

async fn run_sync(settings: &Settings, requested: &[String], dry_run: bool) -> Result<()> {
    if settings.dsn.is_empty() {
        return Err(QuarryError::config(
            "a database connection string is required: set --dsn or QUARRY_DSN",
        ));
    }

    let config = load_source_config(settings).await?;
    let selected: Vec<&SourceSpec> = if requested.is_empty() {
        config.sources.iter().collect()
    } else {
        let mut selected = Vec::new();
        for name in requested {
            match config.sources.iter().find(|s| &s.name == name) {
                Some(spec) => selected.push(spec),
                None => {
                    return Err(QuarryError::config(format!(
                        "source '{name}' is not declared in {}",
                        settings.config_path.display()
                    )))
                }
            }
        }
        selected
    };

    if selected.is_empty() {
        info!("no sources configured; nothing to sync");
        return Ok(());
    }

    tokio::fs::create_dir_all(&settings.data_dir).await?;

    for spec in &selected {
        let plugin = settings.plugin_dir.join(format!("quarry-source-{}", spec.name));
        if !plugin.exists() {
            return Err(QuarryError::plugin(format!(
                "provider plugin for source '{}' is not installed in {}",
                spec.name,
                settings.plugin_dir.display()
            )));
        }
        if settings.no_verify {
            warn!(source = %spec.name, "skipping plugin verification");
        } else {
            debug!(
                source = %spec.name,
                version = spec.version.as_deref().unwrap_or("latest"),
                "provider plugin verified"
            );
        }
    }

    if dry_run {
        info!(
            sources = selected.len(),
            "dry run complete; configuration and plugins verified"
        );
        return Ok(());
    }

    // Fetching and table building happen inside the provider plugins; from
    // here the resolved configuration is handed to them unchanged.
    info!(
        sources = selected.len(),
        data_dir = %settings.data_dir.display(),
        "handing off to provider plugins"
    );
    Ok(())
}

async fn run_init(settings: &Settings, force: bool) -> Result<()> {
    let path = &settings.config_path;
    if path.exists() && !force {
        return Err(QuarryError::config(format!(
            "configuration file already exists at {}; pass --force to overwrite",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, STARTER_CONFIG).await?;
    println!("Configuration written to {}", path.display());
    Ok(())
}

async fn run_policy(settings: &Settings, source: &str) -> Result<()> {
    let direct = std::path::Path::new(source);
    let path = if direct.exists() {
        direct.to_path_buf()
    } else {
        settings.policy_dir.join(source)
    };
    if !path.exists() {
        return Err(QuarryError::policy(format!(
            "policy '{source}' not found (looked in {})",
            settings.policy_dir.display()
        )));
    }

    let contents = tokio::fs::read_to_string(&path).await?;
    if contents.trim().is_empty() {
        return Err(QuarryError::policy(format!(
            "policy file {} is empty",
            path.display()
        )));
    }

    // Evaluation runs in the policy engine against the synced database.
    info!(policy = %path.display(), bytes = contents.len(), "policy loaded; handing off to the policy engine");
    Ok(())
}

fn print_options(registry: &OptionRegistry) {
    println!("Global options:");
    for definition in registry.visible() {
        let env = if definition.env_bound {
            format!(" (env: {})", definition.env_key())
        } else {
            String::new()
        };
        println!(
            "  --{:<22} {:<7} {}{} (default: {})",
            definition.name,
            definition.kind().to_string(),
            definition.help,
            env,
            definition.default
        );
    }
}

fn generate_completions(registry: &OptionRegistry, shell: Shell) {
    let mut cmd = command(registry);
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}

const STARTER_CONFIG: &str = r#"# quarry source configuration
#
# Declare the providers to sync. Each source needs a matching provider
# plugin installed in the plugin directory.
#
# [[sources]]
# name = "aws"
# version = "latest"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::registry::global_options;
    use clap::FromArgMatches;

    fn parse(argv: &[&str]) -> (clap::Command, ArgMatches, Cli) {
        let registry = global_options().unwrap();
        let cmd = command(&registry);
        let matches = cmd.clone().try_get_matches_from(argv.iter().copied()).unwrap();
        let cli = Cli::from_arg_matches(&matches).unwrap();
        (cmd, matches, cli)
    }

    #[test]
    fn test_command_path_for_nested_subcommand() {
        let (_, _, cli) = parse(&["quarry", "policy", "run", "cost-checks"]);
        assert_eq!(cli.command.path(), "quarry policy run");
        assert_eq!(cli.command.positional_args(), vec!["cost-checks"]);
    }

    #[test]
    fn test_completion_is_structural_not_argv_match() {
        let (_, _, cli) = parse(&["quarry", "completion", "bash"]);
        assert!(cli.command.is_completion());

        // a positional that happens to be named "completion" is not one
        let (_, _, cli) = parse(&["quarry", "policy", "run", "completion"]);
        assert!(!cli.command.is_completion());
    }

    #[test]
    fn test_local_options_exclude_globals_and_positionals() {
        let registry = global_options().unwrap();
        let (cmd, matches, _) = parse(&[
            "quarry",
            "--verbose=true",
            "sync",
            "--dry-run",
            "aws",
            "gcp",
        ]);
        let locals = local_options(&registry, &cmd, &matches);
        assert_eq!(locals, vec![("dry-run".to_string(), "true".to_string())]);
    }

    #[test]
    fn test_local_options_empty_when_none_set() {
        let registry = global_options().unwrap();
        let (cmd, matches, _) = parse(&["quarry", "sync"]);
        assert!(local_options(&registry, &cmd, &matches).is_empty());
    }

    #[test]
    fn test_global_flag_accepted_after_subcommand() {
        // resolution itself is covered by the resolver tests
        let (_, _, cli) = parse(&["quarry", "sync", "--verbose=true"]);
        assert_eq!(cli.command.path(), "quarry sync");
    }

    #[test]
    fn test_hidden_options_are_resolvable_but_not_listed() {
        let (_, matches, _) = parse(&["quarry", "--plugin-dir", "/opt/plugins", "sync"]);
        assert_eq!(
            matches.get_one::<String>("plugin-dir").map(String::as_str),
            Some("/opt/plugins")
        );
    }

    #[test]
    fn test_malformed_int_flag_is_rejected() {
        let registry = global_options().unwrap();
        let result = command(&registry).try_get_matches_from(["quarry", "--max-size=abc", "sync"]);
        assert!(result.is_err());
    }
}
