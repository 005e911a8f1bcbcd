//! Typed settings consumed by the initialization hooks
//!
//! `Settings` is the read-only, typed view over a `ResolvedConfig`. Building
//! it is the job of the `config-environment` hook; this is also where the
//! conventional derivations live (plugin and policy directories default to
//! paths under the data directory), keeping the resolver itself free of
//! cross-option dependencies.

use crate::config::resolver::ResolvedConfig;
use crate::error::Result;
use crate::utils::terminal;
use std::path::PathBuf;

/// Fully resolved logging configuration handed to the logging sink.
///
/// The rotation limits (`max_size_mb`, `max_backups`, `max_age_days`) are
/// part of the sink's interface; the rolling engine itself lives behind it.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub verbose: bool,
    pub console: bool,
    pub json: bool,
    pub file: bool,
    pub no_color: bool,
    pub directory: PathBuf,
    pub filename: String,
    pub max_size_mb: i64,
    pub max_backups: i64,
    pub max_age_days: i64,
}

impl LoggerConfig {
    fn from_resolved(resolved: &ResolvedConfig) -> Result<Self> {
        Ok(Self {
            verbose: resolved.get_bool("verbose")?,
            console: resolved.get_bool("enable-console-log")?,
            json: resolved.get_bool("encode-json")?,
            file: resolved.get_bool("enable-file-logging")?,
            no_color: resolved.get_bool("disable-log-color")?,
            directory: PathBuf::from(resolved.get_string("log-directory")?),
            filename: resolved.get_string("log-file")?,
            max_size_mb: resolved.get_int("max-size")?,
            max_backups: resolved.get_int("max-backups")?,
            max_age_days: resolved.get_int("max-age")?,
        })
    }

    /// Console logging is forced on when output is not an interactive
    /// terminal, overriding the user's explicit setting.
    pub fn apply_terminal_policy(&mut self, interactive: bool) {
        if terminal::should_force_console_logging(interactive) {
            self.console = true;
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }
}

/// Read-only typed configuration shared with hooks and command bodies.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config_path: PathBuf,
    pub dsn: String,
    pub no_verify: bool,
    pub data_dir: PathBuf,
    pub plugin_dir: PathBuf,
    pub policy_dir: PathBuf,
    pub no_crash_reports: bool,
    pub logging: LoggerConfig,
}

impl Settings {
    pub fn from_resolved(resolved: &ResolvedConfig) -> Result<Self> {
        let data_dir = PathBuf::from(resolved.get_string("data-dir")?);

        // Derived from data-dir when left empty
        let plugin_dir = match resolved.get_string("plugin-dir")? {
            dir if dir.is_empty() => data_dir.join("plugins"),
            dir => PathBuf::from(dir),
        };
        let policy_dir = match resolved.get_string("policy-dir")? {
            dir if dir.is_empty() => data_dir.join("policies"),
            dir => PathBuf::from(dir),
        };

        Ok(Self {
            config_path: PathBuf::from(resolved.get_string("config")?),
            dsn: resolved.get_string("dsn")?,
            no_verify: resolved.get_bool("no-verify")?,
            data_dir,
            plugin_dir,
            policy_dir,
            no_crash_reports: resolved.get_bool("no-crash-reports")?,
            logging: LoggerConfig::from_resolved(resolved)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli;
    use crate::config::registry::global_options;
    use crate::config::resolver::resolve;
    use std::collections::HashMap;

    fn settings_for(argv: &[&str], env: &[(&str, &str)]) -> Settings {
        let registry = global_options().unwrap();
        let mut full_argv = vec!["quarry"];
        full_argv.extend_from_slice(argv);
        full_argv.push("options");
        let matches = cli::command(&registry)
            .try_get_matches_from(full_argv)
            .unwrap();
        let environ: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let resolved = resolve(&registry, &matches, &environ).unwrap();
        Settings::from_resolved(&resolved).unwrap()
    }

    #[test]
    fn test_plugin_and_policy_dirs_derive_from_data_dir() {
        let settings = settings_for(&["--data-dir", "/var/data"], &[]);
        assert_eq!(settings.plugin_dir, PathBuf::from("/var/data/plugins"));
        assert_eq!(settings.policy_dir, PathBuf::from("/var/data/policies"));
    }

    #[test]
    fn test_explicit_plugin_dir_wins_over_derivation() {
        let settings = settings_for(
            &["--data-dir", "/var/data", "--plugin-dir", "/opt/plugins"],
            &[],
        );
        assert_eq!(settings.plugin_dir, PathBuf::from("/opt/plugins"));
        assert_eq!(settings.policy_dir, PathBuf::from("/var/data/policies"));
    }

    #[test]
    fn test_derivation_applies_to_env_sourced_data_dir() {
        let settings = settings_for(&[], &[("QUARRY_DATA_DIR", "/srv/quarry")]);
        assert_eq!(settings.plugin_dir, PathBuf::from("/srv/quarry/plugins"));
    }

    #[test]
    fn test_logger_config_defaults() {
        let settings = settings_for(&[], &[]);
        let logging = settings.logging;
        assert!(!logging.verbose);
        assert!(!logging.console);
        assert!(logging.file);
        assert_eq!(logging.log_path(), PathBuf::from("./quarry.log"));
        assert_eq!(logging.max_size_mb, 30);
    }

    #[test]
    fn test_terminal_policy_forces_console_when_not_interactive() {
        let settings = settings_for(&["--enable-console-log=false"], &[]);
        let mut logging = settings.logging;
        assert!(!logging.console);
        logging.apply_terminal_policy(false);
        assert!(logging.console);
    }

    #[test]
    fn test_terminal_policy_leaves_interactive_choice_alone() {
        let settings = settings_for(&[], &[]);
        let mut logging = settings.logging;
        logging.apply_terminal_policy(true);
        assert!(!logging.console);
    }
}
