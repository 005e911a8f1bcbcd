//! One-time initialization sequencing
//!
//! Startup runs a fixed, ordered list of named hooks exactly once, before
//! the invoked command body executes. The order is a contract: logging
//! configuration needs the typed settings produced by the config hook, and
//! the later hooks want logging available to report their own problems.
//! A hook failure is fatal and halts the sequence; nothing downstream runs
//! with a partially-initialized process.

use crate::config::{ResolvedConfig, Settings};
use crate::error::{QuarryError, Result};
use crate::startup::{limits, logging, reporting};
use tracing::{debug, warn};

/// Progress of the startup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStage {
    NotStarted,
    ConfigEnvironmentReady,
    LoggingReady,
    ResourceLimitsAdjusted,
    ErrorReportingReady,
    Complete,
}

impl InitStage {
    pub const fn is_complete(self) -> bool {
        matches!(self, InitStage::Complete)
    }
}

/// State shared with the hooks: the read-only resolved configuration going
/// in, the typed settings coming out.
pub struct InitContext {
    pub resolved: ResolvedConfig,
    /// Completion generation skips logging setup entirely.
    pub skip_logging: bool,
    /// Whether stdout is attached to an interactive terminal.
    pub interactive: bool,
    settings: Option<Settings>,
}

impl InitContext {
    pub fn new(resolved: ResolvedConfig, skip_logging: bool, interactive: bool) -> Self {
        Self {
            resolved,
            skip_logging,
            interactive,
            settings: None,
        }
    }

    /// Typed settings, available once the config-environment hook has run.
    pub fn settings(&self) -> Result<&Settings> {
        self.settings
            .as_ref()
            .ok_or_else(|| QuarryError::config("initialization has not run"))
    }
}

struct InitHook {
    name: &'static str,
    reaches: InitStage,
    run: fn(&mut InitContext) -> Result<()>,
}

/// Owns the ordered hook list and the stage state machine.
pub struct InitSequencer {
    stage: InitStage,
    hooks: Vec<InitHook>,
}

impl Default for InitSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl InitSequencer {
    pub fn new() -> Self {
        Self {
            stage: InitStage::NotStarted,
            hooks: vec![
                InitHook {
                    name: "config-environment",
                    reaches: InitStage::ConfigEnvironmentReady,
                    run: config_environment,
                },
                InitHook {
                    name: "logging",
                    reaches: InitStage::LoggingReady,
                    run: configure_logging,
                },
                InitHook {
                    name: "resource-limits",
                    reaches: InitStage::ResourceLimitsAdjusted,
                    run: adjust_resource_limits,
                },
                InitHook {
                    name: "error-reporting",
                    reaches: InitStage::ErrorReportingReady,
                    run: install_error_reporting,
                },
            ],
        }
    }

    pub fn stage(&self) -> InitStage {
        self.stage
    }

    /// Hook names in execution order.
    pub fn hook_names(&self) -> Vec<&'static str> {
        self.hooks.iter().map(|h| h.name).collect()
    }

    /// Run the sequence. A second call is a no-op; a hook error aborts the
    /// sequence with the failing hook named.
    pub fn run(&mut self, ctx: &mut InitContext) -> Result<()> {
        if self.stage != InitStage::NotStarted {
            return Ok(());
        }
        for hook in &self.hooks {
            (hook.run)(ctx)
                .map_err(|e| QuarryError::hook_failure(hook.name.to_string(), e.to_string()))?;
            self.stage = hook.reaches;
        }
        self.stage = InitStage::Complete;
        Ok(())
    }
}

fn config_environment(ctx: &mut InitContext) -> Result<()> {
    ctx.settings = Some(Settings::from_resolved(&ctx.resolved)?);
    Ok(())
}

fn configure_logging(ctx: &mut InitContext) -> Result<()> {
    if ctx.skip_logging {
        return Ok(());
    }
    let mut config = ctx.settings()?.logging.clone();
    config.apply_terminal_policy(ctx.interactive);
    logging::configure(&config)
}

fn adjust_resource_limits(_ctx: &mut InitContext) -> Result<()> {
    // best-effort and platform-dependent; never fatal
    match limits::raise_file_descriptor_limit() {
        Ok(Some(limit)) => debug!(limit, "file descriptor limit raised"),
        Ok(None) => {}
        Err(e) => warn!("could not adjust file descriptor limit: {e}"),
    }
    Ok(())
}

fn install_error_reporting(ctx: &mut InitContext) -> Result<()> {
    reporting::install(ctx.settings()?);
    Ok(())
}
