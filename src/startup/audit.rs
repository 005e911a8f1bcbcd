//! Invocation audit record
//!
//! One structured record per invocation, built immediately before the
//! command body runs: which global options were explicitly set (by flag or
//! environment), which command-local flags were supplied, the command path,
//! and the positional arguments. Sensitive values are replaced at record
//! construction, before anything reaches the logging sink. Emission is
//! best-effort and never affects the command.

use crate::config::resolver::ResolvedConfig;
use serde::Serialize;
use tracing::{info, warn};

/// Marker substituted for sensitive option values. Never reversible.
pub const REDACTION_MARKER: &str = "(redacted)";

/// Options whose values must never be logged, matched by exact name.
const SENSITIVE_OPTIONS: &[&str] = &["dsn"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationRecord {
    pub tool_version: String,
    pub command: String,
    pub global_options: Vec<(String, String)>,
    pub command_options: Vec<(String, String)>,
    pub args: Vec<String>,
}

impl InvocationRecord {
    pub fn new(
        tool_version: &str,
        resolved: &ResolvedConfig,
        command_options: Vec<(String, String)>,
        command_path: &str,
        args: Vec<String>,
    ) -> Self {
        let global_options = resolved
            .explicitly_set()
            .map(|(name, option)| (name.to_string(), redact(name, option.value.to_string())))
            .collect();
        let command_options = command_options
            .into_iter()
            .map(|(name, value)| {
                let value = redact(&name, value);
                (name, value)
            })
            .collect();
        Self {
            tool_version: tool_version.to_string(),
            command: command_path.to_string(),
            global_options,
            command_options,
            args,
        }
    }
}

fn redact(name: &str, value: String) -> String {
    if SENSITIVE_OPTIONS.contains(&name) {
        REDACTION_MARKER.to_string()
    } else {
        value
    }
}

/// Emit the record as a single informational event. Purely observational;
/// a failure here is reported as a warning at best and never escalates.
pub fn emit(record: &InvocationRecord) {
    match serde_json::to_string(record) {
        Ok(json) => info!(target: "quarry::audit", invocation = %json, "invocation parameters"),
        Err(e) => warn!("failed to record invocation parameters: {e}"),
    }
}
