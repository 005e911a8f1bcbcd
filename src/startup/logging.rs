//! Logging sink configuration
//!
//! Installs the global tracing subscriber from a fully resolved
//! `LoggerConfig`: an env-filter for verbosity, an optional console layer,
//! and an optional append-file layer, each in text or JSON encoding. The
//! rotation limits carried on the config belong to the rolling engine
//! behind the file sink and are not interpreted here.

use crate::config::LoggerConfig;
use crate::error::{QuarryError, Result};
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "quarry=debug"
    } else {
        "quarry=info"
    }
}

/// Install the global subscriber. Called at most once, by the logging hook.
pub fn configure(config: &LoggerConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config.verbose)));

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    if config.console {
        if config.json {
            layers.push(tracing_subscriber::fmt::layer().json().boxed());
        } else {
            layers.push(
                tracing_subscriber::fmt::layer()
                    .with_ansi(!config.no_color)
                    .boxed(),
            );
        }
    }

    if config.file {
        std::fs::create_dir_all(&config.directory)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(config.log_path())?;
        let writer = Arc::new(file);
        if config.json {
            layers.push(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .boxed(),
            );
        } else {
            layers.push(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .boxed(),
            );
        }
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| QuarryError::config(format!("failed to install logging subscriber: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_tracks_verbosity() {
        assert_eq!(default_directive(false), "quarry=info");
        assert_eq!(default_directive(true), "quarry=debug");
    }
}
