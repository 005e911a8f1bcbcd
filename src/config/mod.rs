//! Configuration management module
//!
//! This module declares the global option registry, resolves each option's
//! effective value from its ranked sources (flag, environment, default), and
//! exposes the typed settings view consumed by initialization hooks and
//! command bodies.

pub mod registry;
pub mod resolver;
pub mod settings;

pub use registry::{global_options, OptionDefinition, OptionKind, OptionRegistry, OptionValue};
pub use resolver::{resolve, ResolvedConfig, ResolvedOption, ValueSource};
pub use settings::{LoggerConfig, Settings};
