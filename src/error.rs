use thiserror::Error;

/// Main error type for quarry operations
#[derive(Debug, Error)]
pub enum QuarryError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Option '{name}' is already defined")]
    DefinitionConflict { name: String },

    #[error("Unknown option: {name}")]
    UnknownOption { name: String },

    #[error("Invalid value for option '{option}' from {origin}: {message}")]
    ParseError {
        option: String,
        origin: String,
        message: String,
    },

    #[error("Initialization hook '{hook}' failed: {message}")]
    HookFailure { hook: String, message: String },

    #[error("Plugin error: {0}")]
    PluginError(String),

    #[error("Policy error: {0}")]
    PolicyError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl QuarryError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn definition_conflict<S: Into<String>>(name: S) -> Self {
        Self::DefinitionConflict { name: name.into() }
    }

    pub fn unknown_option<S: Into<String>>(name: S) -> Self {
        Self::UnknownOption { name: name.into() }
    }

    pub fn parse<S: Into<String>>(option: S, source: S, message: S) -> Self {
        Self::ParseError {
            option: option.into(),
            origin: source.into(),
            message: message.into(),
        }
    }

    pub fn hook_failure<S: Into<String>>(hook: S, message: S) -> Self {
        Self::HookFailure {
            hook: hook.into(),
            message: message.into(),
        }
    }

    pub fn plugin<S: Into<String>>(msg: S) -> Self {
        Self::PluginError(msg.into())
    }

    pub fn policy<S: Into<String>>(msg: S) -> Self {
        Self::PolicyError(msg.into())
    }

    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::SerializationError(msg.into())
    }
}

/// Result type alias for quarry operations
pub type Result<T> = std::result::Result<T, QuarryError>;
