use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by zone and registry administration.
///
/// Every mutating operation restores the on-disk state it touched before
/// returning one of these, so callers never need to clean up after an `Err`.
#[derive(Debug, Clone, Error)]
pub enum AdminError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A candidate zone file or the master configuration was rejected.
    /// `output` is the checker's text, passed through untouched.
    #[error("{subject} syntax error: {output}")]
    Syntax { subject: String, output: String },

    #[error("Reload failed: {0}")]
    Reload(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),
}

impl AdminError {
    pub fn zone_syntax(zone: &str, output: impl Into<String>) -> Self {
        AdminError::Syntax {
            subject: format!("zone {}", zone),
            output: output.into(),
        }
    }

    pub fn config_syntax(output: impl Into<String>) -> Self {
        AdminError::Syntax {
            subject: "config".to_string(),
            output: output.into(),
        }
    }

    /// Raw output of the external tool that caused this error, if any
    pub fn details(&self) -> Option<&str> {
        match self {
            AdminError::Syntax { output, .. } => Some(output),
            AdminError::Reload(output) => Some(output),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AdminError {
    fn from(err: std::io::Error) -> Self {
        AdminError::Io(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, AdminError>;

/// Errors raised while loading the service configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
