use std::io;
use std::path::{Path, PathBuf};

/// Errors raised by the extraction pipeline. Every stage logs the error
/// before handing it back unchanged.
#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    #[error("Configuration error: missing {}", .missing.join(", "))]
    Configuration { missing: Vec<&'static str> },

    #[error("Invalid configuration file {path}: {message}")]
    ConfigFile { path: PathBuf, message: String },

    #[error("Jira connection failed: {0}")]
    Connectivity(String),

    #[error("Failed to decode Jira response: {0}")]
    Decode(String),

    #[error("Column '{0}' not found in the extracted data")]
    Schema(String),

    #[error("Invalid timestamp '{value}': {reason}")]
    Parse { value: String, reason: String },

    #[error("Path not found: {path}")]
    PathNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Permission denied: {path}")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize rows: {0}")]
    Serialization(String),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

impl EtlError {
    /// Classify an I/O failure on `path` by its error kind.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => EtlError::PathNotFound { path, source },
            io::ErrorKind::PermissionDenied => EtlError::PermissionDenied { path, source },
            _ => EtlError::Io { path, source },
        }
    }

    /// Short category label used in log lines.
    pub fn category(&self) -> &'static str {
        match self {
            EtlError::Configuration { .. } | EtlError::ConfigFile { .. } => "configuration",
            EtlError::Connectivity(_) => "connectivity",
            EtlError::Decode(_) => "decode",
            EtlError::Schema(_) => "schema",
            EtlError::Parse { .. } => "parse",
            EtlError::PathNotFound { .. } => "path not found",
            EtlError::PermissionDenied { .. } => "permission denied",
            EtlError::Io { .. } => "os error",
            EtlError::Serialization(_) => "serialization",
            EtlError::Logging(_) => "logging",
        }
    }
}

pub type EtlResult<T> = Result<T, EtlError>;
