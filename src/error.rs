//! Error types for package-breeder.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can abort a breeder invocation.
///
/// Every variant is fatal for the command that produced it. The only place an
/// error is downgraded is the nest listing, which reports it as
/// "not available" instead of failing.
#[derive(Debug, Error)]
pub enum BreederError {
    /// Malformed catalog, genome, metadata or `breeder.toml` content.
    #[error("invalid {context}: {message}")]
    Config { context: String, message: String },

    /// A required file or directory does not exist.
    #[error("{what} '{}' does not exist", .path.display())]
    MissingResource { what: String, path: PathBuf },

    /// A target name that is not part of the species catalog.
    #[error("unknown specie \"{0}\"")]
    UnknownTarget(String),

    /// An external tool could not be started or exited non-zero.
    #[error("{program} failed ({status}){}", .hint.as_deref().map(|h| format!(": {h}")).unwrap_or_default())]
    ExternalProcess {
        program: String,
        status: String,
        hint: Option<String>,
    },

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error in '{}': {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl BreederError {
    pub(crate) fn config(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            context: context.into(),
            message: message.into(),
        }
    }

    pub(crate) fn missing(what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::MissingResource {
            what: what.into(),
            path: path.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for breeder operations
pub type Result<T> = std::result::Result<T, BreederError>;
