//! Error types for the JointBlend collaborator layer.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or writing recorded poses.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Filesystem access failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record line could not be understood
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// A record ended without a required field
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// The source folder does not exist or is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

impl EnvError {
    /// Creates an I/O error bound to a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a parse error for a 1-based line number.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}
