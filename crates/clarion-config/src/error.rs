//! Errors from loading and saving quality settings.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::validation::ValidationError;

/// File operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    /// Reading a settings file
    Read,
    /// Writing a settings file
    Write,
    /// Creating the settings file's parent directory
    CreateDir,
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileAction::Read => "read",
            FileAction::Write => "write",
            FileAction::CreateDir => "create directory",
        })
    }
}

/// Errors that can occur while loading or saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Filesystem failure
    #[error("cannot {action} '{path}': {source}")]
    Io {
        /// What was being attempted
        action: FileAction,
        /// Path involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The text is not valid settings TOML (syntax, type or unknown metric)
    #[error("invalid settings TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The settings could not be encoded as TOML
    #[error("cannot encode settings as TOML: {0}")]
    Encode(#[from] toml::ser::Error),

    /// Parsed settings hold values the metrics cannot use
    #[error("settings rejected: {0}")]
    Invalid(#[from] ValidationError),
}

impl ConfigError {
    pub(crate) fn io(action: FileAction, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// The failed file action, for I/O errors.
    pub fn file_action(&self) -> Option<FileAction> {
        match self {
            ConfigError::Io { action, .. } => Some(*action),
            _ => None,
        }
    }
}
