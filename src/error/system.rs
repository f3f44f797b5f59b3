//! Local system error types (session file, environment).

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum SystemError {
    /// Permission denied for a file operation.
    PermissionDenied { path: PathBuf, operation: String },

    /// Failed to create the session directory.
    DirectoryCreationFailed { path: PathBuf, message: String },

    /// Generic I/O error.
    IoError {
        operation: String,
        path: Option<PathBuf>,
        message: String,
    },

    /// Could not determine the home directory.
    NoHomeDirectory,

    /// Environment variable missing or invalid.
    EnvironmentError { variable: String, message: String },
}

impl SystemError {
    /// Transient errors may go away on their own (a busy disk, a racing
    /// writer); missing configuration never does.
    pub fn is_transient(&self) -> bool {
        matches!(self, SystemError::IoError { .. })
    }

    pub fn user_message(&self) -> String {
        match self {
            SystemError::PermissionDenied { path, operation } => {
                format!("Permission denied: cannot {} '{}'", operation, path.display())
            }
            SystemError::DirectoryCreationFailed { path, .. } => {
                format!("Could not create directory '{}'", path.display())
            }
            SystemError::IoError { operation, .. } => format!("Failed to {}", operation),
            SystemError::NoHomeDirectory => {
                "Could not locate your home directory to store the session.".to_string()
            }
            SystemError::EnvironmentError { variable, message } => {
                format!("{} is not configured: {}", variable, message)
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            SystemError::PermissionDenied { .. } => "E_SYS_PERM",
            SystemError::DirectoryCreationFailed { .. } => "E_SYS_MKDIR",
            SystemError::IoError { .. } => "E_SYS_IO",
            SystemError::NoHomeDirectory => "E_SYS_HOME",
            SystemError::EnvironmentError { .. } => "E_SYS_ENV",
        }
    }

    /// Build from an `io::Error`, keeping the path that was being touched.
    pub fn from_io(err: &std::io::Error, operation: &str, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => SystemError::PermissionDenied {
                path,
                operation: operation.to_string(),
            },
            _ => SystemError::IoError {
                operation: operation.to_string(),
                path: Some(path),
                message: err.to_string(),
            },
        }
    }
}

impl fmt::Display for SystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemError::PermissionDenied { path, operation } => {
                write!(f, "Permission denied: {} '{}'", operation, path.display())
            }
            SystemError::DirectoryCreationFailed { path, message } => {
                write!(f, "Failed to create '{}': {}", path.display(), message)
            }
            SystemError::IoError {
                operation,
                path: Some(path),
                message,
            } => write!(f, "I/O error during {} on '{}': {}", operation, path.display(), message),
            SystemError::IoError {
                operation,
                path: None,
                message,
            } => write!(f, "I/O error during {}: {}", operation, message),
            SystemError::NoHomeDirectory => write!(f, "Home directory not found"),
            SystemError::EnvironmentError { variable, message } => {
                write!(f, "Environment variable {}: {}", variable, message)
            }
        }
    }
}

impl std::error::Error for SystemError {}
