//! Error types for theme collaborators and configuration.

use std::io;

/// Errors reported by platform collaborators and configuration loading.
///
/// The coordinators never return these from their read/write surface: a
/// failing collaborator is logged and the coordinator degrades to the light
/// default or to in-memory operation.
#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    /// The host has no way to answer a query (no color-scheme API, no window).
    #[error("Environment unsupported: {0}")]
    EnvironmentUnsupported(String),

    /// Storage exists but refused the operation (quota, disabled, sandboxed).
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Reading or writing a file-backed store failed.
    #[error("Storage I/O failed: {0}")]
    StorageIo(#[source] io::Error),

    /// A persisted value is neither `"light"` nor `"dark"`.
    #[error("Malformed theme value: {0:?}")]
    MalformedValue(String),

    /// Configuration could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ThemeError {
    /// Create a storage-unavailable error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    /// Create an environment-unsupported error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::EnvironmentUnsupported(msg.into())
    }
}

impl From<io::Error> for ThemeError {
    fn from(err: io::Error) -> Self {
        ThemeError::StorageIo(err)
    }
}

impl From<serde_yaml::Error> for ThemeError {
    fn from(err: serde_yaml::Error) -> Self {
        ThemeError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ThemeError::MalformedValue("purple".to_string());
        assert!(err.to_string().contains("purple"));

        let err = ThemeError::storage("quota exceeded");
        assert_eq!(err.to_string(), "Storage unavailable: quota exceeded");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "read-only");
        let err: ThemeError = io_err.into();
        assert!(matches!(err, ThemeError::StorageIo(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
