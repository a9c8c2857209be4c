//! # Error Types
//!
//! Custom error types for Nav Logger using `thiserror`.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Nav Logger
#[derive(Debug, Error)]
pub enum NavLoggerError {
    /// A serial port could not be opened
    #[error("Failed to open port {path}: {message}")]
    PortOpen {
        /// Device path that was tried
        path: String,
        /// Transport error text
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The flight log file could not be created or written
    #[error("Flight log error at {path}: {source}")]
    LogFile {
        /// Path of the log file
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },

    /// Every candidate log name for the day is already taken
    #[error("No free flight log name left in {0}")]
    NoFreeLogName(PathBuf),

    /// A device rejected the task declaration
    #[error("Task NOT declared on {device}: {message}")]
    Declaration {
        /// Device name
        device: String,
        /// Device supplied error text
        message: String,
    },

    /// No connected device accepts declarations
    #[error("No logger connected")]
    NoLoggerConnected,

    /// A declaration is in force and the user refused to invalidate it
    #[error("Task already declared")]
    DeclarationLocked,
}

/// Result type alias for Nav Logger
pub type Result<T> = std::result::Result<T, NavLoggerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_open_display() {
        let err = NavLoggerError::PortOpen {
            path: "/dev/ttyUSB3".to_string(),
            message: "No such file or directory".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/dev/ttyUSB3"));
        assert!(msg.contains("No such file"));
    }

    #[test]
    fn test_declaration_display() {
        let err = NavLoggerError::Declaration {
            device: "FLARM".to_string(),
            message: "Unknown error".to_string(),
        };
        assert_eq!(err.to_string(), "Task NOT declared on FLARM: Unknown error");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: NavLoggerError = io_err.into();
        assert!(matches!(err, NavLoggerError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }
}
