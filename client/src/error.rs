//! Error types for administration client operations.
//!
//! Provides a unified error type covering input validation, HTTP failures,
//! missing server-side functions, malformed import files, file I/O, and
//! configuration resolution.

use supa_admin_core::ValidationError;
use thiserror::Error;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Malformed or missing caller input. No request was sent.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Network failure or non-2xx HTTP status.
    ///
    /// `status` is `None` when no response was received; `body` holds the
    /// raw server response (or the transport's failure message).
    #[error("{operation} failed{}: {body}", status_suffix(.status))]
    Transport {
        operation: String,
        status: Option<u16>,
        body: String,
    },

    /// A server-side function the operation depends on is not installed.
    #[error("function '{function}' is not installed on the server; create it with:\n{install_sql}")]
    MissingCapability {
        function: String,
        install_sql: String,
    },

    /// Malformed CSV or JSON input, or an unexpected response shape.
    #[error("malformed {format}: {message}")]
    Format {
        format: &'static str,
        message: String,
    },

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Endpoint or credentials could not be resolved.
    #[error("configuration error: {0}")]
    Config(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" with HTTP {s}")).unwrap_or_default()
}

impl ClientError {
    pub(crate) fn format(format: &'static str, message: impl Into<String>) -> Self {
        Self::Format {
            format,
            message: message.into(),
        }
    }

    /// Returns the HTTP status of a transport failure, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<csv::Error> for ClientError {
    fn from(err: csv::Error) -> Self {
        let message = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(io) => Self::Io(io),
            _ => Self::format("CSV", message),
        }
    }
}

impl From<serde_yaml::Error> for ClientError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Convenience alias for results with [`ClientError`].
pub type Result<T> = std::result::Result<T, ClientError>;
