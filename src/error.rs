//! Error types for polylsp

use std::time::Duration;

use thiserror::Error;

use crate::infra::lsp::protocol::error_codes;
use crate::infra::lsp::state::ServerState;

pub type PolylspResult<T> = std::result::Result<T, PolylspError>;

#[derive(Debug, Error)]
pub enum PolylspError {
    #[error("{0}")]
    Lsp(#[from] LspError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum LspError {
    #[error("Failed to start server: {0}")]
    ServerStart(String),

    /// Malformed frame or message; fatal for the connection
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Request '{method}' timed out after {after:?}")]
    Timeout { method: String, after: Duration },

    #[error("{backend} capability mismatch on '{capability}': expected {expected}, got {actual}")]
    CapabilityMismatch {
        backend: String,
        capability: String,
        expected: String,
        actual: String,
    },

    #[error("{backend} is unavailable: '{executable}' not found. Install: {install_hint}")]
    BackendUnavailable {
        backend: String,
        executable: String,
        install_hint: String,
    },

    /// Process exit, stdio EOF or local teardown
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    #[error("Server error [{code}]: {message}")]
    ServerError { code: i32, message: String },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: ServerState, to: ServerState },

    #[error("Server not ready (state: {0})")]
    NotReady(ServerState),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl LspError {
    pub fn error_code(&self) -> i32 {
        match self {
            Self::ServerError { code, .. } => *code,
            Self::Protocol(_) => error_codes::PARSE_ERROR,
            Self::ConnectionClosed(_) => -32099,
            Self::Timeout { .. } => -32001,
            Self::NotReady(_) => error_codes::SERVER_NOT_INITIALIZED,
            _ => -32000,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::ServerError { code, .. } if *code == error_codes::REQUEST_CANCELLED)
    }

    /// Failures that only affect one call; the caller may retry
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
            || self.is_cancelled()
            || matches!(self, Self::ServerError { code, .. } if *code == error_codes::CONTENT_MODIFIED)
    }

    /// Failures that leave the connection unusable
    pub fn needs_restart(&self) -> bool {
        matches!(self, Self::ConnectionClosed(_) | Self::Protocol(_))
            || self.is_server_shutdown()
    }

    fn is_server_shutdown(&self) -> bool {
        matches!(self, Self::ServerError { message, .. }
            if message.to_lowercase().contains("shutdown")
               || message.to_lowercase().contains("server stopped"))
    }

    pub fn timeout(method: &str, after: Duration) -> Self {
        Self::Timeout {
            method: method.to_string(),
            after,
        }
    }

    pub fn capability_mismatch(
        backend: &str,
        capability: &str,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::CapabilityMismatch {
            backend: backend.to_string(),
            capability: capability.to_string(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl From<crate::infra::lsp::protocol::ResponseError> for LspError {
    fn from(err: crate::infra::lsp::protocol::ResponseError) -> Self {
        LspError::ServerError {
            code: err.code,
            message: err.message,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config parse error: {0}")]
    Parse(String),

    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_recoverable() {
        let err = LspError::timeout("textDocument/hover", Duration::from_secs(3));
        assert!(err.is_recoverable());
        assert!(!err.needs_restart());
        assert_eq!(err.error_code(), -32001);
        assert!(err.to_string().contains("textDocument/hover"));
    }

    #[test]
    fn test_connection_closed_needs_restart() {
        let err = LspError::ConnectionClosed("stdout EOF".into());
        assert!(!err.is_recoverable());
        assert!(err.needs_restart());

        let err = LspError::Protocol("bad header".into());
        assert!(err.needs_restart());
    }

    #[test]
    fn test_cancelled_error() {
        let cancelled = LspError::ServerError {
            code: -32800,
            message: "cancelled".to_string(),
        };
        assert!(cancelled.is_cancelled());
        assert!(cancelled.is_recoverable());

        let modified = LspError::ServerError {
            code: -32801,
            message: "content modified".to_string(),
        };
        assert!(!modified.is_cancelled());
        assert!(modified.is_recoverable());
    }

    #[test]
    fn test_server_shutdown_needs_restart() {
        let stopped = LspError::ServerError {
            code: -32000,
            message: "Server stopped unexpectedly".to_string(),
        };
        assert!(stopped.needs_restart());
    }

    #[test]
    fn test_capability_mismatch_message() {
        let err = LspError::capability_mismatch(
            "clangd",
            "textDocumentSync.change",
            "2",
            "1",
        );
        let msg = err.to_string();
        assert!(msg.contains("clangd"));
        assert!(msg.contains("expected 2, got 1"));
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = LspError::InvalidTransition {
            from: ServerState::Ready,
            to: ServerState::Starting,
        };
        assert_eq!(
            err.to_string(),
            "Invalid state transition: ready -> starting"
        );
    }
}
