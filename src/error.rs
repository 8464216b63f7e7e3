//! Centralized error types for herald using thiserror.
//!
//! Construction problems are loud (`ValidationError`), delivery problems
//! are quiet: `TransportError` and `ProtocolError` never leave
//! `Notifier::notify`, they are logged and turned into `false`.

use thiserror::Error;

/// Errors related to configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load config file: {0}")]
    LoadError(String),
    #[error("invalid configuration: {0}")]
    ValidationError(String),
    #[error("invalid url #{index}: {message}")]
    InvalidUrl { index: usize, message: String },
}

/// A notifier could not be built from its identifier.
///
/// Raised at construction time only; a value that failed validation is
/// never handed out.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{service}: missing {field}")]
    Missing {
        service: &'static str,
        field: &'static str,
    },
    #[error("{service}: invalid {field}: {reason}")]
    Invalid {
        service: &'static str,
        field: &'static str,
        reason: String,
    },
    #[error("{service}: no valid recipients specified")]
    NoRecipients { service: &'static str },
    #[error("{service}: recipient discovery failed: {reason}")]
    Discovery {
        service: &'static str,
        reason: String,
    },
}

impl ValidationError {
    /// Service the error belongs to.
    pub fn service(&self) -> &'static str {
        match self {
            ValidationError::Missing { service, .. }
            | ValidationError::Invalid { service, .. }
            | ValidationError::NoRecipients { service }
            | ValidationError::Discovery { service, .. } => service,
        }
    }
}

/// Failures reported by the HTTP transport instead of a response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("too many redirects: {0}")]
    TooManyRedirects(String),
    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Connect(_) => "connect",
            TransportError::Timeout(_) => "timeout",
            TransportError::TooManyRedirects(_) => "redirect",
            TransportError::Request(_) => "request",
        }
    }
}

/// The remote service answered, but not with what we expected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unexpected status {status} ({reason})")]
    UnexpectedStatus {
        status: u16,
        reason: String,
        detail: Option<String>,
    },
    #[error("response rejected: {0}")]
    RejectedBody(String),
}

/// Everything that can go wrong while delivering one message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("failed to encode payload: {0}")]
    Encode(String),
    #[error("invalid recipient '{0}'")]
    InvalidRecipient(String),
}

impl SendError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SendError::Transport(e) => e.kind(),
            SendError::Protocol(ProtocolError::UnexpectedStatus { .. }) => "status",
            SendError::Protocol(ProtocolError::RejectedBody(_)) => "body",
            SendError::Encode(_) => "encode",
            SendError::InvalidRecipient(_) => "recipient",
        }
    }
}

impl From<serde_json::Error> for SendError {
    fn from(e: serde_json::Error) -> Self {
        SendError::Encode(e.to_string())
    }
}
