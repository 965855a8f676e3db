use std::fmt;

use catcher_core::{CapturedRecord, RequestError};
use thiserror::Error;

use crate::store::StoreError;

/// Operator-visible notices published by the engine loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A record was committed to the store.
    Captured(CapturedRecord),
    /// A commit failed and the triggering message was dropped. `url` is set
    /// for capture events, empty for toggle and clear.
    CommitFailed { url: Option<String>, error: String },
}

/// Answer from the external sink.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkReceipt {
    pub status: u16,
    /// Parsed JSON body, when the sink returned one.
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct SinkError {
    pub kind: FailureKind,
    pub message: String,
}

impl SinkError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidEndpoint,
    HttpStatus(u16),
    Timeout,
    Network,
    Encoding,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidEndpoint => write!(f, "invalid sink endpoint"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "sink unreachable"),
            FailureKind::Encoding => write!(f, "payload encoding failed"),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("state store: {0}")]
    Store(#[from] StoreError),
    #[error("invalid request: {0}")]
    Request(#[from] RequestError),
    #[error("sink: {0}")]
    Sink(#[from] SinkError),
    #[error("failed to start engine runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("engine loop has stopped")]
    Stopped,
}
