use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MSG_NO_FILE_SELECTED: &str = "Please select an image first";
pub const MSG_SERVER_NOT_RESPONDING: &str = "Server is not responding. Please try later.";
pub const MSG_ANALYSIS_FAILED: &str = "Analysis failed. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Analysis was requested with no file held.
    Validation,
    /// The service answered with a structured error carrying a `detail` message.
    ServerMessage,
    /// No response before the timeout, or the connection failed.
    Unreachable,
    /// The service answered without a usable `prediction`.
    MalformedResponse,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::ServerMessage => "server-message",
            ErrorKind::Unreachable => "unreachable",
            ErrorKind::MalformedResponse => "malformed-response",
            ErrorKind::Unknown => "unknown",
        }
    }
}

/// User-facing description of a failed analysis attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorDescriptor {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn no_file_selected() -> Self {
        Self::new(ErrorKind::Validation, MSG_NO_FILE_SELECTED)
    }

    pub fn unreachable() -> Self {
        Self::new(ErrorKind::Unreachable, MSG_SERVER_NOT_RESPONDING)
    }

    pub fn malformed_response() -> Self {
        Self::new(ErrorKind::MalformedResponse, MSG_ANALYSIS_FAILED)
    }

    pub fn unknown() -> Self {
        Self::new(ErrorKind::Unknown, MSG_ANALYSIS_FAILED)
    }
}
