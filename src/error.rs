//! Error types for the bridge.
//!
//! Two layers, two policies:
//!
//! - [`FrameError`] is raised by the framing codec. The stream can no longer be
//!   trusted once one of these occurs, so the session terminates with a failure.
//! - [`HandlerError`] is raised while producing a response to a well-framed
//!   message. The dispatcher turns it into `{"ok": false, "error": ...}` and the
//!   session keeps going.
//!
//! Clean end-of-input at a frame boundary is not an error at all: the reader
//! returns `Ok(None)`.

use std::io;

use thiserror::Error;

/// Framing-layer failure. Always fatal for the current stream.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The peer closed the stream strictly inside a frame.
    #[error("unexpected EOF while reading {stage}: got {received} of {expected} bytes")]
    UnexpectedEof {
        /// `"length prefix"` or `"payload"`.
        stage: &'static str,
        /// Bytes the frame required for this stage.
        expected: usize,
        /// Bytes actually delivered before EOF.
        received: usize,
    },

    /// The payload is not UTF-8 JSON, or not a JSON object.
    #[error("invalid JSON payload: {0}")]
    InvalidPayload(String),

    /// Declared or encoded length exceeds the configured cap.
    #[error("message of {len} bytes exceeds limit of {max} bytes")]
    TooLarge {
        /// Declared (incoming) or encoded (outgoing) payload length.
        len: usize,
        /// The limit that was exceeded.
        max: usize,
    },

    /// Any other transport failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FrameError {
    /// True for the EOF-inside-a-frame case.
    pub fn is_unexpected_eof(&self) -> bool {
        matches!(self, FrameError::UnexpectedEof { .. })
    }

    /// True for undecodable payloads.
    pub fn is_invalid_payload(&self) -> bool {
        matches!(self, FrameError::InvalidPayload(_))
    }
}

/// Application-level failure while handling one message.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("unknown message type: {0}")]
    UnknownType(String),

    #[error("message has no `type` field")]
    MissingType,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid field `{field}`: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    #[error("cannot read secret: {0}")]
    Secret(#[source] io::Error),

    #[error("secret is empty")]
    EmptySecret,

    #[error("storage error: {0}")]
    Storage(#[source] io::Error),

    #[error("cannot serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors from the manifest installer.
#[cfg(feature = "install")]
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("unknown browser `{0}`")]
    UnknownBrowser(String),

    #[error("{browser} has no {scope} manifest location on this platform")]
    Unsupported {
        browser: &'static str,
        scope: &'static str,
    },

    #[error("host executable path must be absolute: {0}")]
    RelativeExePath(std::path::PathBuf),

    #[error("invalid host name `{0}`: use lowercase letters, digits, `_` and `.`")]
    InvalidHostName(String),

    #[error("HOME is not set")]
    NoHome,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("cannot serialize manifest: {0}")]
    Json(#[from] serde_json::Error),
}
