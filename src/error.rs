//! Error types for parsing, framing and the network client/server.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Failures while turning HL7 text into a [`Message`](crate::Message).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The MSH segment is missing, too short, or not the first line.
    #[error("malformed MSH header: {0}")]
    MalformedHeader(String),

    /// A single segment could not be split or typed.
    #[error("failed to decode {tag} segment: {reason}")]
    SegmentDecode { tag: String, reason: String },

    /// A date/time value matched none of the known HL7 formats.
    /// Segment decoding never surfaces this, the field is left unset instead.
    #[error("unparseable HL7 date/time value '{0}'")]
    DateFieldUnparseable(String),
}

impl ParseError {
    pub(crate) fn segment(tag: &str, reason: impl Into<String>) -> Self {
        ParseError::SegmentDecode {
            tag: tag.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by the MLLP framer and the tokio codec built on it.
#[derive(Error, Debug)]
pub enum MllpError {
    /// A frame grew past the configured maximum before its end block arrived.
    #[error("MLLP frame exceeded the {limit} byte limit")]
    FrameTooLarge { limit: usize },

    #[error("I/O error on MLLP transport: {0}")]
    Io(#[from] std::io::Error),
}

/// Which half of an exchange hit its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Connect,
    Write,
    Read,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Connect => "connect",
            Operation::Write => "write",
            Operation::Read => "read",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by [`Client`](crate::Client).
///
/// Any variant other than [`ClientError::Parse`] and [`ClientError::NotConnected`]
/// leaves the client disconnected, the caller has to call `connect` again.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("failed to connect to {address}: {source}")]
    Connection {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("client is not connected")]
    NotConnected,

    #[error("transport error: {0}")]
    Transport(#[from] MllpError),

    #[error("connection closed by peer before a response frame arrived")]
    ConnectionClosed,

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: Operation, after: Duration },

    /// The peer acknowledged some other message; the stream is out of step.
    #[error("acknowledgment for {received} arrived while waiting on {expected}")]
    UnexpectedAck { expected: String, received: String },

    #[error("could not parse response: {0}")]
    Parse(#[from] ParseError),

    #[error("TLS error: {0}")]
    Tls(String),
}

impl ClientError {
    /// True when a deadline expired, as opposed to any other I/O failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout { .. })
    }
}

/// Errors surfaced by [`Server`](crate::Server) lifecycle calls.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server is already running")]
    AlreadyRunning,
}

/// Error type returned by server message handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;
